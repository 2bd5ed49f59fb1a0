//! 数据模型
//!
//! 定义权限存储相关的数据模型和更新结构：
//! - 功能模型：FunctionRecord, FunctionUpdate
//! - 实体信息：EntityInfoRecord
//! - 模块模型：ModuleRecord, ModuleUpdate
//! - 授权关联：ModuleFunctionRecord, ModuleRoleRecord, ModuleUserRecord

use domain::{AccessType, FunctionId, ModuleKey, RoleKey, UserKey};
use uuid::Uuid;

/// 功能记录（受保护的操作，如控制器 Action）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionRecord {
    pub function_id: FunctionId,
    pub name: String,
    pub area: Option<String>,
    pub controller: String,
    pub action: String,
    pub access_type: AccessType,
    pub is_controller: bool,
}

impl FunctionRecord {
    /// 按区域/控制器/操作构造功能记录，编号自动生成。
    pub fn new(
        area: Option<&str>,
        controller: &str,
        action: &str,
        name: impl Into<String>,
        access_type: AccessType,
    ) -> Self {
        Self {
            function_id: FunctionId::from_parts(area, controller, action),
            name: name.into(),
            area: area.map(str::to_string),
            controller: controller.to_string(),
            action: action.to_string(),
            access_type,
            is_controller: false,
        }
    }
}

/// 功能更新输入。
#[derive(Debug, Clone, Default)]
pub struct FunctionUpdate {
    pub name: Option<String>,
    pub access_type: Option<AccessType>,
}

/// 实体信息记录（数据级权限使用）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityInfoRecord {
    pub entity_id: Uuid,
    pub type_name: String,
    pub name: String,
    pub audit_enabled: bool,
}

/// 模块记录。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRecord {
    pub module_key: ModuleKey,
    pub name: String,
    pub position: i32,
    pub parent_key: Option<ModuleKey>,
    pub icon: Option<String>,
    pub enabled: bool,
}

/// 模块更新输入。
///
/// `parent_key` 为 `Some(None)` 时表示移动到根节点。
#[derive(Debug, Clone, Default)]
pub struct ModuleUpdate {
    pub name: Option<String>,
    pub position: Option<i32>,
    pub parent_key: Option<Option<ModuleKey>>,
    pub icon: Option<String>,
    pub enabled: Option<bool>,
}

/// 模块-功能关联。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleFunctionRecord {
    pub module_key: ModuleKey,
    pub function_id: FunctionId,
}

/// 模块-角色授权。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleRoleRecord {
    pub module_key: ModuleKey,
    pub role_key: RoleKey,
}

/// 模块-用户授权。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleUserRecord {
    pub module_key: ModuleKey,
    pub user_key: UserKey,
}
