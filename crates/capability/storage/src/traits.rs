//! 存储接口 Trait 定义
//!
//! 按实体族拆分的窄接口：
//! - FunctionStore：功能存储
//! - EntityInfoStore：实体信息存储
//! - ModuleStore：模块存储
//! - ModuleFunctionStore：模块功能关联
//! - ModuleRoleStore：模块角色授权
//! - ModuleUserStore：模块用户授权
//!
//! `PermissionStore` 由以上接口组合而成，任何同时实现六个接口的类型自动满足。

use crate::error::StorageError;
use crate::models::{
    EntityInfoRecord, FunctionRecord, FunctionUpdate, ModuleFunctionRecord, ModuleRecord,
    ModuleRoleRecord, ModuleUpdate, ModuleUserRecord,
};
use async_trait::async_trait;
use domain::{FunctionId, ModuleKey, RoleKey, UserKey};
use uuid::Uuid;

/// 功能存储接口
#[async_trait]
pub trait FunctionStore: Send + Sync {
    /// 列出所有功能
    async fn list_functions(&self) -> Result<Vec<FunctionRecord>, StorageError>;

    /// 查找指定功能
    async fn find_function(
        &self,
        function_id: &FunctionId,
    ) -> Result<Option<FunctionRecord>, StorageError>;

    /// 创建功能
    async fn create_function(&self, record: FunctionRecord)
    -> Result<FunctionRecord, StorageError>;

    /// 更新功能
    async fn update_function(
        &self,
        function_id: &FunctionId,
        update: FunctionUpdate,
    ) -> Result<Option<FunctionRecord>, StorageError>;

    /// 删除功能（同时移除模块关联）
    async fn delete_function(&self, function_id: &FunctionId) -> Result<bool, StorageError>;
}

/// 实体信息存储接口
#[async_trait]
pub trait EntityInfoStore: Send + Sync {
    async fn list_entity_infos(&self) -> Result<Vec<EntityInfoRecord>, StorageError>;

    async fn find_entity_info(
        &self,
        entity_id: Uuid,
    ) -> Result<Option<EntityInfoRecord>, StorageError>;

    /// 按类型名新增或覆盖
    async fn upsert_entity_info(
        &self,
        record: EntityInfoRecord,
    ) -> Result<EntityInfoRecord, StorageError>;

    async fn delete_entity_info(&self, entity_id: Uuid) -> Result<bool, StorageError>;
}

/// 模块存储接口
#[async_trait]
pub trait ModuleStore: Send + Sync {
    async fn list_modules(&self) -> Result<Vec<ModuleRecord>, StorageError>;

    async fn find_module(&self, module_key: ModuleKey)
    -> Result<Option<ModuleRecord>, StorageError>;

    async fn create_module(&self, record: ModuleRecord) -> Result<ModuleRecord, StorageError>;

    async fn update_module(
        &self,
        module_key: ModuleKey,
        update: ModuleUpdate,
    ) -> Result<Option<ModuleRecord>, StorageError>;

    /// 删除模块；存在子模块时失败，同时移除该模块的所有关联
    async fn delete_module(&self, module_key: ModuleKey) -> Result<bool, StorageError>;
}

/// 模块功能关联存储接口
#[async_trait]
pub trait ModuleFunctionStore: Send + Sync {
    async fn list_module_functions(&self) -> Result<Vec<ModuleFunctionRecord>, StorageError>;

    /// 覆盖模块的功能集合
    async fn set_module_functions(
        &self,
        module_key: ModuleKey,
        function_ids: Vec<FunctionId>,
    ) -> Result<(), StorageError>;
}

/// 模块角色授权存储接口
#[async_trait]
pub trait ModuleRoleStore: Send + Sync {
    /// 列出授权；`role_keys` 为空时返回全部
    async fn list_module_roles(
        &self,
        role_keys: Option<&[RoleKey]>,
    ) -> Result<Vec<ModuleRoleRecord>, StorageError>;

    /// 覆盖角色的模块集合
    async fn set_role_modules(
        &self,
        role_key: &RoleKey,
        module_keys: Vec<ModuleKey>,
    ) -> Result<(), StorageError>;
}

/// 模块用户授权存储接口
#[async_trait]
pub trait ModuleUserStore: Send + Sync {
    /// 列出授权；`user_keys` 为空时返回全部
    async fn list_module_users(
        &self,
        user_keys: Option<&[UserKey]>,
    ) -> Result<Vec<ModuleUserRecord>, StorageError>;

    /// 覆盖用户的模块集合
    async fn set_user_modules(
        &self,
        user_key: UserKey,
        module_keys: Vec<ModuleKey>,
    ) -> Result<(), StorageError>;
}

/// 权限存储：六个窄接口的组合。
pub trait PermissionStore:
    FunctionStore + EntityInfoStore + ModuleStore + ModuleFunctionStore + ModuleRoleStore + ModuleUserStore
{
}

impl<T> PermissionStore for T where
    T: FunctionStore
        + EntityInfoStore
        + ModuleStore
        + ModuleFunctionStore
        + ModuleRoleStore
        + ModuleUserStore
{
}
