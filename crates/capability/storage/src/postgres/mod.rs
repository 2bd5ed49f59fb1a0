//! # PostgreSQL 存储实现模块
//!
//! `PgPermissionStore` 基于 sqlx 实现全部权限存储接口，用于生产环境。
//!
//! ## 包含的实现
//!
//! - **FunctionStore** (`function.rs`)：功能表读写，删除时级联移除模块关联
//! - **EntityInfoStore** (`entity_info.rs`)：实体信息按类型名 upsert
//! - **ModuleStore** (`module.rs`)：模块树节点读写，删除前检查子模块
//! - **ModuleFunctionStore / ModuleRoleStore / ModuleUserStore** (`grants.rs`)：
//!   关联表的整体覆盖写入，使用事务
//!
//! ## 数据库模式
//!
//! 表结构见 `schema.rs`，启动时通过 [`PgPermissionStore::ensure_schema`] 幂等创建：
//! - `functions`：功能表（function_id, name, area, controller, action, access_type, is_controller）
//! - `entity_infos`：实体信息表（entity_id, type_name, name, audit_enabled）
//! - `modules`：模块表（module_key, name, position, parent_key, icon, enabled）
//! - `module_functions` / `module_roles` / `module_users`：授权关联表
//!
//! ## 错误处理
//!
//! - `sqlx::Error` 自动转换为 `StorageError`
//! - 无法识别的访问类型、实体编号视为数据一致性错误

pub mod entity_info;
pub mod function;
pub mod grants;
pub mod module;
pub mod schema;

use crate::error::StorageError;
use sqlx::PgPool;

/// 权限 Postgres 存储
#[derive(Clone)]
pub struct PgPermissionStore {
    pub pool: PgPool,
}

impl PgPermissionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 通过数据库 URL 建立连接池
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let pool = crate::connection::connect_pool(database_url).await?;
        Ok(Self { pool })
    }

    /// 幂等创建权限相关表
    pub async fn ensure_schema(&self) -> Result<(), StorageError> {
        for statement in schema::STATEMENTS {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }
}
