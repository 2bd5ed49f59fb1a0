//! # Warden Storage 模块
//!
//! 权限数据的存储抽象层：功能、实体信息、模块树以及模块与功能/角色/用户的授权关联。
//!
//! ## 架构设计
//!
//! 1. **接口抽象层** (`traits.rs`)：按实体族拆分的异步窄接口，组合为 `PermissionStore`
//! 2. **数据模型层** (`models.rs`)：存储记录与更新结构
//! 3. **错误处理层** (`error.rs`)：统一的存储错误类型
//! 4. **验证辅助层** (`validation.rs`)：写入前的记录校验
//! 5. **连接管理层** (`connection.rs`)：数据库连接池管理
//! 6. **实现层**：
//!    - `in_memory/`：内存存储实现（用于测试和演示）
//!    - `postgres/`：PostgreSQL 存储实现（生产环境使用）
//!
//! ## 使用示例
//!
//! ```rust,ignore
//! use warden_storage::{InMemoryPermissionStore, ModuleRecord, ModuleStore};
//! use domain::ModuleKey;
//!
//! let store = InMemoryPermissionStore::new();
//! store.create_module(ModuleRecord {
//!     module_key: ModuleKey(1),
//!     name: "Root".to_string(),
//!     position: 0,
//!     parent_key: None,
//!     icon: None,
//!     enabled: true,
//! }).await?;
//! ```
//!
//! ## 设计约束
//!
//! - 存储层只保证单条记录的合法性；模块树的环路与悬空父节点由安全层加载时检测
//! - 覆盖写入（set_*）必须整体可见，不允许出现半更新状态

pub mod connection;
pub mod error;
pub mod in_memory;
pub mod models;
pub mod postgres;
pub mod traits;
pub mod validation;

pub use connection::*;
pub use error::*;
pub use models::*;
pub use traits::*;
pub use validation::*;

pub use in_memory::InMemoryPermissionStore;
pub use postgres::PgPermissionStore;
