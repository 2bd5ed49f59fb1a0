//! # Warden Security 模块
//!
//! 权限模型的派生结构与启动流程：
//!
//! - [`module_tree`]：模块树构建（环路/悬空父节点检测）与 `ModuleHandler`
//! - [`metadata`]：功能与实体信息的元数据缓存
//! - [`auth_cache`]：角色/用户授权矩阵，回答“主体能否调用功能”
//! - [`bootstrap`]：固定顺序的启动流程，产出 `SecurityServices`
//! - [`manager`]：管理入口，写入后按顺序触发派生结构重建
//! - [`rebuild`]：重建闸门（单飞合并）与有界重试
//!
//! 所有派生结构整体重建、原子发布；读取方永远只看到完整快照。
//! 存储读取统一经过 `ScopeResolver::run_scoped_async`。

pub mod auth_cache;
pub mod bootstrap;
pub mod error;
pub mod manager;
pub mod metadata;
pub mod module_tree;
pub mod rebuild;
mod unit_of_work;

pub use auth_cache::{AuthSnapshot, FunctionAuthCache, RoleMatrix, UserMatrix};
pub use bootstrap::{SecurityBootstrapper, SecurityServices};
pub use error::SecurityError;
pub use manager::SecurityManager;
pub use metadata::{EntityInfoHandler, FunctionHandler, MetadataCache};
pub use module_tree::{ModuleHandler, ModuleNode, ModuleTree};
pub use rebuild::{RebuildGate, SecurityConfig};
