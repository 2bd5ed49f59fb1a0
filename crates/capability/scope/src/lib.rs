//! # Warden Scope 模块
//!
//! 组件注册表与环境作用域解析。
//!
//! - [`registry`]：`ComponentRegistry`，按生命周期（单例 / 作用域 / 瞬时）登记组件工厂
//! - [`provider`]：`ServiceProvider`（根或作用域解析器）与 `ServiceScope`（作用域守卫）
//! - [`resolver`]：`ScopeResolver`，在“已有环境作用域”和“按需创建一次性作用域”之间仲裁
//! - [`error`]：`ScopeError`
//!
//! ## 状态机
//!
//! - 未绑定：任何解析返回 `ScopeError::NotInitialized`
//! - 已绑定、无环境作用域：`run_scoped*` 创建新作用域，结束时释放
//! - 已绑定、有环境作用域：`run_scoped*` 直接复用，不创建新作用域
//!
//! 环境作用域通过 `tokio::task_local!` 按任务传播，不在并发上下文间共享。

pub mod error;
pub mod provider;
pub mod registry;
pub mod resolver;

pub use error::ScopeError;
pub use provider::{ServiceProvider, ServiceScope};
pub use registry::{ComponentRegistry, Lifetime};
pub use resolver::{ResolverState, ScopeResolver};
