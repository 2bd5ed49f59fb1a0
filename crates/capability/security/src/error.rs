//! 安全层错误类型。

use domain::FunctionId;
use warden_scope::ScopeError;
use warden_storage::StorageError;

#[derive(Debug, Clone, thiserror::Error)]
pub enum SecurityError {
    /// 启动顺序错误：缓存或解析器在初始化前被使用。
    #[error("{0} not initialized")]
    NotInitialized(&'static str),
    /// 模块树结构错误（重复编号、悬空父节点、环路）。
    #[error("module tree integrity violated: {0}")]
    Integrity(String),
    #[error("unknown function: {0}")]
    UnknownFunction(FunctionId),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("scope error: {0}")]
    Scope(#[from] ScopeError),
}

impl SecurityError {
    /// 是否可通过重试恢复（仅存储读取失败）。
    pub fn is_transient(&self) -> bool {
        matches!(self, SecurityError::Storage(_))
    }
}
