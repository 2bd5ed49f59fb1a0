//! 作用域解析错误类型。

/// 组件解析与作用域生命周期错误。
#[derive(Debug, Clone, thiserror::Error)]
pub enum ScopeError {
    #[error("scope resolver is not bound to a root provider")]
    NotInitialized,
    #[error("component not registered: {0}")]
    NotRegistered(&'static str),
    #[error("scoped component {0} requires a scope")]
    ScopeRequired(&'static str),
    #[error("scope already disposed")]
    ScopeDisposed,
    #[error("factory for {component} failed: {message}")]
    Factory {
        component: &'static str,
        message: String,
    },
    #[error("scope dispose failed: {0}")]
    Dispose(String),
}

impl ScopeError {
    /// 构造工厂错误，供组件工厂包装自身的失败原因。
    pub fn factory(component: &'static str, message: impl Into<String>) -> Self {
        ScopeError::Factory {
            component,
            message: message.into(),
        }
    }
}
