use crate::error::SecurityError;
use std::future::Future;
use std::sync::Arc;
use warden_scope::ScopeResolver;
use warden_storage::PermissionStore;

/// 在环境作用域（或新建的一次性作用域）内取得存储并执行 `work`。
pub(crate) async fn with_store<T, F, Fut>(
    resolver: &ScopeResolver,
    work: F,
) -> Result<T, SecurityError>
where
    F: FnOnce(Arc<dyn PermissionStore>) -> Fut,
    Fut: Future<Output = Result<T, SecurityError>>,
{
    resolver
        .run_scoped_async(|provider| async move {
            let store = provider.resolve::<dyn PermissionStore>()?;
            work(store).await
        })
        .await?
}
