//! 环境作用域解析器。
//!
//! 单例和后台任务通过 `ScopeResolver` 借用作用域组件：
//! 当前任务已处于某个作用域（环境作用域）时直接复用；否则创建一次性作用域，
//! 在 `work` 结束（包括 panic 与 future 被丢弃）时释放。

use crate::error::ScopeError;
use crate::provider::ServiceProvider;
use std::future::Future;
use std::sync::{Arc, OnceLock};
use tracing::warn;

tokio::task_local! {
    static AMBIENT: ServiceProvider;
}

/// 解析器在当前执行上下文中的状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverState {
    Unbound,
    Bound,
    Ambient,
}

/// 环境作用域解析器。绑定根解析器后只读，可在任务间共享。
#[derive(Debug, Default)]
pub struct ScopeResolver {
    root: OnceLock<ServiceProvider>,
}

impl ScopeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// 绑定根解析器；先写入者生效，重复绑定返回 false 且不覆盖。
    pub fn bind(&self, provider: &ServiceProvider) -> bool {
        self.root.set(provider.root_provider()).is_ok()
    }

    pub fn is_bound(&self) -> bool {
        self.root.get().is_some()
    }

    pub fn root(&self) -> Result<&ServiceProvider, ScopeError> {
        self.root.get().ok_or(ScopeError::NotInitialized)
    }

    pub fn state(&self) -> ResolverState {
        match self.root.get() {
            None => ResolverState::Unbound,
            Some(_) if self.ambient().is_some() => ResolverState::Ambient,
            Some(_) => ResolverState::Bound,
        }
    }

    /// 当前任务的环境作用域；仅当属于同一个根且尚未释放时可用。
    pub fn ambient(&self) -> Option<ServiceProvider> {
        let root = self.root.get()?;
        AMBIENT
            .try_with(|provider| provider.clone())
            .ok()
            .filter(|provider| provider.same_root(root) && !provider.is_disposed())
    }

    /// 自根创建过的作用域数量。
    pub fn scopes_created(&self) -> u64 {
        self.root.get().map_or(0, ServiceProvider::scopes_created)
    }

    /// 在作用域内同步执行 `work`。
    pub fn run_scoped<R>(
        &self,
        work: impl FnOnce(&ServiceProvider) -> R,
    ) -> Result<R, ScopeError> {
        let root = self.root()?;
        if let Some(ambient) = self.ambient() {
            return Ok(work(&ambient));
        }
        let scope = root.create_scope();
        let provider = scope.provider().clone();
        let result = AMBIENT.sync_scope(provider.clone(), || work(&provider));
        if let Err(err) = scope.dispose() {
            warn!(error = %err, "scope dispose failed after work");
        }
        Ok(result)
    }

    /// 在作用域内异步执行 `work`；除 `work` 自身外不引入额外挂起点。
    pub async fn run_scoped_async<F, Fut, R>(&self, work: F) -> Result<R, ScopeError>
    where
        F: FnOnce(ServiceProvider) -> Fut,
        Fut: Future<Output = R>,
    {
        let root = self.root()?;
        if let Some(ambient) = self.ambient() {
            return Ok(work(ambient).await);
        }
        let scope = root.create_scope();
        let provider = scope.provider().clone();
        let result = AMBIENT
            .scope(provider.clone(), async move { work(provider).await })
            .await;
        if let Err(err) = scope.dispose() {
            warn!(error = %err, "scope dispose failed after work");
        }
        Ok(result)
    }

    /// 以 `provider` 作为环境作用域运行 `future`（请求处理层进入作用域）。
    pub async fn enter_scope<Fut: Future>(
        &self,
        provider: ServiceProvider,
        future: Fut,
    ) -> Fut::Output {
        AMBIENT.scope(provider, future).await
    }

    /// `enter_scope` 的同步版本。
    pub fn enter_scope_sync<R>(&self, provider: ServiceProvider, work: impl FnOnce() -> R) -> R {
        AMBIENT.sync_scope(provider, work)
    }

    /// 解析组件：有环境作用域时委托给它，否则委托给根解析器。
    pub fn resolve<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>, ScopeError> {
        self.current()?.resolve::<T>()
    }

    pub fn try_resolve<T: ?Sized + Send + Sync + 'static>(
        &self,
    ) -> Result<Option<Arc<T>>, ScopeError> {
        self.current()?.try_resolve::<T>()
    }

    pub fn resolve_all<T: ?Sized + Send + Sync + 'static>(
        &self,
    ) -> Result<Vec<Arc<T>>, ScopeError> {
        self.current()?.resolve_all::<T>()
    }

    fn current(&self) -> Result<ServiceProvider, ScopeError> {
        let root = self.root()?;
        Ok(self.ambient().unwrap_or_else(|| root.clone()))
    }
}
