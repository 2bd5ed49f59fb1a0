//! 根解析器与作用域。

use crate::error::ScopeError;
use crate::registry::{Descriptor, Erased, Lifetime};
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub(crate) struct RootState {
    descriptors: Vec<Descriptor>,
    by_type: HashMap<TypeId, Vec<usize>>,
    scopes_created: AtomicU64,
    next_scope_id: AtomicU64,
    shutdown: CancellationToken,
}

impl RootState {
    pub(crate) fn new(descriptors: Vec<Descriptor>, by_type: HashMap<TypeId, Vec<usize>>) -> Self {
        Self {
            descriptors,
            by_type,
            scopes_created: AtomicU64::new(0),
            next_scope_id: AtomicU64::new(1),
            shutdown: CancellationToken::new(),
        }
    }
}

struct ScopeState {
    id: u64,
    /// 按创建顺序记录的作用域实例。
    instances: Mutex<Vec<(usize, Erased)>>,
    disposed: AtomicBool,
    cancellation: CancellationToken,
}

impl ScopeState {
    fn cached(&self, index: usize) -> Result<Option<Erased>, ScopeError> {
        let instances = self
            .instances
            .lock()
            .map_err(|_| ScopeError::factory("scope", "lock failed"))?;
        Ok(instances
            .iter()
            .find(|(slot, _)| *slot == index)
            .map(|(_, instance)| instance.clone()))
    }

    /// 写入新实例；并发创建时保留先写入者。
    fn store(&self, index: usize, instance: Erased) -> Result<Erased, ScopeError> {
        let mut instances = self
            .instances
            .lock()
            .map_err(|_| ScopeError::factory("scope", "lock failed"))?;
        if self.disposed.load(Ordering::SeqCst) {
            return Err(ScopeError::ScopeDisposed);
        }
        if let Some((_, existing)) = instances.iter().find(|(slot, _)| *slot == index) {
            return Ok(existing.clone());
        }
        instances.push((index, instance.clone()));
        Ok(instance)
    }

    fn dispose(&self, root: &RootState) -> Result<(), ScopeError> {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.cancellation.cancel();
        let created = {
            let mut instances = self
                .instances
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *instances)
        };
        let mut failures = Vec::new();
        for (index, instance) in created.into_iter().rev() {
            let descriptor = &root.descriptors[index];
            let Some(disposer) = &descriptor.disposer else {
                continue;
            };
            if let Err(err) = disposer(&instance) {
                warn!(scope_id = self.id, component = descriptor.type_name, error = %err, "scoped component dispose failed");
                warden_telemetry::record_scope_dispose_failure();
                failures.push(format!("{}: {err}", descriptor.type_name));
            }
        }
        warden_telemetry::record_scope_disposed();
        debug!(scope_id = self.id, "scope disposed");
        if failures.is_empty() {
            Ok(())
        } else {
            Err(ScopeError::Dispose(failures.join("; ")))
        }
    }
}

/// 组件解析器：根解析器或某个作用域的解析器。克隆开销很小。
#[derive(Clone)]
pub struct ServiceProvider {
    root: Arc<RootState>,
    scope: Option<Arc<ScopeState>>,
}

impl std::fmt::Debug for ServiceProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceProvider")
            .field("scope_id", &self.scope_id())
            .field("components", &self.root.descriptors.len())
            .finish()
    }
}

impl ServiceProvider {
    pub(crate) fn root(root: Arc<RootState>) -> Self {
        Self { root, scope: None }
    }

    /// 返回所属的根解析器。
    pub fn root_provider(&self) -> ServiceProvider {
        Self::root(self.root.clone())
    }

    pub fn is_root(&self) -> bool {
        self.scope.is_none()
    }

    pub fn scope_id(&self) -> Option<u64> {
        self.scope.as_ref().map(|scope| scope.id)
    }

    /// 作用域是否已释放；根解析器始终为 false。
    pub fn is_disposed(&self) -> bool {
        self.scope
            .as_ref()
            .is_some_and(|scope| scope.disposed.load(Ordering::SeqCst))
    }

    /// 是否与 `other` 属于同一个根。
    pub fn same_root(&self, other: &ServiceProvider) -> bool {
        Arc::ptr_eq(&self.root, &other.root)
    }

    /// 作用域的取消令牌：作用域释放时取消。根解析器返回根令牌。
    pub fn cancellation_token(&self) -> CancellationToken {
        match &self.scope {
            Some(scope) => scope.cancellation.clone(),
            None => self.root.shutdown.clone(),
        }
    }

    /// 自该根创建过的作用域数量。
    pub fn scopes_created(&self) -> u64 {
        self.root.scopes_created.load(Ordering::SeqCst)
    }

    /// 创建新作用域。
    pub fn create_scope(&self) -> ServiceScope {
        let id = self.root.next_scope_id.fetch_add(1, Ordering::SeqCst);
        self.root.scopes_created.fetch_add(1, Ordering::SeqCst);
        warden_telemetry::record_scope_created();
        debug!(scope_id = id, "scope created");
        let state = Arc::new(ScopeState {
            id,
            instances: Mutex::new(Vec::new()),
            disposed: AtomicBool::new(false),
            cancellation: self.root.shutdown.child_token(),
        });
        ServiceScope {
            provider: ServiceProvider {
                root: self.root.clone(),
                scope: Some(state),
            },
        }
    }

    /// 解析组件（多次登记时取最后一次）。
    pub fn resolve<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>, ScopeError> {
        let index = self
            .root
            .by_type
            .get(&TypeId::of::<T>())
            .and_then(|indexes| indexes.last().copied())
            .ok_or(ScopeError::NotRegistered(std::any::type_name::<T>()))?;
        self.instantiate::<T>(index)
    }

    /// 解析组件；未登记时返回 `Ok(None)`。
    pub fn try_resolve<T: ?Sized + Send + Sync + 'static>(
        &self,
    ) -> Result<Option<Arc<T>>, ScopeError> {
        match self.resolve::<T>() {
            Ok(instance) => Ok(Some(instance)),
            Err(ScopeError::NotRegistered(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// 按登记顺序解析全部实现。
    pub fn resolve_all<T: ?Sized + Send + Sync + 'static>(
        &self,
    ) -> Result<Vec<Arc<T>>, ScopeError> {
        let Some(indexes) = self.root.by_type.get(&TypeId::of::<T>()) else {
            return Ok(Vec::new());
        };
        indexes
            .iter()
            .map(|index| self.instantiate::<T>(*index))
            .collect()
    }

    fn instantiate<T: ?Sized + Send + Sync + 'static>(
        &self,
        index: usize,
    ) -> Result<Arc<T>, ScopeError> {
        let descriptor = &self.root.descriptors[index];
        let erased = match descriptor.lifetime {
            Lifetime::Singleton => {
                let mut slot = descriptor
                    .singleton
                    .lock()
                    .map_err(|_| ScopeError::factory(descriptor.type_name, "lock failed"))?;
                match slot.as_ref() {
                    Some(instance) => instance.clone(),
                    None => {
                        // 单例只能依赖根解析器，避免捕获作用域组件
                        let instance = (descriptor.factory)(&self.root_provider())?;
                        *slot = Some(instance.clone());
                        instance
                    }
                }
            }
            Lifetime::Scoped => {
                let Some(scope) = &self.scope else {
                    return Err(ScopeError::ScopeRequired(descriptor.type_name));
                };
                if scope.disposed.load(Ordering::SeqCst) {
                    return Err(ScopeError::ScopeDisposed);
                }
                match scope.cached(index)? {
                    Some(instance) => instance,
                    None => {
                        let instance = (descriptor.factory)(self)?;
                        scope.store(index, instance)?
                    }
                }
            }
            Lifetime::Transient => {
                if self.is_disposed() {
                    return Err(ScopeError::ScopeDisposed);
                }
                (descriptor.factory)(self)?
            }
        };
        erased
            .downcast_ref::<Arc<T>>()
            .cloned()
            .ok_or_else(|| ScopeError::factory(descriptor.type_name, "type mismatch"))
    }

    fn dispose_scope(&self) -> Result<(), ScopeError> {
        match &self.scope {
            Some(scope) => scope.dispose(&self.root),
            None => Ok(()),
        }
    }
}

/// 作用域守卫：显式 `dispose` 或 `Drop` 时释放，且只释放一次。
#[must_use = "dropping the scope disposes it immediately"]
pub struct ServiceScope {
    provider: ServiceProvider,
}

impl ServiceScope {
    pub fn provider(&self) -> &ServiceProvider {
        &self.provider
    }

    pub fn id(&self) -> u64 {
        self.provider.scope_id().unwrap_or_default()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.provider.cancellation_token()
    }

    /// 释放作用域并返回释放钩子的错误。
    pub fn dispose(self) -> Result<(), ScopeError> {
        self.provider.dispose_scope()
    }
}

impl Drop for ServiceScope {
    fn drop(&mut self) {
        if let Err(err) = self.provider.dispose_scope() {
            warn!(scope_id = self.id(), error = %err, "scope dispose failed on drop");
        }
    }
}
