//! 启动流程。
//!
//! 顺序固定，前一步完成后才开始下一步，任一步失败立即返回：
//! 1. 登记存储（作用域）与处理器/缓存（单例），绑定解析器
//! 2. 加载模块树（结构错误终止启动）
//! 3. 同步声明的功能/实体信息并刷新元数据缓存
//! 4. 构建角色与用户授权矩阵
//!
//! 只有全部成功才返回 `SecurityServices`，之前不存在可回答授权查询的对象。

use crate::auth_cache::FunctionAuthCache;
use crate::error::SecurityError;
use crate::manager::SecurityManager;
use crate::metadata::{EntityInfoHandler, FunctionHandler};
use crate::module_tree::ModuleHandler;
use crate::rebuild::SecurityConfig;
use domain::{FunctionId, Principal};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;
use warden_scope::{ComponentRegistry, ScopeError, ScopeResolver, ServiceProvider};
use warden_storage::{EntityInfoRecord, FunctionRecord, PermissionStore};

/// 启动器：收集声明的功能与实体信息，按顺序完成启动。
#[derive(Debug, Clone, Default)]
pub struct SecurityBootstrapper {
    config: SecurityConfig,
    functions: Vec<FunctionRecord>,
    entity_infos: Vec<EntityInfoRecord>,
}

impl SecurityBootstrapper {
    pub fn new(config: SecurityConfig) -> Self {
        Self {
            config,
            functions: Vec::new(),
            entity_infos: Vec::new(),
        }
    }

    pub fn declare_functions(mut self, functions: impl IntoIterator<Item = FunctionRecord>) -> Self {
        self.functions.extend(functions);
        self
    }

    pub fn declare_entity_infos(
        mut self,
        entity_infos: impl IntoIterator<Item = EntityInfoRecord>,
    ) -> Self {
        self.entity_infos.extend(entity_infos);
        self
    }

    /// 执行完整启动流程。
    ///
    /// `store_factory` 为每个作用域提供存储实例；`registry` 可预先登记应用自己的组件。
    pub async fn start<F>(
        self,
        registry: ComponentRegistry,
        store_factory: F,
    ) -> Result<SecurityServices, SecurityError>
    where
        F: Fn(&ServiceProvider) -> Result<Arc<dyn PermissionStore>, ScopeError>
            + Send
            + Sync
            + 'static,
    {
        let services = self.register(registry, store_factory);
        info!(target: "warden.security", stage = "register", "security components registered");

        services.initialize().await?;
        info!(target: "warden.security", stage = "module_tree", "module tree loaded");

        services.refresh_cache().await?;
        info!(target: "warden.security", stage = "metadata", "metadata caches refreshed");

        services.auth.refresh().await?;
        info!(target: "warden.security", stage = "auth_cache", "authorization caches built");

        Ok(services)
    }

    fn register<F>(self, mut registry: ComponentRegistry, store_factory: F) -> SecurityServices
    where
        F: Fn(&ServiceProvider) -> Result<Arc<dyn PermissionStore>, ScopeError>
            + Send
            + Sync
            + 'static,
    {
        let resolver = Arc::new(ScopeResolver::new());
        let modules = Arc::new(ModuleHandler::new(resolver.clone(), self.config.clone()));
        let functions = Arc::new(FunctionHandler::new(
            resolver.clone(),
            self.config.clone(),
            self.functions,
        ));
        let entity_infos = Arc::new(EntityInfoHandler::new(
            resolver.clone(),
            self.config.clone(),
            self.entity_infos,
        ));
        let auth = Arc::new(FunctionAuthCache::new(
            resolver.clone(),
            self.config,
            modules.clone(),
            functions.clone(),
        ));

        registry
            .add_scoped::<dyn PermissionStore, _>(store_factory)
            .add_instance(modules.clone())
            .add_instance(functions.clone())
            .add_instance(entity_infos.clone())
            .add_instance(auth.clone());
        let root = registry.build();
        resolver.bind(&root);

        SecurityServices {
            resolver,
            modules,
            functions,
            entity_infos,
            auth,
            writes: Arc::new(Mutex::new(())),
        }
    }
}

/// 启动完成后的安全服务集合，可廉价克隆。
#[derive(Clone)]
pub struct SecurityServices {
    resolver: Arc<ScopeResolver>,
    modules: Arc<ModuleHandler>,
    functions: Arc<FunctionHandler>,
    entity_infos: Arc<EntityInfoHandler>,
    auth: Arc<FunctionAuthCache>,
    writes: Arc<Mutex<()>>,
}

impl SecurityServices {
    /// 生命周期调用一：加载模块树。
    pub async fn initialize(&self) -> Result<(), SecurityError> {
        self.modules.initialize().await.map(|_| ())
    }

    /// 生命周期调用二：同步声明并刷新功能与实体信息缓存。
    pub async fn refresh_cache(&self) -> Result<(), SecurityError> {
        self.functions.sync_functions().await?;
        self.functions.refresh_cache().await?;
        self.entity_infos.sync_entity_infos().await?;
        self.entity_infos.refresh_cache().await?;
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.modules.is_initialized()
            && self.functions.is_initialized()
            && self.entity_infos.is_initialized()
            && self.auth.is_initialized()
    }

    pub fn is_authorized(&self, principal: &Principal, function_id: &FunctionId) -> bool {
        self.auth.is_authorized(principal, function_id)
    }

    pub fn resolver(&self) -> &Arc<ScopeResolver> {
        &self.resolver
    }

    pub fn modules(&self) -> &Arc<ModuleHandler> {
        &self.modules
    }

    pub fn functions(&self) -> &Arc<FunctionHandler> {
        &self.functions
    }

    pub fn entity_infos(&self) -> &Arc<EntityInfoHandler> {
        &self.entity_infos
    }

    pub fn auth(&self) -> &Arc<FunctionAuthCache> {
        &self.auth
    }

    /// 管理写操作共享的串行锁。
    pub(crate) fn write_lock(&self) -> &Arc<Mutex<()>> {
        &self.writes
    }

    pub fn manager(&self) -> SecurityManager {
        SecurityManager::new(self.clone())
    }

    /// 启动后台授权缓存刷新任务。
    pub fn spawn_refresh_worker(&self, shutdown: CancellationToken) -> JoinHandle<()> {
        self.auth.clone().spawn_refresh_worker(shutdown)
    }
}
