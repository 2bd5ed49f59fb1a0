//! 功能授权缓存。
//!
//! 角色矩阵与用户矩阵分别由模块树快照和授权表计算：
//! `granted(role) = ⋃ descendant_functions(m)`，m 为授予该角色的模块，用户同理。
//! 授权只做并集，不存在显式拒绝。
//!
//! 两张矩阵合为一份 `AuthSnapshot`，读取路径只做一次原子指针加载与哈希查找；
//! 重建经 `RebuildGate` 串行并合并，失败时保留上一份有效快照。

use crate::error::SecurityError;
use crate::metadata::FunctionHandler;
use crate::module_tree::{ModuleHandler, ModuleTree};
use crate::rebuild::{RebuildGate, SecurityConfig, with_retry};
use crate::unit_of_work::with_store;
use arc_swap::ArcSwapOption;
use domain::{AccessType, FunctionId, ModuleKey, Principal, RoleKey, UserKey};
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub type RoleMatrix = HashMap<RoleKey, HashSet<FunctionId>>;
pub type UserMatrix = HashMap<UserKey, HashSet<FunctionId>>;

/// 同一次重建得到的角色矩阵与用户矩阵，整体发布。
#[derive(Debug, Default)]
pub struct AuthSnapshot {
    pub roles: RoleMatrix,
    pub users: UserMatrix,
}

pub struct FunctionAuthCache {
    resolver: Arc<warden_scope::ScopeResolver>,
    config: SecurityConfig,
    modules: Arc<ModuleHandler>,
    functions: Arc<FunctionHandler>,
    snapshot: ArcSwapOption<AuthSnapshot>,
    gate: RebuildGate,
    wake: Notify,
}

impl FunctionAuthCache {
    pub fn new(
        resolver: Arc<warden_scope::ScopeResolver>,
        config: SecurityConfig,
        modules: Arc<ModuleHandler>,
        functions: Arc<FunctionHandler>,
    ) -> Self {
        Self {
            resolver,
            config,
            modules,
            functions,
            snapshot: ArcSwapOption::empty(),
            gate: RebuildGate::new("auth_cache"),
            wake: Notify::new(),
        }
    }

    /// 角色矩阵，仅在 `refresh` 的闸门内调用。
    async fn build_role_caches(&self, tree: &ModuleTree) -> Result<RoleMatrix, SecurityError> {
        let grants = with_retry(&self.config, "module_roles", || {
            with_store(&self.resolver, |store| async move {
                Ok(store.list_module_roles(None).await?)
            })
        })
        .await?;
        Ok(aggregate(
            tree,
            grants.into_iter().map(|grant| (grant.role_key, grant.module_key)),
        ))
    }

    async fn build_user_caches(&self, tree: &ModuleTree) -> Result<UserMatrix, SecurityError> {
        let grants = with_retry(&self.config, "module_users", || {
            with_store(&self.resolver, |store| async move {
                Ok(store.list_module_users(None).await?)
            })
        })
        .await?;
        Ok(aggregate(
            tree,
            grants.into_iter().map(|grant| (grant.user_key, grant.module_key)),
        ))
    }

    /// 经闸门重建两张矩阵；若已有覆盖本次请求的重建则合并。
    ///
    /// 两张矩阵都构建成功后才一次性发布，任一失败保留旧快照。
    pub async fn refresh(&self) -> Result<bool, SecurityError> {
        self.gate
            .run(|| async {
                let tree = self.modules.snapshot()?;
                let roles = self.build_role_caches(&tree).await?;
                debug!(target: "warden.security", roles = roles.len(), "role matrix built");
                let users = self.build_user_caches(&tree).await?;
                debug!(target: "warden.security", users = users.len(), "user matrix built");
                let (role_count, user_count) = (roles.len(), users.len());
                self.snapshot
                    .store(Some(Arc::new(AuthSnapshot { roles, users })));
                info!(target: "warden.security", roles = role_count, users = user_count, "authorization caches rebuilt");
                Ok(())
            })
            .await
    }

    /// 标记过期并同步重建；返回时不会再给出过期答案。
    pub async fn invalidate(&self) -> Result<(), SecurityError> {
        self.gate.mark_stale();
        self.refresh().await.map(|_| ())
    }

    /// 仅标记过期并唤醒后台刷新任务。
    pub fn mark_stale(&self) -> u64 {
        let generation = self.gate.mark_stale();
        self.wake.notify_one();
        generation
    }

    pub fn is_stale(&self) -> bool {
        self.gate.is_stale()
    }

    pub fn generation(&self) -> u64 {
        self.gate.generation()
    }

    pub fn is_initialized(&self) -> bool {
        self.snapshot.load().is_some()
    }

    /// 启动后台刷新任务：收到 `mark_stale` 后重建，直到 `shutdown` 被取消。
    pub fn spawn_refresh_worker(self: Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(target: "warden.security", "auth cache refresh worker started");
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = self.wake.notified() => {
                        if !self.is_stale() {
                            continue;
                        }
                        if let Err(err) = self.refresh().await {
                            warn!(target: "warden.security", "background auth cache refresh failed: {}", err);
                        }
                    }
                }
            }
            info!(target: "warden.security", "auth cache refresh worker stopped");
        })
    }

    /// 显式授权查询；未知功能与未初始化以错误返回。
    pub fn check(
        &self,
        principal: &Principal,
        function_id: &FunctionId,
    ) -> Result<bool, SecurityError> {
        let function = self
            .functions
            .find(function_id)?
            .ok_or_else(|| SecurityError::UnknownFunction(function_id.clone()))?;
        match function.access_type {
            AccessType::Anonymous => Ok(true),
            AccessType::LoggedIn => Ok(principal.is_authenticated()),
            AccessType::RoleLimit => {
                let guard = self.snapshot.load();
                let Some(snapshot) = &*guard else {
                    return Err(SecurityError::NotInitialized("authorization cache"));
                };
                let by_role = principal.roles.iter().any(|role| {
                    snapshot
                        .roles
                        .get(role)
                        .is_some_and(|granted| granted.contains(function_id))
                });
                let by_user = principal.user_id.is_some_and(|user| {
                    snapshot
                        .users
                        .get(&user)
                        .is_some_and(|granted| granted.contains(function_id))
                });
                Ok(by_role || by_user)
            }
        }
    }

    /// 授权查询：任何错误都按拒绝处理，原因只写日志。
    pub fn is_authorized(&self, principal: &Principal, function_id: &FunctionId) -> bool {
        match self.check(principal, function_id) {
            Ok(granted) => {
                warden_telemetry::record_authorization(granted);
                granted
            }
            Err(SecurityError::UnknownFunction(_)) => {
                warn!(target: "warden.security", function_id = %function_id, "authorization for unknown function denied");
                warden_telemetry::record_unknown_function();
                false
            }
            Err(err) => {
                warn!(target: "warden.security", function_id = %function_id, "authorization denied: {}", err);
                warden_telemetry::record_authorization(false);
                false
            }
        }
    }

    /// 角色被授予的功能集合（管理查询用）。
    pub fn role_functions(&self, role: &RoleKey) -> Result<HashSet<FunctionId>, SecurityError> {
        let snapshot = self.current()?;
        Ok(snapshot.roles.get(role).cloned().unwrap_or_default())
    }

    /// 用户直授的功能集合。
    pub fn user_functions(&self, user: UserKey) -> Result<HashSet<FunctionId>, SecurityError> {
        let snapshot = self.current()?;
        Ok(snapshot.users.get(&user).cloned().unwrap_or_default())
    }

    /// 当前发布的快照。
    pub fn current(&self) -> Result<Arc<AuthSnapshot>, SecurityError> {
        self.snapshot
            .load_full()
            .ok_or(SecurityError::NotInitialized("authorization cache"))
    }
}

/// 按授权主体聚合模块后代功能；同一模块只计算一次。
fn aggregate<K: Eq + Hash + std::fmt::Display>(
    tree: &ModuleTree,
    grants: impl Iterator<Item = (K, ModuleKey)>,
) -> HashMap<K, HashSet<FunctionId>> {
    let mut memo: HashMap<ModuleKey, Arc<HashSet<FunctionId>>> = HashMap::new();
    let mut matrix: HashMap<K, HashSet<FunctionId>> = HashMap::new();
    for (holder, module_key) in grants {
        if !tree.contains(module_key) {
            warn!(target: "warden.security", holder = %holder, module_key = %module_key, "grant references unknown module, skipped");
            continue;
        }
        let functions = memo
            .entry(module_key)
            .or_insert_with(|| Arc::new(tree.descendant_functions(module_key)))
            .clone();
        matrix
            .entry(holder)
            .or_default()
            .extend(functions.iter().cloned());
    }
    matrix
}
