//! 管理入口。
//!
//! 每个写操作在一个作用域（工作单元）内完成，随后按依赖顺序重建受影响的派生结构：
//! 模块结构或模块-功能关联变化 → 模块树 → 授权矩阵；授权表变化 → 授权矩阵；
//! 功能/实体信息变化 → 对应元数据缓存。重建完成后才返回。
//!
//! 写操作之间由共享锁串行；模块结构校验读取同一工作单元内的存储行，
//! 已发布快照可能因上次重建失败而过期。

use crate::bootstrap::SecurityServices;
use crate::error::SecurityError;
use crate::module_tree::ModuleTree;
use crate::unit_of_work::with_store;
use domain::{FunctionId, ModuleKey, RoleKey, UserKey};
use std::sync::Arc;
use tracing::info;
use warden_storage::{
    EntityInfoRecord, FunctionRecord, FunctionUpdate, ModuleRecord, ModuleUpdate,
    PermissionStore,
};

#[derive(Clone)]
pub struct SecurityManager {
    services: SecurityServices,
}

impl SecurityManager {
    pub fn new(services: SecurityServices) -> Self {
        Self { services }
    }

    pub fn module_tree(&self) -> Result<Arc<ModuleTree>, SecurityError> {
        self.services.modules().snapshot()
    }

    pub async fn create_module(&self, record: ModuleRecord) -> Result<ModuleRecord, SecurityError> {
        let _writes = self.services.write_lock().lock().await;
        let created = with_store(self.services.resolver(), |store| async move {
            let tree = current_tree(&*store).await?;
            if tree.contains(record.module_key) {
                return Err(SecurityError::Validation(format!(
                    "module {} already exists",
                    record.module_key
                )));
            }
            if let Some(parent) = record.parent_key {
                ensure_parent(&tree, record.module_key, parent)?;
            }
            Ok(store.create_module(record).await?)
        })
        .await?;
        info!(target: "warden.security", module_key = %created.module_key, "module created");
        self.rebuild_structure().await?;
        Ok(created)
    }

    pub async fn update_module(
        &self,
        module_key: ModuleKey,
        update: ModuleUpdate,
    ) -> Result<Option<ModuleRecord>, SecurityError> {
        let _writes = self.services.write_lock().lock().await;
        let updated = with_store(self.services.resolver(), |store| async move {
            if let Some(Some(parent)) = update.parent_key {
                let tree = current_tree(&*store).await?;
                ensure_parent(&tree, module_key, parent)?;
            }
            Ok(store.update_module(module_key, update).await?)
        })
        .await?;
        if updated.is_some() {
            info!(target: "warden.security", module_key = %module_key, "module updated");
            self.rebuild_structure().await?;
        }
        Ok(updated)
    }

    pub async fn delete_module(&self, module_key: ModuleKey) -> Result<bool, SecurityError> {
        let _writes = self.services.write_lock().lock().await;
        let deleted = with_store(self.services.resolver(), |store| async move {
            let tree = current_tree(&*store).await?;
            if !tree.children(module_key).is_empty() {
                return Err(SecurityError::Validation(format!(
                    "module {module_key} has children"
                )));
            }
            Ok(store.delete_module(module_key).await?)
        })
        .await?;
        if deleted {
            info!(target: "warden.security", module_key = %module_key, "module deleted");
            self.rebuild_structure().await?;
        }
        Ok(deleted)
    }

    pub fn list_functions(&self) -> Result<Vec<FunctionRecord>, SecurityError> {
        let mut functions: Vec<FunctionRecord> =
            self.services.functions().snapshot()?.values().cloned().collect();
        functions.sort_by(|a, b| a.function_id.cmp(&b.function_id));
        Ok(functions)
    }

    /// 更新功能名称或访问类型；访问类型在读取路径上实时生效。
    pub async fn update_function(
        &self,
        function_id: FunctionId,
        update: FunctionUpdate,
    ) -> Result<Option<FunctionRecord>, SecurityError> {
        let _writes = self.services.write_lock().lock().await;
        let updated = with_store(self.services.resolver(), |store| async move {
            Ok(store.update_function(&function_id, update).await?)
        })
        .await?;
        if let Some(record) = &updated {
            info!(target: "warden.security", function_id = %record.function_id, access_type = record.access_type.as_str(), "function updated");
            self.services.functions().refresh_cache().await?;
        }
        Ok(updated)
    }

    pub fn list_entity_infos(&self) -> Result<Vec<EntityInfoRecord>, SecurityError> {
        let mut infos: Vec<EntityInfoRecord> = self
            .services
            .entity_infos()
            .snapshot()?
            .values()
            .cloned()
            .collect();
        infos.sort_by(|a, b| a.type_name.cmp(&b.type_name));
        Ok(infos)
    }

    pub async fn upsert_entity_info(
        &self,
        record: EntityInfoRecord,
    ) -> Result<EntityInfoRecord, SecurityError> {
        let _writes = self.services.write_lock().lock().await;
        let saved = with_store(self.services.resolver(), |store| async move {
            Ok(store.upsert_entity_info(record).await?)
        })
        .await?;
        self.services.entity_infos().refresh_cache().await?;
        Ok(saved)
    }

    pub async fn set_module_functions(
        &self,
        module_key: ModuleKey,
        function_ids: Vec<FunctionId>,
    ) -> Result<(), SecurityError> {
        let _writes = self.services.write_lock().lock().await;
        if !self.module_tree()?.contains(module_key) {
            return Err(SecurityError::Validation(format!(
                "module {module_key} not found"
            )));
        }
        let known = self.services.functions().snapshot()?;
        if let Some(unknown) = function_ids.iter().find(|id| !known.contains_key(*id)) {
            return Err(SecurityError::UnknownFunction(unknown.clone()));
        }
        let count = function_ids.len();
        with_store(self.services.resolver(), |store| async move {
            Ok(store.set_module_functions(module_key, function_ids).await?)
        })
        .await?;
        info!(target: "warden.security", module_key = %module_key, functions = count, "module functions replaced");
        self.rebuild_structure().await
    }

    pub async fn set_role_modules(
        &self,
        role_key: RoleKey,
        module_keys: Vec<ModuleKey>,
    ) -> Result<(), SecurityError> {
        let _writes = self.services.write_lock().lock().await;
        self.ensure_modules(&module_keys)?;
        let count = module_keys.len();
        let role = role_key.clone();
        with_store(self.services.resolver(), |store| async move {
            Ok(store.set_role_modules(&role, module_keys).await?)
        })
        .await?;
        info!(target: "warden.security", role = %role_key, modules = count, "role modules replaced");
        self.services.auth().invalidate().await
    }

    pub async fn set_user_modules(
        &self,
        user_key: UserKey,
        module_keys: Vec<ModuleKey>,
    ) -> Result<(), SecurityError> {
        let _writes = self.services.write_lock().lock().await;
        self.ensure_modules(&module_keys)?;
        let count = module_keys.len();
        with_store(self.services.resolver(), |store| async move {
            Ok(store.set_user_modules(user_key, module_keys).await?)
        })
        .await?;
        info!(target: "warden.security", user = %user_key, modules = count, "user modules replaced");
        self.services.auth().invalidate().await
    }

    fn ensure_modules(&self, module_keys: &[ModuleKey]) -> Result<(), SecurityError> {
        let tree = self.module_tree()?;
        match module_keys.iter().find(|key| !tree.contains(**key)) {
            Some(missing) => Err(SecurityError::Validation(format!(
                "module {missing} not found"
            ))),
            None => Ok(()),
        }
    }

    async fn rebuild_structure(&self) -> Result<(), SecurityError> {
        self.services.modules().refresh().await?;
        self.services.auth().invalidate().await
    }
}

/// 按存储当前行构建模块树，不使用已发布的快照。
async fn current_tree(store: &dyn PermissionStore) -> Result<ModuleTree, SecurityError> {
    let modules = store.list_modules().await?;
    let links = store.list_module_functions().await?;
    ModuleTree::build(modules, links)
}

/// 校验新父节点存在且不会形成环路。
fn ensure_parent(
    tree: &ModuleTree,
    module_key: ModuleKey,
    parent: ModuleKey,
) -> Result<(), SecurityError> {
    if !tree.contains(parent) {
        return Err(SecurityError::Integrity(format!(
            "parent module {parent} not found"
        )));
    }
    if tree.would_create_cycle(module_key, parent) {
        return Err(SecurityError::Integrity(format!(
            "moving module {module_key} under {parent} creates a cycle"
        )));
    }
    Ok(())
}
