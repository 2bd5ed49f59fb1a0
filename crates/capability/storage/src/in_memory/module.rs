//! 模块内存存储实现
//!
//! 不校验父子环路：结构完整性由模块树加载时统一检查。

use super::InMemoryPermissionStore;
use crate::error::StorageError;
use crate::models::{ModuleRecord, ModuleUpdate};
use crate::traits::ModuleStore;
use crate::validation::ensure_module;
use domain::ModuleKey;

#[async_trait::async_trait]
impl ModuleStore for InMemoryPermissionStore {
    async fn list_modules(&self) -> Result<Vec<ModuleRecord>, StorageError> {
        let tables = self.read()?;
        Ok(tables.modules.values().cloned().collect())
    }

    async fn find_module(
        &self,
        module_key: ModuleKey,
    ) -> Result<Option<ModuleRecord>, StorageError> {
        let tables = self.read()?;
        Ok(tables.modules.get(&module_key).cloned())
    }

    async fn create_module(&self, record: ModuleRecord) -> Result<ModuleRecord, StorageError> {
        ensure_module(&record)?;
        let mut tables = self.write()?;
        if tables.modules.contains_key(&record.module_key) {
            return Err(StorageError::new("module exists"));
        }
        tables.modules.insert(record.module_key, record.clone());
        Ok(record)
    }

    async fn update_module(
        &self,
        module_key: ModuleKey,
        update: ModuleUpdate,
    ) -> Result<Option<ModuleRecord>, StorageError> {
        let mut tables = self.write()?;
        let Some(current) = tables.modules.get(&module_key) else {
            return Ok(None);
        };
        let mut module = current.clone();
        if let Some(name) = update.name {
            module.name = name;
        }
        if let Some(position) = update.position {
            module.position = position;
        }
        if let Some(parent_key) = update.parent_key {
            module.parent_key = parent_key;
        }
        if let Some(icon) = update.icon {
            module.icon = Some(icon);
        }
        if let Some(enabled) = update.enabled {
            module.enabled = enabled;
        }
        ensure_module(&module)?;
        tables.modules.insert(module_key, module.clone());
        Ok(Some(module))
    }

    async fn delete_module(&self, module_key: ModuleKey) -> Result<bool, StorageError> {
        let mut tables = self.write()?;
        if !tables.modules.contains_key(&module_key) {
            return Ok(false);
        }
        if tables
            .modules
            .values()
            .any(|module| module.parent_key == Some(module_key))
        {
            return Err(StorageError::new("module has children"));
        }
        tables.modules.remove(&module_key);
        tables.module_functions.retain(|(key, _)| *key != module_key);
        tables.module_roles.retain(|(key, _)| *key != module_key);
        tables.module_users.retain(|(key, _)| *key != module_key);
        Ok(true)
    }
}
