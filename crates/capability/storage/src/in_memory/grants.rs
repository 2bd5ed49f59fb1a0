//! 授权关联内存存储实现
//!
//! 模块-功能、模块-角色、模块-用户三张关联表。

use super::InMemoryPermissionStore;
use crate::error::StorageError;
use crate::models::{ModuleFunctionRecord, ModuleRoleRecord, ModuleUserRecord};
use crate::traits::{ModuleFunctionStore, ModuleRoleStore, ModuleUserStore};
use domain::{FunctionId, ModuleKey, RoleKey, UserKey};

#[async_trait::async_trait]
impl ModuleFunctionStore for InMemoryPermissionStore {
    async fn list_module_functions(&self) -> Result<Vec<ModuleFunctionRecord>, StorageError> {
        let tables = self.read()?;
        Ok(tables
            .module_functions
            .iter()
            .map(|(module_key, function_id)| ModuleFunctionRecord {
                module_key: *module_key,
                function_id: function_id.clone(),
            })
            .collect())
    }

    async fn set_module_functions(
        &self,
        module_key: ModuleKey,
        function_ids: Vec<FunctionId>,
    ) -> Result<(), StorageError> {
        let mut tables = self.write()?;
        if !tables.modules.contains_key(&module_key) {
            return Err(StorageError::new("module not found"));
        }
        if let Some(unknown) = function_ids
            .iter()
            .find(|id| !tables.functions.contains_key(*id))
        {
            return Err(StorageError::new(format!("function not found: {unknown}")));
        }
        tables.module_functions.retain(|(key, _)| *key != module_key);
        for function_id in function_ids {
            tables.module_functions.insert((module_key, function_id));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ModuleRoleStore for InMemoryPermissionStore {
    async fn list_module_roles(
        &self,
        role_keys: Option<&[RoleKey]>,
    ) -> Result<Vec<ModuleRoleRecord>, StorageError> {
        let tables = self.read()?;
        Ok(tables
            .module_roles
            .iter()
            .filter(|(_, role)| role_keys.is_none_or(|keys| keys.contains(role)))
            .map(|(module_key, role_key)| ModuleRoleRecord {
                module_key: *module_key,
                role_key: role_key.clone(),
            })
            .collect())
    }

    async fn set_role_modules(
        &self,
        role_key: &RoleKey,
        module_keys: Vec<ModuleKey>,
    ) -> Result<(), StorageError> {
        let mut tables = self.write()?;
        if let Some(unknown) = module_keys
            .iter()
            .find(|key| !tables.modules.contains_key(*key))
        {
            return Err(StorageError::new(format!("module not found: {unknown}")));
        }
        tables.module_roles.retain(|(_, role)| role != role_key);
        for module_key in module_keys {
            tables.module_roles.insert((module_key, role_key.clone()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ModuleUserStore for InMemoryPermissionStore {
    async fn list_module_users(
        &self,
        user_keys: Option<&[UserKey]>,
    ) -> Result<Vec<ModuleUserRecord>, StorageError> {
        if self.take_user_grant_failure() {
            return Err(StorageError::new("injected user grant read failure"));
        }
        let tables = self.read()?;
        Ok(tables
            .module_users
            .iter()
            .filter(|(_, user)| user_keys.is_none_or(|keys| keys.contains(user)))
            .map(|(module_key, user_key)| ModuleUserRecord {
                module_key: *module_key,
                user_key: *user_key,
            })
            .collect())
    }

    async fn set_user_modules(
        &self,
        user_key: UserKey,
        module_keys: Vec<ModuleKey>,
    ) -> Result<(), StorageError> {
        let mut tables = self.write()?;
        if let Some(unknown) = module_keys
            .iter()
            .find(|key| !tables.modules.contains_key(*key))
        {
            return Err(StorageError::new(format!("module not found: {unknown}")));
        }
        tables.module_users.retain(|(_, user)| *user != user_key);
        for module_key in module_keys {
            tables.module_users.insert((module_key, user_key));
        }
        Ok(())
    }
}
