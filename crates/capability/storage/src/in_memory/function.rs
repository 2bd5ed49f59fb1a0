//! 功能内存存储实现

use super::InMemoryPermissionStore;
use crate::error::StorageError;
use crate::models::{FunctionRecord, FunctionUpdate};
use crate::traits::FunctionStore;
use crate::validation::ensure_function;
use domain::FunctionId;

#[async_trait::async_trait]
impl FunctionStore for InMemoryPermissionStore {
    async fn list_functions(&self) -> Result<Vec<FunctionRecord>, StorageError> {
        let tables = self.read()?;
        Ok(tables.functions.values().cloned().collect())
    }

    async fn find_function(
        &self,
        function_id: &FunctionId,
    ) -> Result<Option<FunctionRecord>, StorageError> {
        let tables = self.read()?;
        Ok(tables.functions.get(function_id).cloned())
    }

    async fn create_function(
        &self,
        record: FunctionRecord,
    ) -> Result<FunctionRecord, StorageError> {
        ensure_function(&record)?;
        let mut tables = self.write()?;
        if tables.functions.contains_key(&record.function_id) {
            return Err(StorageError::new("function exists"));
        }
        tables
            .functions
            .insert(record.function_id.clone(), record.clone());
        Ok(record)
    }

    async fn update_function(
        &self,
        function_id: &FunctionId,
        update: FunctionUpdate,
    ) -> Result<Option<FunctionRecord>, StorageError> {
        let mut tables = self.write()?;
        let Some(function) = tables.functions.get_mut(function_id) else {
            return Ok(None);
        };
        if let Some(name) = update.name {
            function.name = name;
        }
        if let Some(access_type) = update.access_type {
            function.access_type = access_type;
        }
        Ok(Some(function.clone()))
    }

    async fn delete_function(&self, function_id: &FunctionId) -> Result<bool, StorageError> {
        let mut tables = self.write()?;
        if tables.functions.remove(function_id).is_none() {
            return Ok(false);
        }
        tables
            .module_functions
            .retain(|(_, attached)| attached != function_id);
        Ok(true)
    }
}
