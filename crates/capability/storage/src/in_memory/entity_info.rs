//! 实体信息内存存储实现

use super::InMemoryPermissionStore;
use crate::error::StorageError;
use crate::models::EntityInfoRecord;
use crate::traits::EntityInfoStore;
use uuid::Uuid;

#[async_trait::async_trait]
impl EntityInfoStore for InMemoryPermissionStore {
    async fn list_entity_infos(&self) -> Result<Vec<EntityInfoRecord>, StorageError> {
        let tables = self.read()?;
        Ok(tables.entity_infos.values().cloned().collect())
    }

    async fn find_entity_info(
        &self,
        entity_id: Uuid,
    ) -> Result<Option<EntityInfoRecord>, StorageError> {
        let tables = self.read()?;
        Ok(tables.entity_infos.get(&entity_id).cloned())
    }

    async fn upsert_entity_info(
        &self,
        record: EntityInfoRecord,
    ) -> Result<EntityInfoRecord, StorageError> {
        if record.type_name.trim().is_empty() {
            return Err(StorageError::new("type name required"));
        }
        let mut tables = self.write()?;
        // 同一类型名只保留一条，沿用已有编号
        let existing = tables
            .entity_infos
            .values()
            .find(|item| item.type_name == record.type_name)
            .map(|item| item.entity_id);
        let record = match existing {
            Some(entity_id) => EntityInfoRecord {
                entity_id,
                ..record
            },
            None => record,
        };
        tables.entity_infos.insert(record.entity_id, record.clone());
        Ok(record)
    }

    async fn delete_entity_info(&self, entity_id: Uuid) -> Result<bool, StorageError> {
        let mut tables = self.write()?;
        Ok(tables.entity_infos.remove(&entity_id).is_some())
    }
}
