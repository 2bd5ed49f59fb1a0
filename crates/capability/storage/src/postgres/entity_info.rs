//! Postgres 实体信息存储实现

use super::PgPermissionStore;
use crate::error::StorageError;
use crate::models::EntityInfoRecord;
use crate::traits::EntityInfoStore;
use sqlx::Row;
use sqlx::postgres::PgRow;
use uuid::Uuid;

fn entity_info_from_row(row: &PgRow) -> Result<EntityInfoRecord, StorageError> {
    let entity_id: String = row.try_get("entity_id")?;
    let entity_id = Uuid::parse_str(&entity_id)
        .map_err(|err| StorageError::new(format!("invalid entity id {entity_id}: {err}")))?;
    Ok(EntityInfoRecord {
        entity_id,
        type_name: row.try_get("type_name")?,
        name: row.try_get("name")?,
        audit_enabled: row.try_get("audit_enabled")?,
    })
}

#[async_trait::async_trait]
impl EntityInfoStore for PgPermissionStore {
    async fn list_entity_infos(&self) -> Result<Vec<EntityInfoRecord>, StorageError> {
        let rows = sqlx::query(
            "select entity_id, type_name, name, audit_enabled \
             from entity_infos order by type_name",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(entity_info_from_row).collect()
    }

    async fn find_entity_info(
        &self,
        entity_id: Uuid,
    ) -> Result<Option<EntityInfoRecord>, StorageError> {
        let row = sqlx::query(
            "select entity_id, type_name, name, audit_enabled \
             from entity_infos where entity_id = $1",
        )
        .bind(entity_id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(entity_info_from_row(&row)?))
    }

    async fn upsert_entity_info(
        &self,
        record: EntityInfoRecord,
    ) -> Result<EntityInfoRecord, StorageError> {
        if record.type_name.trim().is_empty() {
            return Err(StorageError::new("type name required"));
        }
        let row = sqlx::query(
            "insert into entity_infos (entity_id, type_name, name, audit_enabled) \
             values ($1, $2, $3, $4) \
             on conflict (type_name) do update set \
             name = excluded.name, audit_enabled = excluded.audit_enabled \
             returning entity_id, type_name, name, audit_enabled",
        )
        .bind(record.entity_id.to_string())
        .bind(&record.type_name)
        .bind(&record.name)
        .bind(record.audit_enabled)
        .fetch_one(&self.pool)
        .await?;
        entity_info_from_row(&row)
    }

    async fn delete_entity_info(&self, entity_id: Uuid) -> Result<bool, StorageError> {
        let result = sqlx::query("delete from entity_infos where entity_id = $1")
            .bind(entity_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
