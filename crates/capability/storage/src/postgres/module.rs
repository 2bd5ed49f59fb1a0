//! Postgres 模块存储实现

use super::PgPermissionStore;
use crate::error::StorageError;
use crate::models::{ModuleRecord, ModuleUpdate};
use crate::traits::ModuleStore;
use crate::validation::ensure_module;
use domain::ModuleKey;
use sqlx::Row;
use sqlx::postgres::PgRow;

fn module_from_row(row: &PgRow) -> Result<ModuleRecord, StorageError> {
    let parent_key: Option<i64> = row.try_get("parent_key")?;
    Ok(ModuleRecord {
        module_key: ModuleKey(row.try_get("module_key")?),
        name: row.try_get("name")?,
        position: row.try_get("position")?,
        parent_key: parent_key.map(ModuleKey),
        icon: row.try_get("icon")?,
        enabled: row.try_get("enabled")?,
    })
}

#[async_trait::async_trait]
impl ModuleStore for PgPermissionStore {
    async fn list_modules(&self) -> Result<Vec<ModuleRecord>, StorageError> {
        let rows = sqlx::query(
            "select module_key, name, position, parent_key, icon, enabled \
             from modules order by module_key",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(module_from_row).collect()
    }

    async fn find_module(
        &self,
        module_key: ModuleKey,
    ) -> Result<Option<ModuleRecord>, StorageError> {
        let row = sqlx::query(
            "select module_key, name, position, parent_key, icon, enabled \
             from modules where module_key = $1",
        )
        .bind(module_key.0)
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(module_from_row(&row)?))
    }

    async fn create_module(&self, record: ModuleRecord) -> Result<ModuleRecord, StorageError> {
        ensure_module(&record)?;
        sqlx::query(
            "insert into modules (module_key, name, position, parent_key, icon, enabled) \
             values ($1, $2, $3, $4, $5, $6)",
        )
        .bind(record.module_key.0)
        .bind(&record.name)
        .bind(record.position)
        .bind(record.parent_key.map(|key| key.0))
        .bind(&record.icon)
        .bind(record.enabled)
        .execute(&self.pool)
        .await?;
        Ok(record)
    }

    async fn update_module(
        &self,
        module_key: ModuleKey,
        update: ModuleUpdate,
    ) -> Result<Option<ModuleRecord>, StorageError> {
        if update.parent_key == Some(Some(module_key)) {
            return Err(StorageError::new("module cannot be its own parent"));
        }
        if update
            .name
            .as_deref()
            .is_some_and(|name| name.trim().is_empty())
        {
            return Err(StorageError::new("module name required"));
        }
        // $4 区分“不修改父节点”与“移动到根节点”
        let row = sqlx::query(
            "update modules set \
             name = coalesce($1, name), \
             position = coalesce($2, position), \
             parent_key = case when $3 then $4 else parent_key end, \
             icon = coalesce($5, icon), \
             enabled = coalesce($6, enabled) \
             where module_key = $7 \
             returning module_key, name, position, parent_key, icon, enabled",
        )
        .bind(update.name)
        .bind(update.position)
        .bind(update.parent_key.is_some())
        .bind(update.parent_key.flatten().map(|key| key.0))
        .bind(update.icon)
        .bind(update.enabled)
        .bind(module_key.0)
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(module_from_row(&row)?))
    }

    async fn delete_module(&self, module_key: ModuleKey) -> Result<bool, StorageError> {
        let mut tx = self.pool.begin().await?;
        let children: i64 =
            sqlx::query_scalar("select count(*) from modules where parent_key = $1")
                .bind(module_key.0)
                .fetch_one(&mut *tx)
                .await?;
        if children > 0 {
            return Err(StorageError::new("module has children"));
        }
        // 关联表通过外键级联删除
        let result = sqlx::query("delete from modules where module_key = $1")
            .bind(module_key.0)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }
}
