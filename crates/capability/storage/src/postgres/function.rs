//! Postgres 功能存储实现

use super::PgPermissionStore;
use crate::error::StorageError;
use crate::models::{FunctionRecord, FunctionUpdate};
use crate::traits::FunctionStore;
use crate::validation::ensure_function;
use domain::{AccessType, FunctionId};
use sqlx::Row;
use sqlx::postgres::PgRow;

fn function_from_row(row: &PgRow) -> Result<FunctionRecord, StorageError> {
    let function_id: String = row.try_get("function_id")?;
    let access_type: String = row.try_get("access_type")?;
    let access_type = AccessType::parse(&access_type)
        .ok_or_else(|| StorageError::new(format!("invalid access type: {access_type}")))?;
    Ok(FunctionRecord {
        function_id: FunctionId::new(function_id),
        name: row.try_get("name")?,
        area: row.try_get("area")?,
        controller: row.try_get("controller")?,
        action: row.try_get("action")?,
        access_type,
        is_controller: row.try_get("is_controller")?,
    })
}

#[async_trait::async_trait]
impl FunctionStore for PgPermissionStore {
    async fn list_functions(&self) -> Result<Vec<FunctionRecord>, StorageError> {
        let rows = sqlx::query(
            "select function_id, name, area, controller, action, access_type, is_controller \
             from functions order by function_id",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(function_from_row).collect()
    }

    async fn find_function(
        &self,
        function_id: &FunctionId,
    ) -> Result<Option<FunctionRecord>, StorageError> {
        let row = sqlx::query(
            "select function_id, name, area, controller, action, access_type, is_controller \
             from functions where function_id = $1",
        )
        .bind(function_id.as_str())
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(function_from_row(&row)?))
    }

    async fn create_function(
        &self,
        record: FunctionRecord,
    ) -> Result<FunctionRecord, StorageError> {
        ensure_function(&record)?;
        sqlx::query(
            "insert into functions \
             (function_id, name, area, controller, action, access_type, is_controller) \
             values ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(record.function_id.as_str())
        .bind(&record.name)
        .bind(&record.area)
        .bind(&record.controller)
        .bind(&record.action)
        .bind(record.access_type.as_str())
        .bind(record.is_controller)
        .execute(&self.pool)
        .await?;
        Ok(record)
    }

    async fn update_function(
        &self,
        function_id: &FunctionId,
        update: FunctionUpdate,
    ) -> Result<Option<FunctionRecord>, StorageError> {
        let row = sqlx::query(
            "update functions set \
             name = coalesce($1, name), \
             access_type = coalesce($2, access_type) \
             where function_id = $3 \
             returning function_id, name, area, controller, action, access_type, is_controller",
        )
        .bind(update.name)
        .bind(update.access_type.map(AccessType::as_str))
        .bind(function_id.as_str())
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(function_from_row(&row)?))
    }

    async fn delete_function(&self, function_id: &FunctionId) -> Result<bool, StorageError> {
        // module_functions 通过外键级联删除
        let result = sqlx::query("delete from functions where function_id = $1")
            .bind(function_id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
