//! Postgres 授权关联存储实现
//!
//! set_* 在单个事务内先删除再插入，保证覆盖写入原子可见。

use super::PgPermissionStore;
use crate::error::StorageError;
use crate::models::{ModuleFunctionRecord, ModuleRoleRecord, ModuleUserRecord};
use crate::traits::{ModuleFunctionStore, ModuleRoleStore, ModuleUserStore};
use domain::{FunctionId, ModuleKey, RoleKey, UserKey};
use sqlx::Row;

#[async_trait::async_trait]
impl ModuleFunctionStore for PgPermissionStore {
    async fn list_module_functions(&self) -> Result<Vec<ModuleFunctionRecord>, StorageError> {
        let rows = sqlx::query(
            "select module_key, function_id from module_functions \
             order by module_key, function_id",
        )
        .fetch_all(&self.pool)
        .await?;
        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let function_id: String = row.try_get("function_id")?;
            records.push(ModuleFunctionRecord {
                module_key: ModuleKey(row.try_get("module_key")?),
                function_id: FunctionId::new(function_id),
            });
        }
        Ok(records)
    }

    async fn set_module_functions(
        &self,
        module_key: ModuleKey,
        function_ids: Vec<FunctionId>,
    ) -> Result<(), StorageError> {
        let ids: Vec<String> = function_ids
            .iter()
            .map(|id| id.as_str().to_string())
            .collect();
        let mut tx = self.pool.begin().await?;
        sqlx::query("delete from module_functions where module_key = $1")
            .bind(module_key.0)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "insert into module_functions (module_key, function_id) \
             select $1, id from unnest($2::text[]) as t(id) \
             on conflict do nothing",
        )
        .bind(module_key.0)
        .bind(&ids)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl ModuleRoleStore for PgPermissionStore {
    async fn list_module_roles(
        &self,
        role_keys: Option<&[RoleKey]>,
    ) -> Result<Vec<ModuleRoleRecord>, StorageError> {
        let rows = match role_keys {
            Some(keys) => {
                let keys: Vec<String> = keys.iter().map(|key| key.as_str().to_string()).collect();
                sqlx::query(
                    "select module_key, role_key from module_roles \
                     where role_key = any($1) order by module_key, role_key",
                )
                .bind(&keys)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "select module_key, role_key from module_roles \
                     order by module_key, role_key",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };
        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let role_key: String = row.try_get("role_key")?;
            records.push(ModuleRoleRecord {
                module_key: ModuleKey(row.try_get("module_key")?),
                role_key: RoleKey::new(role_key),
            });
        }
        Ok(records)
    }

    async fn set_role_modules(
        &self,
        role_key: &RoleKey,
        module_keys: Vec<ModuleKey>,
    ) -> Result<(), StorageError> {
        let keys: Vec<i64> = module_keys.iter().map(|key| key.0).collect();
        let mut tx = self.pool.begin().await?;
        sqlx::query("delete from module_roles where role_key = $1")
            .bind(role_key.as_str())
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "insert into module_roles (module_key, role_key) \
             select key, $1 from unnest($2::bigint[]) as t(key) \
             on conflict do nothing",
        )
        .bind(role_key.as_str())
        .bind(&keys)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl ModuleUserStore for PgPermissionStore {
    async fn list_module_users(
        &self,
        user_keys: Option<&[UserKey]>,
    ) -> Result<Vec<ModuleUserRecord>, StorageError> {
        let rows = match user_keys {
            Some(keys) => {
                let keys: Vec<i64> = keys.iter().map(|key| key.0).collect();
                sqlx::query(
                    "select module_key, user_key from module_users \
                     where user_key = any($1) order by module_key, user_key",
                )
                .bind(&keys)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "select module_key, user_key from module_users \
                     order by module_key, user_key",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };
        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(ModuleUserRecord {
                module_key: ModuleKey(row.try_get("module_key")?),
                user_key: UserKey(row.try_get("user_key")?),
            });
        }
        Ok(records)
    }

    async fn set_user_modules(
        &self,
        user_key: UserKey,
        module_keys: Vec<ModuleKey>,
    ) -> Result<(), StorageError> {
        let keys: Vec<i64> = module_keys.iter().map(|key| key.0).collect();
        let mut tx = self.pool.begin().await?;
        sqlx::query("delete from module_users where user_key = $1")
            .bind(user_key.0)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "insert into module_users (module_key, user_key) \
             select key, $1 from unnest($2::bigint[]) as t(key) \
             on conflict do nothing",
        )
        .bind(user_key.0)
        .bind(&keys)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }
}
