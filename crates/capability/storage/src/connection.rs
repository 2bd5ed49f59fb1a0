//! 权限库连接池。
//!
//! `PgPermissionStore` 的全部查询共用一个池。读取压力集中在启动和派生结构重建时，
//! 请求路径只读内存快照，因此池保持很小；取连接超时按存储错误返回，
//! 交由重建重试逻辑处理。

use crate::error::StorageError;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;

const MAX_CONNECTIONS: u32 = 8;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

fn pool_options() -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .acquire_timeout(ACQUIRE_TIMEOUT)
}

/// 建立权限库连接池。
pub async fn connect_pool(database_url: &str) -> Result<PgPool, StorageError> {
    let pool = pool_options().connect(database_url).await?;
    Ok(pool)
}
