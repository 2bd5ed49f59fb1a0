//! 权限服务 HTTP API：模块树/功能/授权管理与授权查询。
//!
//! 启动顺序：读取配置 → 初始化日志 → 选择存储（Postgres 或带演示数据的内存存储）
//! → 安全核心启动流程 → 后台授权缓存刷新 → 开始监听。

mod catalog;
mod handlers;
mod middleware;
mod routes;
mod seed;
mod utils;

use catalog::{FunctionCatalog, route_functions};
use domain::{Principal, RoleKey, UserKey};
use sqlx::PgPool;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use warden_auth::JwtManager;
use warden_config::AppConfig;
use warden_scope::ComponentRegistry;
use warden_security::{SecurityBootstrapper, SecurityConfig, SecurityServices};
use warden_storage::{InMemoryPermissionStore, PermissionStore, PgPermissionStore};
use warden_telemetry::init_tracing;

#[derive(Clone)]
pub struct AppState {
    pub services: SecurityServices,
    pub jwt: Arc<JwtManager>,
    pub catalog: Arc<FunctionCatalog>,
    pub db_pool: Option<PgPool>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在），便于直接 cargo run 启动
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;
    init_tracing();

    let routes = route_functions();
    let bootstrapper = SecurityBootstrapper::new(SecurityConfig {
        rebuild_max_retries: config.rebuild_max_retries,
        rebuild_backoff_ms: config.rebuild_backoff_ms,
    })
    .declare_functions(routes.iter().map(|item| item.record.clone()));

    let (services, db_pool) = match &config.database_url {
        Some(database_url) => {
            let store = PgPermissionStore::connect(database_url).await?;
            store.ensure_schema().await?;
            let pool = store.pool.clone();
            // 每个作用域一个存储句柄，共享连接池
            let services = bootstrapper
                .start(ComponentRegistry::new(), move |_| {
                    Ok(Arc::new(store.clone()) as Arc<dyn PermissionStore>)
                })
                .await?;
            (services, Some(pool))
        }
        None => {
            let store = Arc::new(InMemoryPermissionStore::new());
            seed::seed_demo(&store, &routes).await?;
            let shared: Arc<dyn PermissionStore> = store;
            let services = bootstrapper
                .start(ComponentRegistry::new(), move |_| Ok(shared.clone()))
                .await?;
            (services, None)
        }
    };

    let jwt = Arc::new(JwtManager::new(
        config.jwt_secret.clone(),
        config.jwt_access_ttl_seconds,
    ));
    if db_pool.is_none() {
        let admin = Principal::user(UserKey(1), vec![RoleKey::new("Admin")]);
        let token = jwt.issue_access_token(&admin)?;
        info!(target: "warden.api", user = 1, role = "Admin", "demo access token: {}", token);
    }

    let shutdown = CancellationToken::new();
    let worker = config
        .refresh_worker_enabled
        .then(|| services.spawn_refresh_worker(shutdown.clone()));

    let state = AppState {
        services,
        jwt,
        catalog: Arc::new(FunctionCatalog::new(&routes)),
        db_pool,
    };
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;
    info!(target: "warden.api", addr = %config.http_addr, "listening");
    let signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            signal.cancel();
        })
        .await?;

    shutdown.cancel();
    if let Some(worker) = worker {
        let _ = worker.await;
    }
    Ok(())
}
