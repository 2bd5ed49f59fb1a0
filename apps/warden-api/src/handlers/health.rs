//! 健康检查：启动流程完成且数据库可达才返回 200。

use crate::AppState;
use crate::utils::response::unavailable_error;
use api_contract::{ApiResponse, HealthDto};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::warn;

pub async fn health(State(state): State<AppState>) -> Response {
    if !state.services.is_ready() {
        return unavailable_error("security services not ready");
    }
    if let Some(pool) = &state.db_pool {
        if let Err(err) = sqlx::query_scalar::<_, i32>("select 1").fetch_one(pool).await {
            warn!(target: "warden.api", "database health check failed: {}", err);
            return unavailable_error("database unavailable");
        }
    }
    let dto = HealthDto {
        ready: true,
        auth_generation: state.services.auth().generation(),
    };
    (StatusCode::OK, Json(ApiResponse::success(dto))).into_response()
}
