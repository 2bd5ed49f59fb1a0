//! 角色/用户授权接口（整体替换）

use crate::AppState;
use crate::utils::response::{bad_request_error, security_error};
use api_contract::{ApiResponse, SetRoleModulesRequest, SetUserModulesRequest};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use domain::{ModuleKey, RoleKey, UserKey};

#[derive(Debug, serde::Deserialize)]
pub struct RolePath {
    pub role_key: String,
}

#[derive(Debug, serde::Deserialize)]
pub struct UserPath {
    pub user_key: i64,
}

pub async fn set_role_modules(
    State(state): State<AppState>,
    Path(path): Path<RolePath>,
    Json(req): Json<SetRoleModulesRequest>,
) -> Response {
    let role_key = path.role_key.trim();
    if role_key.is_empty() {
        return bad_request_error("role key is required");
    }
    let module_keys = req.module_keys.into_iter().map(ModuleKey).collect();
    match state
        .services
        .manager()
        .set_role_modules(RoleKey::new(role_key), module_keys)
        .await
    {
        Ok(()) => (StatusCode::OK, Json(ApiResponse::success(()))).into_response(),
        Err(err) => security_error(err),
    }
}

pub async fn set_user_modules(
    State(state): State<AppState>,
    Path(path): Path<UserPath>,
    Json(req): Json<SetUserModulesRequest>,
) -> Response {
    let module_keys = req.module_keys.into_iter().map(ModuleKey).collect();
    match state
        .services
        .manager()
        .set_user_modules(UserKey(path.user_key), module_keys)
        .await
    {
        Ok(()) => (StatusCode::OK, Json(ApiResponse::success(()))).into_response(),
        Err(err) => security_error(err),
    }
}
