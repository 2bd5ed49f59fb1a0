//! 模块树管理接口

use crate::AppState;
use crate::utils::response::{
    bad_request_error, module_tree_to_dto, not_found_error, security_error,
};
use api_contract::{ApiResponse, CreateModuleRequest, SetModuleFunctionsRequest, UpdateModuleRequest};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use domain::{FunctionId, ModuleKey};
use warden_storage::{ModuleRecord, ModuleUpdate};

#[derive(Debug, serde::Deserialize)]
pub struct ModulePath {
    pub module_key: i64,
}

pub async fn list_modules(State(state): State<AppState>) -> Response {
    match state.services.manager().module_tree() {
        Ok(tree) => {
            let items = module_tree_to_dto(&tree);
            (StatusCode::OK, Json(ApiResponse::success(items))).into_response()
        }
        Err(err) => security_error(err),
    }
}

pub async fn create_module(
    State(state): State<AppState>,
    Json(req): Json<CreateModuleRequest>,
) -> Response {
    let name = req.name.trim().to_string();
    if name.is_empty() {
        return bad_request_error("name is required");
    }
    let record = ModuleRecord {
        module_key: ModuleKey(req.module_key),
        name,
        position: req.position,
        parent_key: req.parent_key.map(ModuleKey),
        icon: req.icon,
        enabled: req.enabled,
    };
    match state.services.manager().create_module(record).await {
        Ok(created) => (
            StatusCode::CREATED,
            Json(ApiResponse::success(created.module_key.0)),
        )
            .into_response(),
        Err(err) => security_error(err),
    }
}

pub async fn update_module(
    State(state): State<AppState>,
    Path(path): Path<ModulePath>,
    Json(req): Json<UpdateModuleRequest>,
) -> Response {
    if req.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
        return bad_request_error("name must not be empty");
    }
    let update = ModuleUpdate {
        name: req.name.map(|name| name.trim().to_string()),
        position: req.position,
        parent_key: req.parent_key.map(|parent| parent.map(ModuleKey)),
        icon: req.icon,
        enabled: req.enabled,
    };
    match state
        .services
        .manager()
        .update_module(ModuleKey(path.module_key), update)
        .await
    {
        Ok(Some(updated)) => {
            (StatusCode::OK, Json(ApiResponse::success(updated.module_key.0))).into_response()
        }
        Ok(None) => not_found_error(),
        Err(err) => security_error(err),
    }
}

pub async fn delete_module(
    State(state): State<AppState>,
    Path(path): Path<ModulePath>,
) -> Response {
    match state
        .services
        .manager()
        .delete_module(ModuleKey(path.module_key))
        .await
    {
        Ok(true) => (StatusCode::OK, Json(ApiResponse::success(()))).into_response(),
        Ok(false) => not_found_error(),
        Err(err) => security_error(err),
    }
}

pub async fn set_module_functions(
    State(state): State<AppState>,
    Path(path): Path<ModulePath>,
    Json(req): Json<SetModuleFunctionsRequest>,
) -> Response {
    let function_ids = req
        .function_ids
        .iter()
        .map(|value| FunctionId::new(value.trim()))
        .collect();
    match state
        .services
        .manager()
        .set_module_functions(ModuleKey(path.module_key), function_ids)
        .await
    {
        Ok(()) => (StatusCode::OK, Json(ApiResponse::success(()))).into_response(),
        Err(err) => security_error(err),
    }
}
