//! 功能与实体信息接口

use crate::AppState;
use crate::utils::response::{
    bad_request_error, entity_info_to_dto, function_to_dto, not_found_error, security_error,
};
use api_contract::{ApiResponse, UpdateFunctionRequest};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use domain::{AccessType, FunctionId};
use warden_storage::FunctionUpdate;

#[derive(Debug, serde::Deserialize)]
pub struct FunctionPath {
    pub function_id: String,
}

pub async fn list_functions(State(state): State<AppState>) -> Response {
    match state.services.manager().list_functions() {
        Ok(items) => {
            let items = items.into_iter().map(function_to_dto).collect::<Vec<_>>();
            (StatusCode::OK, Json(ApiResponse::success(items))).into_response()
        }
        Err(err) => security_error(err),
    }
}

pub async fn update_function(
    State(state): State<AppState>,
    Path(path): Path<FunctionPath>,
    Json(req): Json<UpdateFunctionRequest>,
) -> Response {
    let access_type = match req.access_type.as_deref() {
        Some(value) => match AccessType::parse(value) {
            Some(access_type) => Some(access_type),
            None => return bad_request_error(format!("invalid accessType: {value}")),
        },
        None => None,
    };
    let update = FunctionUpdate {
        name: req.name,
        access_type,
    };
    match state
        .services
        .manager()
        .update_function(FunctionId::new(path.function_id), update)
        .await
    {
        Ok(Some(record)) => {
            (StatusCode::OK, Json(ApiResponse::success(function_to_dto(record)))).into_response()
        }
        Ok(None) => not_found_error(),
        Err(err) => security_error(err),
    }
}

pub async fn list_entity_infos(State(state): State<AppState>) -> Response {
    match state.services.manager().list_entity_infos() {
        Ok(items) => {
            let items = items.into_iter().map(entity_info_to_dto).collect::<Vec<_>>();
            (StatusCode::OK, Json(ApiResponse::success(items))).into_response()
        }
        Err(err) => security_error(err),
    }
}
