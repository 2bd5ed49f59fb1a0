//! 授权查询：回答当前请求主体能否访问指定功能。

use crate::AppState;
use crate::utils::response::bad_request_error;
use api_contract::{ApiResponse, AuthCheckResponse};
use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use domain::{FunctionId, Principal};

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthCheckQuery {
    pub function_id: String,
}

pub async fn auth_check(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<AuthCheckQuery>,
) -> Response {
    let function_id = query.function_id.trim();
    if function_id.is_empty() {
        return bad_request_error("functionId is required");
    }
    let function_id = FunctionId::new(function_id);
    let authorized = state.services.is_authorized(&principal, &function_id);
    let response = AuthCheckResponse {
        function_id: function_id.as_str().to_string(),
        authenticated: principal.is_authenticated(),
        authorized,
    };
    (StatusCode::OK, Json(ApiResponse::success(response))).into_response()
}
