//! HTTP 响应辅助函数和 DTO 转换
//!
//! 提供统一的错误响应构造函数和 DTO 转换函数：
//! - 错误响应：auth_error, forbidden_error, bad_request_error, not_found_error,
//!   unavailable_error, security_error
//! - DTO 转换：module_tree_to_dto, function_to_dto, entity_info_to_dto
//!
//! 所有错误返回统一的 ApiResponse 格式，HTTP 状态码与错误码对应。

use api_contract::{ApiResponse, EntityInfoDto, FunctionDto, ModuleDto};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use domain::ModuleKey;
use tracing::error;
use warden_security::{ModuleTree, SecurityError};
use warden_storage::{EntityInfoRecord, FunctionRecord};

/// 认证错误响应
pub fn auth_error(status: StatusCode) -> Response {
    (
        status,
        Json(ApiResponse::<()>::error(
            "AUTH.UNAUTHORIZED",
            "unauthorized",
        )),
    )
        .into_response()
}

/// 禁止访问错误响应
pub fn forbidden_error() -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(ApiResponse::<()>::error("AUTH.FORBIDDEN", "forbidden")),
    )
        .into_response()
}

/// 错误请求响应
pub fn bad_request_error(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiResponse::<()>::error("INVALID.REQUEST", message.into())),
    )
        .into_response()
}

/// 资源未找到错误响应
pub fn not_found_error() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::<()>::error("RESOURCE.NOT_FOUND", "not found")),
    )
        .into_response()
}

/// 服务未就绪响应
pub fn unavailable_error(message: impl Into<String>) -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ApiResponse::<()>::error("SERVICE.UNAVAILABLE", message.into())),
    )
        .into_response()
}

/// 内部错误响应
pub fn internal_error(message: impl Into<String>) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiResponse::<()>::error("INTERNAL.ERROR", message.into())),
    )
        .into_response()
}

/// 安全核心错误响应
pub fn security_error(err: SecurityError) -> Response {
    match err {
        SecurityError::Validation(message) => bad_request_error(message),
        SecurityError::UnknownFunction(function_id) => {
            bad_request_error(format!("unknown function {function_id}"))
        }
        SecurityError::Integrity(message) => (
            StatusCode::CONFLICT,
            Json(ApiResponse::<()>::error("MODULE.INTEGRITY", message)),
        )
            .into_response(),
        SecurityError::NotInitialized(what) => unavailable_error(format!("{what} not initialized")),
        err @ (SecurityError::Storage(_) | SecurityError::Scope(_)) => {
            error!(target: "warden.api", "request failed: {}", err);
            internal_error(err.to_string())
        }
    }
}

/// ModuleTree 转 ModuleDto 森林（按根节点顺序）
pub fn module_tree_to_dto(tree: &ModuleTree) -> Vec<ModuleDto> {
    tree.roots()
        .iter()
        .filter_map(|key| module_to_dto(tree, *key))
        .collect()
}

fn module_to_dto(tree: &ModuleTree, key: ModuleKey) -> Option<ModuleDto> {
    let node = tree.get(key)?;
    Some(ModuleDto {
        module_key: node.record.module_key.0,
        name: node.record.name.clone(),
        position: node.record.position,
        parent_key: node.record.parent_key.map(|parent| parent.0),
        icon: node.record.icon.clone(),
        enabled: node.record.enabled,
        tree_path: tree.tree_path(key).unwrap_or_default(),
        functions: node
            .functions
            .iter()
            .map(|function_id| function_id.as_str().to_string())
            .collect(),
        children: node
            .children
            .iter()
            .filter_map(|child| module_to_dto(tree, *child))
            .collect(),
    })
}

/// FunctionRecord 转 FunctionDto
pub fn function_to_dto(record: FunctionRecord) -> FunctionDto {
    FunctionDto {
        function_id: record.function_id.as_str().to_string(),
        name: record.name,
        area: record.area,
        controller: record.controller,
        action: record.action,
        access_type: record.access_type.as_str().to_string(),
    }
}

/// EntityInfoRecord 转 EntityInfoDto
pub fn entity_info_to_dto(record: EntityInfoRecord) -> EntityInfoDto {
    EntityInfoDto {
        entity_id: record.entity_id.to_string(),
        type_name: record.type_name,
        name: record.name,
        audit_enabled: record.audit_enabled,
    }
}
