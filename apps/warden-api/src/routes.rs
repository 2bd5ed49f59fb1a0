//! 路由定义
//!
//! - 健康检查：/health（不经过授权闸门）
//! - 模块树：/api/modules/*
//! - 功能与实体信息：/api/functions/*, /api/entity-infos
//! - 授权设置：/api/roles/:role_key/modules, /api/users/:user_key/modules
//! - 授权查询：/api/auth/check
//!
//! `/api` 下的路由都挂授权中间件；路由模板与功能编号的对应见 `catalog`。

use crate::AppState;
use crate::handlers::*;
use crate::middleware::{authenticate, authorize, request_context, request_scope};
use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, put},
};

pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/api/modules", get(list_modules).post(create_module))
        .route(
            "/api/modules/:module_key",
            put(update_module).delete(delete_module),
        )
        .route("/api/modules/:module_key/functions", put(set_module_functions))
        .route("/api/functions", get(list_functions))
        .route("/api/functions/:function_id", put(update_function))
        .route("/api/entity-infos", get(list_entity_infos))
        .route("/api/roles/:role_key/modules", put(set_role_modules))
        .route("/api/users/:user_key/modules", put(set_user_modules))
        .route("/api/auth/check", get(auth_check))
        .route_layer(from_fn_with_state(state.clone(), authorize));

    Router::new()
        .route("/health", get(health))
        .merge(api)
        .layer(from_fn_with_state(state.clone(), authenticate))
        .layer(from_fn_with_state(state.clone(), request_scope))
        .layer(from_fn(request_context))
        .with_state(state)
}
