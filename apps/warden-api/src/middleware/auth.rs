//! 认证和授权中间件
//!
//! 请求依次经过：
//! 1. request_context：注入 request_id/trace_id 并建立日志 span
//! 2. request_scope：为请求创建环境作用域，处理完成（含取消）后释放
//! 3. authenticate：Bearer JWT → `Principal`；无凭据为匿名，凭据无效返回 401
//! 4. authorize：按匹配到的路由模板查功能编号并判定授权；
//!    匿名被拒返回 401，已认证被拒返回 403

use axum::{
    body::Body,
    extract::{MatchedPath, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    middleware::Next,
    response::Response,
};
use domain::Principal;
use tracing::{Instrument, info_span, warn};
use warden_auth::{AuthError, Authenticator};
use warden_telemetry::new_request_ids;

use crate::AppState;
use crate::utils::response::{auth_error, forbidden_error, internal_error};

/// 请求上下文中间件：注入 request_id/trace_id
pub async fn request_context(mut req: Request<Body>, next: Next) -> Response {
    let ids = new_request_ids();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    req.extensions_mut().insert(ids.clone());

    let span = info_span!(
        "request",
        request_id = %ids.request_id,
        trace_id = %ids.trace_id,
        method = %method,
        path = %path
    );

    let mut response: Response = next.run(req).instrument(span).await;
    response.headers_mut().insert(
        "x-request-id",
        HeaderValue::from_str(&ids.request_id).unwrap_or_else(|_| HeaderValue::from_static("")),
    );
    response.headers_mut().insert(
        "x-trace-id",
        HeaderValue::from_str(&ids.trace_id).unwrap_or_else(|_| HeaderValue::from_static("")),
    );
    response
}

/// 请求作用域中间件：请求内的所有存储访问共享同一个作用域
pub async fn request_scope(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    match state
        .services
        .resolver()
        .run_scoped_async(move |_| next.run(req))
        .await
    {
        Ok(response) => response,
        Err(err) => {
            warn!(target: "warden.api", "request scope unavailable: {}", err);
            internal_error(err.to_string())
        }
    }
}

/// 从 Authorization 头提取 Bearer token
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let header_value = headers.get(header::AUTHORIZATION)?;
    let auth_str = header_value.to_str().ok()?;
    warden_auth::bearer_token(auth_str)
}

/// 认证中间件：把请求主体写入扩展
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let principal = match state.jwt.authenticate(bearer_token(req.headers())).await {
        Ok(principal) => principal,
        Err(AuthError::TokenInvalid | AuthError::TokenExpired) => {
            return auth_error(StatusCode::UNAUTHORIZED);
        }
        Err(err) => return internal_error(err.to_string()),
    };
    req.extensions_mut().insert(principal);
    next.run(req).await
}

/// 授权中间件：仅挂在受保护路由上（route_layer），此时已能取得路由模板
pub async fn authorize(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let principal = req
        .extensions()
        .get::<Principal>()
        .cloned()
        .unwrap_or_else(Principal::anonymous);
    let function_id = req
        .extensions()
        .get::<MatchedPath>()
        .and_then(|matched| state.catalog.lookup(req.method(), matched.as_str()));

    let allowed = match function_id {
        Some(function_id) => state.services.is_authorized(&principal, function_id),
        None => {
            warn!(target: "warden.api", method = %req.method(), path = %req.uri().path(), "route has no function declaration, denied");
            warden_telemetry::record_unknown_function();
            false
        }
    };
    if allowed {
        return next.run(req).await;
    }
    if principal.is_authenticated() {
        forbidden_error()
    } else {
        auth_error(StatusCode::UNAUTHORIZED)
    }
}

#[cfg(test)]
mod tests {
    use super::bearer_token;
    use axum::http::{HeaderMap, HeaderValue, header};

    #[test]
    fn bearer_token_extracts() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer token-1"),
        );
        assert_eq!(bearer_token(&headers), Some("token-1"));
    }
}
