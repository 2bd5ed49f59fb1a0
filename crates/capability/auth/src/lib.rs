//! 认证能力：JWT 签发与校验，把请求凭据还原为 `Principal`。
//!
//! 授权判断不在这里完成；这里只回答“请求者是谁”。

mod jwt;

use async_trait::async_trait;
use domain::Principal;

pub use jwt::JwtManager;

/// 认证相关错误。
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("token expired")]
    TokenExpired,
    #[error("token invalid")]
    TokenInvalid,
    #[error("internal error: {0}")]
    Internal(String),
}

/// 从 `Authorization` 头中取出 Bearer token；格式不符返回 `None`。
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// 认证能力 trait，便于替换实现与测试。
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// 无凭据时返回匿名主体；凭据无效时返回错误。
    async fn authenticate(&self, bearer: Option<&str>) -> Result<Principal, AuthError>;
}

#[async_trait]
impl Authenticator for JwtManager {
    async fn authenticate(&self, bearer: Option<&str>) -> Result<Principal, AuthError> {
        match bearer {
            Some(token) => self.decode_access(token),
            None => Ok(Principal::anonymous()),
        }
    }
}
