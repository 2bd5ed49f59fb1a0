use crate::AuthError;
use domain::{Principal, RoleKey, UserKey};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

const ACCESS_TOKEN_TYPE: &str = "access";

#[derive(Debug, Serialize, Deserialize)]
/// JWT 内部 claims。
struct Claims {
    sub: String,
    roles: Vec<String>,
    exp: usize,
    token_type: String,
}

/// JWT 生成与校验。
pub struct JwtManager {
    secret: Vec<u8>,
    access_ttl_seconds: u64,
}

impl JwtManager {
    pub fn new(secret: String, access_ttl_seconds: u64) -> Self {
        Self {
            secret: secret.into_bytes(),
            access_ttl_seconds,
        }
    }

    /// 为已认证主体签发 access token；匿名主体不能签发。
    pub fn issue_access_token(&self, principal: &Principal) -> Result<String, AuthError> {
        let user_id = principal
            .user_id
            .ok_or_else(|| AuthError::Internal("anonymous principal".to_string()))?;
        self.encode(user_id, &principal.roles, now_epoch_seconds() + self.access_ttl_seconds)
    }

    /// 解析 access token 并还原主体。
    pub fn decode_access(&self, token: &str) -> Result<Principal, AuthError> {
        let claims = self.decode_claims(token)?;
        if claims.token_type != ACCESS_TOKEN_TYPE {
            return Err(AuthError::TokenInvalid);
        }
        let user_id: i64 = claims.sub.parse().map_err(|_| AuthError::TokenInvalid)?;
        let roles = claims.roles.into_iter().map(RoleKey).collect();
        Ok(Principal::user(UserKey(user_id), roles))
    }

    fn encode(&self, user_id: UserKey, roles: &[RoleKey], exp: u64) -> Result<String, AuthError> {
        let claims = Claims {
            sub: user_id.0.to_string(),
            roles: roles.iter().map(|role| role.as_str().to_string()).collect(),
            exp: exp as usize,
            token_type: ACCESS_TOKEN_TYPE.to_string(),
        };
        jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(&self.secret),
        )
        .map_err(|err| AuthError::Internal(err.to_string()))
    }

    fn decode_claims(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        let decoded = jsonwebtoken::decode::<Claims>(
            token,
            &DecodingKey::from_secret(&self.secret),
            &validation,
        )
        .map_err(map_jwt_error)?;
        Ok(decoded.claims)
    }

    #[cfg(test)]
    fn issue_expired(&self, principal: &Principal) -> Result<String, AuthError> {
        let user_id = principal.user_id.unwrap_or(UserKey(0));
        self.encode(user_id, &principal.roles, now_epoch_seconds().saturating_sub(3600))
    }
}

fn now_epoch_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// 将 jwt 库错误映射为业务错误。
fn map_jwt_error(err: jsonwebtoken::errors::Error) -> AuthError {
    match err.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => {
            tracing::debug!(target: "warden.auth", "token rejected: {}", err);
            AuthError::TokenInvalid
        }
    }
}
