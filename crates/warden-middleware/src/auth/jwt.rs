use anyhow::{anyhow, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::AuthError;

/// 未配置密钥时使用的开发密钥
pub const DEFAULT_SECRET: &str = "default-secret-change-in-production";

/// 凭证默认有效期（年）。凭证本身几乎永不过期，失效由会话 TTL 决定。
pub const DEFAULT_LIFETIME_YEARS: i64 = 100;

/// 有效期上限（年），超出的配置值按上限处理
pub const MAX_LIFETIME_YEARS: i64 = 1000;

/// JWT 签发与校验
pub struct JwtAuth {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    lifetime: Duration,
}

/// JWT Claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user_id: i64,
    pub user_name: String,
    /// 会话存储中的键
    pub session: String,
    pub exp: i64,
}

impl JwtAuth {
    pub fn new(secret: &str, lifetime_years: i64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            lifetime: Duration::days(365 * lifetime_years.clamp(1, MAX_LIFETIME_YEARS)),
        }
    }

    /// 签发凭证
    pub fn issue(&self, user_id: i64, user_name: &str, session: &str) -> Result<String> {
        let expires_at = Utc::now()
            .checked_add_signed(self.lifetime)
            .ok_or_else(|| anyhow!("token expiry out of range"))?;

        let claims = Claims {
            user_id,
            user_name: user_name.to_string(),
            session: session.to_string(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        Ok(token)
    }

    /// 校验凭证，签名或解码失败统一返回 `TokenInvalid`
    pub fn verify(&self, token: &str) -> std::result::Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|err| {
                debug!(error = %err, "token rejected");
                AuthError::TokenInvalid
            })
    }
}

impl Default for JwtAuth {
    fn default() -> Self {
        Self::new(DEFAULT_SECRET, DEFAULT_LIFETIME_YEARS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_and_verify_token() {
        let auth = JwtAuth::new("test-secret", DEFAULT_LIFETIME_YEARS);

        let token = auth.issue(7, "alice", "abcdefghijklmnopqrstuvwxyz0123").unwrap();
        let claims = auth.verify(&token).unwrap();

        assert_eq!(claims.user_id, 7);
        assert_eq!(claims.user_name, "alice");
        assert_eq!(claims.session, "abcdefghijklmnopqrstuvwxyz0123");
    }

    #[test]
    fn test_expiry_is_far_future() {
        let auth = JwtAuth::default();
        let token = auth.issue(1, "admin", "s").unwrap();
        let claims = auth.verify(&token).unwrap();

        let fifty_years = (Utc::now() + Duration::days(365 * 50)).timestamp();
        assert!(claims.exp > fifty_years);
    }

    #[test]
    fn test_oversized_lifetime_is_clamped() {
        let auth = JwtAuth::new("test-secret", i64::MAX);
        let token = auth.issue(1, "admin", "s").unwrap();
        let claims = auth.verify(&token).unwrap();

        let limit = (Utc::now() + Duration::days(365 * MAX_LIFETIME_YEARS)).timestamp();
        assert!(claims.exp <= limit);
        assert!(claims.exp > Utc::now().timestamp());

        // 非正数按一年处理
        let auth = JwtAuth::new("test-secret", -5);
        let token = auth.issue(1, "admin", "s").unwrap();
        assert!(auth.verify(&token).is_ok());
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let issuer = JwtAuth::new("secret-a", 1);
        let verifier = JwtAuth::new("secret-b", 1);

        let token = issuer.issue(1, "admin", "s").unwrap();
        assert!(matches!(verifier.verify(&token), Err(AuthError::TokenInvalid)));
    }

    #[test]
    fn test_invalid_token() {
        let auth = JwtAuth::new("test-secret", 1);
        assert!(matches!(auth.verify("invalid-token"), Err(AuthError::TokenInvalid)));
        assert!(matches!(auth.verify(""), Err(AuthError::TokenInvalid)));
    }

    #[test]
    fn test_extra_claims_are_tolerated() {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct EmployeeClaims<'a> {
            user_id: i64,
            user_name: &'a str,
            emp_id: &'a str,
            session: &'a str,
            exp: i64,
        }

        let secret = "test-secret";
        let claims = EmployeeClaims {
            user_id: 42,
            user_name: "worker",
            emp_id: "E-0042",
            session: "sess",
            exp: (Utc::now() + Duration::days(1)).timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap();

        let decoded = JwtAuth::new(secret, 1).verify(&token).unwrap();
        assert_eq!(decoded.user_id, 42);
        assert_eq!(decoded.session, "sess");
    }
}
