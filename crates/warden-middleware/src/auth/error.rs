use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// 日志中保留的凭证前缀长度
const REDACT_PREFIX_LEN: usize = 12;

/// 认证与授权错误
#[derive(Debug, Error)]
pub enum AuthError {
    /// 凭证缺失、格式错误或签名无法验证
    #[error("Invalid token")]
    TokenInvalid,

    /// 会话已失效，需要重新登录
    #[error("Session expired")]
    AuthExpired,

    /// 身份有效但权限不足
    #[error("Permission denied")]
    PermissionDenied,

    /// 两个身份库都无法访问
    #[error("Identity backend unavailable: {0}")]
    BackendUnavailable(String),

    /// 内部错误（会话存储等）
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::TokenInvalid | AuthError::AuthExpired => StatusCode::UNAUTHORIZED,
            AuthError::PermissionDenied => StatusCode::FORBIDDEN,
            AuthError::BackendUnavailable(_) | AuthError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            AuthError::BackendUnavailable(ref detail) => {
                tracing::error!(detail = %detail, "identity backend unavailable");
                "Identity backend unavailable".to_string()
            }
            AuthError::Internal(ref err) => {
                tracing::error!(error = %err, "internal authentication error");
                "Internal error".to_string()
            }
            ref other => other.to_string(),
        };

        let body = Json(json!({
            "error": message,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

/// 截断凭证或会话 ID，只保留可用于排查的前缀
pub fn redact(value: &str) -> String {
    let prefix: String = value.chars().take(REDACT_PREFIX_LEN).collect();
    format!("{}...<redacted>", prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AuthError::TokenInvalid.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::AuthExpired.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::PermissionDenied.status(), StatusCode::FORBIDDEN);
        assert!(AuthError::BackendUnavailable("down".into())
            .status()
            .is_server_error());
        assert!(AuthError::Internal(anyhow::anyhow!("boom"))
            .status()
            .is_server_error());
    }

    #[test]
    fn test_redact_keeps_only_prefix() {
        let token = "eyJhbGciOiJIUzI1NiJ9.payload.signature";
        let redacted = redact(token);
        assert_eq!(redacted, "eyJhbGciOiJI...<redacted>");
        assert!(!redacted.contains("signature"));

        assert_eq!(redact("short"), "short...<redacted>");
    }
}
