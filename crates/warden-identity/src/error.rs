use thiserror::Error;
use warden_middleware::AuthError;

/// 身份库错误类型
#[derive(Error, Debug)]
pub enum IdentityError {
    /// 主库与旧库均不可用
    #[error("Identity backend unavailable: {0}")]
    BackendUnavailable(String),

    /// 用户不存在
    #[error("User not found: {0}")]
    UserNotFound(i64),

    /// 用户名或密码错误
    #[error("Invalid user name or password")]
    InvalidCredentials,

    /// 账号已停用
    #[error("Account disabled: {0}")]
    AccountDisabled(String),

    /// 数据库错误
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::DbErr),

    /// 其他错误
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// 身份库结果类型
pub type Result<T> = std::result::Result<T, IdentityError>;

impl IdentityError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        IdentityError::BackendUnavailable(msg.into())
    }
}

impl From<IdentityError> for AuthError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::BackendUnavailable(msg) => AuthError::BackendUnavailable(msg),
            IdentityError::UserNotFound(_) => AuthError::AuthExpired,
            other => AuthError::Internal(anyhow::Error::new(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_mapping() {
        let err: AuthError = IdentityError::unavailable("both stores down").into();
        assert!(matches!(err, AuthError::BackendUnavailable(_)));

        let err: AuthError = IdentityError::UserNotFound(7).into();
        assert!(matches!(err, AuthError::AuthExpired));

        let err: AuthError = IdentityError::InvalidCredentials.into();
        assert!(matches!(err, AuthError::Internal(_)));
    }
}
