use anyhow::Context;
use lazy_static::lazy_static;
use tracing::warn;

use crate::backend::PinnedBackend;
use crate::error::{IdentityError, Result};
use crate::UserRow;

lazy_static! {
    /// 用户不存在时参与校验的摘要，与真实用户走同样的 bcrypt 计算
    static ref FALLBACK_HASH: Option<String> =
        bcrypt::hash("warden-unknown-user", bcrypt::DEFAULT_COST).ok();
}

/// 生成 bcrypt 密码摘要
pub fn hash_password(password: &str) -> Result<String> {
    Ok(bcrypt::hash(password, bcrypt::DEFAULT_COST).context("failed to hash password")?)
}

/// 校验密码，摘要格式错误视为不匹配
pub async fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let password = password.to_string();
    let hash = hash.to_string();

    let verified = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .context("password verification task failed")?;

    Ok(verified.unwrap_or_else(|e| {
        warn!(error = %e, "Malformed password hash");
        false
    }))
}

/// 校验用户名和密码并返回用户
///
/// 用户不存在与密码错误返回同一个错误。
pub async fn check_credentials(
    backend: &mut PinnedBackend<'_>,
    user_name: &str,
    password: &str,
) -> Result<UserRow> {
    let Some(user) = backend.user_by_name(user_name).await? else {
        verify_fallback(password).await?;
        return Err(IdentityError::InvalidCredentials);
    };

    if !verify_password(password, &user.password_hash).await? {
        return Err(IdentityError::InvalidCredentials);
    }

    if !user.status.is_active() {
        return Err(IdentityError::AccountDisabled(user.user_name));
    }

    Ok(user)
}

/// 对不存在的用户也执行一次 bcrypt 校验，结果丢弃
async fn verify_fallback(password: &str) -> Result<()> {
    let password = password.to_string();

    tokio::task::spawn_blocking(move || {
        if let Some(hash) = FALLBACK_HASH.as_deref() {
            let _ = bcrypt::verify(password, hash);
        }
    })
    .await
    .context("password verification task failed")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_and_verify() {
        let hash = hash_password("secret").unwrap();
        assert!(verify_password("secret", &hash).await.unwrap());
        assert!(!verify_password("wrong", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_fallback_hash_runs_full_check() {
        let hash = FALLBACK_HASH.as_deref().unwrap();
        assert!(hash.starts_with("$2"));
        assert!(!verify_password("secret", hash).await.unwrap());

        verify_fallback("secret").await.unwrap();
    }

    #[tokio::test]
    async fn test_malformed_hash_does_not_match() {
        assert!(!verify_password("secret", "not-a-hash").await.unwrap());
    }
}
