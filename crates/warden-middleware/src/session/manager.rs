use anyhow::Result;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::{SessionPayload, SessionStore};
use crate::auth::{redact, JwtAuth};

/// 会话 ID 长度
pub const SESSION_ID_LEN: usize = 30;

const SESSION_ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// 登录后返回给调用方的凭证
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub session: String,
}

/// 在线会话摘要
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveSession {
    pub session: String,
    pub user_id: i64,
    pub user_name: String,
    pub login_time: DateTime<Utc>,
    pub remaining_secs: u64,
}

/// 会话管理器
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    jwt: Arc<JwtAuth>,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>, jwt: Arc<JwtAuth>, ttl: Duration) -> Self {
        Self { store, jwt, ttl }
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub fn jwt(&self) -> &JwtAuth {
        &self.jwt
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// 创建会话并签发凭证
    pub async fn open(&self, payload: &SessionPayload) -> Result<IssuedSession> {
        let session = generate_session_id();
        let user = &payload.user_info;

        self.store.create(&session, payload, self.ttl).await?;
        let token = self.jwt.issue(user.user_id, &user.user_name, &session)?;

        info!(user_id = user.user_id, session = %redact(&session), "Session created");
        Ok(IssuedSession { token, session })
    }

    /// 注销
    pub async fn close(&self, session: &str) -> Result<()> {
        self.store.destroy(&[session.to_string()]).await?;
        info!(session = %redact(session), "Session closed");
        Ok(())
    }

    /// 强制下线
    pub async fn evict(&self, sessions: &[String]) -> Result<()> {
        if sessions.is_empty() {
            return Ok(());
        }
        self.store.destroy(sessions).await?;
        info!(count = sessions.len(), "Sessions evicted");
        Ok(())
    }

    /// 列出登记集合中仍然在线的会话
    pub async fn live_sessions(&self) -> Result<Vec<LiveSession>> {
        let mut live = Vec::new();
        for session in self.store.registered().await? {
            let Some(payload) = self.store.read(&session).await? else {
                continue;
            };
            let remaining = self.store.remaining_ttl(&session).await?.unwrap_or_default();
            live.push(LiveSession {
                session,
                user_id: payload.user_info.user_id,
                user_name: payload.user_info.user_name,
                login_time: payload.login_time,
                remaining_secs: remaining.as_secs(),
            });
        }
        live.sort_by(|a, b| b.login_time.cmp(&a.login_time));
        Ok(live)
    }

    /// 清理登记集合中已过期的会话
    pub async fn reap(&self) -> Result<u64> {
        let mut expired = Vec::new();
        for session in self.store.registered().await? {
            if !self.store.is_live(&session).await? {
                expired.push(session);
            }
        }

        self.store.destroy(&expired).await?;
        Ok(expired.len() as u64)
    }

    /// 启动定期清理任务
    pub fn spawn_reaper(self: Arc<Self>, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);

            loop {
                interval.tick().await;

                match self.reap().await {
                    Ok(removed) if removed > 0 => {
                        info!(removed = removed, "Reaped expired sessions");
                    }
                    Ok(_) => debug!("No expired sessions to reap"),
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to reap expired sessions");
                    }
                }
            }
        })
    }
}

/// 生成 30 位随机会话 ID（0-9a-z）
pub fn generate_session_id() -> String {
    let mut rng = rand::thread_rng();
    (0..SESSION_ID_LEN)
        .map(|_| SESSION_ID_ALPHABET[rng.gen_range(0..SESSION_ID_ALPHABET.len())] as char)
        .collect()
}
