use anyhow::Result;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

use super::SessionPayload;

/// 在线会话登记集合的键
pub const REGISTRY_KEY: &str = "login_tokens";

/// 会话存储 trait
///
/// 每个操作只在单键粒度上保证原子性。
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// 登记会话、写入内容并设置 TTL
    async fn create(&self, session: &str, payload: &SessionPayload, ttl: Duration) -> Result<()>;

    /// 会话是否存在且未过期
    async fn is_live(&self, session: &str) -> Result<bool>;

    /// 会话仍在线时覆盖内容并重置 TTL，不写登记集合。返回是否写入
    async fn replace(
        &self,
        session: &str,
        payload: &SessionPayload,
        ttl: Duration,
    ) -> Result<bool>;

    /// 重置 TTL，不读写内容
    async fn refresh(&self, session: &str, ttl: Duration) -> Result<()>;

    /// 读取会话内容
    async fn read(&self, session: &str) -> Result<Option<SessionPayload>>;

    /// 从登记集合和存储中同时删除
    async fn destroy(&self, sessions: &[String]) -> Result<()>;

    /// 登记集合中的全部会话 ID
    async fn registered(&self) -> Result<Vec<String>>;

    /// 剩余 TTL，会话不存在时为 None
    async fn remaining_ttl(&self, session: &str) -> Result<Option<Duration>>;
}

struct Entry {
    payload: SessionPayload,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// 内存会话存储（用于开发和测试）
pub struct MemorySessionStore {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
    registry: Arc<RwLock<HashSet<String>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            registry: Arc::new(RwLock::new(HashSet::new())),
        }
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, session: &str, payload: &SessionPayload, ttl: Duration) -> Result<()> {
        self.registry.write().await.insert(session.to_string());

        let entry = Entry {
            payload: payload.clone(),
            expires_at: Instant::now() + ttl,
        };
        self.entries.write().await.insert(session.to_string(), entry);
        Ok(())
    }

    async fn is_live(&self, session: &str) -> Result<bool> {
        let entries = self.entries.read().await;
        let now = Instant::now();
        Ok(entries.get(session).is_some_and(|e| e.is_live(now)))
    }

    async fn replace(
        &self,
        session: &str,
        payload: &SessionPayload,
        ttl: Duration,
    ) -> Result<bool> {
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        let Some(entry) = entries.get_mut(session).filter(|e| e.is_live(now)) else {
            return Ok(false);
        };

        entry.payload = payload.clone();
        entry.expires_at = now + ttl;
        Ok(true)
    }

    async fn refresh(&self, session: &str, ttl: Duration) -> Result<()> {
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        if let Some(entry) = entries.get_mut(session).filter(|e| e.is_live(now)) {
            entry.expires_at = now + ttl;
        }
        Ok(())
    }

    async fn read(&self, session: &str) -> Result<Option<SessionPayload>> {
        let entries = self.entries.read().await;
        let now = Instant::now();
        Ok(entries
            .get(session)
            .filter(|e| e.is_live(now))
            .map(|e| e.payload.clone()))
    }

    async fn destroy(&self, sessions: &[String]) -> Result<()> {
        {
            let mut registry = self.registry.write().await;
            for session in sessions {
                registry.remove(session);
            }
        }

        let mut entries = self.entries.write().await;
        for session in sessions {
            entries.remove(session);
        }
        Ok(())
    }

    async fn registered(&self) -> Result<Vec<String>> {
        let registry = self.registry.read().await;
        Ok(registry.iter().cloned().collect())
    }

    async fn remaining_ttl(&self, session: &str) -> Result<Option<Duration>> {
        let entries = self.entries.read().await;
        let now = Instant::now();
        Ok(entries
            .get(session)
            .filter(|e| e.is_live(now))
            .map(|e| e.expires_at - now))
    }
}

/// Redis 会话存储
#[cfg(feature = "redis-session")]
pub struct RedisSessionStore {
    client: redis::Client,
}

#[cfg(feature = "redis-session")]
impl RedisSessionStore {
    pub fn new(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self { client })
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }
}

#[cfg(feature = "redis-session")]
#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn create(&self, session: &str, payload: &SessionPayload, ttl: Duration) -> Result<()> {
        use redis::AsyncCommands;

        let mut conn = self.connection().await?;
        let json = serde_json::to_string(payload)?;

        conn.sadd::<_, _, ()>(REGISTRY_KEY, session).await?;
        redis::cmd("SET")
            .arg(session)
            .arg(json)
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async::<_, ()>(&mut conn)
            .await?;

        Ok(())
    }

    async fn is_live(&self, session: &str) -> Result<bool> {
        use redis::AsyncCommands;

        let mut conn = self.connection().await?;
        let exists: bool = conn.exists(session).await?;
        Ok(exists)
    }

    async fn replace(
        &self,
        session: &str,
        payload: &SessionPayload,
        ttl: Duration,
    ) -> Result<bool> {
        let mut conn = self.connection().await?;
        let json = serde_json::to_string(payload)?;

        // XX：键不存在时不写入，返回 nil
        let written: Option<String> = redis::cmd("SET")
            .arg(session)
            .arg(json)
            .arg("XX")
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await?;

        Ok(written.is_some())
    }

    async fn refresh(&self, session: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.connection().await?;
        redis::cmd("EXPIRE")
            .arg(session)
            .arg(ttl.as_secs().max(1))
            .query_async::<_, i64>(&mut conn)
            .await?;
        Ok(())
    }

    async fn read(&self, session: &str) -> Result<Option<SessionPayload>> {
        use redis::AsyncCommands;

        let mut conn = self.connection().await?;
        let result: Option<String> = conn.get(session).await?;

        match result {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn destroy(&self, sessions: &[String]) -> Result<()> {
        use redis::AsyncCommands;

        if sessions.is_empty() {
            return Ok(());
        }

        let mut conn = self.connection().await?;
        conn.srem::<_, _, ()>(REGISTRY_KEY, sessions).await?;
        conn.del::<_, ()>(sessions).await?;
        Ok(())
    }

    async fn registered(&self) -> Result<Vec<String>> {
        use redis::AsyncCommands;

        let mut conn = self.connection().await?;
        let members: Vec<String> = conn.smembers(REGISTRY_KEY).await?;
        Ok(members)
    }

    async fn remaining_ttl(&self, session: &str) -> Result<Option<Duration>> {
        let mut conn = self.connection().await?;
        let millis: i64 = redis::cmd("PTTL")
            .arg(session)
            .query_async(&mut conn)
            .await?;

        // -2: 键不存在；-1: 未设置过期时间
        Ok(match millis {
            -2 => None,
            -1 => Some(Duration::MAX),
            ms => Some(Duration::from_millis(ms.max(0) as u64)),
        })
    }
}
