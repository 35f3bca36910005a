//! 待刷新用户集合
//!
//! 修改角色-菜单或用户-角色关系的一方在提交后写入受影响的用户 ID，
//! 认证中间件在该用户下一次请求时重建会话并清除标记。
//! 语义为至少一次：重建与新的修改并发时，标记可能被提前清除，
//! 由下一次修改重新写入。
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

/// 待刷新用户集合的键
pub const DIRTY_USERS_KEY: &str = "update_userInfo";

#[async_trait]
pub trait DirtySignal: Send + Sync {
    /// 标记用户需要刷新，空列表不做任何操作
    async fn mark(&self, user_ids: &[i64]) -> Result<()>;

    async fn is_dirty(&self, user_id: i64) -> Result<bool>;

    async fn clear(&self, user_id: i64) -> Result<()>;

    /// 当前全部待刷新用户
    async fn pending(&self) -> Result<Vec<i64>>;
}

/// 内存实现
#[derive(Default)]
pub struct MemoryDirtySignal {
    users: Arc<RwLock<HashSet<String>>>,
}

impl MemoryDirtySignal {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DirtySignal for MemoryDirtySignal {
    async fn mark(&self, user_ids: &[i64]) -> Result<()> {
        if user_ids.is_empty() {
            return Ok(());
        }
        let mut users = self.users.write().await;
        users.extend(user_ids.iter().map(i64::to_string));
        Ok(())
    }

    async fn is_dirty(&self, user_id: i64) -> Result<bool> {
        Ok(self.users.read().await.contains(&user_id.to_string()))
    }

    async fn clear(&self, user_id: i64) -> Result<()> {
        self.users.write().await.remove(&user_id.to_string());
        Ok(())
    }

    async fn pending(&self) -> Result<Vec<i64>> {
        let users = self.users.read().await;
        Ok(parse_ids(users.iter()))
    }
}

/// Redis 实现
#[cfg(feature = "redis-session")]
pub struct RedisDirtySignal {
    client: redis::Client,
}

#[cfg(feature = "redis-session")]
impl RedisDirtySignal {
    pub fn new(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self { client })
    }
}

#[cfg(feature = "redis-session")]
#[async_trait]
impl DirtySignal for RedisDirtySignal {
    async fn mark(&self, user_ids: &[i64]) -> Result<()> {
        use redis::AsyncCommands;

        if user_ids.is_empty() {
            return Ok(());
        }
        let ids: Vec<String> = user_ids.iter().map(i64::to_string).collect();
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.sadd::<_, _, ()>(DIRTY_USERS_KEY, ids).await?;
        Ok(())
    }

    async fn is_dirty(&self, user_id: i64) -> Result<bool> {
        use redis::AsyncCommands;

        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let member: bool = conn.sismember(DIRTY_USERS_KEY, user_id.to_string()).await?;
        Ok(member)
    }

    async fn clear(&self, user_id: i64) -> Result<()> {
        use redis::AsyncCommands;

        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.srem::<_, _, ()>(DIRTY_USERS_KEY, user_id.to_string()).await?;
        Ok(())
    }

    async fn pending(&self) -> Result<Vec<i64>> {
        use redis::AsyncCommands;

        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let members: Vec<String> = conn.smembers(DIRTY_USERS_KEY).await?;
        Ok(parse_ids(members.iter()))
    }
}

fn parse_ids<'a>(ids: impl Iterator<Item = &'a String>) -> Vec<i64> {
    let mut parsed: Vec<i64> = ids.filter_map(|id| id.parse().ok()).collect();
    parsed.sort_unstable();
    parsed
}
