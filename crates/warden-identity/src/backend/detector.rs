use anyhow::{anyhow, bail, Result};
use sea_orm::{ConnectionTrait, DatabaseBackend, DatabaseConnection, Statement};
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::{timeout, Instant};
use tracing::{debug, info, warn};

use crate::BackendMode;

/// 身份库模式探测器
///
/// 主库可达且包含全部必需表时使用主库，否则使用旧库。
/// 结果缓存 `ttl` 时长；探测失败一律回落到旧库，不向调用方返回错误。
pub struct ModeDetector {
    primary: Option<DatabaseConnection>,
    required_tables: Vec<String>,
    ttl: Duration,
    probe_timeout: Duration,
    cached: RwLock<Option<(BackendMode, Instant)>>,
}

impl ModeDetector {
    pub fn new(primary: Option<DatabaseConnection>, required_tables: Vec<String>, ttl: Duration) -> Self {
        Self {
            primary,
            required_tables,
            ttl,
            probe_timeout: Duration::from_secs(5),
            cached: RwLock::new(None),
        }
    }

    pub fn with_probe_timeout(mut self, probe_timeout: Duration) -> Self {
        self.probe_timeout = probe_timeout;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.primary.is_some()
    }

    /// 当前模式；`force` 为 true 时忽略缓存重新探测
    pub async fn detect(&self, force: bool) -> BackendMode {
        if !force {
            if let Some((mode, at)) = *self.cached.read().await {
                if at.elapsed() < self.ttl {
                    return mode;
                }
            }
        }

        let mode = if self.primary.is_none() {
            BackendMode::Legacy
        } else {
            match self.probe().await {
                Ok(true) => BackendMode::Primary,
                Ok(false) => {
                    debug!("Primary store is missing required tables");
                    BackendMode::Legacy
                }
                Err(e) => {
                    warn!(error = %e, "Primary store probe failed");
                    BackendMode::Legacy
                }
            }
        };

        let mut cached = self.cached.write().await;
        if cached.map(|(previous, _)| previous) != Some(mode) {
            info!(mode = %mode, "Identity backend mode selected");
        }
        *cached = Some((mode, Instant::now()));
        mode
    }

    /// 丢弃缓存，下一次调用重新探测
    pub async fn invalidate(&self) {
        *self.cached.write().await = None;
    }

    pub async fn cached(&self) -> Option<BackendMode> {
        self.cached.read().await.map(|(mode, _)| mode)
    }

    /// 主库是否包含全部必需表，不可达时返回错误
    pub async fn probe(&self) -> Result<bool> {
        let Some(db) = &self.primary else {
            bail!("primary store is not configured");
        };

        let tables = timeout(self.probe_timeout, list_tables(db))
            .await
            .map_err(|_| anyhow!("primary store probe timed out"))??;

        Ok(self.required_tables.iter().all(|t| tables.contains(t)))
    }
}

async fn list_tables(db: &DatabaseConnection) -> Result<HashSet<String>> {
    let backend = db.get_database_backend();
    let sql = match backend {
        DatabaseBackend::Postgres => {
            "SELECT table_name::text AS table_name FROM information_schema.tables WHERE table_schema = current_schema()"
        }
        DatabaseBackend::MySql => {
            "SELECT table_name AS table_name FROM information_schema.tables WHERE table_schema = DATABASE()"
        }
        DatabaseBackend::Sqlite => "SELECT name AS table_name FROM sqlite_master WHERE type = 'table'",
    };

    let rows = db.query_all(Statement::from_string(backend, sql.to_string())).await?;
    Ok(rows
        .iter()
        .filter_map(|row| row.try_get::<String>("", "table_name").ok())
        .collect())
}
