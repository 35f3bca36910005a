use anyhow::Result;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};
use warden_identity::{BackendAdapter, BackendOptions, ChangeNotifier, ConnectSettings, SessionPayloadBuilder};
use warden_middleware::{
    auth::jwt::DEFAULT_SECRET, AuthState, DirtySignal, JwtAuth, MemoryDirtySignal, MemorySessionStore,
    SessionManager, SessionStore,
};

use crate::config::{AppConfig, SessionBackend};

/// API 应用状态
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    /// 会话管理器
    pub sessions: Arc<SessionManager>,
    /// 双库身份适配器
    pub identity: Arc<BackendAdapter>,
    pub payloads: Arc<SessionPayloadBuilder>,
    /// 供角色、菜单管理方写入待刷新用户
    pub notifier: Arc<ChangeNotifier>,
    pub auth: AuthState,
}

impl AppState {
    /// 由已建立的依赖组装
    pub fn new(
        config: AppConfig,
        identity: Arc<BackendAdapter>,
        store: Arc<dyn SessionStore>,
        dirty: Arc<dyn DirtySignal>,
    ) -> Self {
        let jwt = Arc::new(JwtAuth::new(&config.auth.jwt_secret, config.auth.token_lifetime_years));
        let sessions = Arc::new(SessionManager::new(store, jwt, config.auth.session_ttl()));
        let payloads = Arc::new(SessionPayloadBuilder::new(identity.clone()));
        let notifier = Arc::new(ChangeNotifier::new(identity.clone(), dirty.clone()));

        let allowlist: HashSet<String> = config.auth.allowlist.iter().cloned().collect();
        let auth = AuthState {
            sessions: sessions.clone(),
            dirty,
            payloads: payloads.clone(),
            allowlist: Arc::new(allowlist),
            anonymous_fallback: config.auth.anonymous_fallback,
        };

        Self {
            config: Arc::new(config),
            sessions,
            identity,
            payloads,
            notifier,
            auth,
        }
    }

    /// 按配置连接数据库与会话存储
    pub async fn connect(config: AppConfig) -> Result<Self> {
        if config.auth.jwt_secret == DEFAULT_SECRET {
            warn!("Using the built-in JWT secret; set auth.jwt_secret in production");
        }

        let settings = ConnectSettings {
            max_connections: config.database.max_connections,
            connect_timeout: config.database.connect_timeout(),
            lazy: false,
        };
        let legacy = warden_identity::connect(&config.database.legacy_url, &settings).await?;

        // 主库延迟连接，不可达时由模式探测回落到旧库
        let primary = match &config.database.primary_url {
            Some(url) => {
                let lazy = ConnectSettings { lazy: true, ..settings.clone() };
                Some(warden_identity::connect(url, &lazy).await?)
            }
            None => None,
        };

        let options = BackendOptions {
            required_tables: config.database.required_tables.clone(),
            mode_ttl: config.database.mode_ttl(),
            query_timeout: config.database.query_timeout(),
        };
        let identity = Arc::new(BackendAdapter::new(primary, legacy, options));
        info!(mode = %identity.mode().await, "Identity backend ready");

        let (store, dirty) = session_backend(&config)?;
        Ok(Self::new(config, identity, store, dirty))
    }
}

fn session_backend(config: &AppConfig) -> Result<(Arc<dyn SessionStore>, Arc<dyn DirtySignal>)> {
    match config.session.backend {
        SessionBackend::Memory => Ok((
            Arc::new(MemorySessionStore::new()),
            Arc::new(MemoryDirtySignal::new()),
        )),
        #[cfg(feature = "redis-session")]
        SessionBackend::Redis => {
            use warden_middleware::{RedisDirtySignal, RedisSessionStore};
            Ok((
                Arc::new(RedisSessionStore::new(&config.session.redis_url)?),
                Arc::new(RedisDirtySignal::new(&config.session.redis_url)?),
            ))
        }
        #[cfg(not(feature = "redis-session"))]
        SessionBackend::Redis => {
            anyhow::bail!("session.backend = \"redis\" requires the `redis-session` feature")
        }
    }
}
