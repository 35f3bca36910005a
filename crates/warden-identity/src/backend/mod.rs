//! 双库身份适配器
//!
//! 上层只看到统一的行结构；每个逻辑操作通过 [`BackendAdapter::pin`]
//! 固定使用一个库，查询失败或超时后切换到另一个库并在该操作内保持不变。
pub mod detector;
pub mod legacy;
pub mod primary;

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

pub use detector::ModeDetector;
pub use legacy::LegacyStore;
pub use primary::PrimaryStore;

use crate::error::{IdentityError, Result};
use crate::{BackendMode, BackendStatus, MenuRow, RoleMenuRow, RoleRow, UserRow};

/// 主库必需表
pub const DEFAULT_REQUIRED_TABLES: [&str; 5] = [
    "sys_user",
    "sys_role",
    "sys_menu",
    "sys_user_role",
    "sys_role_menu",
];

/// 单个库的查询契约，两个库的实现返回相同结构
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// 按 ID 查找未删除用户
    async fn user_by_id(&self, user_id: i64) -> AnyResult<Option<UserRow>>;

    /// 按用户名查找未删除用户
    async fn user_by_name(&self, user_name: &str) -> AnyResult<Option<UserRow>>;

    async fn roles_for_user(&self, user_id: i64) -> AnyResult<Vec<RoleRow>>;

    async fn role_menus(&self, role_ids: &[i64]) -> AnyResult<Vec<RoleMenuRow>>;

    async fn menus(&self, menu_ids: &[i64]) -> AnyResult<Vec<MenuRow>>;

    /// 持有任一角色的用户 ID（去重、升序）
    async fn users_for_roles(&self, role_ids: &[i64]) -> AnyResult<Vec<i64>>;

    /// 关联任一菜单的角色 ID（去重、升序）
    async fn roles_for_menus(&self, menu_ids: &[i64]) -> AnyResult<Vec<i64>>;
}

/// 适配器参数
#[derive(Debug, Clone)]
pub struct BackendOptions {
    pub required_tables: Vec<String>,
    pub mode_ttl: Duration,
    pub query_timeout: Duration,
}

impl Default for BackendOptions {
    fn default() -> Self {
        Self {
            required_tables: DEFAULT_REQUIRED_TABLES.iter().map(|t| t.to_string()).collect(),
            mode_ttl: Duration::from_secs(10),
            query_timeout: Duration::from_secs(5),
        }
    }
}

/// 双库身份适配器
pub struct BackendAdapter {
    detector: ModeDetector,
    primary: Option<Arc<dyn IdentityStore>>,
    legacy: Arc<dyn IdentityStore>,
    query_timeout: Duration,
}

impl BackendAdapter {
    pub fn new(primary: Option<DatabaseConnection>, legacy: DatabaseConnection, options: BackendOptions) -> Self {
        let detector = ModeDetector::new(primary.clone(), options.required_tables, options.mode_ttl)
            .with_probe_timeout(options.query_timeout);
        let primary = primary.map(|db| Arc::new(PrimaryStore::new(db)) as Arc<dyn IdentityStore>);

        Self::with_stores(
            detector,
            primary,
            Arc::new(LegacyStore::new(legacy)),
            options.query_timeout,
        )
    }

    /// 使用自定义查询实现构建
    pub fn with_stores(
        detector: ModeDetector,
        primary: Option<Arc<dyn IdentityStore>>,
        legacy: Arc<dyn IdentityStore>,
        query_timeout: Duration,
    ) -> Self {
        Self {
            detector,
            primary,
            legacy,
            query_timeout,
        }
    }

    pub fn detector(&self) -> &ModeDetector {
        &self.detector
    }

    pub async fn mode(&self) -> BackendMode {
        self.detector.detect(false).await
    }

    /// 为一个逻辑操作固定当前模式
    pub async fn pin(&self) -> PinnedBackend<'_> {
        let mode = self.mode().await;
        debug!(mode = %mode, "Identity backend pinned");
        PinnedBackend { adapter: self, mode }
    }

    fn store(&self, mode: BackendMode) -> Option<Arc<dyn IdentityStore>> {
        match mode {
            BackendMode::Primary => self.primary.clone(),
            BackendMode::Legacy => Some(self.legacy.clone()),
        }
    }

    /// 身份库状态
    pub async fn status(&self) -> BackendStatus {
        let mode = self.mode().await;
        let (primary_available, primary_tables_ok) = match self.detector.probe().await {
            Ok(tables_ok) => (true, tables_ok),
            Err(_) => (false, false),
        };

        BackendStatus {
            mode,
            primary_configured: self.detector.is_configured(),
            primary_available,
            primary_tables_ok,
        }
    }

    pub async fn user_by_id(&self, user_id: i64) -> Result<Option<UserRow>> {
        self.pin().await.user_by_id(user_id).await
    }

    pub async fn user_by_name(&self, user_name: &str) -> Result<Option<UserRow>> {
        self.pin().await.user_by_name(user_name).await
    }

    pub async fn roles_for_user(&self, user_id: i64) -> Result<Vec<RoleRow>> {
        self.pin().await.roles_for_user(user_id).await
    }

    pub async fn role_menus(&self, role_ids: &[i64]) -> Result<Vec<RoleMenuRow>> {
        self.pin().await.role_menus(role_ids).await
    }

    pub async fn menus(&self, menu_ids: &[i64]) -> Result<Vec<MenuRow>> {
        self.pin().await.menus(menu_ids).await
    }

    pub async fn users_for_roles(&self, role_ids: &[i64]) -> Result<Vec<i64>> {
        self.pin().await.users_for_roles(role_ids).await
    }

    pub async fn users_for_menus(&self, menu_ids: &[i64]) -> Result<Vec<i64>> {
        self.pin().await.users_for_menus(menu_ids).await
    }
}

/// 固定模式的适配器视图
pub struct PinnedBackend<'a> {
    adapter: &'a BackendAdapter,
    mode: BackendMode,
}

impl PinnedBackend<'_> {
    pub fn mode(&self) -> BackendMode {
        self.mode
    }

    pub async fn user_by_id(&mut self, user_id: i64) -> Result<Option<UserRow>> {
        self.run("user_by_id", move |store| async move { store.user_by_id(user_id).await })
            .await
    }

    pub async fn user_by_name(&mut self, user_name: &str) -> Result<Option<UserRow>> {
        let user_name = user_name.to_string();
        self.run("user_by_name", move |store| {
            let user_name = user_name.clone();
            async move { store.user_by_name(&user_name).await }
        })
        .await
    }

    pub async fn roles_for_user(&mut self, user_id: i64) -> Result<Vec<RoleRow>> {
        self.run("roles_for_user", move |store| async move { store.roles_for_user(user_id).await })
            .await
    }

    pub async fn role_menus(&mut self, role_ids: &[i64]) -> Result<Vec<RoleMenuRow>> {
        if role_ids.is_empty() {
            return Ok(Vec::new());
        }
        let role_ids = role_ids.to_vec();
        self.run("role_menus", move |store| {
            let role_ids = role_ids.clone();
            async move { store.role_menus(&role_ids).await }
        })
        .await
    }

    pub async fn menus(&mut self, menu_ids: &[i64]) -> Result<Vec<MenuRow>> {
        if menu_ids.is_empty() {
            return Ok(Vec::new());
        }
        let menu_ids = menu_ids.to_vec();
        self.run("menus", move |store| {
            let menu_ids = menu_ids.clone();
            async move { store.menus(&menu_ids).await }
        })
        .await
    }

    pub async fn users_for_roles(&mut self, role_ids: &[i64]) -> Result<Vec<i64>> {
        if role_ids.is_empty() {
            return Ok(Vec::new());
        }
        let role_ids = role_ids.to_vec();
        self.run("users_for_roles", move |store| {
            let role_ids = role_ids.clone();
            async move { store.users_for_roles(&role_ids).await }
        })
        .await
    }

    /// 菜单 -> 角色 -> 用户
    pub async fn users_for_menus(&mut self, menu_ids: &[i64]) -> Result<Vec<i64>> {
        if menu_ids.is_empty() {
            return Ok(Vec::new());
        }
        let menu_ids = menu_ids.to_vec();
        let role_ids = self
            .run("roles_for_menus", move |store| {
                let menu_ids = menu_ids.clone();
                async move { store.roles_for_menus(&menu_ids).await }
            })
            .await?;
        self.users_for_roles(&role_ids).await
    }

    /// 在当前模式执行查询，失败或超时时切换到另一个库重试一次
    async fn run<T, F, Fut>(&mut self, op: &'static str, call: F) -> Result<T>
    where
        F: Fn(Arc<dyn IdentityStore>) -> Fut,
        Fut: Future<Output = AnyResult<T>>,
    {
        let mut last_error = format!("{op}: no identity store available");

        for mode in [self.mode, self.mode.other()] {
            let Some(store) = self.adapter.store(mode) else {
                continue;
            };

            match timeout(self.adapter.query_timeout, call(store)).await {
                Ok(Ok(value)) => {
                    if mode != self.mode {
                        warn!(op = op, from = %self.mode, to = %mode, "Identity query fell back to other store");
                        self.mode = mode;
                        self.adapter.detector.invalidate().await;
                    }
                    return Ok(value);
                }
                Ok(Err(e)) => {
                    warn!(op = op, mode = %mode, error = %e, "Identity query failed");
                    last_error = format!("{op} on {mode}: {e}");
                }
                Err(_) => {
                    warn!(op = op, mode = %mode, "Identity query timed out");
                    last_error = format!("{op} on {mode}: timed out");
                }
            }
        }

        Err(IdentityError::unavailable(last_error))
    }
}


#[cfg(test)]
mod tests {
    use super::doubles::{BrokenStore, FixtureStore};
    use super::*;
    use crate::AccountStatus;
    use sea_orm::{ConnectionTrait, Database, Statement};
    use std::sync::atomic::Ordering;

    /// 包含全部必需表的主库连接，使探测结果为主库
    async fn primary_probe_db() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        for table in DEFAULT_REQUIRED_TABLES {
            db.execute(Statement::from_string(
                db.get_database_backend(),
                format!("CREATE TABLE {table} (id INTEGER PRIMARY KEY)"),
            ))
            .await
            .unwrap();
        }
        db
    }

    fn legacy_fixture() -> FixtureStore {
        FixtureStore {
            users: vec![UserRow {
                user_id: 7,
                user_name: "alice".into(),
                nick_name: None,
                email: None,
                department: None,
                status: AccountStatus::Active,
                password_hash: String::new(),
            }],
            roles: vec![RoleRow {
                role_id: 2,
                role_name: "Viewer".into(),
                role_key: "viewer".into(),
            }],
            user_roles: vec![(7, 2)],
            ..Default::default()
        }
    }

    async fn adapter_with(primary: Arc<BrokenStore>, query_timeout: Duration) -> BackendAdapter {
        let detector = ModeDetector::new(
            Some(primary_probe_db().await),
            DEFAULT_REQUIRED_TABLES.iter().map(|t| t.to_string()).collect(),
            Duration::from_secs(3600),
        );
        BackendAdapter::with_stores(
            detector,
            Some(primary as Arc<dyn IdentityStore>),
            Arc::new(legacy_fixture()),
            query_timeout,
        )
    }

    #[tokio::test]
    async fn test_failed_query_falls_back_for_rest_of_operation() {
        let primary = Arc::new(BrokenStore::failing());
        let adapter = adapter_with(primary.clone(), Duration::from_secs(1)).await;

        let mut pinned = adapter.pin().await;
        assert_eq!(pinned.mode(), BackendMode::Primary);

        let user = pinned.user_by_id(7).await.unwrap().unwrap();
        assert_eq!(user.user_name, "alice");
        assert_eq!(pinned.mode(), BackendMode::Legacy);

        // 后续查询不再访问主库
        let roles = pinned.roles_for_user(7).await.unwrap();
        assert_eq!(roles.len(), 1);
        assert_eq!(primary.calls.load(Ordering::SeqCst), 1);

        // 切换后探测缓存被清除
        assert_eq!(adapter.detector().cached().await, None);
    }

    #[tokio::test]
    async fn test_timed_out_query_falls_back() {
        let primary = Arc::new(BrokenStore::hanging());
        let adapter = adapter_with(primary.clone(), Duration::from_millis(100)).await;

        let mut pinned = adapter.pin().await;
        let user = pinned.user_by_name("alice").await.unwrap();
        assert!(user.is_some());
        assert_eq!(pinned.mode(), BackendMode::Legacy);
        assert_eq!(primary.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_both_stores_failing_is_unavailable() {
        let detector = ModeDetector::new(None, Vec::new(), Duration::from_secs(10));
        let adapter = BackendAdapter::with_stores(
            detector,
            Some(Arc::new(BrokenStore::failing())),
            Arc::new(BrokenStore::failing()),
            Duration::from_secs(1),
        );

        let err = adapter.user_by_id(7).await.unwrap_err();
        assert!(matches!(err, IdentityError::BackendUnavailable(_)));
    }

    #[tokio::test]
    async fn test_legacy_failure_without_primary_is_unavailable() {
        let detector = ModeDetector::new(None, Vec::new(), Duration::from_secs(10));
        let adapter = BackendAdapter::with_stores(
            detector,
            None,
            Arc::new(BrokenStore::failing()),
            Duration::from_secs(1),
        );

        let err = adapter.roles_for_user(7).await.unwrap_err();
        assert!(matches!(err, IdentityError::BackendUnavailable(_)));
    }

    #[tokio::test]
    async fn test_empty_id_lists_skip_queries() {
        let primary = Arc::new(BrokenStore::failing());
        let adapter = adapter_with(primary.clone(), Duration::from_secs(1)).await;

        let mut pinned = adapter.pin().await;
        assert!(pinned.role_menus(&[]).await.unwrap().is_empty());
        assert!(pinned.menus(&[]).await.unwrap().is_empty());
        assert!(pinned.users_for_roles(&[]).await.unwrap().is_empty());
        assert!(pinned.users_for_menus(&[]).await.unwrap().is_empty());
        assert_eq!(primary.calls.load(Ordering::SeqCst), 0);
        assert_eq!(pinned.mode(), BackendMode::Primary);
    }

    #[tokio::test]
    async fn test_status_reports_probe() {
        let adapter = adapter_with(Arc::new(BrokenStore::failing()), Duration::from_secs(1)).await;
        let status = adapter.status().await;
        assert_eq!(status.mode, BackendMode::Primary);
        assert!(status.primary_configured);
        assert!(status.primary_available);
        assert!(status.primary_tables_ok);
    }
}
