pub mod converter;
pub mod legacy;
pub mod primary;

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr};
use std::time::Duration;
use tracing::info;

/// 连接参数
#[derive(Debug, Clone)]
pub struct ConnectSettings {
    pub max_connections: u32,
    pub connect_timeout: Duration,
    /// 首次使用时才建立连接
    pub lazy: bool,
}

impl Default for ConnectSettings {
    fn default() -> Self {
        Self {
            max_connections: 10,
            connect_timeout: Duration::from_millis(2000),
            lazy: false,
        }
    }
}

/// 建立数据库连接池
pub async fn connect(url: &str, settings: &ConnectSettings) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(url.to_string());
    options
        .max_connections(settings.max_connections)
        .connect_timeout(settings.connect_timeout)
        .acquire_timeout(settings.connect_timeout)
        .connect_lazy(settings.lazy)
        .sqlx_logging(false);

    let db = Database::connect(options).await?;
    info!(backend = ?db.get_database_backend(), "Database connected");
    Ok(db)
}
