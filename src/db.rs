pub mod transaction;

use crate::config::AppConfig;
use crate::errors::ServiceError;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend};
use sea_orm_migration::MigratorTrait;
use std::time::Duration;
use tracing::{debug, error, info};

pub use transaction::with_transaction;

/// Type alias for a database connection pool
pub type DbPool = DatabaseConnection;

/// Configuration for database connection
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Database connection URL
    pub url: String,
    /// Maximum number of connections
    pub max_connections: u32,
    /// Minimum number of connections
    pub min_connections: u32,
    /// Connection timeout duration
    pub connect_timeout: Duration,
    /// Idle timeout duration
    pub idle_timeout: Duration,
    /// Acquire connection timeout
    pub acquire_timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            acquire_timeout: Duration::from_secs(8),
        }
    }
}

impl From<&AppConfig> for DbConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            url: cfg.database_url.clone(),
            max_connections: cfg.db_max_connections,
            min_connections: cfg.db_min_connections.min(cfg.db_max_connections),
            connect_timeout: Duration::from_secs(cfg.db_connect_timeout_secs),
            idle_timeout: Duration::from_secs(cfg.db_idle_timeout_secs),
            acquire_timeout: Duration::from_secs(cfg.db_acquire_timeout_secs),
        }
    }
}

/// Establishes a connection pool to the database with custom configuration
///
/// # Errors
/// Returns a `ServiceError::DatabaseError` if the connection cannot be established
pub async fn establish_connection_with_config(config: &DbConfig) -> Result<DbPool, ServiceError> {
    debug!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Configuring database connection"
    );

    let mut opt = ConnectOptions::new(config.url.clone());
    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(config.connect_timeout)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .sqlx_logging(false);

    let db_pool = Database::connect(opt).await.map_err(|e| {
        error!("Database connection establishment failed: {}", e);
        ServiceError::DatabaseError(e)
    })?;

    info!(
        backend = ?db_pool.get_database_backend(),
        "Database connection pool established successfully"
    );
    Ok(db_pool)
}

/// Establish DB pool using AppConfig tuning
pub async fn establish_connection_from_app_config(cfg: &AppConfig) -> Result<DbPool, ServiceError> {
    let db_cfg: DbConfig = cfg.into();
    establish_connection_with_config(&db_cfg).await
}

/// Runs database migrations
///
/// # Errors
/// Returns a `ServiceError::DatabaseError` if migrations fail to execute
pub async fn run_migrations(pool: &DbPool) -> Result<(), ServiceError> {
    info!("Running database migrations");
    let start = std::time::Instant::now();

    let result = migrations::Migrator::up(pool, None)
        .await
        .map_err(ServiceError::DatabaseError);

    let elapsed = start.elapsed();
    match &result {
        Ok(_) => info!("Database migrations completed successfully in {:?}", elapsed),
        Err(e) => error!("Database migrations failed after {:?}: {}", elapsed, e),
    }

    result
}

/// Checks if the database connection is active
pub async fn check_connection(pool: &DbPool) -> Result<(), ServiceError> {
    let start = std::time::Instant::now();
    let result = pool.ping().await.map_err(ServiceError::DatabaseError);

    match &result {
        Ok(_) => debug!("Database connection check successful in {:?}", start.elapsed()),
        Err(e) => error!(
            "Database connection check failed after {:?}: {}",
            start.elapsed(),
            e
        ),
    }

    result
}

/// Whether row-level locks (`SELECT ... FOR UPDATE`) are available on this backend.
pub fn supports_row_locks(backend: DbBackend) -> bool {
    matches!(backend, DbBackend::Postgres | DbBackend::MySql)
}

/// Single-connection in-memory SQLite pool with the schema applied.
#[cfg(test)]
pub(crate) async fn memory_pool() -> DbPool {
    let cfg = DbConfig {
        url: "sqlite::memory:".into(),
        max_connections: 1,
        min_connections: 1,
        ..Default::default()
    };
    let pool = establish_connection_with_config(&cfg).await.unwrap();
    run_migrations(&pool).await.unwrap();
    pool
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_settings_follow_app_config() {
        let mut cfg = AppConfig::new("sqlite::memory:".into(), "127.0.0.1".into(), 0, "test".into());
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 4;

        let db_cfg = DbConfig::from(&cfg);
        assert_eq!(db_cfg.max_connections, 1);
        assert_eq!(db_cfg.min_connections, 1);
        assert_eq!(db_cfg.url, "sqlite::memory:");
    }

    #[test]
    fn sqlite_has_no_row_locks() {
        assert!(supports_row_locks(DbBackend::Postgres));
        assert!(!supports_row_locks(DbBackend::Sqlite));
    }

    #[tokio::test]
    async fn in_memory_sqlite_migrates_and_pings() {
        let pool = memory_pool().await;
        assert_eq!(pool.get_database_backend(), DbBackend::Sqlite);
        check_connection(&pool).await.unwrap();
    }

    #[tokio::test]
    async fn migrated_quantity_columns_hold_exact_values() {
        use crate::entities::{product, quantity::Quantity};
        use rust_decimal_macros::dec;
        use sea_orm::{ActiveModelTrait, EntityTrait, Set};

        let pool = memory_pool().await;
        let stored = Quantity::new(dec!(999999999999.9999)).unwrap();
        let id = product::ActiveModel {
            id: Set(uuid::Uuid::new_v4()),
            name: Set("Rice".into()),
            sku: Set(None),
            stock_quantity: Set(stored),
            ..Default::default()
        }
        .insert(&pool)
        .await
        .unwrap()
        .id;

        let loaded = product::Entity::find_by_id(id).one(&pool).await.unwrap().unwrap();
        assert_eq!(loaded.stock_quantity, stored);
        assert_eq!(loaded.stock_quantity.amount().to_string(), "999999999999.9999");
    }
}
