//! # Database Pool Management
//!
//! Connection pool creation and configuration for SQLite.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Database Handle                                    │
//! │                                                                         │
//! │  StockbookConfig::load()  ──►  DbConfig (path, pool, busy, policy)     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config).await ← Create pool + run migrations            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌──────────────────────────────┐   ┌────────────────────────────┐     │
//! │  │         SqlitePool           │   │   Arc<LockManager>         │     │
//! │  │  ┌─────┐ ┌─────┐ ┌─────┐     │   │   StockRow / Invoice /     │     │
//! │  │  │Conn1│ │Conn2│ │Conn3│ ... │   │   Purchase keys            │     │
//! │  │  └─────┘ └─────┘ └─────┘     │   └────────────────────────────┘     │
//! │  └──────────────────────────────┘                                       │
//! │       │  shared by every repository and recorder handed out below      │
//! │       ▼                                                                 │
//! │  db.products()  db.locations()  db.ledger()  db.sections()             │
//! │  db.prices()    db.purchases()  db.sales()                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## SQLite Settings
//! - WAL: readers never block the single writer
//! - `busy_timeout`: a writer waits for the file lock instead of failing
//! - foreign keys on (off by default in SQLite)

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use stockbook_core::StockPolicy;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::ledger::StockLedger;
use crate::locks::LockManager;
use crate::migrations;
use crate::recorder::purchase::PurchaseRecorder;
use crate::recorder::sale::SaleRecorder;
use crate::repository::location::LocationRepository;
use crate::repository::pricing::SectionPriceRepository;
use crate::repository::product::ProductRepository;
use crate::repository::section::SectionRepository;

// =============================================================================
// Configuration
// =============================================================================

/// Database configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("/var/lib/stockbook/stock.db")
///     .max_connections(8)
///     .stock_policy(StockPolicy::Enforce);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Path to the SQLite database file.
    pub database_path: PathBuf,

    /// Maximum number of connections in the pool.
    /// Default: 5
    pub max_connections: u32,

    /// Minimum number of connections to keep alive.
    /// Default: 1
    pub min_connections: u32,

    /// Pool acquire timeout.
    /// Default: 30 seconds
    pub connect_timeout: Duration,

    /// Idle timeout before closing a connection. `None` keeps connections.
    /// Default: 10 minutes
    pub idle_timeout: Option<Duration>,

    /// How long a statement waits on SQLite's file lock.
    /// Default: 10 seconds
    pub busy_timeout: Duration,

    /// Negative stock handling for every ledger write.
    /// Default: enforce
    pub stock_policy: StockPolicy,

    /// Whether to run migrations on connect.
    /// Default: true
    pub run_migrations: bool,
}

impl DbConfig {
    /// Creates a new configuration for the given file (created if missing).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Some(Duration::from_secs(600)),
            busy_timeout: Duration::from_secs(10),
            stock_policy: StockPolicy::Enforce,
            run_migrations: true,
        }
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the minimum number of connections.
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Sets the pool acquire timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets SQLite's busy timeout.
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Sets the stock policy.
    pub fn stock_policy(mut self, policy: StockPolicy) -> Self {
        self.stock_policy = policy;
        self
    }

    /// Sets whether to run migrations on connect.
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Creates an in-memory database configuration (for testing).
    ///
    /// One connection that is never reaped: the database lives exactly as
    /// long as that connection.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1,
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: None,
            busy_timeout: Duration::from_secs(5),
            stock_policy: StockPolicy::Enforce,
            run_migrations: true,
        }
    }
}

// =============================================================================
// Database
// =============================================================================

/// Main database handle providing repository and recorder access.
///
/// Cheap to clone; clones share the pool and the lock manager. All writers
/// of one database file must go through handles cloned from the same
/// `Database` so they see the same locks.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    locks: Arc<LockManager>,
    stock_policy: StockPolicy,
}

impl Database {
    /// Creates a new database connection pool.
    ///
    /// ## What This Does
    /// 1. Creates the database file if it doesn't exist
    /// 2. Configures WAL, NORMAL synchronous, foreign keys, busy timeout
    /// 3. Creates the connection pool
    /// 4. Runs migrations (if enabled)
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            policy = %config.stock_policy,
            "Initializing database connection"
        );

        let connect_url = if config.database_path.as_os_str() == ":memory:" {
            "sqlite::memory:".to_string()
        } else {
            format!("sqlite://{}?mode=rwc", config.database_path.display())
        };

        let connect_options = SqliteConnectOptions::from_str(&connect_url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(config.busy_timeout)
            .create_if_missing(true);

        debug!("Connection options configured");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(config.idle_timeout)
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            "Database pool created"
        );

        let db = Database {
            pool,
            locks: Arc::new(LockManager::new()),
            stock_policy: config.stock_policy,
        };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Runs database migrations.
    pub async fn run_migrations(&self) -> DbResult<()> {
        info!("Running database migrations");
        migrations::run_migrations(&self.pool).await?;
        info!("Migrations complete");
        Ok(())
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// The lock manager shared by every writer of this handle.
    pub fn locks(&self) -> &Arc<LockManager> {
        &self.locks
    }

    pub fn stock_policy(&self) -> StockPolicy {
        self.stock_policy
    }

    /// Returns the product catalog.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let product = db.products().get_by_barcode("3F9A0C21B7DE").await?;
    /// ```
    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone())
    }

    /// Returns the location catalog.
    pub fn locations(&self) -> LocationRepository {
        LocationRepository::new(self.pool.clone())
    }

    /// Returns the stock ledger.
    pub fn ledger(&self) -> StockLedger {
        StockLedger::new(self.pool.clone(), self.locks.clone(), self.stock_policy)
    }

    /// Returns the channel and section catalog.
    pub fn sections(&self) -> SectionRepository {
        SectionRepository::new(self.pool.clone())
    }

    /// Returns the per-section price catalog.
    pub fn prices(&self) -> SectionPriceRepository {
        SectionPriceRepository::new(self.pool.clone())
    }

    /// Returns the purchase recorder.
    pub fn purchases(&self) -> PurchaseRecorder {
        PurchaseRecorder::new(self.pool.clone(), self.locks.clone(), self.stock_policy)
    }

    /// Returns the sale recorder.
    pub fn sales(&self) -> SaleRecorder {
        SaleRecorder::new(self.pool.clone(), self.locks.clone(), self.stock_policy)
    }

    /// Closes the database connection pool.
    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }

    /// Checks if the database is healthy (can execute queries).
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
