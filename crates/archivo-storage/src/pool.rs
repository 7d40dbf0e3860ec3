//! SQLite connection pool using r2d2
//!
//! Provides a connection pool for SQLite to support concurrent access from one
//! process, with per-connection initialization (WAL mode, pragmas).

use archivo_core::{Error, Result, StorageConfig};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Counter for generating unique in-memory database names
static MEMORY_DB_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A pooled SQLite connection
pub type PooledSqlite = PooledConnection<SqliteConnectionManager>;

/// Configuration for the connection pool
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum number of connections in the pool
    pub max_size: u32,
    /// Minimum number of idle connections to maintain
    pub min_idle: Option<u32>,
    /// Timeout for acquiring a connection from the pool
    pub connection_timeout: Duration,
    /// How long SQLite retries on a locked database
    pub busy_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: 10,
            min_idle: Some(2),
            connection_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_millis(5000),
        }
    }
}

impl PoolConfig {
    /// Create a configuration suitable for testing with minimal resources
    pub fn for_testing() -> Self {
        Self {
            max_size: 5,
            min_idle: Some(1),
            connection_timeout: Duration::from_secs(5),
            busy_timeout: Duration::from_millis(5000),
        }
    }
}

impl From<&StorageConfig> for PoolConfig {
    fn from(config: &StorageConfig) -> Self {
        Self {
            max_size: config.max_connections,
            min_idle: config.min_idle,
            connection_timeout: config.connection_timeout(),
            busy_timeout: config.busy_timeout(),
        }
    }
}

/// Connection initializer for file-based databases
#[derive(Debug)]
struct FileConnectionInitializer {
    busy_timeout: Duration,
}

impl r2d2::CustomizeConnection<Connection, rusqlite::Error> for FileConnectionInitializer {
    fn on_acquire(&self, conn: &mut Connection) -> std::result::Result<(), rusqlite::Error> {
        conn.busy_timeout(self.busy_timeout)?;
        // WAL lets readers proceed while a writer holds the lock
        let _mode: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;
        conn.execute_batch("PRAGMA synchronous=NORMAL;")?;
        Ok(())
    }
}

/// Connection initializer for in-memory databases
/// Note: WAL mode doesn't work with in-memory shared cache databases
#[derive(Debug)]
struct MemoryConnectionInitializer {
    busy_timeout: Duration,
}

impl r2d2::CustomizeConnection<Connection, rusqlite::Error> for MemoryConnectionInitializer {
    fn on_acquire(&self, conn: &mut Connection) -> std::result::Result<(), rusqlite::Error> {
        conn.busy_timeout(self.busy_timeout)?;
        Ok(())
    }
}

/// SQLite connection pool wrapper
pub struct ConnectionPool {
    pool: Pool<SqliteConnectionManager>,
}

impl ConnectionPool {
    /// Create a new connection pool for the database at the given path
    ///
    /// The location is opened once directly before the pool is built, so an
    /// unopenable path or a non-database file fails right away instead of
    /// after `connection_timeout`.
    pub fn new(path: &Path, config: PoolConfig) -> Result<Self> {
        let probe = Connection::open_with_flags(path, OpenFlags::default())
            .and_then(|conn| {
                // Opening is lazy; reading the header rejects non-database files
                conn.query_row("PRAGMA schema_version", [], |row| row.get::<_, i64>(0))?;
                Ok(conn)
            })
            .map_err(|e| {
                Error::Initialization(format!(
                    "Failed to open database at {}: {}",
                    path.display(),
                    e
                ))
            })?;
        drop(probe);

        let manager = SqliteConnectionManager::file(path);
        let initializer = FileConnectionInitializer {
            busy_timeout: config.busy_timeout,
        };
        Self::build_pool_with_initializer(manager, config, Box::new(initializer))
    }

    /// Create an in-memory connection pool (for testing)
    ///
    /// Each connection would normally get its own private in-memory database,
    /// so a shared-cache URI with a unique name keeps different pools isolated.
    /// Shared-cache connections take table-level locks that SQLite reports as
    /// `SQLITE_LOCKED` without honouring `busy_timeout`, so the pool holds a
    /// single connection and callers queue for it instead. That connection is
    /// never recycled, since the database lives only as long as it does.
    pub fn in_memory(config: PoolConfig) -> Result<Self> {
        let db_id = MEMORY_DB_COUNTER.fetch_add(1, Ordering::SeqCst);
        let uri = format!("file:archivo-memdb{}?mode=memory&cache=shared", db_id);
        let manager = SqliteConnectionManager::file(&uri);
        let initializer = MemoryConnectionInitializer {
            busy_timeout: config.busy_timeout,
        };
        let pool = Pool::builder()
            .max_size(1)
            .min_idle(Some(1))
            .idle_timeout(None)
            .max_lifetime(None)
            .connection_timeout(config.connection_timeout)
            .connection_customizer(Box::new(initializer))
            .build(manager)
            .map_err(|e| {
                Error::Initialization(format!("Failed to create connection pool: {}", e))
            })?;

        Ok(Self { pool })
    }

    /// Build the pool from a manager with the given configuration and initializer
    fn build_pool_with_initializer<I>(
        manager: SqliteConnectionManager,
        config: PoolConfig,
        initializer: Box<I>,
    ) -> Result<Self>
    where
        I: r2d2::CustomizeConnection<Connection, rusqlite::Error> + 'static,
    {
        let mut builder = Pool::builder()
            .max_size(config.max_size)
            .connection_timeout(config.connection_timeout)
            .connection_customizer(initializer);

        if let Some(min_idle) = config.min_idle {
            builder = builder.min_idle(Some(min_idle));
        }

        let pool = builder.build(manager).map_err(|e| {
            Error::Initialization(format!("Failed to create connection pool: {}", e))
        })?;

        Ok(Self { pool })
    }

    /// Get a connection from the pool
    pub fn get(&self) -> Result<PooledSqlite> {
        self.pool
            .get()
            .map_err(|e| Error::Storage(format!("Failed to get connection from pool: {}", e)))
    }
}
