//! SQLite page store with FTS5 full-text search
//!
//! Pages live in two tables: `pages` holds identity and metadata, the FTS5
//! virtual table `fts` holds the indexed body keyed by `pageid`. Both rows are
//! written in one transaction.

use crate::pool::{ConnectionPool, PoolConfig, PooledSqlite};
use crate::snippet::{CLOSE_MARKER, CONTEXT_TOKENS, ELLIPSIS, OPEN_MARKER};
use crate::store::PageStore;
use archivo_core::{Context, Error, Page, PageId, Result, StoreStats};
use parking_lot::RwLock;
use rusqlite::{params, Connection, Transaction, TransactionBehavior};
use std::os::raw::c_int;
use std::path::Path;
use tracing::{debug, info, warn};

/// VM instructions between cancellation checks while a statement runs
const PROGRESS_INTERVAL: c_int = 1000;

/// SQLite-backed [`PageStore`] with connection pooling
pub struct SqliteStore {
    pool: RwLock<Option<ConnectionPool>>,
}

impl SqliteStore {
    /// Open or create an archive at the given path
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_config(path, PoolConfig::default())
    }

    /// Open or create an archive with custom pool configuration
    pub fn open_with_config(path: &Path, config: PoolConfig) -> Result<Self> {
        let pool = ConnectionPool::new(path, config)?;
        let store = Self::from_pool(pool)?;
        info!("Opened page store at {}", path.display());
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> Result<Self> {
        Self::in_memory_with_config(PoolConfig::for_testing())
    }

    /// Create an in-memory store with custom pool configuration
    pub fn in_memory_with_config(config: PoolConfig) -> Result<Self> {
        let pool = ConnectionPool::in_memory(config)?;
        Self::from_pool(pool)
    }

    /// Create the schema on a fresh pool. On failure the pool, and every
    /// connection it opened, is dropped before returning.
    fn from_pool(pool: ConnectionPool) -> Result<Self> {
        initialize_schema(&pool)?;
        Ok(Self {
            pool: RwLock::new(Some(pool)),
        })
    }

    pub fn is_closed(&self) -> bool {
        self.pool.read().is_none()
    }

    /// Execute a closure with a raw connection from the pool
    #[cfg(test)]
    fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.acquire(&Context::background())?;
        f(&conn)
    }

    fn acquire(&self, ctx: &Context) -> Result<PooledSqlite> {
        let guard = self.pool.read();
        let pool = guard.as_ref().ok_or(Error::Closed)?;
        ctx.check()?;
        pool.get()
    }

    /// Run `f` on a pooled connection while `ctx` is watched.
    ///
    /// A progress handler interrupts the running statement once the context is
    /// done; any failure observed after that point is reported as cancellation.
    fn run<F, T>(&self, ctx: &Context, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self.acquire(ctx)?;

        let watched = ctx.clone();
        conn.progress_handler(PROGRESS_INTERVAL, Some(move || watched.is_done()));
        let result = f(&mut *conn);
        clear_progress_handler(&conn);

        match result {
            Err(err) if ctx.is_done() => {
                debug!("Operation aborted by context: {}", err);
                ctx.check()?;
                Err(err)
            }
            other => other,
        }
    }
}

impl PageStore for SqliteStore {
    fn save(&self, ctx: &Context, page: &Page) -> Result<PageId> {
        self.run(ctx, |conn| {
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(|e| Error::Storage(format!("Failed to begin transaction: {}", e)))?;

            let result = insert_page(&tx, ctx, page).and_then(|id| ctx.check().map(|_| id));

            // Commit and rollback must run to completion once decided
            clear_progress_handler(&tx);

            match result {
                Ok(id) => {
                    tx.commit()
                        .map_err(|e| Error::Storage(format!("Failed to commit transaction: {}", e)))?;
                    debug!("Saved page {} ({})", id, page.url);
                    Ok(id)
                }
                Err(e) => {
                    if let Err(rollback_err) = tx.rollback() {
                        warn!("Rollback after failed save also failed: {}", rollback_err);
                    }
                    Err(e)
                }
            }
        })
    }

    fn get(&self, ctx: &Context, id: PageId) -> Result<Page> {
        self.run(ctx, |conn| {
            conn.query_row(
                r#"
                SELECT pages.url, pages.title, fts.content
                FROM pages
                JOIN fts ON pages.id = fts.pageid
                WHERE pages.id = ?1
                "#,
                params![id],
                |row| {
                    Ok(Page {
                        id,
                        url: row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                        title: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                        html_content: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    })
                },
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Error::NotFound(format!("page {}", id)),
                e => Error::Storage(format!("Failed to get page {}: {}", id, e)),
            })
        })
    }

    fn search(&self, ctx: &Context, query: &str) -> Result<Vec<Page>> {
        self.run(ctx, |conn| {
            if query.trim().is_empty() {
                return Err(Error::QuerySyntax("empty query".into()));
            }

            let mut stmt = conn
                .prepare(
                    r#"
                    SELECT pages.id, pages.url, pages.title,
                           snippet(fts, -1, ?2, ?3, ?4, ?5)
                    FROM fts
                    JOIN pages ON pages.id = fts.pageid
                    WHERE fts MATCH ?1
                    ORDER BY fts.rank
                    "#,
                )
                .map_err(|e| Error::Storage(format!("Failed to prepare query: {}", e)))?;

            let rows = stmt
                .query_map(
                    params![
                        query,
                        OPEN_MARKER,
                        CLOSE_MARKER,
                        ELLIPSIS,
                        CONTEXT_TOKENS as i64
                    ],
                    |row| {
                        Ok(Page {
                            id: row.get(0)?,
                            url: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                            title: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                            html_content: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                        })
                    },
                )
                .map_err(search_error)?;

            let mut results = Vec::new();
            for row in rows {
                results.push(row.map_err(search_error)?);
            }

            debug!("Search {:?} matched {} pages", query, results.len());
            Ok(results)
        })
    }

    fn stats(&self, ctx: &Context) -> Result<StoreStats> {
        self.run(ctx, |conn| {
            let (page_count, index_count): (i64, i64) = conn
                .query_row(
                    "SELECT (SELECT COUNT(*) FROM pages), (SELECT COUNT(*) FROM fts)",
                    [],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .map_err(|e| Error::Storage(format!("Failed to count pages: {}", e)))?;

            Ok(StoreStats {
                page_count: page_count as u64,
                index_count: index_count as u64,
            })
        })
    }

    fn close(&self) -> Result<()> {
        match self.pool.write().take() {
            Some(pool) => {
                drop(pool);
                info!("Page store closed");
            }
            None => debug!("Page store already closed"),
        }
        Ok(())
    }
}

/// Insert the page row, then its index entry keyed by the new id
fn insert_page(tx: &Transaction<'_>, ctx: &Context, page: &Page) -> Result<PageId> {
    tx.execute(
        "INSERT INTO pages (url, title) VALUES (?1, ?2)",
        params![page.url, page.title],
    )
    .map_err(|e| Error::Storage(format!("Failed to insert page: {}", e)))?;
    let id = tx.last_insert_rowid();

    ctx.check()?;

    tx.execute(
        "INSERT INTO fts (pageid, content) VALUES (?1, ?2)",
        params![id, page.html_content],
    )
    .map_err(|e| Error::Storage(format!("Failed to index page {}: {}", id, e)))?;

    Ok(id)
}

fn initialize_schema(pool: &ConnectionPool) -> Result<()> {
    let conn = pool
        .get()
        .map_err(|e| Error::Initialization(e.to_string()))?;
    conn.execute_batch(SCHEMA)
        .map_err(|e| Error::Initialization(format!("Failed to initialize schema: {}", e)))
}

fn clear_progress_handler(conn: &Connection) {
    conn.progress_handler(PROGRESS_INTERVAL, None::<fn() -> bool>);
}

/// Map a search failure, separating malformed queries from storage faults
fn search_error(err: rusqlite::Error) -> Error {
    if let rusqlite::Error::SqliteFailure(_, Some(msg)) = &err {
        if is_query_syntax_message(msg) {
            return Error::QuerySyntax(msg.clone());
        }
    }
    Error::Storage(format!("Failed to search pages: {}", err))
}

/// FTS5 reports query parse failures through these messages
fn is_query_syntax_message(msg: &str) -> bool {
    msg.starts_with("fts5:")
        || msg.contains("unterminated string")
        || msg.starts_with("no such column")
        || msg.starts_with("unknown special query")
}

/// Database schema
///
/// `pageid` is UNINDEXED so identities are never matched as search terms.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS pages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT,
    title TEXT
);

CREATE VIRTUAL TABLE IF NOT EXISTS fts USING fts5(pageid UNINDEXED, content);
"#;
