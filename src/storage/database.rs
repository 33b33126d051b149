//! Session Store with Connection Pooling
//!
//! SQLite persistence for research sessions featuring:
//! - Connection pooling via r2d2 for concurrent sessions
//! - Panic-safe transactions with automatic rollback
//! - Version-tracked migrations
//! - WAL mode for concurrent readers during writes

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;

use crate::research::types::{ReportArtifact, ResearchSession, SessionStatus};
use crate::types::{ResearchError, Result, ResultExt};

/// Shared database handle for async contexts.
pub type SharedDatabase = Arc<Database>;

const SCHEMA: &str = include_str!("schema.sql");

/// Current schema version for migration tracking
const SCHEMA_VERSION: u32 = 1;

/// Schema change applied to databases older than `version`
#[allow(dead_code)]
struct Migration {
    version: u32,
    description: &'static str,
    up: &'static str,
}

const MIGRATIONS: &[Migration] = &[];

/// Connection pool configuration
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_size: u32,
    pub min_idle: u32,
    /// Timeout for acquiring a connection (seconds)
    pub connection_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        let cores = std::thread::available_parallelism()
            .map(|p| p.get() as u32)
            .unwrap_or(4);
        let max_size = (cores * 2).clamp(4, 16);
        Self {
            max_size,
            min_idle: 1,
            connection_timeout_secs: 30,
        }
    }
}

// =============================================================================
// Records
// =============================================================================

/// Stored view of a session
#[derive(Debug, Clone, Serialize)]
pub struct SessionRecord {
    pub session_id: String,
    pub query: String,
    pub status: SessionStatus,
    pub output_dir: String,
    pub created_at: String,
    pub updated_at: String,
    pub completed_at: Option<String>,
    pub error: Option<String>,
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PhaseRecord {
    pub phase: String,
    pub status: String,
    pub duration_ms: u64,
    pub error: Option<String>,
    pub recorded_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutputRecord {
    pub output_type: String,
    pub file_path: String,
    pub file_size: u64,
    pub file_hash: String,
    pub word_count: usize,
    pub section_count: usize,
    pub template: String,
    pub created_at: String,
}

/// Session plus its phase history and outputs
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    #[serde(flatten)]
    pub session: SessionRecord,
    pub phases: Vec<PhaseRecord>,
    pub outputs: Vec<OutputRecord>,
}

type SessionRow = (
    String,
    String,
    String,
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
);

// =============================================================================
// Database
// =============================================================================

/// Thread-safe database with connection pooling.
pub struct Database {
    pool: Pool<SqliteConnectionManager>,
}

impl Database {
    /// Open (creating parent directories) and initialize the store.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_config(path, PoolConfig::default())
    }

    pub fn open_with_config<P: AsRef<Path>>(path: P, config: PoolConfig) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context_fn(|| format!("Failed to create {}", parent.display()))?;
        }

        let manager = SqliteConnectionManager::file(path).with_init(Self::configure_connection);

        let pool = Pool::builder()
            .max_size(config.max_size)
            .min_idle(Some(config.min_idle))
            .connection_timeout(std::time::Duration::from_secs(
                config.connection_timeout_secs,
            ))
            .build(manager)
            .map_err(|e| {
                ResearchError::Storage(format!("Failed to create connection pool: {}", e))
            })?;

        let db = Self { pool };
        db.initialize()?;
        Ok(db)
    }

    /// Open an in-memory database for testing or store-less runs.
    pub fn open_in_memory() -> Result<Self> {
        let manager = SqliteConnectionManager::memory().with_init(|conn| {
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
            Ok(())
        });

        // A second connection would see a different in-memory database
        let pool = Pool::builder().max_size(1).build(manager).map_err(|e| {
            ResearchError::Storage(format!("Failed to create in-memory pool: {}", e))
        })?;

        let db = Self { pool };
        db.initialize()?;
        Ok(db)
    }

    fn configure_connection(conn: &mut Connection) -> std::result::Result<(), rusqlite::Error> {
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA busy_timeout = 5000;
            "#,
        )?;
        Ok(())
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>> {
        self.pool.get().map_err(|e| {
            ResearchError::Storage(format!("Failed to acquire database connection: {}", e))
        })
    }

    /// Apply the schema to a fresh database or migrate an older one.
    fn initialize(&self) -> Result<()> {
        let conn = self.conn()?;
        let current_version: u32 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap_or(0);

        if current_version == 0 {
            conn.execute_batch(SCHEMA)
                .with_context("Failed to initialize database schema")?;
            conn.pragma_update(None, "user_version", SCHEMA_VERSION)
                .with_context("Failed to set schema version")?;
            return Ok(());
        }

        for migration in MIGRATIONS {
            if migration.version > current_version {
                conn.execute_batch(migration.up).with_context_fn(|| {
                    format!(
                        "Failed to apply migration {}: {}",
                        migration.version, migration.description
                    )
                })?;
                tracing::info!(
                    "Applied migration {}: {}",
                    migration.version,
                    migration.description
                );
            }
        }

        if current_version < SCHEMA_VERSION {
            conn.pragma_update(None, "user_version", SCHEMA_VERSION)
                .with_context("Failed to update schema version")?;
        }

        Ok(())
    }

    /// Execute a function within a panic-safe database transaction.
    ///
    /// If the closure errors or panics the transaction is rolled back on drop.
    pub fn transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction()
            .with_context("Failed to start transaction")?;

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| f(&tx)));

        match result {
            Ok(Ok(value)) => {
                tx.commit().with_context("Failed to commit transaction")?;
                Ok(value)
            }
            Ok(Err(e)) => Err(e),
            Err(panic_payload) => {
                let panic_msg = panic_payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic_payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "Unknown panic".to_string());

                tracing::error!("Transaction panicked: {}", panic_msg);
                Err(ResearchError::Storage(format!(
                    "Transaction panicked: {}",
                    panic_msg
                )))
            }
        }
    }

    // =========================================================================
    // Sessions
    // =========================================================================

    pub fn insert_session(&self, session: &ResearchSession) -> Result<()> {
        let created = session.created_at.to_rfc3339();
        self.conn()?
            .execute(
                "INSERT INTO research_sessions
                 (session_id, query, status, output_directory, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                params![
                    session.session_id.as_str(),
                    session.query,
                    session.status.as_str(),
                    session.output_dir.display().to_string(),
                    created,
                ],
            )
            .with_context("Failed to insert research session")?;
        Ok(())
    }

    /// Move an active session to a terminal status.
    ///
    /// Returns `false` when no active row matched (unknown or already terminal).
    pub fn finish_session(
        &self,
        session_id: &str,
        status: SessionStatus,
        completed_at: DateTime<Utc>,
        error: Option<&str>,
        summary: Option<&str>,
    ) -> Result<bool> {
        let completed = completed_at.to_rfc3339();
        let changed = self
            .conn()?
            .execute(
                "UPDATE research_sessions
                 SET status = ?1, completed_at = ?2, updated_at = ?2,
                     error_message = ?3, summary = ?4
                 WHERE session_id = ?5 AND status = 'active'",
                params![status.as_str(), completed, error, summary, session_id],
            )
            .with_context("Failed to update research session")?;
        Ok(changed == 1)
    }

    pub fn record_phase(
        &self,
        session_id: &str,
        phase: &str,
        succeeded: bool,
        duration_ms: u64,
        error: Option<&str>,
    ) -> Result<()> {
        self.conn()?
            .execute(
                "INSERT INTO phase_executions
                 (session_id, phase, status, duration_ms, error_message, recorded_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    session_id,
                    phase,
                    if succeeded { "completed" } else { "failed" },
                    duration_ms as i64,
                    error,
                    Utc::now().to_rfc3339(),
                ],
            )
            .with_context("Failed to record phase execution")?;
        Ok(())
    }

    /// Complete a session and record its report in one transaction.
    pub fn complete_with_output(
        &self,
        session_id: &str,
        completed_at: DateTime<Utc>,
        summary: &str,
        report: &ReportArtifact,
    ) -> Result<bool> {
        let completed = completed_at.to_rfc3339();
        self.transaction(|conn| {
            let changed = conn.execute(
                "UPDATE research_sessions
                 SET status = 'completed', completed_at = ?1, updated_at = ?1, summary = ?2
                 WHERE session_id = ?3 AND status = 'active'",
                params![completed, summary, session_id],
            )?;
            if changed == 0 {
                return Ok(false);
            }
            conn.execute(
                "INSERT INTO research_outputs
                 (session_id, output_type, file_path, file_size, file_hash,
                  word_count, section_count, template, created_at)
                 VALUES (?1, 'report', ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    session_id,
                    report.path.display().to_string(),
                    report.size_bytes as i64,
                    report.content_hash,
                    report.word_count as i64,
                    report.section_count as i64,
                    report.template.as_str(),
                    completed,
                ],
            )?;
            Ok(true)
        })
    }

    pub fn get_session(&self, session_id: &str) -> Result<Option<SessionRecord>> {
        let conn = self.conn()?;
        let row: Option<SessionRow> = conn
            .query_row(
                "SELECT session_id, query, status, output_directory, created_at, updated_at,
                        completed_at, error_message, summary
                 FROM research_sessions WHERE session_id = ?1",
                params![session_id],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                        row.get(6)?,
                        row.get(7)?,
                        row.get(8)?,
                    ))
                },
            )
            .optional()
            .with_context("Failed to load research session")?;

        row.map(Self::session_from_row).transpose()
    }

    /// Full snapshot for the status endpoint
    pub fn session_snapshot(&self, session_id: &str) -> Result<Option<SessionSnapshot>> {
        let Some(session) = self.get_session(session_id)? else {
            return Ok(None);
        };

        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT phase, status, duration_ms, error_message, recorded_at
             FROM phase_executions WHERE session_id = ?1 ORDER BY id",
        )?;
        let phases = stmt
            .query_map(params![session_id], |row| {
                Ok(PhaseRecord {
                    phase: row.get(0)?,
                    status: row.get(1)?,
                    duration_ms: row.get::<_, i64>(2)? as u64,
                    error: row.get(3)?,
                    recorded_at: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut stmt = conn.prepare(
            "SELECT output_type, file_path, file_size, file_hash, word_count, section_count,
                    template, created_at
             FROM research_outputs WHERE session_id = ?1 ORDER BY id",
        )?;
        let outputs = stmt
            .query_map(params![session_id], |row| {
                Ok(OutputRecord {
                    output_type: row.get(0)?,
                    file_path: row.get(1)?,
                    file_size: row.get::<_, i64>(2)? as u64,
                    file_hash: row.get(3)?,
                    word_count: row.get::<_, i64>(4)? as usize,
                    section_count: row.get::<_, i64>(5)? as usize,
                    template: row.get(6)?,
                    created_at: row.get(7)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Some(SessionSnapshot {
            session,
            phases,
            outputs,
        }))
    }

    /// Most recent sessions first
    pub fn list_sessions(&self, limit: usize) -> Result<Vec<SessionRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT session_id, query, status, output_directory, created_at, updated_at,
                    completed_at, error_message, summary
             FROM research_sessions ORDER BY created_at DESC, id DESC LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                    row.get(7)?,
                    row.get(8)?,
                ))
            })?
            .collect::<std::result::Result<Vec<SessionRow>, _>>()?;

        rows.into_iter().map(Self::session_from_row).collect()
    }

    /// Session counts keyed by status
    pub fn status_counts(&self) -> Result<Vec<(String, u64)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT status, COUNT(*) FROM research_sessions GROUP BY status ORDER BY status",
        )?;
        let counts = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get::<_, i64>(1)? as u64)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(counts)
    }

    fn session_from_row(row: SessionRow) -> Result<SessionRecord> {
        let (session_id, query, status, output_dir, created_at, updated_at, completed_at, error, summary) =
            row;
        let status = status
            .parse::<SessionStatus>()
            .map_err(ResearchError::Storage)?;
        Ok(SessionRecord {
            session_id,
            query,
            status,
            output_dir,
            created_at,
            updated_at,
            completed_at,
            error,
            summary,
        })
    }
}
