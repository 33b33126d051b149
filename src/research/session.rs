//! Session Manager
//!
//! Allocates session ids, prepares output directories and owns the
//! active → completed/failed lifecycle. When a session store is attached,
//! every transition is mirrored to SQLite.

use chrono::Utc;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::types::{ReportArtifact, ResearchSession, SessionStatus};
use crate::storage::{SessionRecord, SessionSnapshot, SharedDatabase};
use crate::types::{ResearchError, Result, SessionId};

#[derive(Clone, Default)]
pub struct SessionManager {
    store: Option<SharedDatabase>,
}

impl SessionManager {
    pub fn new(store: Option<SharedDatabase>) -> Self {
        Self { store }
    }

    pub fn has_store(&self) -> bool {
        self.store.is_some()
    }

    /// Start a new session.
    ///
    /// Creating `output_dir` is idempotent, so sessions may share a directory.
    pub async fn open_session(
        &self,
        query: &str,
        output_dir: impl AsRef<Path>,
    ) -> Result<ResearchSession> {
        let output_dir = output_dir.as_ref();
        tokio::fs::create_dir_all(output_dir).await.map_err(|e| {
            ResearchError::Storage(format!(
                "Failed to create output directory {}: {}",
                output_dir.display(),
                e
            ))
        })?;

        let session = ResearchSession {
            session_id: SessionId::generate(),
            query: query.to_string(),
            status: SessionStatus::Active,
            output_dir: output_dir.to_path_buf(),
            created_at: Utc::now(),
            completed_at: None,
            error: None,
        };

        if let Some(store) = &self.store {
            store.insert_session(&session)?;
        }

        info!(
            "Opened research session {} in {}",
            session.session_id,
            output_dir.display()
        );
        Ok(session)
    }

    /// Mark a session completed and record its report.
    ///
    /// The store is updated first; on error the session stays active.
    pub fn complete_session(
        &self,
        session: &mut ResearchSession,
        report: &ReportArtifact,
        summary: &str,
    ) -> Result<()> {
        Self::ensure_active(session, SessionStatus::Completed)?;
        let now = Utc::now();

        if let Some(store) = &self.store
            && !store.complete_with_output(session.session_id.as_str(), now, summary, report)?
        {
            warn!(
                "Session {} was not active in the store when completing",
                session.session_id
            );
        }

        session.status = SessionStatus::Completed;
        session.completed_at = Some(now);
        info!("Session {} completed", session.session_id);
        Ok(())
    }

    /// Mark a session failed, keeping the originating message.
    pub fn fail_session(&self, session: &mut ResearchSession, error: &str) -> Result<()> {
        Self::ensure_active(session, SessionStatus::Failed)?;
        let now = Utc::now();

        session.status = SessionStatus::Failed;
        session.completed_at = Some(now);
        session.error = Some(error.to_string());

        if let Some(store) = &self.store {
            store.finish_session(
                session.session_id.as_str(),
                SessionStatus::Failed,
                now,
                Some(error),
                None,
            )?;
        }

        warn!("Session {} failed: {}", session.session_id, error);
        Ok(())
    }

    /// Record a phase outcome; store errors are logged, not propagated.
    pub fn record_phase(
        &self,
        session: &ResearchSession,
        phase: &str,
        elapsed: Duration,
        error: Option<&str>,
    ) {
        debug!(
            "Session {} phase {} finished in {:?}",
            session.session_id, phase, elapsed
        );
        if let Some(store) = &self.store
            && let Err(e) = store.record_phase(
                session.session_id.as_str(),
                phase,
                error.is_none(),
                elapsed.as_millis() as u64,
                error,
            )
        {
            warn!("Failed to record phase {}: {}", phase, e);
        }
    }

    /// Stored snapshot of a session, if the store knows it
    pub fn snapshot(&self, session_id: &str) -> Result<Option<SessionSnapshot>> {
        match &self.store {
            Some(store) => store.session_snapshot(session_id),
            None => Ok(None),
        }
    }

    pub fn recent(&self, limit: usize) -> Result<Vec<SessionRecord>> {
        match &self.store {
            Some(store) => store.list_sessions(limit),
            None => Ok(Vec::new()),
        }
    }

    /// Stored session counts per status
    pub fn counts(&self) -> Result<Vec<(String, u64)>> {
        match &self.store {
            Some(store) => store.status_counts(),
            None => Ok(Vec::new()),
        }
    }

    fn ensure_active(session: &ResearchSession, to: SessionStatus) -> Result<()> {
        if session.status.is_terminal() {
            return Err(ResearchError::InvalidTransition {
                session_id: session.session_id.to_string(),
                from: session.status.to_string(),
                to: to.to_string(),
            });
        }
        Ok(())
    }
}
