pub mod database;

pub use database::{
    Database, OutputRecord, PhaseRecord, PoolConfig, SessionRecord, SessionSnapshot,
    SharedDatabase,
};

use std::sync::Arc;
use tracing::debug;

use crate::config::StorageConfig;
use crate::types::Result;

/// Open the session store when enabled
pub fn open_store(config: &StorageConfig) -> Result<Option<SharedDatabase>> {
    if !config.enabled {
        debug!("Session store disabled");
        return Ok(None);
    }
    let db = Database::open(&config.database_path)?;
    Ok(Some(Arc::new(db)))
}
