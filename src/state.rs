use std::sync::Arc;

use sqlx::SqlitePool;

use crate::clock::Clock;
use crate::db::lock::SectionLocks;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub clock: Arc<dyn Clock>,
    pub locks: Arc<SectionLocks>,
}

impl AppState {
    pub fn new(db: SqlitePool, clock: Arc<dyn Clock>) -> Self {
        Self {
            db,
            clock,
            locks: Arc::new(SectionLocks::default()),
        }
    }
}
