use std::sync::Arc;

use dashmap::DashMap;
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use crate::error::AppError;

/// Per-section exclusive locks. Contention is scoped to one section; leases on
/// different sections proceed in parallel.
///
/// Entries are never evicted. The registry holds at most one mutex per section
/// that has ever been leased, and each entry is reused on every later lease.
#[derive(Default)]
pub struct SectionLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl SectionLocks {
    /// Waits for exclusive access to `section_id`, then opens a transaction whose
    /// first statement writes the section row so the database write lock is held
    /// from the start.
    ///
    /// Dropping the lease without calling [`SectionLease::commit`] rolls the
    /// transaction back and releases the lock.
    pub async fn lease(&self, db: &SqlitePool, section_id: &str) -> Result<SectionLease, AppError> {
        let lock = Arc::clone(self.locks.entry(section_id.to_string()).or_default().value());
        let guard = lock.lock_owned().await;
        debug!(section_id, "section lock acquired");

        let mut tx = db.begin().await?;
        let touched = sqlx::query("UPDATE sections SET capacity = capacity WHERE id = ?1")
            .bind(section_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if touched == 0 {
            return Err(AppError::NotFound("section"));
        }

        Ok(SectionLease {
            tx,
            _guard: guard,
        })
    }
}

/// A transaction plus exclusive ownership of one section's capacity.
pub struct SectionLease {
    tx: Transaction<'static, Sqlite>,
    _guard: OwnedMutexGuard<()>,
}

impl SectionLease {
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut *self.tx
    }

    pub async fn commit(self) -> Result<(), AppError> {
        self.tx.commit().await?;
        Ok(())
    }
}
