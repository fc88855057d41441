//! Per-project async locks
//!
//! Check-then-write sequences (duplicate code check before insert, cycle check
//! before persisting an edge) hold the project's lock for their whole span.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// Lazily created mutex per project id
#[derive(Clone, Default)]
pub struct ProjectLocks {
    locks: Arc<DashMap<Uuid, Arc<Mutex<()>>>>,
}

impl ProjectLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `project_id`
    pub async fn lock(&self, project_id: Uuid) -> OwnedMutexGuard<()> {
        let mutex = self.locks.entry(project_id).or_default().clone();
        mutex.lock_owned().await
    }

    /// Number of projects that have been locked at least once
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
