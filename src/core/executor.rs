//! Execution of generated DDL against a target database

use async_trait::async_trait;
use tokio::sync::Mutex;

/// DDL execution errors
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("Statement rejected: {0}")]
    Rejected(String),

    #[cfg(feature = "postgres")]
    #[error("Target database unavailable: {0}")]
    Pool(#[from] crate::core::db::PoolError),

    #[cfg(feature = "postgres")]
    #[error("Statement failed: {0}")]
    Database(#[from] sqlx::Error),
}

/// Runs a DDL script; one call may carry several `;`-terminated statements
#[async_trait]
pub trait DdlExecutor: Send + Sync {
    async fn execute(&self, ddl: &str) -> Result<(), ExecutorError>;
}

/// Executor that only logs and records what it was asked to run
#[derive(Default)]
pub struct DryRunExecutor {
    executed: Mutex<Vec<String>>,
}

impl DryRunExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts received so far, oldest first
    pub async fn executed(&self) -> Vec<String> {
        self.executed.lock().await.clone()
    }
}

#[async_trait]
impl DdlExecutor for DryRunExecutor {
    async fn execute(&self, ddl: &str) -> Result<(), ExecutorError> {
        tracing::info!(ddl = %ddl, "Dry run, statement not executed");
        self.executed.lock().await.push(ddl.to_string());
        Ok(())
    }
}

#[cfg(feature = "postgres")]
pub use pooled::PooledDdlExecutor;

#[cfg(feature = "postgres")]
mod pooled {
    use std::sync::Arc;

    use async_trait::async_trait;
    use uuid::Uuid;

    use super::{DdlExecutor, ExecutorError};
    use crate::core::db::PoolRegistry;

    /// Executes DDL on the pool registered under `database_id`
    #[derive(Clone)]
    pub struct PooledDdlExecutor {
        registry: Arc<PoolRegistry>,
        database_id: Uuid,
    }

    impl PooledDdlExecutor {
        pub fn new(registry: Arc<PoolRegistry>, database_id: Uuid) -> Self {
            Self {
                registry,
                database_id,
            }
        }
    }

    #[async_trait]
    impl DdlExecutor for PooledDdlExecutor {
        async fn execute(&self, ddl: &str) -> Result<(), ExecutorError> {
            let pool = self.registry.get(self.database_id)?;
            sqlx::raw_sql(ddl).execute(&pool).await?;
            tracing::debug!(database_id = %self.database_id, "DDL executed");
            Ok(())
        }
    }
}
