//! Database module for the metadata store and target databases
//!
//! This module provides PostgreSQL persistence for table designs and
//! relations, plus the connection pools generated DDL is executed on.

pub mod models;
pub mod pool;
pub mod repositories;

// Re-export commonly used items
pub use models::*;
pub use pool::{
    DatabaseConfig, DbConfig, DbError, PoolError, PoolRegistry, create_pool,
    create_pool_with_migrations, health_check, run_migrations,
};
pub use repositories::{TableDesignRepository, TableRelationRepository};

// Re-export sqlx types that might be needed
pub use sqlx::PgPool;
