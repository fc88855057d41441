//! Core domain models and business logic for schema synchronization

pub mod config;
pub mod ddl;
#[cfg(feature = "postgres")]
pub mod db;
pub mod engine;
pub mod executor;
mod locks;
pub mod registry;
pub mod relations;
mod schema;
pub mod store;
pub mod validation;

pub use ddl::{DdlError, DdlGenerator};
pub use engine::{EngineError, SchemaEngine};
pub use executor::{DdlExecutor, DryRunExecutor, ExecutorError};
#[cfg(feature = "postgres")]
pub use executor::PooledDdlExecutor;
pub use locks::ProjectLocks;
pub use registry::{
    DdlPreview, RegistryError, StatementKind, SyncError, SyncOutcome, SyncReport, TableRegistry,
};
pub use relations::{LookupError, RelationError, RelationGraphManager, TableLookup};
pub use schema::*;
pub use store::{
    InMemoryRelationStore, InMemoryTableDesignStore, RelationStore, StoreError, TableDesignStore,
};
pub use validation::{SchemaValidator, ValidationError, ValidationLevel};
