//! Database repositories
//!
//! PostgreSQL implementations of the store traits the registry and the
//! relation manager depend on.

pub mod table_design;
pub mod table_relation;

pub use table_design::TableDesignRepository;
pub use table_relation::TableRelationRepository;
