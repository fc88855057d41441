//! Schemasync - Schema Synchronization Engine
//!
//! Keeps logical table designs and the relations between them, validates
//! them, and turns them into CREATE/ALTER DDL for the target database.

pub mod core;
