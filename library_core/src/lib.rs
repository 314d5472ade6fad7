#![forbid(unsafe_code)]

//! Core domain model and persistence for a small library catalog.
//!
//! This crate provides:
//! - Book and member entities with validated construction
//! - The `Library` catalog (lending, search, statistics)
//! - A JSON file store for both collections
//! - Snapshot/rollback transactions
//! - Logging, timing and argument checks around catalog operations

pub mod error;
pub mod book;
pub mod member;
pub mod ops;
pub mod store;
pub mod catalog;
pub mod transaction;
pub mod config;
pub mod logging;

// Re-export commonly used types
pub use error::{Entity, Error, Result};
pub use book::{Book, DEFAULT_LOAN_DAYS};
pub use member::{Member, DEFAULT_MAX_BOOKS};
pub use store::Store;
pub use catalog::{Library, Statistics};
pub use transaction::{Transaction, TransactionState};
pub use config::Config;
