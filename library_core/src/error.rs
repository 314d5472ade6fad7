//! Error types for the library_core crate.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Which keyed collection an error refers to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Entity {
    Book,
    Member,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Book => f.write_str("Book with ISBN"),
            Entity::Member => f.write_str("Member with ID"),
        }
    }
}

/// Core error type for catalog operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A field failed validation at construction time
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Unknown ISBN or member id
    #[error("{entity} {key} not found")]
    NotFound { entity: Entity, key: String },

    /// The key is already registered
    #[error("{entity} {key} already exists")]
    DuplicateKey { entity: Entity, key: String },

    /// Borrow attempted on a book that is already out
    #[error("Book with ISBN {0} is not available for borrowing")]
    Unavailable(String),

    /// Borrow attempted past the member's capacity
    #[error("Member {member_id} has reached the borrowing limit of {limit} books")]
    LimitExceeded { member_id: String, limit: usize },

    /// Borrow or return called out of sequence
    #[error("Illegal state: {0}")]
    IllegalState(String),

    /// Return attempted by someone other than the current borrower
    #[error("Book with ISBN {isbn} is not borrowed by member {member_id}")]
    BorrowerMismatch { isbn: String, member_id: String },

    /// A durable store could not be decoded
    #[error("Corrupt data in {path:?}: {source}")]
    CorruptData {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization error on write
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn book_not_found(isbn: &str) -> Self {
        Error::NotFound {
            entity: Entity::Book,
            key: isbn.to_string(),
        }
    }

    pub(crate) fn member_not_found(member_id: &str) -> Self {
        Error::NotFound {
            entity: Entity::Member,
            key: member_id.to_string(),
        }
    }
}
