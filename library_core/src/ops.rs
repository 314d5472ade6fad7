//! Cross-cutting wrappers applied around catalog operations.
//!
//! These carry no domain logic. [`logged`] and [`timed`] decorate a closure
//! with tracing output; the `require_*` checks reject unusable keys before
//! the wrapped operation touches any state.

use crate::book::MIN_ISBN_LEN;
use crate::{Error, Result};
use std::fmt::{Debug, Display};
use std::time::{Duration, Instant};

/// Run `f`, logging the call and its outcome
///
/// Errors are logged and returned unchanged.
pub fn logged<T, E, F>(operation: &str, args: impl Debug, f: F) -> std::result::Result<T, E>
where
    F: FnOnce() -> std::result::Result<T, E>,
    E: Display,
{
    tracing::info!("Calling '{}' with {:?}", operation, args);

    match f() {
        Ok(value) => {
            tracing::info!("'{}' completed", operation);
            Ok(value)
        }
        Err(e) => {
            tracing::error!("'{}' failed: {}", operation, e);
            Err(e)
        }
    }
}

/// Run `f` and report how long it took
pub fn timed<T, F>(operation: &str, f: F) -> (T, Duration)
where
    F: FnOnce() -> T,
{
    let start = Instant::now();
    let value = f();
    let elapsed = start.elapsed();

    tracing::info!(
        elapsed_ms = elapsed.as_secs_f64() * 1000.0,
        "'{}' took {:.4}s",
        operation,
        elapsed.as_secs_f64()
    );
    (value, elapsed)
}

/// Reject an ISBN argument that cannot identify a book
pub fn require_isbn(isbn: &str) -> Result<()> {
    if isbn.chars().count() < MIN_ISBN_LEN {
        return Err(Error::InvalidInput(format!(
            "ISBN must contain at least {} characters, got {:?}",
            MIN_ISBN_LEN, isbn
        )));
    }
    Ok(())
}

/// Reject an empty member id argument
pub fn require_member_id(member_id: &str) -> Result<()> {
    if member_id.is_empty() {
        return Err(Error::InvalidInput("member_id is required".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logged_passes_errors_through() {
        crate::logging::init_test();

        let result: Result<()> = logged("failing", "M001", || {
            Err(Error::Unavailable("1234567890".into()))
        });
        match result {
            Err(Error::Unavailable(isbn)) => assert_eq!(isbn, "1234567890"),
            other => panic!("Expected Unavailable, got {:?}", other),
        }

        let ok: Result<i32> = logged("succeeding", (), || Ok(7));
        assert_eq!(ok.unwrap(), 7);
    }

    #[test]
    fn test_timed_returns_value() {
        let (value, elapsed) = timed("sum", || (1..=10).sum::<i32>());
        assert_eq!(value, 55);
        assert!(elapsed < Duration::from_secs(5));
    }

    #[test]
    fn test_require_isbn() {
        assert!(require_isbn("978-0132350884").is_ok());
        assert!(matches!(require_isbn("12345"), Err(Error::InvalidInput(_))));
        assert!(matches!(require_isbn(""), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_require_member_id() {
        assert!(require_member_id("M001").is_ok());
        assert!(matches!(require_member_id(""), Err(Error::InvalidInput(_))));
    }
}
