//! Book entity and its borrow/return lifecycle.
//!
//! A `Book` is always valid: construction checks every field, and the
//! borrow state (`available`, `borrowed_by`, `due_date`) only changes
//! through [`Book::borrow`], [`Book::borrow_until`] and [`Book::return_book`].
//! Deserialization goes through the same checks.

use crate::{Error, Result};
use chrono::{DateTime, Datelike, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Default loan period in days
pub const DEFAULT_LOAN_DAYS: u32 = 14;

/// Minimum accepted ISBN length (ISBN-10 without separators)
pub const MIN_ISBN_LEN: usize = 10;

/// Earliest accepted publication year
pub const MIN_YEAR: i32 = 1000;

/// A book in the catalog, keyed by ISBN
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BookRecord")]
pub struct Book {
    isbn: String,
    title: String,
    author: String,
    year: i32,
    available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    borrowed_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    due_date: Option<DateTime<Utc>>,
}

/// Raw on-disk shape, validated into a `Book`
#[derive(Deserialize)]
struct BookRecord {
    isbn: String,
    title: String,
    author: String,
    year: i32,
    #[serde(default = "default_available")]
    available: bool,
    #[serde(default)]
    borrowed_by: Option<String>,
    #[serde(default)]
    due_date: Option<DateTime<Utc>>,
}

fn default_available() -> bool {
    true
}

impl TryFrom<BookRecord> for Book {
    type Error = Error;

    fn try_from(record: BookRecord) -> Result<Self> {
        let mut book = Book::new(record.isbn, record.title, record.author, record.year)?;

        match (record.available, record.borrowed_by, record.due_date) {
            (true, None, None) => {}
            (false, Some(member_id), Some(due_date)) => book.borrow_until(member_id, due_date)?,
            (available, borrowed_by, due_date) => {
                return Err(Error::InvalidInput(format!(
                    "Book {} has inconsistent borrow state (available={}, borrowed_by={:?}, due_date={:?})",
                    book.isbn, available, borrowed_by, due_date
                )));
            }
        }

        Ok(book)
    }
}

impl Book {
    /// Create an available book, validating every field
    pub fn new(
        isbn: impl Into<String>,
        title: impl Into<String>,
        author: impl Into<String>,
        year: i32,
    ) -> Result<Self> {
        let isbn = isbn.into();
        let title = title.into();
        let author = author.into();

        if isbn.chars().count() < MIN_ISBN_LEN {
            return Err(Error::InvalidInput(format!(
                "ISBN must contain at least {} characters, got {:?}",
                MIN_ISBN_LEN, isbn
            )));
        }
        if title.is_empty() {
            return Err(Error::InvalidInput("Title must not be empty".into()));
        }
        if author.is_empty() {
            return Err(Error::InvalidInput("Author must not be empty".into()));
        }

        let current_year = Utc::now().year();
        if !(MIN_YEAR..=current_year).contains(&year) {
            return Err(Error::InvalidInput(format!(
                "Year must be between {} and {}, got {}",
                MIN_YEAR, current_year, year
            )));
        }

        Ok(Self {
            isbn,
            title,
            author,
            year,
            available: true,
            borrowed_by: None,
            due_date: None,
        })
    }

    pub fn isbn(&self) -> &str {
        &self.isbn
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    /// Member currently holding the book, if any
    pub fn borrowed_by(&self) -> Option<&str> {
        self.borrowed_by.as_deref()
    }

    pub fn due_date(&self) -> Option<DateTime<Utc>> {
        self.due_date
    }

    /// Lend the book for `days` days starting now
    ///
    /// A loan period that pushes the due date past the representable
    /// calendar range is `InvalidInput`.
    pub fn borrow(&mut self, member_id: impl Into<String>, days: u32) -> Result<()> {
        let due_date = Duration::try_days(i64::from(days))
            .and_then(|period| Utc::now().checked_add_signed(period))
            .ok_or_else(|| {
                Error::InvalidInput(format!("Loan period of {} days is out of range", days))
            })?;
        self.borrow_until(member_id, due_date)
    }

    /// Lend the book with an explicit due date
    pub fn borrow_until(
        &mut self,
        member_id: impl Into<String>,
        due_date: DateTime<Utc>,
    ) -> Result<()> {
        if !self.available {
            return Err(Error::IllegalState(format!(
                "Book {} is already borrowed",
                self.isbn
            )));
        }

        self.available = false;
        self.borrowed_by = Some(member_id.into());
        self.due_date = Some(due_date);
        Ok(())
    }

    /// Put the book back on the shelf
    pub fn return_book(&mut self) -> Result<()> {
        if self.available {
            return Err(Error::IllegalState(format!(
                "Book {} was not borrowed",
                self.isbn
            )));
        }

        self.available = true;
        self.borrowed_by = None;
        self.due_date = None;
        Ok(())
    }

    pub fn is_overdue(&self) -> bool {
        self.is_overdue_at(Utc::now())
    }

    /// Overdue check against a caller-supplied clock
    pub fn is_overdue_at(&self, now: DateTime<Utc>) -> bool {
        self.due_date.is_some_and(|due| now > due)
    }
}
