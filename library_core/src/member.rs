//! Library member entity.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Default number of books a member may hold at once
pub const DEFAULT_MAX_BOOKS: usize = 3;

/// A registered member, keyed by member id
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "MemberRecord")]
pub struct Member {
    member_id: String,
    name: String,
    email: String,
    borrowed_books: Vec<String>,
    max_books: usize,
}

#[derive(Deserialize)]
struct MemberRecord {
    member_id: String,
    name: String,
    email: String,
    #[serde(default)]
    borrowed_books: Vec<String>,
    #[serde(default = "default_max_books")]
    max_books: usize,
}

fn default_max_books() -> usize {
    DEFAULT_MAX_BOOKS
}

impl TryFrom<MemberRecord> for Member {
    type Error = Error;

    fn try_from(record: MemberRecord) -> Result<Self> {
        let mut member = Member::new(record.member_id, record.name, record.email)?
            .with_max_books(record.max_books);

        for isbn in record.borrowed_books {
            if member.has_borrowed(&isbn) {
                return Err(Error::InvalidInput(format!(
                    "Member {} lists ISBN {} twice",
                    member.member_id, isbn
                )));
            }
            member.borrowed_books.push(isbn);
        }

        Ok(member)
    }
}

impl Member {
    /// Create a member with no loans and the default capacity
    pub fn new(
        member_id: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
    ) -> Result<Self> {
        let member_id = member_id.into();
        let name = name.into();
        let email = email.into();

        if member_id.is_empty() {
            return Err(Error::InvalidInput("Member ID must not be empty".into()));
        }
        if name.is_empty() {
            return Err(Error::InvalidInput("Name must not be empty".into()));
        }
        if !email.contains('@') {
            return Err(Error::InvalidInput(format!(
                "Email must contain '@', got {:?}",
                email
            )));
        }

        Ok(Self {
            member_id,
            name,
            email,
            borrowed_books: Vec::new(),
            max_books: DEFAULT_MAX_BOOKS,
        })
    }

    /// Override the borrowing capacity
    pub fn with_max_books(mut self, max_books: usize) -> Self {
        self.max_books = max_books;
        self
    }

    pub fn member_id(&self) -> &str {
        &self.member_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    /// ISBNs currently on loan, in the order they were borrowed
    pub fn borrowed_books(&self) -> &[String] {
        &self.borrowed_books
    }

    pub fn max_books(&self) -> usize {
        self.max_books
    }

    pub fn has_borrowed(&self, isbn: &str) -> bool {
        self.borrowed_books.iter().any(|b| b == isbn)
    }

    pub fn can_borrow(&self) -> bool {
        self.borrowed_books.len() < self.max_books
    }

    /// Record a loan; adding an ISBN already held is a no-op
    pub fn add_borrowed_book(&mut self, isbn: impl Into<String>) {
        let isbn = isbn.into();
        if !self.has_borrowed(&isbn) {
            self.borrowed_books.push(isbn);
        }
    }

    /// Drop a loan; removing an ISBN not held is a no-op
    pub fn remove_borrowed_book(&mut self, isbn: &str) {
        self.borrowed_books.retain(|b| b != isbn);
    }
}
