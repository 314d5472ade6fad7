//! The library catalog: books and members keyed by ISBN and member id.
//!
//! Mutators only change in-memory state. Nothing reaches disk until
//! [`Library::save`], [`Library::clear`] or a committed
//! [`Library::transaction`](crate::transaction).

use crate::book::DEFAULT_LOAN_DAYS;
use crate::error::Entity;
use crate::store::Store;
use crate::{ops, Book, Error, Member, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Counts computed from the current catalog contents
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    pub total_books: usize,
    pub available_books: usize,
    pub borrowed_books: usize,
    pub overdue_books: usize,
    pub total_members: usize,
}

/// In-memory registry of books and members backed by a [`Store`]
///
/// Both collections keep insertion order, which is also the order every
/// query returns results in.
#[derive(Debug)]
pub struct Library {
    store: Store,
    books: Vec<Book>,
    members: Vec<Member>,
}

impl Library {
    /// Open the library stored under `data_dir`, creating the directory
    /// if needed and loading both collections eagerly
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        std::fs::create_dir_all(data_dir)?;

        let store = Store::new(data_dir);
        let (books, members) = store.load()?;
        tracing::info!(
            "Opened library at {:?}: {} books, {} members",
            data_dir,
            books.len(),
            members.len()
        );

        Ok(Self {
            store,
            books,
            members,
        })
    }

    pub fn data_dir(&self) -> &Path {
        self.store.data_dir()
    }

    /// Persist both collections, returning how long the write took
    pub fn save(&self) -> Result<Duration> {
        let (result, elapsed) =
            ops::timed("save", || self.store.save(&self.books, &self.members));
        result?;
        Ok(elapsed)
    }

    // ------------------------------------------------------------------
    // Books
    // ------------------------------------------------------------------

    pub fn add_book(&mut self, isbn: &str, title: &str, author: &str, year: i32) -> Result<&Book> {
        let index = ops::logged("add_book", (isbn, title, author, year), || {
            ops::require_isbn(isbn)?;
            if self.book_index(isbn).is_some() {
                return Err(Error::DuplicateKey {
                    entity: Entity::Book,
                    key: isbn.to_string(),
                });
            }

            self.books.push(Book::new(isbn, title, author, year)?);
            Ok(self.books.len() - 1)
        })?;

        Ok(&self.books[index])
    }

    pub fn get_book(&self, isbn: &str) -> Result<&Book> {
        ops::require_isbn(isbn)?;
        self.book_index(isbn)
            .map(|index| &self.books[index])
            .ok_or_else(|| Error::book_not_found(isbn))
    }

    /// All books in insertion order
    pub fn books(&self) -> impl Iterator<Item = &Book> {
        self.books.iter()
    }

    pub fn len_books(&self) -> usize {
        self.books.len()
    }

    fn book_index(&self, isbn: &str) -> Option<usize> {
        self.books.iter().position(|b| b.isbn() == isbn)
    }

    // ------------------------------------------------------------------
    // Members
    // ------------------------------------------------------------------

    pub fn add_member(&mut self, member_id: &str, name: &str, email: &str) -> Result<&Member> {
        let index = ops::logged("add_member", (member_id, name, email), || {
            if self.member_index(member_id).is_some() {
                return Err(Error::DuplicateKey {
                    entity: Entity::Member,
                    key: member_id.to_string(),
                });
            }

            self.members.push(Member::new(member_id, name, email)?);
            Ok(self.members.len() - 1)
        })?;

        Ok(&self.members[index])
    }

    pub fn get_member(&self, member_id: &str) -> Result<&Member> {
        self.member_index(member_id)
            .map(|index| &self.members[index])
            .ok_or_else(|| Error::member_not_found(member_id))
    }

    /// All members in insertion order
    pub fn members(&self) -> impl Iterator<Item = &Member> {
        self.members.iter()
    }

    pub fn len_members(&self) -> usize {
        self.members.len()
    }

    fn member_index(&self, member_id: &str) -> Option<usize> {
        self.members.iter().position(|m| m.member_id() == member_id)
    }

    // ------------------------------------------------------------------
    // Lending
    // ------------------------------------------------------------------

    /// Lend `isbn` to `member_id` for `days` days
    ///
    /// Every check runs before either entity is touched, so a failed
    /// borrow leaves both the book and the member unchanged.
    pub fn borrow_book(&mut self, isbn: &str, member_id: &str, days: u32) -> Result<()> {
        ops::logged("borrow_book", (isbn, member_id, days), || {
            ops::require_isbn(isbn)?;
            ops::require_member_id(member_id)?;

            let book_index = self
                .book_index(isbn)
                .ok_or_else(|| Error::book_not_found(isbn))?;
            let member_index = self
                .member_index(member_id)
                .ok_or_else(|| Error::member_not_found(member_id))?;

            if !self.books[book_index].is_available() {
                return Err(Error::Unavailable(isbn.to_string()));
            }
            let member = &self.members[member_index];
            if !member.can_borrow() {
                return Err(Error::LimitExceeded {
                    member_id: member_id.to_string(),
                    limit: member.max_books(),
                });
            }

            self.books[book_index].borrow(member_id, days)?;
            self.members[member_index].add_borrowed_book(isbn);
            Ok(())
        })
    }

    /// Lend for the default loan period
    pub fn borrow_book_default(&mut self, isbn: &str, member_id: &str) -> Result<()> {
        self.borrow_book(isbn, member_id, DEFAULT_LOAN_DAYS)
    }

    pub fn return_book(&mut self, isbn: &str, member_id: &str) -> Result<()> {
        ops::logged("return_book", (isbn, member_id), || {
            ops::require_isbn(isbn)?;
            ops::require_member_id(member_id)?;

            let book_index = self
                .book_index(isbn)
                .ok_or_else(|| Error::book_not_found(isbn))?;
            let member_index = self
                .member_index(member_id)
                .ok_or_else(|| Error::member_not_found(member_id))?;

            if self.books[book_index].borrowed_by() != Some(member_id) {
                return Err(Error::BorrowerMismatch {
                    isbn: isbn.to_string(),
                    member_id: member_id.to_string(),
                });
            }

            self.books[book_index].return_book()?;
            self.members[member_index].remove_borrowed_book(isbn);
            Ok(())
        })
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Case-insensitive substring match on title or author
    pub fn search(&self, query: &str) -> Vec<&Book> {
        let needle = query.to_lowercase();
        self.books
            .iter()
            .filter(|b| {
                b.title().to_lowercase().contains(&needle)
                    || b.author().to_lowercase().contains(&needle)
            })
            .collect()
    }

    pub fn available_books(&self) -> Vec<&Book> {
        self.books.iter().filter(|b| b.is_available()).collect()
    }

    pub fn borrowed_books(&self) -> Vec<&Book> {
        self.books.iter().filter(|b| !b.is_available()).collect()
    }

    pub fn overdue_books(&self) -> Vec<&Book> {
        self.books.iter().filter(|b| b.is_overdue()).collect()
    }

    /// Lazily yield books whose author contains `author`, ignoring case
    pub fn books_by_author(&self, author: &str) -> impl Iterator<Item = &Book> + '_ {
        let needle = author.to_lowercase();
        self.books
            .iter()
            .filter(move |b| b.author().to_lowercase().contains(&needle))
    }

    /// Books published in `start..=end`
    pub fn books_by_year_range(&self, start: i32, end: i32) -> impl Iterator<Item = &Book> + '_ {
        self.books
            .iter()
            .filter(move |b| (start..=end).contains(&b.year()))
    }

    /// Split the catalog into pages of at most `page_size` books
    pub fn paginate_books(&self, page_size: usize) -> Result<std::slice::Chunks<'_, Book>> {
        if page_size == 0 {
            return Err(Error::InvalidInput("Page size must be positive".into()));
        }
        Ok(self.books.chunks(page_size))
    }

    pub fn statistics(&self) -> Statistics {
        Statistics {
            total_books: self.books.len(),
            available_books: self.books.iter().filter(|b| b.is_available()).count(),
            borrowed_books: self.books.iter().filter(|b| !b.is_available()).count(),
            overdue_books: self.books.iter().filter(|b| b.is_overdue()).count(),
            total_members: self.members.len(),
        }
    }

    /// Remove every book and member and persist the empty catalog
    pub fn clear(&mut self) -> Result<()> {
        ops::logged("clear", (), || {
            self.books.clear();
            self.members.clear();
            self.save().map(|_| ())
        })
    }

    // ------------------------------------------------------------------
    // Snapshot support for transactions
    // ------------------------------------------------------------------

    pub(crate) fn snapshot(&self) -> (Vec<Book>, Vec<Member>) {
        (self.books.clone(), self.members.clone())
    }

    pub(crate) fn restore(&mut self, books: Vec<Book>, members: Vec<Member>) {
        self.books = books;
        self.members = members;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};

    const CLEAN_CODE: &str = "978-0132350884";

    fn populated_library(dir: &Path) -> Library {
        let mut library = Library::open(dir).unwrap();
        library.add_book(CLEAN_CODE, "Clean Code", "Robert C. Martin", 2008).unwrap();
        library.add_book("978-0201633610", "Design Patterns", "Erich Gamma", 1994).unwrap();
        library.add_book("978-0735619678", "Code Complete", "Steve McConnell", 2004).unwrap();
        library.add_book("978-0134494166", "Effective Python", "Brett Slatkin", 2019).unwrap();
        library.add_book("978-1491904244", "Fluent Python", "Luciano Ramalho", 2015).unwrap();

        library.add_member("M001", "John Doe", "john@example.com").unwrap();
        library.add_member("M002", "Jane Smith", "jane@example.com").unwrap();
        library.add_member("M003", "Peter Jones", "peter@example.com").unwrap();

        library.save().unwrap();
        library
    }

    #[test]
    fn test_open_creates_data_dir_and_starts_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let data_dir = temp_dir.path().join("data");

        let library = Library::open(&data_dir).unwrap();
        assert!(data_dir.exists());
        assert_eq!(library.len_books(), 0);
        assert_eq!(library.len_members(), 0);
    }

    #[test]
    fn test_open_loads_existing_data() {
        let temp_dir = tempfile::tempdir().unwrap();
        std::fs::write(
            temp_dir.path().join("books.json"),
            r#"[{"isbn": "1234567890", "title": "t", "author": "a", "year": 2000}]"#,
        )
        .unwrap();
        std::fs::write(
            temp_dir.path().join("members.json"),
            r#"[{"member_id": "M1", "name": "n", "email": "e@e.com"}]"#,
        )
        .unwrap();

        let library = Library::open(temp_dir.path()).unwrap();
        assert!(library.get_book("1234567890").is_ok());
        assert!(library.get_member("M1").is_ok());
    }

    #[test]
    fn test_open_fails_on_corrupt_store() {
        let temp_dir = tempfile::tempdir().unwrap();
        std::fs::write(temp_dir.path().join("books.json"), "this is not json").unwrap();

        let result = Library::open(temp_dir.path());
        assert!(matches!(result, Err(Error::CorruptData { .. })));
    }

    #[test]
    fn test_open_tolerates_empty_store_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        std::fs::File::create(temp_dir.path().join("books.json")).unwrap();

        let library = Library::open(temp_dir.path()).unwrap();
        assert_eq!(library.len_books(), 0);
    }

    #[test]
    fn test_add_book_is_memory_only_until_save() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut library = Library::open(temp_dir.path()).unwrap();
        library.add_book("1234567890", "Test Book", "Test Author", 2021).unwrap();
        assert!(library.get_book("1234567890").is_ok());

        let unsaved = Library::open(temp_dir.path()).unwrap();
        assert_eq!(unsaved.len_books(), 0);

        library.save().unwrap();
        let reloaded = Library::open(temp_dir.path()).unwrap();
        assert_eq!(reloaded.get_book("1234567890").unwrap().title(), "Test Book");
    }

    #[test]
    fn test_add_duplicate_book_fails() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut library = populated_library(temp_dir.path());

        let result = library.add_book(CLEAN_CODE, "Clean Code", "Robert C. Martin", 2008);
        match result {
            Err(Error::DuplicateKey { entity, key }) => {
                assert_eq!(entity, Entity::Book);
                assert_eq!(key, CLEAN_CODE);
            }
            other => panic!("Expected DuplicateKey, got {:?}", other),
        }
        assert_eq!(library.len_books(), 5);
    }

    #[test]
    fn test_add_invalid_book_fails() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut library = Library::open(temp_dir.path()).unwrap();

        assert!(matches!(
            library.add_book("123", "t", "a", 2000),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            library.add_book("1234567890", "t", "a", 10),
            Err(Error::InvalidInput(_))
        ));
        assert_eq!(library.len_books(), 0);
    }

    #[test]
    fn test_get_missing_book_and_member() {
        let temp_dir = tempfile::tempdir().unwrap();
        let library = Library::open(temp_dir.path()).unwrap();

        match library.get_book("000-0000000000") {
            Err(Error::NotFound { entity, key }) => {
                assert_eq!(entity, Entity::Book);
                assert_eq!(key, "000-0000000000");
            }
            other => panic!("Expected NotFound, got {:?}", other),
        }
        match library.get_member("M-NON-EXIST") {
            Err(Error::NotFound { entity, key }) => {
                assert_eq!(entity, Entity::Member);
                assert_eq!(key, "M-NON-EXIST");
            }
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_add_member_and_duplicate() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut library = populated_library(temp_dir.path());

        assert_eq!(library.get_member("M001").unwrap().name(), "John Doe");
        assert!(matches!(
            library.add_member("M001", "John Doe", "john@example.com"),
            Err(Error::DuplicateKey { entity: Entity::Member, .. })
        ));
        assert!(matches!(
            library.add_member("M099", "No Mail", "nomail"),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_borrow_and_return_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut library = populated_library(temp_dir.path());

        library.borrow_book_default(CLEAN_CODE, "M001").unwrap();
        library.save().unwrap();

        let book = library.get_book(CLEAN_CODE).unwrap();
        assert!(!book.is_available());
        assert_eq!(book.borrowed_by(), Some("M001"));
        assert!(library.get_member("M001").unwrap().has_borrowed(CLEAN_CODE));

        let reloaded = Library::open(temp_dir.path()).unwrap();
        assert!(!reloaded.get_book(CLEAN_CODE).unwrap().is_available());

        library.return_book(CLEAN_CODE, "M001").unwrap();
        let book = library.get_book(CLEAN_CODE).unwrap();
        assert!(book.is_available());
        assert!(book.due_date().is_none());
        assert!(!library.get_member("M001").unwrap().has_borrowed(CLEAN_CODE));
    }

    #[test]
    fn test_borrow_unavailable_book_fails() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut library = populated_library(temp_dir.path());

        library.borrow_book_default(CLEAN_CODE, "M001").unwrap();
        let result = library.borrow_book_default(CLEAN_CODE, "M002");
        assert!(matches!(result, Err(Error::Unavailable(ref isbn)) if isbn == CLEAN_CODE));
        assert!(library.get_member("M002").unwrap().borrowed_books().is_empty());
    }

    #[test]
    fn test_borrow_at_limit_fails_without_side_effects() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut library = populated_library(temp_dir.path());

        for isbn in ["978-0201633610", "978-0735619678", "978-0134494166"] {
            library.borrow_book_default(isbn, "M003").unwrap();
        }
        assert!(!library.get_member("M003").unwrap().can_borrow());

        match library.borrow_book_default(CLEAN_CODE, "M003") {
            Err(Error::LimitExceeded { member_id, limit }) => {
                assert_eq!(member_id, "M003");
                assert_eq!(limit, 3);
            }
            other => panic!("Expected LimitExceeded, got {:?}", other),
        }
        assert!(library.get_book(CLEAN_CODE).unwrap().is_available());
        assert_eq!(library.get_member("M003").unwrap().borrowed_books().len(), 3);
    }

    #[test]
    fn test_borrow_unknown_keys() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut library = populated_library(temp_dir.path());

        assert!(matches!(
            library.borrow_book_default("999-9999999999", "M001"),
            Err(Error::NotFound { entity: Entity::Book, .. })
        ));
        assert!(matches!(
            library.borrow_book_default(CLEAN_CODE, "M404"),
            Err(Error::NotFound { entity: Entity::Member, .. })
        ));
        assert!(matches!(
            library.borrow_book_default(CLEAN_CODE, ""),
            Err(Error::InvalidInput(_))
        ));
        assert!(library.get_book(CLEAN_CODE).unwrap().is_available());
    }

    #[test]
    fn test_borrow_with_out_of_range_period_changes_nothing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut library = populated_library(temp_dir.path());

        assert!(matches!(
            library.borrow_book(CLEAN_CODE, "M001", u32::MAX),
            Err(Error::InvalidInput(_))
        ));
        assert!(library.get_book(CLEAN_CODE).unwrap().is_available());
        assert!(library.get_member("M001").unwrap().borrowed_books().is_empty());
    }

    #[test]
    fn test_return_by_wrong_member_fails() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut library = populated_library(temp_dir.path());

        library.borrow_book_default(CLEAN_CODE, "M001").unwrap();
        assert!(matches!(
            library.return_book(CLEAN_CODE, "M002"),
            Err(Error::BorrowerMismatch { .. })
        ));
        assert_eq!(library.get_book(CLEAN_CODE).unwrap().borrowed_by(), Some("M001"));

        // an available book has no borrower to match
        assert!(matches!(
            library.return_book("978-0201633610", "M001"),
            Err(Error::BorrowerMismatch { .. })
        ));
    }

    #[test]
    fn test_search_by_title_and_author() {
        let temp_dir = tempfile::tempdir().unwrap();
        let library = populated_library(temp_dir.path());

        let results = library.search("python");
        let titles: Vec<_> = results.iter().map(|b| b.title()).collect();
        assert_eq!(titles, vec!["Effective Python", "Fluent Python"]);

        assert_eq!(library.search("MARTIN").len(), 1);
        assert!(library.search("haskell").is_empty());
    }

    #[test]
    fn test_filters() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut library = populated_library(temp_dir.path());

        library.borrow_book_default(CLEAN_CODE, "M001").unwrap();
        assert_eq!(library.available_books().len(), 4);

        let borrowed = library.borrowed_books();
        assert_eq!(borrowed.len(), 1);
        assert_eq!(borrowed[0].isbn(), CLEAN_CODE);
        assert!(library.overdue_books().is_empty());
    }

    #[test]
    fn test_overdue_books_loaded_from_store() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = Store::new(temp_dir.path());

        let mut overdue = Book::new(
            "978-1593275846",
            "Automate the Boring Stuff with Python",
            "Al Sweigart",
            2015,
        )
        .unwrap();
        overdue
            .borrow_until("M002", Utc::now() - ChronoDuration::days(5))
            .unwrap();
        let mut member = Member::new("M002", "Jane Smith", "jane@example.com").unwrap();
        member.add_borrowed_book("978-1593275846");
        store.save(&[overdue], &[member]).unwrap();

        let library = Library::open(temp_dir.path()).unwrap();
        let overdue = library.overdue_books();
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].isbn(), "978-1593275846");
        assert_eq!(library.statistics().overdue_books, 1);
    }

    #[test]
    fn test_author_and_year_generators() {
        let temp_dir = tempfile::tempdir().unwrap();
        let library = populated_library(temp_dir.path());

        let by_gamma: Vec<_> = library.books_by_author("gamma").collect();
        assert_eq!(by_gamma.len(), 1);
        assert_eq!(by_gamma[0].title(), "Design Patterns");

        let years: Vec<_> = library
            .books_by_year_range(2004, 2015)
            .map(|b| b.year())
            .collect();
        assert_eq!(years, vec![2008, 2004, 2015]);
    }

    #[test]
    fn test_paginate_books() {
        let temp_dir = tempfile::tempdir().unwrap();
        let library = populated_library(temp_dir.path());

        let sizes: Vec<_> = library.paginate_books(2).unwrap().map(|p| p.len()).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
        assert!(matches!(library.paginate_books(0), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_statistics_are_fresh() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut library = populated_library(temp_dir.path());

        let before = library.statistics();
        assert_eq!(
            before,
            Statistics {
                total_books: 5,
                available_books: 5,
                borrowed_books: 0,
                overdue_books: 0,
                total_members: 3,
            }
        );

        library.borrow_book_default(CLEAN_CODE, "M001").unwrap();
        let after = library.statistics();
        assert_eq!(after.available_books, 4);
        assert_eq!(after.borrowed_books, 1);
    }

    #[test]
    fn test_clear_persists_empty_state() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut library = populated_library(temp_dir.path());

        library.clear().unwrap();
        assert_eq!(library.len_books(), 0);
        assert_eq!(library.len_members(), 0);

        let reloaded = Library::open(temp_dir.path()).unwrap();
        assert_eq!(reloaded.len_books(), 0);
        assert_eq!(reloaded.len_members(), 0);
    }
}
