//! Snapshot/rollback transactions over a [`Library`].
//!
//! A transaction clones both collections when it begins. Committing saves
//! the live state; rolling back replaces the live collections with the
//! snapshot wholesale.
//!
//! [`Library::transaction`] is the scoped form: it holds the only `&mut`
//! borrow of the library for its duration, so transactions cannot nest or
//! overlap.

use crate::{Book, Error, Library, Member, Result};
use std::time::Duration;

/// Lifecycle of a [`Transaction`]
///
/// There is no idle state: a transaction is active from the moment it is
/// created by [`Transaction::begin`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransactionState {
    Active,
    Committed,
    RolledBack,
}

/// Deep copy of a library's collections taken at `begin`
#[derive(Debug)]
pub struct Transaction {
    books: Vec<Book>,
    members: Vec<Member>,
    state: TransactionState,
}

impl Transaction {
    pub fn begin(library: &Library) -> Self {
        let (books, members) = library.snapshot();
        tracing::debug!(
            "Transaction started ({} books, {} members snapshotted)",
            books.len(),
            members.len()
        );

        Self {
            books,
            members,
            state: TransactionState::Active,
        }
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Persist the library's current state
    ///
    /// On save failure the transaction stays active so the caller can
    /// still roll back.
    pub fn commit(&mut self, library: &mut Library) -> Result<Duration> {
        self.ensure_active("commit")?;

        let elapsed = library.save()?;
        self.state = TransactionState::Committed;
        tracing::info!("Transaction committed");
        Ok(elapsed)
    }

    /// Put the snapshot back in place of the library's current state
    pub fn rollback(&mut self, library: &mut Library) -> Result<()> {
        self.ensure_active("roll back")?;

        library.restore(
            std::mem::take(&mut self.books),
            std::mem::take(&mut self.members),
        );
        self.state = TransactionState::RolledBack;
        tracing::warn!("Transaction rolled back");
        Ok(())
    }

    fn ensure_active(&self, action: &str) -> Result<()> {
        if self.state != TransactionState::Active {
            return Err(Error::IllegalState(format!(
                "Cannot {} a transaction that is {:?}",
                action, self.state
            )));
        }
        Ok(())
    }
}

impl Library {
    /// Run `f` as one unit of work
    ///
    /// If `f` returns `Ok`, the library is saved. If `f` returns `Err`, the
    /// in-memory state is restored to what it was before `f` ran and the
    /// error is returned unchanged. If the save itself fails, memory is
    /// restored as well and the save error is returned.
    pub fn transaction<T, E, F>(&mut self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&mut Library) -> std::result::Result<T, E>,
        E: From<Error>,
    {
        let mut tx = Transaction::begin(self);

        match f(self) {
            Ok(value) => match tx.commit(self) {
                Ok(_) => Ok(value),
                Err(e) => {
                    tx.rollback(self)?;
                    Err(e.into())
                }
            },
            Err(e) => {
                tx.rollback(self)?;
                Err(e)
            }
        }
    }
}
