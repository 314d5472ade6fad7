//! JSON file store for the book and member collections.
//!
//! Each collection lives in its own file under the data directory as a
//! pretty-printed JSON array. Reads take a shared lock; writes are staged
//! into temp files in the same directory and renamed into place once both
//! collections have been written and synced.

use crate::{Book, Error, Member, Result};
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const BOOKS_FILE: &str = "books.json";
pub const MEMBERS_FILE: &str = "members.json";

/// Entities stored under a natural key
pub trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for Book {
    fn key(&self) -> &str {
        self.isbn()
    }
}

impl Keyed for Member {
    fn key(&self) -> &str {
        self.member_id()
    }
}

/// Location of the two collection files
#[derive(Clone, Debug)]
pub struct Store {
    data_dir: PathBuf,
    books_path: PathBuf,
    members_path: PathBuf,
}

impl Store {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            books_path: data_dir.join(BOOKS_FILE),
            members_path: data_dir.join(MEMBERS_FILE),
            data_dir,
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn books_path(&self) -> &Path {
        &self.books_path
    }

    pub fn members_path(&self) -> &Path {
        &self.members_path
    }

    /// Load both collections
    ///
    /// A missing or zero-length file is an empty collection. Malformed
    /// JSON, or a record that fails entity validation, is `CorruptData`.
    pub fn load(&self) -> Result<(Vec<Book>, Vec<Member>)> {
        let books = read_collection(&self.books_path)?;
        let members = read_collection(&self.members_path)?;
        tracing::debug!(
            "Loaded {} books and {} members from {:?}",
            books.len(),
            members.len(),
            self.data_dir
        );
        Ok((books, members))
    }

    /// Overwrite both collection files
    ///
    /// Both files are fully written and synced before either is renamed
    /// into place, so a serialization or write failure leaves the store as
    /// it was.
    pub fn save(&self, books: &[Book], members: &[Member]) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;

        let staged_books = self.stage(books)?;
        let staged_members = self.stage(members)?;

        staged_books
            .persist(&self.books_path)
            .map_err(|e| Error::Io(e.error))?;
        staged_members
            .persist(&self.members_path)
            .map_err(|e| Error::Io(e.error))?;

        tracing::debug!(
            "Saved {} books and {} members to {:?}",
            books.len(),
            members.len(),
            self.data_dir
        );
        Ok(())
    }

    fn stage<T: Serialize>(&self, records: &[T]) -> Result<NamedTempFile> {
        let temp = NamedTempFile::new_in(&self.data_dir)?;
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = BufWriter::new(temp.as_file());
            serde_json::to_writer_pretty(&mut writer, records)?;
            writer.write_all(b"\n")?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;
        Ok(temp)
    }
}

fn read_collection<T>(path: &Path) -> Result<Vec<T>>
where
    T: DeserializeOwned + Keyed,
{
    if !path.exists() {
        tracing::info!("No store file at {:?}, starting empty", path);
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    // raw bytes, so bad encoding surfaces as a JSON error rather than IO
    let mut contents = Vec::new();
    let read = BufReader::new(&file).read_to_end(&mut contents);
    file.unlock()?;
    read?;

    if contents.is_empty() {
        tracing::info!("Store file {:?} is empty", path);
        return Ok(Vec::new());
    }

    let records: Vec<T> =
        serde_json::from_slice(&contents).map_err(|source| Error::CorruptData {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(dedup_by_key(records, path))
}

/// Later records replace earlier ones with the same key, keeping the
/// position of the first occurrence
fn dedup_by_key<T: Keyed>(records: Vec<T>, path: &Path) -> Vec<T> {
    let mut unique: Vec<T> = Vec::with_capacity(records.len());
    for record in records {
        match unique.iter().position(|r| r.key() == record.key()) {
            Some(index) => {
                tracing::warn!(
                    "Duplicate key {} in {:?}, keeping the later entry",
                    record.key(),
                    path
                );
                unique[index] = record;
            }
            None => unique.push(record),
        }
    }
    unique
}
