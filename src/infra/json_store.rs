use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::domain::model::book::Book;
use crate::domain::model::reader::Reader;
use crate::domain::repository::LibraryRepository;

#[derive(Debug, thiserror::Error)]
pub enum JsonStoreError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// LibraryRepository backed by two JSON files, one array per collection.
pub struct JsonLibraryRepository {
    books_path: PathBuf,
    readers_path: PathBuf,
}

impl JsonLibraryRepository {
    pub fn new(books_path: impl Into<PathBuf>, readers_path: impl Into<PathBuf>) -> Self {
        Self {
            books_path: books_path.into(),
            readers_path: readers_path.into(),
        }
    }

    /// `books.json` and `readers.json` inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self::new(dir.join("books.json"), dir.join("readers.json"))
    }

    pub fn books_path(&self) -> &Path {
        &self.books_path
    }

    pub fn readers_path(&self) -> &Path {
        &self.readers_path
    }
}

impl LibraryRepository for JsonLibraryRepository {
    type Error = JsonStoreError;

    fn load_books(&self) -> Result<Option<Vec<Book>>, Self::Error> {
        read_array(&self.books_path)
    }

    fn load_readers(&self) -> Result<Option<Vec<Reader>>, Self::Error> {
        read_array(&self.readers_path)
    }

    fn save_books(&self, books: &[Book]) -> Result<(), Self::Error> {
        write_array(&self.books_path, books)
    }

    fn save_readers(&self, readers: &[Reader]) -> Result<(), Self::Error> {
        write_array(&self.readers_path, readers)
    }
}

fn read_array<T: DeserializeOwned>(path: &Path) -> Result<Option<Vec<T>>, JsonStoreError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path).map_err(|source| JsonStoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    // A file holding `null` counts as an empty collection.
    let items: Option<Vec<T>> =
        serde_json::from_str(&content).map_err(|source| JsonStoreError::Json {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(Some(items.unwrap_or_default()))
}

/// Whole-file overwrite via a sibling temp file and rename.
fn write_array<T: Serialize>(path: &Path, items: &[T]) -> Result<(), JsonStoreError> {
    let io_err = |source| JsonStoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
    }
    let content = serde_json::to_string_pretty(items).map_err(|source| JsonStoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &content).map_err(io_err)?;
    std::fs::rename(&tmp, path).map_err(io_err)?;
    Ok(())
}
