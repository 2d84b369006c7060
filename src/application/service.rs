use crate::domain::model::book::Book;
use crate::domain::model::id::{BookId, ReaderId};
use crate::domain::model::library::{AddBookRequest, AddReaderRequest, Library};
use crate::domain::model::reader::Reader;
use crate::domain::repository::LibraryRepository;

use super::error::{AppError, Resource};

/// Result of `load_all`. Load failures do not abort the other resource.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub books: usize,
    pub readers: usize,
    /// Readers whose loan points at a book missing from the catalog.
    pub dangling: Vec<ReaderId>,
    /// Readers claiming a book another reader already holds.
    pub contested: Vec<ReaderId>,
    /// Unavailable books no reader claims.
    pub orphaned: Vec<BookId>,
    pub failures: Vec<AppError>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
            && self.dangling.is_empty()
            && self.contested.is_empty()
            && self.orphaned.is_empty()
    }
}

/// Use cases over the in-memory library. State lives here between saves;
/// the repository is only touched by load/save.
///
/// A resource that failed to load is held back from `save_all` so the file
/// on disk is not replaced by an empty collection. Saving that resource
/// explicitly, or a later successful load, lifts the hold.
pub struct LibraryService<R: LibraryRepository> {
    repo: R,
    library: Library,
    unloaded: Vec<Resource>,
    books_dirty: bool,
    readers_dirty: bool,
}

impl<R: LibraryRepository> LibraryService<R> {
    /// Starts with an empty library. Call `load_all` to read persisted state.
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            library: Library::new(),
            unloaded: Vec::new(),
            books_dirty: false,
            readers_dirty: false,
        }
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Resources whose last load failed and that `save_all` leaves untouched.
    pub fn unloaded(&self) -> &[Resource] {
        &self.unloaded
    }

    /// In-memory changes not yet written by a save.
    pub fn has_unsaved_changes(&self) -> bool {
        self.books_dirty || self.readers_dirty
    }

    // --- Mutations ---

    pub fn add_book(&mut self, req: AddBookRequest) -> BookId {
        let id = self.library.add_book(req);
        self.books_dirty = true;
        tracing::info!(book = %id, "book added");
        id
    }

    pub fn add_reader(&mut self, req: AddReaderRequest) -> ReaderId {
        let id = self.library.add_reader(req);
        self.readers_dirty = true;
        tracing::info!(reader = %id, "reader added");
        id
    }

    pub fn checkout(&mut self, reader: ReaderId, book: BookId) -> Result<(), AppError> {
        self.library.checkout(reader, book)?;
        self.mark_both_dirty();
        tracing::info!(%reader, %book, "book checked out");
        Ok(())
    }

    pub fn return_book(&mut self, reader: ReaderId) -> Result<BookId, AppError> {
        let book = self.library.return_book(reader)?;
        self.mark_both_dirty();
        tracing::info!(%reader, %book, "book returned");
        Ok(book)
    }

    pub fn remove_reader(&mut self, id: ReaderId) -> Result<Reader, AppError> {
        let held = self.library.get_reader(id).and_then(|r| r.active_book());
        let reader = self.library.remove_reader(id)?;
        self.mark_both_dirty();
        match held {
            Some(book) => tracing::info!(reader = %id, %book, "reader removed, held book returned"),
            None => tracing::info!(reader = %id, "reader removed"),
        }
        Ok(reader)
    }

    pub fn remove_book(&mut self, id: BookId) -> Result<Book, AppError> {
        let book = self.library.remove_book(id)?;
        self.books_dirty = true;
        tracing::info!(book = %id, "book removed");
        Ok(book)
    }

    // --- Persistence ---

    /// Replaces the in-memory state with the persisted one.
    ///
    /// An absent resource yields an empty collection. A malformed one is
    /// reported and also left empty; the other resource is still loaded.
    pub fn load_all(&mut self) -> LoadReport {
        let mut report = LoadReport::default();
        self.unloaded.clear();

        let books = match self.repo.load_books() {
            Ok(books) => books.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to load books");
                report.failures.push(AppError::storage(Resource::Books, e));
                self.unloaded.push(Resource::Books);
                Vec::new()
            }
        };
        let readers = match self.repo.load_readers() {
            Ok(readers) => readers.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to load readers");
                report.failures.push(AppError::storage(Resource::Readers, e));
                self.unloaded.push(Resource::Readers);
                Vec::new()
            }
        };

        let (library, reconciled) = Library::from_parts(books, readers);
        self.library = library;
        self.books_dirty = false;
        self.readers_dirty = false;

        for reader in &reconciled.dangling {
            tracing::warn!(%reader, "active book not found in catalog");
        }
        for reader in &reconciled.contested {
            tracing::warn!(%reader, "active book already held by another reader");
        }
        for book in &reconciled.orphaned {
            tracing::warn!(%book, "book marked taken but no reader holds it");
        }
        tracing::debug!(
            resolved = reconciled.resolved,
            dangling = reconciled.dangling.len(),
            contested = reconciled.contested.len(),
            orphaned = reconciled.orphaned.len(),
            "reconciled reader loans"
        );

        report.books = self.library.books().len();
        report.readers = self.library.readers().len();
        report.dangling = reconciled.dangling;
        report.contested = reconciled.contested;
        report.orphaned = reconciled.orphaned;
        tracing::info!(books = report.books, readers = report.readers, "library loaded");
        report
    }

    /// Writes the catalog, overwriting a file that failed to load.
    pub fn save_books(&mut self) -> Result<(), AppError> {
        self.write_books()?;
        self.unloaded.retain(|r| *r != Resource::Books);
        Ok(())
    }

    /// Writes the readers, overwriting a file that failed to load.
    pub fn save_readers(&mut self) -> Result<(), AppError> {
        self.write_readers()?;
        self.unloaded.retain(|r| *r != Resource::Readers);
        Ok(())
    }

    /// Writes every resource except those held back after a failed load.
    pub fn save_all(&mut self) -> Result<(), AppError> {
        if self.unloaded.contains(&Resource::Books) {
            tracing::warn!("books file failed to load; not overwriting it");
        } else {
            self.write_books()?;
        }
        if self.unloaded.contains(&Resource::Readers) {
            tracing::warn!("readers file failed to load; not overwriting it");
        } else {
            self.write_readers()?;
        }
        Ok(())
    }

    // --- private ---

    fn mark_both_dirty(&mut self) {
        self.books_dirty = true;
        self.readers_dirty = true;
    }

    fn write_books(&mut self) -> Result<(), AppError> {
        self.repo
            .save_books(self.library.books())
            .map_err(|e| AppError::storage(Resource::Books, e))?;
        self.books_dirty = false;
        tracing::debug!(count = self.library.books().len(), "books saved");
        Ok(())
    }

    fn write_readers(&mut self) -> Result<(), AppError> {
        self.repo
            .save_readers(self.library.readers())
            .map_err(|e| AppError::storage(Resource::Readers, e))?;
        self.readers_dirty = false;
        tracing::debug!(count = self.library.readers().len(), "readers saved");
        Ok(())
    }
}
