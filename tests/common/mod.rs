//! Shared test harness for integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use bookbro::application::service::LibraryService;
use bookbro::domain::model::book::Book;
use bookbro::domain::model::id::{BookId, ReaderId};
use bookbro::domain::model::library::{AddBookRequest, AddReaderRequest, Library};
use bookbro::domain::model::reader::Reader;
use bookbro::domain::repository::LibraryRepository;

// =============================================================================
// InMemoryRepo — JSON kept in a map instead of files
// =============================================================================

#[derive(Debug, thiserror::Error)]
#[error("in-memory store error: {0}")]
pub struct InMemoryError(#[from] serde_json::Error);

const BOOKS: &str = "books";
const READERS: &str = "readers";

/// Clones share the same store, like two handles on the same files.
#[derive(Clone)]
pub struct InMemoryRepo {
    store: Rc<RefCell<HashMap<&'static str, String>>>,
}

impl InMemoryRepo {
    pub fn new() -> Self {
        Self {
            store: Rc::new(RefCell::new(HashMap::new())),
        }
    }

    /// Raw content for the books resource, bypassing serialization.
    pub fn put_raw_books(&self, raw: &str) {
        self.store.borrow_mut().insert(BOOKS, raw.to_string());
    }

    pub fn put_raw_readers(&self, raw: &str) {
        self.store.borrow_mut().insert(READERS, raw.to_string());
    }

    pub fn raw_books(&self) -> Option<String> {
        self.store.borrow().get(BOOKS).cloned()
    }

    pub fn has_books(&self) -> bool {
        self.store.borrow().contains_key(BOOKS)
    }

    pub fn has_readers(&self) -> bool {
        self.store.borrow().contains_key(READERS)
    }
}

impl LibraryRepository for InMemoryRepo {
    type Error = InMemoryError;

    fn load_books(&self) -> Result<Option<Vec<Book>>, Self::Error> {
        match self.store.borrow().get(BOOKS) {
            Some(json) => Ok(Some(serde_json::from_str(json)?)),
            None => Ok(None),
        }
    }

    fn load_readers(&self) -> Result<Option<Vec<Reader>>, Self::Error> {
        match self.store.borrow().get(READERS) {
            Some(json) => Ok(Some(serde_json::from_str(json)?)),
            None => Ok(None),
        }
    }

    fn save_books(&self, books: &[Book]) -> Result<(), Self::Error> {
        let json = serde_json::to_string(books)?;
        self.store.borrow_mut().insert(BOOKS, json);
        Ok(())
    }

    fn save_readers(&self, readers: &[Reader]) -> Result<(), Self::Error> {
        let json = serde_json::to_string(readers)?;
        self.store.borrow_mut().insert(READERS, json);
        Ok(())
    }
}

// =============================================================================
// TestLibrary — a populated service with ids by name
// =============================================================================

pub struct TestLibrary<R: LibraryRepository = InMemoryRepo> {
    pub service: LibraryService<R>,
    pub books: HashMap<&'static str, BookId>,
    pub readers: HashMap<&'static str, ReaderId>,
}

impl TestLibrary {
    /// Standard fixture:
    /// ```text
    /// books:   dune (Frank Herbert), emma (Jane Austen), persuasion (Jane Austen)
    /// readers: ada (holds dune), grace (free), linus (free)
    /// ```
    pub fn standard() -> Self {
        Self::standard_with(InMemoryRepo::new())
    }
}

impl<R: LibraryRepository> TestLibrary<R> {
    /// Same fixture, over any repository.
    pub fn standard_with(repo: R) -> Self {
        let mut service = LibraryService::new(repo);
        let mut books = HashMap::new();
        let mut readers = HashMap::new();

        for (key, title, author, year) in [
            ("dune", "Dune", "Frank Herbert", 1965),
            ("emma", "Emma", "Jane Austen", 1815),
            ("persuasion", "Persuasion", "Jane Austen", 1817),
        ] {
            let id = service.add_book(AddBookRequest {
                title: title.into(),
                author: author.into(),
                year,
            });
            books.insert(key, id);
        }

        for (key, name, phone) in [
            ("ada", "Ada Lovelace", Some("555-0100")),
            ("grace", "Grace Hopper", None),
            ("linus", "Linus Torvalds", None),
        ] {
            let id = service.add_reader(AddReaderRequest {
                full_name: name.into(),
                phone: phone.map(String::from),
            });
            readers.insert(key, id);
        }

        service.checkout(readers["ada"], books["dune"]).unwrap();

        Self {
            service,
            books,
            readers,
        }
    }
}

// =============================================================================
// Assertion helpers
// =============================================================================

/// Checks the cross-entity lending invariants.
pub fn assert_consistent(library: &Library) {
    for book in library.books() {
        let holders: Vec<&Reader> = library
            .readers()
            .iter()
            .filter(|r| r.active_book_id() == Some(book.id()))
            .collect();
        assert!(
            holders.len() <= 1,
            "book {} held by {} readers",
            book.title(),
            holders.len()
        );
        assert_eq!(
            book.is_available(),
            holders.is_empty(),
            "availability of {} disagrees with loans",
            book.title()
        );
    }
    for reader in library.readers() {
        assert_eq!(reader.is_active(), reader.active_book_id().is_some());
        if let Some(resolved) = reader.active_book() {
            assert_eq!(Some(resolved), reader.active_book_id());
        }
    }
}

/// Result is Err and its message contains `expected`.
pub fn assert_error_contains<T: std::fmt::Debug>(
    result: Result<T, impl std::fmt::Display>,
    expected: &str,
) {
    match result {
        Err(e) => {
            let msg = e.to_string();
            assert!(
                msg.contains(expected),
                "Expected error containing '{expected}', got: '{msg}'"
            );
        }
        Ok(v) => panic!("Expected error containing '{expected}', got Ok({v:?})"),
    }
}
