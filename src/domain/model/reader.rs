use serde::{Deserialize, Serialize};

use super::book::{contains_ignore_case, Book};
use super::id::{BookId, ReaderId};

/// A library member. Holds at most one book at a time.
///
/// `active_book_id` is the durable reference that gets persisted.
/// `active_book` is its in-memory resolution: it is only set once the
/// referenced book is known to exist in the catalog, either by a checkout
/// or by reconciliation after load.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Reader {
    id: ReaderId,
    full_name: String,
    #[serde(default)]
    phone: String,
    #[serde(default)]
    active: bool,
    #[serde(default)]
    active_book_id: Option<BookId>,
    #[serde(skip)]
    active_book: Option<BookId>,
}

impl PartialEq for Reader {
    /// Equality over persisted fields only.
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.full_name == other.full_name
            && self.phone == other.phone
            && self.active == other.active
            && self.active_book_id == other.active_book_id
    }
}

impl Eq for Reader {}

impl Reader {
    pub fn new(full_name: impl Into<String>) -> Self {
        Self {
            id: ReaderId::new(),
            full_name: full_name.into(),
            phone: String::new(),
            active: false,
            active_book_id: None,
            active_book: None,
        }
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = phone.into();
        self
    }

    pub fn id(&self) -> ReaderId {
        self.id
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn phone(&self) -> &str {
        &self.phone
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn active_book_id(&self) -> Option<BookId> {
        self.active_book_id
    }

    /// The resolved in-memory link, if any.
    pub fn active_book(&self) -> Option<BookId> {
        self.active_book
    }

    pub fn has_resolved_book(&self) -> bool {
        self.active_book.is_some()
    }

    /// Claims a loan whose book could not be found in the catalog.
    pub fn is_dangling(&self) -> bool {
        self.active_book_id.is_some() && self.active_book.is_none()
    }

    pub fn matches_name(&self, query: &str) -> bool {
        contains_ignore_case(&self.full_name, query)
    }

    // --- Driven by the Library only ---

    pub(crate) fn give_book(&mut self, book: Option<&Book>) {
        let Some(book) = book else {
            return;
        };
        self.active_book = Some(book.id());
        self.active_book_id = Some(book.id());
        self.active = true;
    }

    pub(crate) fn take_book_back(&mut self) {
        self.active_book = None;
        self.active_book_id = None;
        self.active = false;
    }

    pub(crate) fn resolve(&mut self, book: Option<BookId>) {
        self.active_book = book;
    }
}
