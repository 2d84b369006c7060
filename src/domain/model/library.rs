use std::collections::{HashMap, HashSet};

use super::book::{contains_ignore_case, Book};
use super::id::{BookId, ReaderId};
use super::reader::Reader;
use crate::domain::error::DomainError;

/// Book creation request. Title and author are validated by the caller.
pub struct AddBookRequest {
    pub title: String,
    pub author: String,
    pub year: i32,
}

pub struct AddReaderRequest {
    pub full_name: String,
    pub phone: Option<String>,
}

/// Outcome of a reconciliation pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub resolved: usize,
    /// Readers whose `active_book_id` matches no book in the catalog.
    pub dangling: Vec<ReaderId>,
    /// Readers claiming a book an earlier reader already holds. Left unresolved.
    pub contested: Vec<ReaderId>,
    /// Unavailable books that no reader claims.
    pub orphaned: Vec<BookId>,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.dangling.is_empty() && self.contested.is_empty() && self.orphaned.is_empty()
    }
}

/// The lending aggregate. Every checkout, return and removal goes through
/// here so that a book is never held by two readers and a book is
/// unavailable exactly when some reader refers to it.
#[derive(Debug, Default, Clone)]
pub struct Library {
    books: Vec<Book>,
    readers: Vec<Reader>,
}

impl Library {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a library from freshly loaded collections and reconciles the
    /// reader links against the catalog.
    pub fn from_parts(books: Vec<Book>, readers: Vec<Reader>) -> (Self, ReconcileReport) {
        let mut library = Self { books, readers };
        let report = library.reconcile();
        (library, report)
    }

    pub fn books(&self) -> &[Book] {
        &self.books
    }

    pub fn readers(&self) -> &[Reader] {
        &self.readers
    }

    pub fn get_book(&self, id: BookId) -> Option<&Book> {
        self.books.iter().find(|b| b.id() == id)
    }

    pub fn get_reader(&self, id: ReaderId) -> Option<&Reader> {
        self.readers.iter().find(|r| r.id() == id)
    }

    /// The book a reader currently holds, when it resolves.
    pub fn active_book_of(&self, reader: &Reader) -> Option<&Book> {
        reader.active_book().and_then(|id| self.get_book(id))
    }

    pub fn add_book(&mut self, req: AddBookRequest) -> BookId {
        let book = Book::new(req.title, req.author, req.year);
        let id = book.id();
        self.books.push(book);
        id
    }

    pub fn add_reader(&mut self, req: AddReaderRequest) -> ReaderId {
        let mut reader = Reader::new(req.full_name);
        if let Some(phone) = req.phone {
            reader = reader.with_phone(phone);
        }
        let id = reader.id();
        self.readers.push(reader);
        id
    }

    /// Links a free reader with an available book.
    pub fn checkout(&mut self, reader_id: ReaderId, book_id: BookId) -> Result<(), DomainError> {
        let r_idx = self.reader_index(reader_id)?;
        let b_idx = self.book_index(book_id)?;

        if self.readers[r_idx].is_active() {
            return Err(DomainError::ReaderHasLoan(reader_id));
        }
        if !self.books[b_idx].is_available() {
            return Err(DomainError::BookUnavailable(book_id));
        }

        // Both checks passed; apply the pair together.
        self.readers[r_idx].give_book(Some(&self.books[b_idx]));
        self.books[b_idx].mark_taken();
        Ok(())
    }

    /// Unlinks the reader from the held book and makes it available again.
    pub fn return_book(&mut self, reader_id: ReaderId) -> Result<BookId, DomainError> {
        let r_idx = self.reader_index(reader_id)?;
        let b_idx = self.resolved_loan_index(r_idx)?;

        let book_id = self.books[b_idx].id();
        self.readers[r_idx].take_book_back();
        self.books[b_idx].mark_available();
        Ok(book_id)
    }

    /// Removes a reader. A resolved loan is returned first; a dangling one
    /// has no book to release.
    pub fn remove_reader(&mut self, id: ReaderId) -> Result<Reader, DomainError> {
        let r_idx = self.reader_index(id)?;
        if let Ok(b_idx) = self.resolved_loan_index(r_idx) {
            self.readers[r_idx].take_book_back();
            self.books[b_idx].mark_available();
        }
        Ok(self.readers.remove(r_idx))
    }

    /// Removes a book from the catalog. Refused while any reader holds it;
    /// an unavailable book nobody claims can be removed.
    pub fn remove_book(&mut self, id: BookId) -> Result<Book, DomainError> {
        let b_idx = self.book_index(id)?;
        let held = self
            .readers
            .iter()
            .any(|r| r.active_book_id() == Some(id));
        if held {
            return Err(DomainError::BookOnLoan(id));
        }
        Ok(self.books.remove(b_idx))
    }

    // --- Candidate filters ---

    /// Readers eligible for checkout.
    pub fn free_readers(&self) -> Vec<&Reader> {
        self.readers.iter().filter(|r| !r.is_active()).collect()
    }

    /// Books eligible for checkout.
    pub fn available_books(&self) -> Vec<&Book> {
        self.books.iter().filter(|b| b.is_available()).collect()
    }

    /// Readers eligible for return: active with a resolved book.
    pub fn readers_with_books(&self) -> Vec<&Reader> {
        self.readers
            .iter()
            .filter(|r| r.is_active() && self.active_book_of(r).is_some())
            .collect()
    }

    // --- Search & reports ---

    pub fn find_books_by_title(&self, query: &str) -> Vec<&Book> {
        self.books.iter().filter(|b| b.matches_title(query)).collect()
    }

    pub fn find_books_by_author(&self, query: &str) -> Vec<&Book> {
        self.books.iter().filter(|b| b.matches_author(query)).collect()
    }

    pub fn find_readers_by_name(&self, query: &str) -> Vec<&Reader> {
        self.readers.iter().filter(|r| r.matches_name(query)).collect()
    }

    /// Readers whose resolved active book title matches.
    pub fn find_readers_by_book_title(&self, query: &str) -> Vec<&Reader> {
        self.readers
            .iter()
            .filter(|r| {
                self.active_book_of(r)
                    .is_some_and(|b| contains_ignore_case(b.title(), query))
            })
            .collect()
    }

    /// Most taken books first. Ties keep catalog order.
    pub fn popular_books(&self, limit: usize) -> Vec<&Book> {
        let mut ranked: Vec<&Book> = self.books.iter().collect();
        ranked.sort_by(|a, b| b.times_taken().cmp(&a.times_taken()));
        ranked.truncate(limit);
        ranked
    }

    /// Resolves every reader's durable book reference against the catalog.
    ///
    /// The first reader claiming a book keeps it; later claimants stay
    /// unresolved so the book can only be returned once.
    pub fn reconcile(&mut self) -> ReconcileReport {
        let index: HashMap<BookId, &Book> = self.books.iter().map(|b| (b.id(), b)).collect();
        let mut claimed: HashSet<BookId> = HashSet::new();
        let mut report = ReconcileReport::default();

        for reader in &mut self.readers {
            let Some(book_id) = reader.active_book_id() else {
                reader.resolve(None);
                continue;
            };
            match index.get(&book_id) {
                Some(_) if claimed.contains(&book_id) => {
                    reader.resolve(None);
                    report.contested.push(reader.id());
                }
                Some(book) => {
                    reader.resolve(Some(book.id()));
                    claimed.insert(book_id);
                    report.resolved += 1;
                }
                None => {
                    reader.resolve(None);
                    report.dangling.push(reader.id());
                }
            }
        }

        report.orphaned = self
            .books
            .iter()
            .filter(|b| !b.is_available() && !claimed.contains(&b.id()))
            .map(|b| b.id())
            .collect();

        report
    }

    // --- Private helpers ---

    fn book_index(&self, id: BookId) -> Result<usize, DomainError> {
        self.books
            .iter()
            .position(|b| b.id() == id)
            .ok_or(DomainError::BookNotFound(id))
    }

    fn reader_index(&self, id: ReaderId) -> Result<usize, DomainError> {
        self.readers
            .iter()
            .position(|r| r.id() == id)
            .ok_or(DomainError::ReaderNotFound(id))
    }

    fn resolved_loan_index(&self, r_idx: usize) -> Result<usize, DomainError> {
        let reader = &self.readers[r_idx];
        let book_id = match reader.active_book_id() {
            Some(id) if reader.is_active() => id,
            _ => return Err(DomainError::NoActiveLoan(reader.id())),
        };
        let dangling = DomainError::DanglingLoan {
            reader: reader.id(),
            book: book_id,
        };
        if reader.active_book() != Some(book_id) {
            return Err(dangling);
        }
        self.book_index(book_id).map_err(|_| dangling)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(library: &mut Library, title: &str) -> BookId {
        library.add_book(AddBookRequest {
            title: title.into(),
            author: "Author".into(),
            year: 2000,
        })
    }

    fn reader(library: &mut Library, name: &str) -> ReaderId {
        library.add_reader(AddReaderRequest {
            full_name: name.into(),
            phone: None,
        })
    }

    fn taken(library: &mut Library, title: &str, times: u32) -> BookId {
        let id = book(library, title);
        let r = reader(library, "tmp");
        for _ in 0..times {
            library.checkout(r, id).unwrap();
            library.return_book(r).unwrap();
        }
        library.remove_reader(r).unwrap();
        id
    }

    #[test]
    fn checkout_links_pair() {
        let mut lib = Library::new();
        let b = book(&mut lib, "Dune");
        let r = reader(&mut lib, "Ada");

        lib.checkout(r, b).unwrap();

        let reader = lib.get_reader(r).unwrap();
        assert!(reader.is_active());
        assert_eq!(reader.active_book_id(), Some(b));
        assert_eq!(lib.active_book_of(reader).unwrap().title(), "Dune");
        let book = lib.get_book(b).unwrap();
        assert!(!book.is_available());
        assert_eq!(book.times_taken(), 1);
    }

    #[test]
    fn reject_checkout_of_unavailable_book() {
        let mut lib = Library::new();
        let b = book(&mut lib, "Dune");
        let r1 = reader(&mut lib, "Ada");
        let r2 = reader(&mut lib, "Grace");
        lib.checkout(r1, b).unwrap();

        let result = lib.checkout(r2, b);
        assert!(matches!(result, Err(DomainError::BookUnavailable(id)) if id == b));
        assert!(!lib.get_reader(r2).unwrap().is_active());
        assert_eq!(lib.get_book(b).unwrap().times_taken(), 1);
    }

    #[test]
    fn reject_second_loan_for_active_reader() {
        let mut lib = Library::new();
        let b1 = book(&mut lib, "Dune");
        let b2 = book(&mut lib, "Emma");
        let r = reader(&mut lib, "Ada");
        lib.checkout(r, b1).unwrap();

        let result = lib.checkout(r, b2);
        assert!(matches!(result, Err(DomainError::ReaderHasLoan(_))));
        assert!(lib.get_book(b2).unwrap().is_available());
        assert_eq!(lib.get_reader(r).unwrap().active_book_id(), Some(b1));
    }

    #[test]
    fn checkout_unknown_ids() {
        let mut lib = Library::new();
        let b = book(&mut lib, "Dune");
        let r = reader(&mut lib, "Ada");

        assert!(matches!(
            lib.checkout(ReaderId::new(), b),
            Err(DomainError::ReaderNotFound(_))
        ));
        assert!(matches!(
            lib.checkout(r, BookId::new()),
            Err(DomainError::BookNotFound(_))
        ));
        assert!(lib.get_book(b).unwrap().is_available());
    }

    #[test]
    fn return_restores_availability_keeps_counter() {
        let mut lib = Library::new();
        let b = book(&mut lib, "Dune");
        let r = reader(&mut lib, "Ada");
        lib.checkout(r, b).unwrap();

        assert_eq!(lib.return_book(r).unwrap(), b);

        let book = lib.get_book(b).unwrap();
        assert!(book.is_available());
        assert_eq!(book.times_taken(), 1);
        assert!(!lib.get_reader(r).unwrap().is_active());
    }

    #[test]
    fn return_without_loan() {
        let mut lib = Library::new();
        let r = reader(&mut lib, "Ada");
        assert!(matches!(lib.return_book(r), Err(DomainError::NoActiveLoan(_))));
    }

    #[test]
    fn remove_reader_returns_held_book() {
        let mut lib = Library::new();
        let b = book(&mut lib, "Dune");
        let r = reader(&mut lib, "Ada");
        lib.checkout(r, b).unwrap();

        let removed = lib.remove_reader(r).unwrap();
        assert_eq!(removed.full_name(), "Ada");
        assert!(!removed.is_active());
        assert!(lib.get_reader(r).is_none());
        assert!(lib.get_book(b).unwrap().is_available());
    }

    #[test]
    fn remove_unknown_reader() {
        let mut lib = Library::new();
        assert!(matches!(
            lib.remove_reader(ReaderId::new()),
            Err(DomainError::ReaderNotFound(_))
        ));
    }

    #[test]
    fn remove_book_refused_while_on_loan() {
        let mut lib = Library::new();
        let b = book(&mut lib, "Dune");
        let r = reader(&mut lib, "Ada");
        lib.checkout(r, b).unwrap();

        assert!(matches!(lib.remove_book(b), Err(DomainError::BookOnLoan(_))));

        lib.return_book(r).unwrap();
        let removed = lib.remove_book(b).unwrap();
        assert_eq!(removed.title(), "Dune");
        assert!(lib.books().is_empty());
    }

    #[test]
    fn candidate_filters() {
        let mut lib = Library::new();
        let b1 = book(&mut lib, "Dune");
        let b2 = book(&mut lib, "Emma");
        let r1 = reader(&mut lib, "Ada");
        let r2 = reader(&mut lib, "Grace");
        lib.checkout(r1, b1).unwrap();

        let free: Vec<ReaderId> = lib.free_readers().iter().map(|r| r.id()).collect();
        assert_eq!(free, vec![r2]);
        let avail: Vec<BookId> = lib.available_books().iter().map(|b| b.id()).collect();
        assert_eq!(avail, vec![b2]);
        let holding: Vec<ReaderId> = lib.readers_with_books().iter().map(|r| r.id()).collect();
        assert_eq!(holding, vec![r1]);
    }

    #[test]
    fn search_is_case_insensitive() {
        let mut lib = Library::new();
        lib.add_book(AddBookRequest {
            title: "Pride and Prejudice".into(),
            author: "Jane Austen".into(),
            year: 1813,
        });
        lib.add_book(AddBookRequest {
            title: "Emma".into(),
            author: "Jane Austen".into(),
            year: 1815,
        });
        lib.add_book(AddBookRequest {
            title: "Dune".into(),
            author: "Frank Herbert".into(),
            year: 1965,
        });

        assert_eq!(lib.find_books_by_title("PRIDE").len(), 1);
        assert_eq!(lib.find_books_by_author("austen").len(), 2);
        assert!(lib.find_books_by_title("zzz").is_empty());
    }

    #[test]
    fn find_readers_by_name_and_book_title() {
        let mut lib = Library::new();
        let b = book(&mut lib, "Dune Messiah");
        let ada = reader(&mut lib, "Ada Lovelace");
        let _grace = reader(&mut lib, "Grace Hopper");
        lib.checkout(ada, b).unwrap();

        let by_name = lib.find_readers_by_name("hopper");
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].full_name(), "Grace Hopper");

        let by_title = lib.find_readers_by_book_title("messiah");
        assert_eq!(by_title.len(), 1);
        assert_eq!(by_title[0].id(), ada);
    }

    #[test]
    fn popularity_ranking_is_stable() {
        let mut lib = Library::new();
        let counts = [5, 3, 3, 0, 8, 1];
        let ids: Vec<BookId> = counts
            .iter()
            .enumerate()
            .map(|(i, &n)| taken(&mut lib, &format!("B{i}"), n))
            .collect();

        let top: Vec<BookId> = lib.popular_books(5).iter().map(|b| b.id()).collect();
        assert_eq!(top, vec![ids[4], ids[0], ids[1], ids[2], ids[5]]);
    }

    #[test]
    fn reconcile_resolves_and_reports_dangling() {
        let dune = Book::new("Dune", "Frank Herbert", 1965);
        let ghost = Book::new("Ghost", "Nobody", 1900);

        let mut holder = Reader::new("Ada");
        holder.give_book(Some(&dune));
        let mut lost = Reader::new("Grace");
        lost.give_book(Some(&ghost));
        let free = Reader::new("Linus");

        // Simulate a load: resolved links are not persisted.
        let readers: Vec<Reader> = [holder, lost, free]
            .iter()
            .map(|r| serde_json::from_value(serde_json::to_value(r).unwrap()).unwrap())
            .collect();
        let lost_id = readers[1].id();

        let (lib, report) = Library::from_parts(vec![dune.clone()], readers);

        assert_eq!(report.resolved, 1);
        assert_eq!(report.dangling, vec![lost_id]);

        let lost = lib.get_reader(lost_id).unwrap();
        assert!(lost.is_active());
        assert_eq!(lost.active_book_id(), Some(ghost.id()));
        assert!(lib.active_book_of(lost).is_none());
        assert_eq!(lib.readers_with_books().len(), 1);
    }

    #[test]
    fn reconcile_reports_orphaned_books_and_allows_removal() {
        let json = r#"[{
            "Id": "3a6f0c2e-9d41-4b7e-8c15-7e2d9f4a1b60",
            "Title": "Left Behind",
            "Author": "Someone",
            "Year": 1999,
            "TimesTaken": 3,
            "IsAvaliable": false
        }]"#;
        let books: Vec<Book> = serde_json::from_str(json).unwrap();
        let orphan = books[0].id();

        let (mut lib, report) = Library::from_parts(books, Vec::new());

        assert_eq!(report.orphaned, vec![orphan]);
        assert!(!report.is_clean());
        assert!(lib.available_books().is_empty());

        let removed = lib.remove_book(orphan).unwrap();
        assert_eq!(removed.title(), "Left Behind");
        assert!(lib.books().is_empty());
    }

    #[test]
    fn reconcile_resolves_only_first_of_duplicate_claimants() {
        let mut dune = Book::new("Dune", "Frank Herbert", 1965);
        dune.mark_taken();
        let mut first = Reader::new("Ada");
        first.give_book(Some(&dune));
        let mut second = Reader::new("Grace");
        second.give_book(Some(&dune));
        let (first_id, second_id, book_id) = (first.id(), second.id(), dune.id());

        let (mut lib, report) = Library::from_parts(vec![dune], vec![first, second]);

        assert_eq!(report.resolved, 1);
        assert_eq!(report.contested, vec![second_id]);
        assert!(report.orphaned.is_empty());
        assert_eq!(lib.readers_with_books().len(), 1);

        assert_eq!(lib.return_book(first_id).unwrap(), book_id);
        assert!(matches!(
            lib.return_book(second_id),
            Err(DomainError::DanglingLoan { .. })
        ));
    }

    #[test]
    fn dangling_loan_cannot_be_returned_but_reader_can_be_removed() {
        let ghost = Book::new("Ghost", "Nobody", 1900);
        let mut lost = Reader::new("Grace");
        lost.give_book(Some(&ghost));
        lost.resolve(None);
        let id = lost.id();

        let (mut lib, _) = Library::from_parts(Vec::new(), vec![lost]);

        assert!(matches!(
            lib.return_book(id),
            Err(DomainError::DanglingLoan { .. })
        ));
        assert!(lib.get_reader(id).unwrap().is_active());

        lib.remove_reader(id).unwrap();
        assert!(lib.readers().is_empty());
    }
}
