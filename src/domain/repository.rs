use super::model::book::Book;
use super::model::reader::Reader;

/// Persistence seam for the two collections. Implemented by the infra layer.
///
/// `Ok(None)` means the resource does not exist yet.
pub trait LibraryRepository {
    type Error: std::error::Error + Send + Sync + 'static;

    fn load_books(&self) -> Result<Option<Vec<Book>>, Self::Error>;
    fn load_readers(&self) -> Result<Option<Vec<Reader>>, Self::Error>;
    fn save_books(&self, books: &[Book]) -> Result<(), Self::Error>;
    fn save_readers(&self, readers: &[Reader]) -> Result<(), Self::Error>;
}
