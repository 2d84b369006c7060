use super::model::id::{BookId, ReaderId};

#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("book not found: {0}")]
    BookNotFound(BookId),

    #[error("reader not found: {0}")]
    ReaderNotFound(ReaderId),

    #[error("book {0} is not available")]
    BookUnavailable(BookId),

    #[error("reader {0} already holds a book")]
    ReaderHasLoan(ReaderId),

    #[error("reader {0} holds no book")]
    NoActiveLoan(ReaderId),

    #[error("reader {reader} holds unknown book {book}")]
    DanglingLoan { reader: ReaderId, book: BookId },

    #[error("book {0} is checked out and cannot be removed")]
    BookOnLoan(BookId),

    #[error("invalid id format: {0:?}")]
    InvalidId(String),
}
