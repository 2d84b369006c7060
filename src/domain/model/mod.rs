pub mod book;
pub mod id;
pub mod library;
pub mod reader;
