use serde::{Deserialize, Serialize};

use super::id::BookId;

/// A physical item in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Book {
    id: BookId,
    title: String,
    author: String,
    year: i32,
    #[serde(default)]
    times_taken: u32,
    #[serde(rename = "IsAvailable", alias = "IsAvaliable", default = "default_available")]
    available: bool,
}

fn default_available() -> bool {
    true
}

impl Book {
    pub fn new(title: impl Into<String>, author: impl Into<String>, year: i32) -> Self {
        Self {
            id: BookId::new(),
            title: title.into(),
            author: author.into(),
            year,
            times_taken: 0,
            available: true,
        }
    }

    pub fn id(&self) -> BookId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn times_taken(&self) -> u32 {
        self.times_taken
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    /// Case-insensitive substring match on the title.
    pub fn matches_title(&self, query: &str) -> bool {
        contains_ignore_case(&self.title, query)
    }

    /// Case-insensitive substring match on the author.
    pub fn matches_author(&self, query: &str) -> bool {
        contains_ignore_case(&self.author, query)
    }

    // --- Driven by the Library only ---

    pub(crate) fn mark_taken(&mut self) {
        self.available = false;
        self.times_taken = self.times_taken.saturating_add(1);
    }

    pub(crate) fn mark_available(&mut self) {
        self.available = true;
    }
}

pub(crate) fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
