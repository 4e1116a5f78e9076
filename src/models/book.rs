//! Book (catalog entry) model and related types

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::AppError;

/// Catalog entry with its copy counts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BookRecord")]
pub struct Book {
    #[serde(rename = "book_id")]
    pub id: String,
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub genre: String,
    /// Fixed at creation
    pub total_copies: u32,
    pub available_copies: u32,
    /// Mirrors `available_copies > 0`; stored for older readers of the snapshot.
    pub is_available: bool,
}

/// Snapshot shape of a book, where `is_available` may be missing.
#[derive(Deserialize)]
struct BookRecord {
    book_id: String,
    title: String,
    author: String,
    isbn: String,
    genre: String,
    total_copies: u32,
    available_copies: u32,
    is_available: Option<bool>,
}

impl From<BookRecord> for Book {
    fn from(r: BookRecord) -> Self {
        Self {
            is_available: r.is_available.unwrap_or(r.available_copies > 0),
            id: r.book_id,
            title: r.title,
            author: r.author,
            isbn: r.isbn,
            genre: r.genre,
            total_copies: r.total_copies,
            available_copies: r.available_copies,
        }
    }
}

impl Book {
    pub fn new(id: String, data: CreateBook) -> Self {
        Self {
            id,
            title: data.title,
            author: data.author,
            isbn: data.isbn,
            genre: data.genre,
            total_copies: data.total_copies,
            available_copies: data.total_copies,
            is_available: data.total_copies > 0,
        }
    }

    /// Take one copy off the shelf. Callers check availability first.
    pub(crate) fn check_out(&mut self) {
        debug_assert!(self.available_copies > 0);
        self.available_copies = self.available_copies.saturating_sub(1);
        self.is_available = self.available_copies > 0;
    }

    /// Put one copy back on the shelf.
    pub(crate) fn check_in(&mut self) {
        self.available_copies = (self.available_copies + 1).min(self.total_copies);
        self.is_available = self.available_copies > 0;
    }

    fn apply(&mut self, update: UpdateBook) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(author) = update.author {
            self.author = author;
        }
        if let Some(isbn) = update.isbn {
            self.isbn = isbn;
        }
        if let Some(genre) = update.genre {
            self.genre = genre;
        }
    }

    pub(crate) fn update(&mut self, update: UpdateBook) -> Result<(), AppError> {
        update.validate()?;
        self.apply(update);
        Ok(())
    }
}

/// Create book request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateBook {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Author is required"))]
    pub author: String,
    pub isbn: String,
    pub genre: String,
    pub total_copies: u32,
}

/// Update book request. Copy counts are not editable; they only move
/// through borrowing and returning.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateBook {
    #[validate(length(min = 1, message = "Title cannot be empty"))]
    pub title: Option<String>,
    #[validate(length(min = 1, message = "Author cannot be empty"))]
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub genre: Option<String>,
}

/// Field a catalog search matches against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookSearchField {
    #[default]
    Title,
    Author,
    Isbn,
    Genre,
}

impl BookSearchField {
    pub fn value<'a>(&self, book: &'a Book) -> &'a str {
        match self {
            BookSearchField::Title => &book.title,
            BookSearchField::Author => &book.author,
            BookSearchField::Isbn => &book.isbn,
            BookSearchField::Genre => &book.genre,
        }
    }
}

impl std::str::FromStr for BookSearchField {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "title" => Ok(BookSearchField::Title),
            "author" => Ok(BookSearchField::Author),
            "isbn" => Ok(BookSearchField::Isbn),
            "genre" => Ok(BookSearchField::Genre),
            other => Err(AppError::Validation(format!("unknown search field: {}", other))),
        }
    }
}

impl std::fmt::Display for BookSearchField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            BookSearchField::Title => "title",
            BookSearchField::Author => "author",
            BookSearchField::Isbn => "isbn",
            BookSearchField::Genre => "genre",
        };
        write!(f, "{}", label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dune(copies: u32) -> Book {
        Book::new(
            "B1000".into(),
            CreateBook {
                title: "Dune".into(),
                author: "Frank Herbert".into(),
                isbn: "978-0441013593".into(),
                genre: "Science Fiction".into(),
                total_copies: copies,
            },
        )
    }

    #[test]
    fn test_new_book_has_all_copies_available() {
        let book = dune(2);
        assert_eq!(book.available_copies, 2);
        assert!(book.is_available);
        assert!(!dune(0).is_available);
    }

    #[test]
    fn test_check_out_and_in_track_availability() {
        let mut book = dune(1);
        book.check_out();
        assert_eq!(book.available_copies, 0);
        assert!(!book.is_available);
        book.check_in();
        assert_eq!(book.available_copies, 1);
        assert!(book.is_available);
    }

    #[test]
    fn test_update_rejects_empty_title() {
        let mut book = dune(1);
        let result = book.update(UpdateBook {
            title: Some(String::new()),
            ..Default::default()
        });
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(book.title, "Dune");
    }

    #[test]
    fn test_search_field_parsing() {
        assert_eq!("ISBN".parse::<BookSearchField>().unwrap(), BookSearchField::Isbn);
        assert!("publisher".parse::<BookSearchField>().is_err());
    }

    #[test]
    fn test_snapshot_field_names() {
        let json = serde_json::to_value(dune(1)).unwrap();
        assert_eq!(json["book_id"], "B1000");
        assert_eq!(json["is_available"], true);
    }

    #[test]
    fn test_missing_availability_flag_is_derived() {
        let book: Book = serde_json::from_str(
            r#"{"book_id":"a1b2c3d4","title":"Emma","author":"Austen","isbn":"1","genre":"Novel",
                "total_copies":2,"available_copies":0}"#,
        )
        .unwrap();
        assert!(!book.is_available);
    }
}
