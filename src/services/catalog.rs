//! Catalog management service

use validator::Validate;

use crate::{
    error::AppResult,
    models::book::{Book, BookSearchField, CreateBook, UpdateBook},
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Add a book with all of its copies on the shelf
    pub async fn add_book(&self, book: CreateBook) -> AppResult<Book> {
        book.validate()?;
        self.repository
            .write(|store| Ok(store.add_book(|id| Book::new(id, book)).clone()))
            .await
    }

    /// Get book by ID
    pub async fn get_book(&self, id: &str) -> AppResult<Book> {
        self.repository.read().await.book(id).cloned()
    }

    /// All books in catalog order
    pub async fn list_books(&self) -> Vec<Book> {
        self.repository.read().await.books().cloned().collect()
    }

    /// Update descriptive fields of a book
    pub async fn update_book(&self, id: &str, update: UpdateBook) -> AppResult<Book> {
        self.repository
            .write(|store| {
                let book = store.book_mut(id)?;
                book.update(update)?;
                Ok(book.clone())
            })
            .await
    }

    /// Delete a book that has no copies on loan
    pub async fn delete_book(&self, id: &str) -> AppResult<()> {
        self.repository
            .write(|store| store.delete_book(id))
            .await
            .map(|_| ())
    }

    /// Case-insensitive substring search on one field
    pub async fn search_books(&self, query: &str, field: BookSearchField) -> Vec<Book> {
        let needle = query.to_lowercase();
        self.repository
            .read()
            .await
            .books()
            .filter(|book| field.value(book).to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }
}
