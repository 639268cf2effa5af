//! Book repository trait.
//!
//! Defines the interface the orchestration layer uses for book persistence.

use super::model::{Book, new_id};
use super::store::validate_book_id;
use crate::error::{Result, StorybookError};
use async_trait::async_trait;

/// Entity name used in errors and log lines.
pub const BOOK_ENTITY: &str = "book";

/// An abstract repository for managing storybooks.
///
/// This trait decouples callers from the specific backend: the file-backed
/// repository, the cached file-backed repository, or a database later on.
/// Callers hold an `Arc<dyn BookRepository>` and never know which one.
///
/// # Contract
///
/// - `create` assigns an id when the book has none and rejects ids that are
///   already stored.
/// - `update` requires an existing entry and never changes `created_at`.
/// - Write paths re-index pages and dialogues so that stored indices run
///   from 1 without gaps.
/// - `delete` of an absent id is not an error; it returns `false`.
#[async_trait]
pub trait BookRepository: Send + Sync {
    /// Stores a new book and returns it as stored.
    ///
    /// # Returns
    ///
    /// - `Ok(Book)`: Stored book, with id and indices assigned
    /// - `Err(StorybookError::AlreadyExists { .. })`: Id already in use
    /// - `Err(_)`: Persistence failed; nothing was stored
    async fn create(&self, book: Book) -> Result<Book>;

    /// Finds a book by its ID.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Book))`: Book found
    /// - `Ok(None)`: Book not found
    /// - `Err(_)`: Error occurred during retrieval
    async fn get(&self, book_id: &str) -> Result<Option<Book>>;

    /// Returns every stored book. Order is unspecified.
    async fn get_all(&self) -> Result<Vec<Book>>;

    /// Replaces an existing book.
    ///
    /// # Returns
    ///
    /// - `Ok(Book)`: The book as stored
    /// - `Err(StorybookError::NotFound { .. })`: No book with this id
    /// - `Err(_)`: Persistence failed; the previous version is kept
    async fn update(&self, book_id: &str, book: Book) -> Result<Book>;

    /// Deletes a book.
    ///
    /// # Returns
    ///
    /// - `Ok(true)`: Book deleted
    /// - `Ok(false)`: Nothing to delete
    /// - `Err(_)`: Persistence failed; the book is kept
    async fn delete(&self, book_id: &str) -> Result<bool>;

    /// Checks whether a book exists.
    async fn exists(&self, book_id: &str) -> Result<bool> {
        Ok(self.get(book_id).await?.is_some())
    }
}

/// Prepares a book for its first write.
///
/// Assigns an id when none is set, validates it as a path component and
/// re-indexes pages and dialogues.
pub fn prepare_create(mut book: Book) -> Result<Book> {
    if book.id.is_empty() {
        book.id = new_id();
    }
    validate_book_id(&book.id)?;
    book.normalize();
    Ok(book)
}

/// Prepares the replacement of `previous` by `book`.
///
/// The body may omit the id; if it carries one it must match `book_id`.
/// `created_at` always stays at the stored value.
pub fn prepare_update(book_id: &str, previous: &Book, mut book: Book) -> Result<Book> {
    if book.id.is_empty() {
        book.id = book_id.to_string();
    } else if book.id != book_id {
        return Err(StorybookError::validation(format!(
            "book id mismatch: {} != {}",
            book.id, book_id
        )));
    }
    book.created_at = previous.created_at;
    book.normalize();
    Ok(book)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::Page;

    #[test]
    fn test_prepare_create_assigns_id() {
        let mut book = Book::new("T", "");
        book.id.clear();
        book.push_page(Page::new(7, ""));
        book.pages[0].index = 7;

        let prepared = prepare_create(book).unwrap();
        assert!(!prepared.id.is_empty());
        assert_eq!(prepared.pages[0].index, 1);
    }

    #[test]
    fn test_prepare_create_rejects_bad_id() {
        let mut book = Book::new("T", "");
        book.id = "../escape".to_string();
        assert!(prepare_create(book).unwrap_err().is_validation());
    }

    #[test]
    fn test_prepare_update_keeps_created_at() {
        let previous = Book::new("Old", "");
        let mut replacement = Book::new("New", "");
        replacement.id.clear();

        let prepared = prepare_update(&previous.id, &previous, replacement).unwrap();
        assert_eq!(prepared.id, previous.id);
        assert_eq!(prepared.created_at, previous.created_at);
        assert_eq!(prepared.title, "New");
    }

    #[test]
    fn test_prepare_update_rejects_id_mismatch() {
        let previous = Book::new("Old", "");
        let other = Book::new("Other", "");
        let err = prepare_update(&previous.id, &previous, other).unwrap_err();
        assert!(err.is_validation());
    }
}
