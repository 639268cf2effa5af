//! Durable book store trait.
//!
//! Defines the interface for the persistent, one-document-per-book store
//! that repositories write through to.

use super::model::Book;
use crate::error::{Result, StorybookError};
use async_trait::async_trait;

/// A persistent store holding the exact serialized form of each book.
///
/// # Implementation Notes
///
/// - `save` must be atomic from the caller's perspective: a concurrent
///   `load` sees either the previous document or the new one, never a
///   partial write.
/// - Absence is a normal outcome (`Ok(None)` / `Ok(false)`), not an error.
/// - A document that exists but cannot be parsed is reported as
///   [`StorybookError::CorruptRecord`] so warm-up can skip it.
#[async_trait]
pub trait BookStore: Send + Sync {
    /// Writes the full document for `book`, replacing any previous one.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Document durably written
    /// - `Err(_)`: Nothing was replaced
    async fn save(&self, book: &Book) -> Result<()>;

    /// Loads a book by its ID.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Book))`: Document found and parsed
    /// - `Ok(None)`: No document for this id
    /// - `Err(StorybookError::CorruptRecord { .. })`: Document unreadable
    async fn load(&self, book_id: &str) -> Result<Option<Book>>;

    /// Lists the ids of every stored document, in no particular order.
    async fn list_ids(&self) -> Result<Vec<String>>;

    /// Removes the document for `book_id`.
    ///
    /// # Returns
    ///
    /// - `Ok(true)`: A document was removed
    /// - `Ok(false)`: There was nothing to remove
    async fn delete(&self, book_id: &str) -> Result<bool>;

    /// Loads every stored book, skipping documents that fail to load.
    ///
    /// Only a failure to enumerate ids is fatal; a single unreadable
    /// document is logged and left out.
    async fn load_all(&self) -> Result<Vec<Book>> {
        let ids = self.list_ids().await?;
        let mut books = Vec::with_capacity(ids.len());

        for book_id in ids {
            match self.load(&book_id).await {
                Ok(Some(book)) => books.push(book),
                Ok(None) => {
                    tracing::debug!("Book {} vanished during scan", book_id);
                }
                Err(e) => {
                    tracing::warn!("Skipping unreadable book {}: {}", book_id, e);
                }
            }
        }

        Ok(books)
    }
}

/// Rejects ids that cannot be used as a single directory name.
///
/// Book ids become path components of the on-disk layout, so anything that
/// could escape the book directory is refused before I/O happens.
pub fn validate_book_id(book_id: &str) -> Result<()> {
    if book_id.is_empty() {
        return Err(StorybookError::validation("book id must not be empty"));
    }
    if book_id == "." || book_id == ".." || book_id.starts_with('.') {
        return Err(StorybookError::validation(format!(
            "book id '{}' must not start with '.'",
            book_id
        )));
    }
    if book_id.contains(['/', '\\', '\0']) {
        return Err(StorybookError::validation(format!(
            "book id '{}' must be a single path component",
            book_id
        )));
    }
    Ok(())
}
