//! Uncached `BookRepository` over a `BookStore`.

use crate::file_book_store::FileBookStore;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use storybook_core::book::{
    BOOK_ENTITY, Book, BookRepository, BookStore, prepare_create, prepare_update,
    validate_book_id,
};
use storybook_core::error::{Result, StorybookError};
use tokio::sync::Mutex;

/// Book repository that goes to the store on every call.
///
/// Reads hit the disk each time and `get_all` rescans the whole book
/// directory; use `CachedBookRepository` when that matters. Writers are
/// serialized within the process so the exists-check and the write of
/// `create`/`update` cannot interleave.
pub struct FileBookRepository {
    store: Arc<dyn BookStore>,
    writer: Mutex<()>,
}

impl FileBookRepository {
    pub fn new(store: Arc<dyn BookStore>) -> Self {
        Self {
            store,
            writer: Mutex::new(()),
        }
    }

    /// Creates a repository on a `FileBookStore` rooted at `data_root`.
    pub async fn open(data_root: &Path) -> Result<Self> {
        let store = FileBookStore::open(data_root).await?;
        Ok(Self::new(Arc::new(store)))
    }

    /// Loads a book, treating an unreadable document or an id that can
    /// never be stored as absent.
    async fn load_or_skip(&self, book_id: &str) -> Result<Option<Book>> {
        if validate_book_id(book_id).is_err() {
            return Ok(None);
        }
        match self.store.load(book_id).await {
            Err(e) if e.is_corrupt() => {
                tracing::warn!("Ignoring corrupt book {}: {}", book_id, e);
                Ok(None)
            }
            other => other,
        }
    }
}

#[async_trait]
impl BookRepository for FileBookRepository {
    async fn create(&self, book: Book) -> Result<Book> {
        let book = prepare_create(book)?;
        let _guard = self.writer.lock().await;

        if self.store.load(&book.id).await?.is_some() {
            return Err(StorybookError::already_exists(BOOK_ENTITY, &book.id));
        }
        self.store.save(&book).await?;

        tracing::info!("Book created in file system: {}", book.id);
        Ok(book)
    }

    async fn get(&self, book_id: &str) -> Result<Option<Book>> {
        self.load_or_skip(book_id).await
    }

    async fn get_all(&self) -> Result<Vec<Book>> {
        let books = self.store.load_all().await?;
        tracing::debug!("Loaded {} books from file system", books.len());
        Ok(books)
    }

    async fn update(&self, book_id: &str, book: Book) -> Result<Book> {
        let _guard = self.writer.lock().await;

        let previous = self
            .load_or_skip(book_id)
            .await?
            .ok_or_else(|| StorybookError::not_found(BOOK_ENTITY, book_id))?;
        let book = prepare_update(book_id, &previous, book)?;
        self.store.save(&book).await?;

        tracing::info!("Book updated in file system: {}", book_id);
        Ok(book)
    }

    async fn delete(&self, book_id: &str) -> Result<bool> {
        if let Err(e) = validate_book_id(book_id) {
            tracing::warn!("Nothing to delete for invalid book id {:?}: {}", book_id, e);
            return Ok(false);
        }
        let _guard = self.writer.lock().await;

        let removed = self.store.delete(book_id).await?;
        if removed {
            tracing::info!("Book metadata deleted from file system: {}", book_id);
        } else {
            tracing::warn!("Book not found for deletion: {}", book_id);
        }
        Ok(removed)
    }
}
