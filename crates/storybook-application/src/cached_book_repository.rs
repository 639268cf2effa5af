//! Write-through in-memory mirror of the book store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use storybook_core::book::{
    BOOK_ENTITY, Book, BookRepository, BookStore, CacheStats, prepare_create, prepare_update,
    validate_book_id,
};
use storybook_core::error::{Result, StorybookError};
use storybook_infrastructure::FileBookStore;
use tokio::sync::{Mutex, RwLock};

/// Book repository serving reads from memory and writing through to a store.
///
/// Every persisted book is loaded by [`initialize`](Self::initialize); after
/// that, reads never touch the disk and a miss means the book does not
/// exist. There is no eviction.
///
/// Mutations are serialized by one writer lock held for the whole
/// persist-then-publish step, so readers only ever observe states that are
/// already durable. A failed persist leaves memory untouched.
///
/// Cloning is cheap and every clone shares the same map.
#[derive(Clone)]
pub struct CachedBookRepository {
    inner: Arc<Inner>,
}

struct Inner {
    store: Arc<dyn BookStore>,
    books: RwLock<HashMap<String, Book>>,
    /// Serializes create/update/delete/refresh/shutdown.
    writer: Mutex<()>,
    ready: AtomicBool,
}

impl CachedBookRepository {
    /// Wraps `store`. The repository rejects every operation until
    /// [`initialize`](Self::initialize) has run.
    pub fn new(store: Arc<dyn BookStore>) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                books: RwLock::new(HashMap::new()),
                writer: Mutex::new(()),
                ready: AtomicBool::new(false),
            }),
        }
    }

    /// Opens a `FileBookStore` under `data_root` and warms the cache from it.
    pub async fn open(data_root: &Path) -> Result<Self> {
        let store = FileBookStore::open(data_root).await?;
        let repository = Self::new(Arc::new(store));
        repository.initialize().await?;
        Ok(repository)
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.ready.load(Ordering::SeqCst)
    }

    /// Loads every persisted book into memory.
    ///
    /// Unreadable documents are logged and skipped. Calling this again
    /// rebuilds the map from disk, which is what [`refresh`](Self::refresh)
    /// does on an initialized repository.
    pub async fn initialize(&self) -> Result<CacheStats> {
        let inner = self.inner.clone();
        tokio::spawn(async move { inner.reload(false).await }).await?
    }

    /// Resynchronizes memory from disk after out-of-band changes.
    ///
    /// Holds the writer lock for the whole scan, so no mutation interleaves
    /// with it and readers see either the old map or the new one. A refresh
    /// that was queued behind [`shutdown`](Self::shutdown) fails with
    /// `NotInitialized` instead of bringing the cache back.
    pub async fn refresh(&self) -> Result<CacheStats> {
        self.inner.ensure_ready()?;
        let inner = self.inner.clone();
        let stats = tokio::spawn(async move { inner.reload(true).await }).await??;
        tracing::info!("Book cache refreshed: {} books", stats.cached_count);
        Ok(stats)
    }

    /// Reports what is currently cached.
    pub async fn stats(&self) -> Result<CacheStats> {
        self.inner.ensure_ready()?;
        let books = self.inner.books.read().await;
        Ok(CacheStats::from_ids(books.keys().cloned()))
    }

    /// Drops every cached entry. Files on disk are kept.
    pub async fn clear_cache(&self) -> Result<()> {
        self.inner.ensure_ready()?;
        let _guard = self.inner.writer.lock().await;
        let mut books = self.inner.books.write().await;
        let dropped = books.len();
        books.clear();
        tracing::info!("Book cache cleared ({} entries dropped)", dropped);
        Ok(())
    }

    /// Waits for in-flight mutations, then empties the cache and marks the
    /// repository uninitialized.
    pub async fn shutdown(&self) {
        let _guard = self.inner.writer.lock().await;
        self.inner.ready.store(false, Ordering::SeqCst);
        self.inner.books.write().await.clear();
        tracing::info!("Book cache shut down");
    }
}

impl Inner {
    fn ensure_ready(&self) -> Result<()> {
        if self.ready.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StorybookError::NotInitialized)
        }
    }

    async fn reload(&self, require_ready: bool) -> Result<CacheStats> {
        let _guard = self.writer.lock().await;
        if require_ready {
            self.ensure_ready()?;
        }

        let loaded = self.store.load_all().await?;
        let fresh: HashMap<String, Book> = loaded
            .into_iter()
            .map(|book| (book.id.clone(), book))
            .collect();
        let stats = CacheStats::from_ids(fresh.keys().cloned());

        *self.books.write().await = fresh;
        self.ready.store(true, Ordering::SeqCst);

        tracing::info!("Book cache warmed up: {} books", stats.cached_count);
        Ok(stats)
    }

    /// Persists `next` for `book_id` (or deletes it when `None`), then
    /// publishes the same change to memory.
    ///
    /// Must be called with the writer lock held. Returns whether anything
    /// was present before, on disk or in memory.
    async fn write_through(&self, book_id: &str, next: Option<Book>) -> Result<bool> {
        let persisted = match &next {
            Some(book) => self.store.save(book).await.map(|()| true),
            None => self.store.delete(book_id).await,
        };
        let on_disk = persisted.map_err(|e| {
            tracing::error!("Write-through failed for book {}, cache unchanged: {}", book_id, e);
            e
        })?;

        let mut books = self.books.write().await;
        let in_memory = match next {
            Some(book) => books.insert(book_id.to_string(), book).is_some(),
            None => books.remove(book_id).is_some(),
        };
        Ok(on_disk || in_memory)
    }

    async fn create(&self, book: Book) -> Result<Book> {
        let _guard = self.writer.lock().await;
        self.ensure_ready()?;

        if self.books.read().await.contains_key(&book.id) {
            return Err(StorybookError::already_exists(BOOK_ENTITY, &book.id));
        }
        // A document skipped at warm-up still owns its id.
        match self.store.load(&book.id).await {
            Ok(None) => {}
            Ok(Some(_)) => return Err(StorybookError::already_exists(BOOK_ENTITY, &book.id)),
            Err(e) if e.is_corrupt() => {
                tracing::warn!("Book id {} is held by an unreadable document", book.id);
                return Err(StorybookError::already_exists(BOOK_ENTITY, &book.id));
            }
            Err(e) => return Err(e),
        }
        self.write_through(&book.id, Some(book.clone())).await?;

        tracing::info!("Book created: {}", book.id);
        Ok(book)
    }

    async fn update(&self, book_id: String, book: Book) -> Result<Book> {
        let _guard = self.writer.lock().await;
        self.ensure_ready()?;

        let previous = self
            .books
            .read()
            .await
            .get(&book_id)
            .cloned()
            .ok_or_else(|| StorybookError::not_found(BOOK_ENTITY, &book_id))?;
        let book = prepare_update(&book_id, &previous, book)?;
        self.write_through(&book_id, Some(book.clone())).await?;

        tracing::info!("Book updated: {} (status {})", book_id, book.status);
        Ok(book)
    }

    async fn delete(&self, book_id: String) -> Result<bool> {
        let _guard = self.writer.lock().await;
        self.ensure_ready()?;

        // The store is asked even on a cache miss so that stale files left by
        // skipped documents go away as well.
        let removed = self.write_through(&book_id, None).await?;
        if removed {
            tracing::info!("Book deleted: {}", book_id);
        } else {
            tracing::warn!("Book not found for deletion: {}", book_id);
        }
        Ok(removed)
    }
}

#[async_trait]
impl BookRepository for CachedBookRepository {
    async fn create(&self, book: Book) -> Result<Book> {
        self.inner.ensure_ready()?;
        let book = prepare_create(book)?;
        let inner = self.inner.clone();
        tokio::spawn(async move { inner.create(book).await }).await?
    }

    async fn get(&self, book_id: &str) -> Result<Option<Book>> {
        self.inner.ensure_ready()?;
        let book = self.inner.books.read().await.get(book_id).cloned();
        match &book {
            Some(_) => tracing::debug!("Book cache hit: {}", book_id),
            None => tracing::debug!("Book cache miss: {}", book_id),
        }
        Ok(book)
    }

    async fn get_all(&self) -> Result<Vec<Book>> {
        self.inner.ensure_ready()?;
        let books = self.inner.books.read().await;
        Ok(books.values().cloned().collect())
    }

    async fn update(&self, book_id: &str, book: Book) -> Result<Book> {
        self.inner.ensure_ready()?;
        let inner = self.inner.clone();
        let book_id = book_id.to_string();
        tokio::spawn(async move { inner.update(book_id, book).await }).await?
    }

    async fn delete(&self, book_id: &str) -> Result<bool> {
        self.inner.ensure_ready()?;
        if let Err(e) = validate_book_id(book_id) {
            tracing::warn!("Nothing to delete for invalid book id {:?}: {}", book_id, e);
            return Ok(false);
        }
        let inner = self.inner.clone();
        let book_id = book_id.to_string();
        tokio::spawn(async move { inner.delete(book_id).await }).await?
    }

    async fn exists(&self, book_id: &str) -> Result<bool> {
        self.inner.ensure_ready()?;
        Ok(self.inner.books.read().await.contains_key(book_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storybook_core::book::{BookStatus, Page};
    use storybook_infrastructure::FaultyBookStore;
    use tempfile::TempDir;

    async fn create_test_repository() -> (CachedBookRepository, Arc<FaultyBookStore>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let file_store = FileBookStore::open(temp_dir.path()).await.unwrap();
        let store = Arc::new(FaultyBookStore::new(Arc::new(file_store)));
        let repo = CachedBookRepository::new(store.clone());
        repo.initialize().await.unwrap();
        (repo, store, temp_dir)
    }

    #[tokio::test]
    async fn test_operations_require_initialize() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileBookStore::open(temp_dir.path()).await.unwrap();
        let repo = CachedBookRepository::new(Arc::new(store));

        assert!(!repo.is_initialized());
        assert_eq!(repo.get("x").await.unwrap_err(), StorybookError::NotInitialized);
        assert_eq!(
            repo.create(Book::new("T", "")).await.unwrap_err(),
            StorybookError::NotInitialized
        );
        assert_eq!(repo.stats().await.unwrap_err(), StorybookError::NotInitialized);
        assert_eq!(repo.refresh().await.unwrap_err(), StorybookError::NotInitialized);

        repo.initialize().await.unwrap();
        assert!(repo.is_initialized());
        assert!(repo.get("x").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let (repo, _store, _temp_dir) = create_test_repository().await;
        let mut book = Book::new("T", "/data/image/cover.png");
        book.push_page(Page::new(1, "/data/image/p1.png"));

        let created = repo.create(book.clone()).await.unwrap();
        assert_eq!(created, book);
        assert_eq!(repo.get(&book.id).await.unwrap(), Some(book.clone()));
        assert!(repo.exists(&book.id).await.unwrap());
        assert_eq!(repo.stats().await.unwrap().ids, vec![book.id]);
    }

    #[tokio::test]
    async fn test_create_duplicate_is_rejected() {
        let (repo, store, _temp_dir) = create_test_repository().await;
        let book = Book::new("T", "");
        repo.create(book.clone()).await.unwrap();

        let err = repo.create(book).await.unwrap_err();
        assert!(matches!(err, StorybookError::AlreadyExists { .. }));
        assert_eq!(store.save_calls(), 1);
    }

    #[tokio::test]
    async fn test_failed_create_leaves_no_entry() {
        let (repo, store, _temp_dir) = create_test_repository().await;
        store.fail_saves(true);

        let book = Book::new("T", "");
        assert!(repo.create(book.clone()).await.unwrap_err().is_persistence());
        assert!(repo.get(&book.id).await.unwrap().is_none());
        assert_eq!(repo.stats().await.unwrap().cached_count, 0);
    }

    #[tokio::test]
    async fn test_failed_update_keeps_previous() {
        let (repo, store, _temp_dir) = create_test_repository().await;
        let book = repo.create(Book::new("T", "")).await.unwrap();

        store.fail_saves(true);
        let mut changed = book.clone();
        changed.status = BookStatus::Success;
        assert!(repo.update(&book.id, changed).await.is_err());

        assert_eq!(repo.get(&book.id).await.unwrap(), Some(book.clone()));
        assert_eq!(store.load(&book.id).await.unwrap(), Some(book));
    }

    #[tokio::test]
    async fn test_failed_delete_keeps_entry() {
        let (repo, store, _temp_dir) = create_test_repository().await;
        let book = repo.create(Book::new("T", "")).await.unwrap();

        store.fail_deletes(true);
        assert!(repo.delete(&book.id).await.is_err());
        assert!(repo.exists(&book.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_missing_does_not_touch_store() {
        let (repo, store, _temp_dir) = create_test_repository().await;
        let err = repo.update("missing", Book::new("T", "")).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(store.save_calls(), 0);
    }

    #[tokio::test]
    async fn test_get_all_returns_copies() {
        let (repo, _store, _temp_dir) = create_test_repository().await;
        let book = repo.create(Book::new("T", "")).await.unwrap();

        let mut all = repo.get_all().await.unwrap();
        all[0].title = "mutated".to_string();

        assert_eq!(repo.get(&book.id).await.unwrap().unwrap().title, "T");
    }

    #[tokio::test]
    async fn test_clear_cache_keeps_files() {
        let (repo, store, _temp_dir) = create_test_repository().await;
        let book = repo.create(Book::new("T", "")).await.unwrap();

        repo.clear_cache().await.unwrap();
        assert!(repo.get(&book.id).await.unwrap().is_none());
        assert!(store.load(&book.id).await.unwrap().is_some());

        let stats = repo.refresh().await.unwrap();
        assert_eq!(stats.ids, vec![book.id]);
    }

    #[tokio::test]
    async fn test_shutdown_then_reinitialize() {
        let (repo, _store, _temp_dir) = create_test_repository().await;
        let book = repo.create(Book::new("T", "")).await.unwrap();

        repo.shutdown().await;
        assert!(!repo.is_initialized());
        assert_eq!(
            repo.get(&book.id).await.unwrap_err(),
            StorybookError::NotInitialized
        );

        let stats = repo.initialize().await.unwrap();
        assert_eq!(stats.cached_count, 1);
        assert!(repo.exists(&book.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_refresh_queued_behind_shutdown_stays_down() {
        let (repo, store, _temp_dir) = create_test_repository().await;
        store.delay_saves(std::time::Duration::from_millis(100));

        let slow = {
            let repo = repo.clone();
            tokio::spawn(async move { repo.create(Book::new("slow", "")).await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        let shutdown = {
            let repo = repo.clone();
            tokio::spawn(async move { repo.shutdown().await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        let refresh = {
            let repo = repo.clone();
            tokio::spawn(async move { repo.refresh().await })
        };

        slow.await.unwrap().unwrap();
        shutdown.await.unwrap();
        assert_eq!(
            refresh.await.unwrap().unwrap_err(),
            StorybookError::NotInitialized
        );
        assert!(!repo.is_initialized());
    }

    #[tokio::test]
    async fn test_delete_invalid_id_is_nothing_to_delete() {
        let (repo, store, _temp_dir) = create_test_repository().await;
        store.fail_deletes(true);

        for id in ["a/b", ".x", "", ".."] {
            assert!(!repo.delete(id).await.unwrap());
            assert!(repo.get(id).await.unwrap().is_none());
        }
    }

    #[tokio::test]
    async fn test_create_over_stored_document_is_rejected() {
        let (repo, store, _temp_dir) = create_test_repository().await;
        let book = Book::new("T", "");
        store.save(&book).await.unwrap();

        let err = repo.create(book).await.unwrap_err();
        assert!(matches!(err, StorybookError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn test_failed_scan_keeps_previous_map() {
        let (repo, store, _temp_dir) = create_test_repository().await;
        let book = repo.create(Book::new("T", "")).await.unwrap();

        store.fail_list(true);
        assert!(repo.refresh().await.is_err());
        assert!(repo.exists(&book.id).await.unwrap());
    }
}
