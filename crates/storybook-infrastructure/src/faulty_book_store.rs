//! Fault-injecting `BookStore` wrapper for testing.

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use storybook_core::book::{Book, BookStore};
use storybook_core::error::{Result, StorybookError};

/// Wraps another store and fails or slows down operations on demand.
///
/// Toggles are atomics, so a test can flip them through a shared `Arc`
/// while the repository under test holds the same store.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use storybook_infrastructure::{FaultyBookStore, FileBookStore};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let dir = tempfile::tempdir()?;
/// let store = Arc::new(FaultyBookStore::new(Arc::new(FileBookStore::open(dir.path()).await?)));
/// store.fail_saves(true);
/// # Ok(())
/// # }
/// ```
pub struct FaultyBookStore {
    inner: Arc<dyn BookStore>,
    fail_saves: AtomicBool,
    fail_deletes: AtomicBool,
    fail_list: AtomicBool,
    save_delay_ms: AtomicU64,
    save_calls: AtomicUsize,
}

impl FaultyBookStore {
    pub fn new(inner: Arc<dyn BookStore>) -> Self {
        Self {
            inner,
            fail_saves: AtomicBool::new(false),
            fail_deletes: AtomicBool::new(false),
            fail_list: AtomicBool::new(false),
            save_delay_ms: AtomicU64::new(0),
            save_calls: AtomicUsize::new(0),
        }
    }

    /// Makes every following `save` fail without touching the inner store.
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    /// Sleeps this long before forwarding each `save`.
    pub fn delay_saves(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.save_delay_ms.store(millis, Ordering::SeqCst);
    }

    /// Number of `save` calls seen, including failed ones.
    pub fn save_calls(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BookStore for FaultyBookStore {
    async fn save(&self, book: &Book) -> Result<()> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);

        let delay = self.save_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StorybookError::persistence(format!(
                "injected save failure for {}",
                book.id
            )));
        }
        self.inner.save(book).await
    }

    async fn load(&self, book_id: &str) -> Result<Option<Book>> {
        self.inner.load(book_id).await
    }

    async fn list_ids(&self) -> Result<Vec<String>> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(StorybookError::io("injected list failure"));
        }
        self.inner.list_ids().await
    }

    async fn delete(&self, book_id: &str) -> Result<bool> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(StorybookError::persistence(format!(
                "injected delete failure for {}",
                book_id
            )));
        }
        self.inner.delete(book_id).await
    }
}
