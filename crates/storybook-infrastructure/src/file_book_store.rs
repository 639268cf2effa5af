//! Filesystem-backed `BookStore`.

use crate::paths::StorybookPaths;
use crate::storage::{AtomicJsonError, AtomicJsonFile};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::Path;
use storybook_core::book::{Book, BookStore, validate_book_id};
use storybook_core::error::{Result, StorybookError};
use tokio::fs;

/// Book store keeping one JSON document per book.
///
/// Directory structure:
/// ```text
/// data_root/
/// └── book/
///     ├── 550e8400-.../metadata.json
///     └── 6ba7b810-.../metadata.json
/// ```
#[derive(Debug, Clone)]
pub struct FileBookStore {
    paths: StorybookPaths,
}

impl FileBookStore {
    /// Opens the store, creating `<data_root>/book` if needed.
    pub async fn new(paths: StorybookPaths) -> Result<Self> {
        fs::create_dir_all(paths.book_root()).await.map_err(|e| {
            StorybookError::io(format!(
                "Failed to create book directory {}: {}",
                paths.book_root().display(),
                e
            ))
        })?;
        tracing::info!("FileBookStore opened at {}", paths.book_root().display());
        Ok(Self { paths })
    }

    pub async fn open(data_root: &Path) -> Result<Self> {
        Self::new(StorybookPaths::new(data_root)).await
    }

    pub fn paths(&self) -> &StorybookPaths {
        &self.paths
    }

    fn document(&self, book_id: &str) -> Result<AtomicJsonFile<Book>> {
        validate_book_id(book_id)?;
        Ok(AtomicJsonFile::new(self.paths.metadata_file(book_id)))
    }
}

#[async_trait]
impl BookStore for FileBookStore {
    async fn save(&self, book: &Book) -> Result<()> {
        let document = self.document(&book.id)?;
        document.save(book).await.map_err(|e| {
            StorybookError::persistence(format!("Failed to save book {}: {}", book.id, e))
        })?;
        tracing::debug!("Book metadata saved: {}", book.id);
        Ok(())
    }

    async fn load(&self, book_id: &str) -> Result<Option<Book>> {
        let document = self.document(book_id)?;
        let mut book = match document.load().await {
            Ok(Some(book)) => book,
            Ok(None) => return Ok(None),
            Err(AtomicJsonError::ParseError(e)) => {
                return Err(StorybookError::corrupt(book_id, e.to_string()));
            }
            Err(e) => {
                return Err(StorybookError::io(format!(
                    "Failed to read book {}: {}",
                    book_id, e
                )));
            }
        };

        // The directory name is the key; a document claiming another id
        // cannot be cached safely.
        if book.id.is_empty() {
            book.id = book_id.to_string();
        } else if book.id != book_id {
            return Err(StorybookError::corrupt(
                book_id,
                format!("document id '{}' does not match its directory", book.id),
            ));
        }

        Ok(Some(book))
    }

    async fn list_ids(&self) -> Result<Vec<String>> {
        let book_root = self.paths.book_root();
        let mut entries = match fs::read_dir(&book_root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!("Book directory does not exist: {}", book_root.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let Some(book_id) = entry.file_name().to_str().map(str::to_string) else {
                tracing::warn!("Skipping non UTF-8 book directory {:?}", entry.path());
                continue;
            };
            if validate_book_id(&book_id).is_err() {
                continue;
            }
            if fs::try_exists(self.paths.metadata_file(&book_id)).await? {
                ids.push(book_id);
            }
        }

        Ok(ids)
    }

    async fn delete(&self, book_id: &str) -> Result<bool> {
        let document = self.document(book_id)?;
        let removed = document.remove().await.map_err(|e| {
            StorybookError::persistence(format!("Failed to delete book {}: {}", book_id, e))
        })?;

        // Drop the per-book directory once it is empty; anything else left
        // in it is not ours to remove.
        if let Err(e) = fs::remove_dir(self.paths.book_dir(book_id)).await {
            if e.kind() != ErrorKind::NotFound {
                tracing::debug!("Keeping book directory {}: {}", book_id, e);
            }
        }

        if removed {
            tracing::debug!("Book metadata deleted: {}", book_id);
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storybook_core::book::{BookStatus, Page};
    use tempfile::TempDir;

    async fn create_test_store() -> (FileBookStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = FileBookStore::open(temp_dir.path()).await.unwrap();
        (store, temp_dir)
    }

    fn create_test_book(title: &str) -> Book {
        let mut book = Book::new(title, format!("/data/image/{}/cover.png", title));
        let mut page = Page::new(1, "/data/image/p1.png");
        page.push_dialogue("아침을 먹었다.", "/data/sound/d1.mp3");
        book.push_page(page);
        book
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let (store, temp_dir) = create_test_store().await;
        let book = create_test_book("fox");

        store.save(&book).await.unwrap();

        let metadata = temp_dir
            .path()
            .join("book")
            .join(&book.id)
            .join("metadata.json");
        assert!(metadata.exists());

        let loaded = store.load(&book.id).await.unwrap().unwrap();
        assert_eq!(loaded, book);
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let (store, _temp_dir) = create_test_store().await;
        let mut book = create_test_book("fox");
        store.save(&book).await.unwrap();

        book.status = BookStatus::Success;
        store.save(&book).await.unwrap();

        let loaded = store.load(&book.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, BookStatus::Success);
    }

    #[tokio::test]
    async fn test_load_missing_is_none() {
        let (store, _temp_dir) = create_test_store().await;
        assert!(store.load("does-not-exist").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_load_corrupt_document() {
        let (store, temp_dir) = create_test_store().await;
        let dir = temp_dir.path().join("book").join("broken");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("metadata.json"), "{ not json").unwrap();

        let err = store.load("broken").await.unwrap_err();
        assert!(err.is_corrupt());
    }

    #[tokio::test]
    async fn test_load_rejects_foreign_id() {
        let (store, temp_dir) = create_test_store().await;
        let book = create_test_book("fox");
        let dir = temp_dir.path().join("book").join("other-id");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("metadata.json"), serde_json::to_vec(&book).unwrap()).unwrap();

        assert!(store.load("other-id").await.unwrap_err().is_corrupt());
    }

    #[tokio::test]
    async fn test_list_ids_skips_stray_entries() {
        let (store, temp_dir) = create_test_store().await;
        let a = create_test_book("a");
        let b = create_test_book("b");
        store.save(&a).await.unwrap();
        store.save(&b).await.unwrap();

        let book_root = temp_dir.path().join("book");
        std::fs::create_dir_all(book_root.join("empty-dir")).unwrap();
        std::fs::create_dir_all(book_root.join(".hidden")).unwrap();
        std::fs::write(book_root.join("stray.json"), "{}").unwrap();

        let mut ids = store.list_ids().await.unwrap();
        ids.sort();
        let mut expected = vec![a.id.clone(), b.id.clone()];
        expected.sort();
        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (store, temp_dir) = create_test_store().await;
        let book = create_test_book("fox");
        store.save(&book).await.unwrap();

        assert!(store.delete(&book.id).await.unwrap());
        assert!(!store.delete(&book.id).await.unwrap());
        assert!(!temp_dir.path().join("book").join(&book.id).exists());
        assert!(store.load(&book.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invalid_id_never_touches_disk() {
        let (store, _temp_dir) = create_test_store().await;
        assert!(store.load("../etc").await.unwrap_err().is_validation());
        assert!(store.delete("a/b").await.unwrap_err().is_validation());

        let mut book = create_test_book("fox");
        book.id = "..".to_string();
        assert!(store.save(&book).await.unwrap_err().is_validation());
    }

    #[tokio::test]
    async fn test_load_all_skips_corrupt() {
        let (store, temp_dir) = create_test_store().await;
        let book = create_test_book("fox");
        store.save(&book).await.unwrap();

        let dir = temp_dir.path().join("book").join("broken");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("metadata.json"), "garbage").unwrap();

        let books = store.load_all().await.unwrap();
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].id, book.id);
    }
}
