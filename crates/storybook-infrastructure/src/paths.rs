//! Path management for storybook data.
//!
//! # Directory Structure
//!
//! ```text
//! <data-root>/
//! └── book/
//!     └── <book-id>/
//!         └── metadata.json     # complete serialized Book
//!
//! ~/.config/storybook/
//! └── config.toml               # optional configuration file
//! ```
//!
//! Binary assets (images, audio, video) referenced from books live in
//! sibling trees under the data root and are managed by the asset storage.

use std::path::{Path, PathBuf};

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Platform data directory could not be determined.
    DataDirNotFound,
    /// Platform config directory could not be determined.
    ConfigDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::DataDirNotFound => write!(f, "Cannot find platform data directory"),
            PathError::ConfigDirNotFound => write!(f, "Cannot find platform config directory"),
        }
    }
}

impl std::error::Error for PathError {}

const APP_NAME: &str = "storybook";

/// Resolves every on-disk location below a data root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorybookPaths {
    data_root: PathBuf,
}

impl StorybookPaths {
    /// Name of the directory holding one sub-directory per book.
    pub const BOOK_DIR: &'static str = "book";
    /// Name of the document inside each book directory.
    pub const METADATA_FILE: &'static str = "metadata.json";

    pub fn new(data_root: impl Into<PathBuf>) -> Self {
        Self {
            data_root: data_root.into(),
        }
    }

    /// Returns the platform default data root (e.g. `~/.local/share/storybook`).
    pub fn default_data_root() -> Result<PathBuf, PathError> {
        dirs::data_dir()
            .map(|dir| dir.join(APP_NAME))
            .ok_or(PathError::DataDirNotFound)
    }

    /// Returns the platform default config file (e.g. `~/.config/storybook/config.toml`).
    pub fn default_config_file() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_NAME).join("config.toml"))
            .ok_or(PathError::ConfigDirNotFound)
    }

    pub fn data_root(&self) -> &Path {
        &self.data_root
    }

    /// `<data-root>/book`
    pub fn book_root(&self) -> PathBuf {
        self.data_root.join(Self::BOOK_DIR)
    }

    /// `<data-root>/book/<book-id>`
    ///
    /// The id is not validated here; see
    /// [`storybook_core::book::validate_book_id`].
    pub fn book_dir(&self, book_id: &str) -> PathBuf {
        self.book_root().join(book_id)
    }

    /// `<data-root>/book/<book-id>/metadata.json`
    pub fn metadata_file(&self, book_id: &str) -> PathBuf {
        self.book_dir(book_id).join(Self::METADATA_FILE)
    }
}
