pub mod config;
pub mod file_book_repository;
pub mod file_book_store;
pub mod paths;
pub mod storage;

#[cfg(any(test, feature = "mock"))]
pub mod faulty_book_store;

pub use crate::config::StorybookConfig;
pub use crate::file_book_repository::FileBookRepository;
pub use crate::file_book_store::FileBookStore;
pub use crate::paths::StorybookPaths;

#[cfg(any(test, feature = "mock"))]
pub use crate::faulty_book_store::FaultyBookStore;
