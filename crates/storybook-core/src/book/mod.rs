//! Book domain module.
//!
//! # Module Structure
//!
//! - `model`: `Book`, `Page`, `Dialogue` and their enums
//! - `store`: `BookStore`, the durable one-document-per-book store
//! - `repository`: `BookRepository`, the capability callers depend on
//! - `stats`: `CacheStats` report for administrative endpoints

mod model;
pub mod repository;
mod stats;
pub mod store;

// Re-export public API
pub use model::{Book, BookStatus, BookSummary, Dialogue, Page, PageKind, new_id};
pub use repository::{BOOK_ENTITY, BookRepository, prepare_create, prepare_update};
pub use stats::CacheStats;
pub use store::{BookStore, validate_book_id};
