pub mod cached_book_repository;

pub use cached_book_repository::CachedBookRepository;
