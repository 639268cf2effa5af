pub mod books;
pub mod cache;
