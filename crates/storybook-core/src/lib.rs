pub mod book;
pub mod error;

// Re-export common error type
pub use error::{Result, StorybookError};
