pub mod format;
pub mod hash;
pub mod metadata;
pub mod store;

pub use format::*;
pub use hash::*;
pub use metadata::*;
pub use store::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Only PDF files are allowed: {0}")]
    NotAPdf(String),

    #[error("File too large: {size_mb:.1}MB exceeds {max_mb}MB limit")]
    FileTooLarge { size_mb: f64, max_mb: u64 },

    #[error("File is empty: {0}")]
    EmptyFile(String),

    #[error("File already exists: {0}")]
    AlreadyExists(String),
}
