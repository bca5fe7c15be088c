pub mod config;
pub mod directory;
pub mod error;
pub mod logging;
pub mod query;
pub mod slack;

pub use error::{DirectoryError, Result};
