//! Data models for the application
//!
//! Assets and their store keys, the project aggregate with its transfer
//! representation, and paging types.

mod asset;
mod page;
mod project;

// Re-export all models for convenient imports
pub use asset::*;
pub use page::*;
pub use project::*;
