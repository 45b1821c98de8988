//! Request handler module
//!
//! Routes requests by path prefix to the view, edit and save page handlers.

pub mod pages;
pub mod router;

// Re-export main entry point
pub use router::handle_request;
