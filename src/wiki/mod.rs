//! Wiki domain module
//!
//! Pages, title validation, the on-disk page store and template rendering.

pub mod store;
pub mod template;
pub mod title;

pub use store::FileStore;
pub use template::{TemplateError, Templates};
pub use title::is_valid_title;

/// A wiki page, built fresh for each request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub title: String,
    pub body: Vec<u8>,
}

impl Page {
    pub fn new(title: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }

    /// Page that does not exist yet
    pub fn empty(title: impl Into<String>) -> Self {
        Self::new(title, Vec::new())
    }
}
