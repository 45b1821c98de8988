//! HTTP protocol layer module
//!
//! Response builders and form decoding, independent of wiki semantics.

pub mod form;
pub mod response;

// Re-export commonly used types
pub use form::{form_encoding, form_value, FormEncoding};
pub use response::{
    build_404_response, build_405_response, build_413_response, build_415_response,
    build_500_response, build_health_response, build_html_response, build_redirect_response,
};
