//! Utility functions shared by the feed core and the command-line front end.
//!
//! - **URL validation**: feed URLs must be absolute `http`/`https` URLs
//! - **Text processing**: making untrusted feed text safe and readable in a terminal

mod text;
mod url_validator;

pub use text::strip_control_chars;
pub use url_validator::{validate_url, UrlValidationError};
