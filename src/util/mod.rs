//! Utility functions for common operations.
//!
//! This module provides reusable utilities for:
//!
//! - **URL validation**: article links and API base URLs must be public HTTP(S)
//! - **Text processing**: truncation, whitespace cleanup, Slack escaping and
//!   control-character stripping for publisher-supplied text
//!
//! # Examples
//!
//! ```
//! use account_brief::util::{truncate_chars, validate_url};
//!
//! let url = validate_url("https://www.reuters.com/markets/acme").unwrap();
//! assert_eq!(url.scheme(), "https");
//!
//! let short = truncate_chars("A very long article description", 10);
//! assert_eq!(short, "A very ...");
//! ```

mod text;
mod url_validator;

pub use text::{collapse_whitespace, escape_mrkdwn, strip_control_chars, truncate_chars};
pub use url_validator::{validate_base_url, validate_url, UrlValidationError};
