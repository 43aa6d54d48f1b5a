//! Formatting shared by the built-in sinks.
//!
//! - [`merge`] folds a flat key/value body into a [`Fields`] mapping for
//!   structured output.
//! - [`logfmt`] encodes a flat key/value body as `key=value` pairs for text
//!   output.

pub mod logfmt;
pub mod merge;

pub use logfmt::{encode_keyvals, EncodeError};
pub use merge::{merge, Fields};
