//! xlog sinks
//!
//! - [`traits`]: the `Sink` contract and its error type
//! - [`adapter`]: worker loop and shutdown handshake shared by sinks
//! - [`console`]: colorized `key=value` lines
//! - [`json`]: one JSON object per line
//! - [`destination`]: stdout, stderr, files and in-process writers

pub mod adapter;
pub mod console;
pub mod destination;
pub mod json;
pub mod traits;

pub use adapter::{Adapter, Render, WorkerState};
pub use console::ConsoleSink;
pub use destination::{Destination, SharedWriter};
pub use json::JsonFormatSink;
pub use traits::{ErrorSender, MessageSender, Sink, SinkError, SinkResult};

use crate::value::Value;
use chrono::{SecondsFormat, Utc};

/// `["time", <now>]` when enabled, otherwise empty.
pub(crate) fn timestamp_fields(enabled: bool) -> Vec<Value> {
    if enabled {
        vec![
            Value::from("time"),
            Value::Str(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        ]
    } else {
        Vec::new()
    }
}
