//! xlog - pluggable asynchronous logging
//!
//! Log calls build a [`Message`] that the [`Dispatcher`] fans out to every
//! active sink whose minimum [`Level`] admits it. Each sink renders on its own
//! tokio task behind a bounded queue, so a slow destination stalls only its
//! own queue (and producers once that queue is full, never dropping records).
//! Render failures travel over a shared channel to a background reporter.
//!
//! Two sinks are built in: `console` (colorized `key=value` lines) and
//! `jsonFormat` (one JSON object per line). More can be added with
//! [`register`].
//!
//! # Quick start
//!
//! ```rust
//! use xlog::{ConsoleConfig, Level};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     xlog::new(
//!         "console",
//!         ConsoleConfig {
//!             level: Level::Info,
//!             buffer_size: 64,
//!             default_fields: xlog::values!["service", "api"],
//!             ..Default::default()
//!         },
//!     )
//!     .await?;
//!
//!     xlog::info(xlog::values!["event", "started", "port", 8080]).await;
//!     xlog::error!("upstream", "timeout").await;
//!
//!     xlog::shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! # Configuration file
//!
//! ```rust,no_run
//! # async fn run() -> xlog::Result<()> {
//! let config = xlog::load_config_from_file(std::path::Path::new("xlog.toml"))?;
//! xlog::init_with_config(config).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod diagnostics;
pub mod dispatcher;
pub mod error;
pub mod format;
pub mod level;
pub mod message;
pub mod registry;
pub mod sinks;
pub mod value;

mod macros;

pub use config::{
    load_config_from_file, load_config_from_str, ConsoleConfig, CustomConfig, JsonFormatConfig,
    LoggerConfig, SinkConfig,
};
pub use diagnostics::{diagnostics_snapshot, get_diagnostics, DiagnosticsSnapshot};
pub use dispatcher::{Dispatcher, DispatcherBuilder};
pub use error::{Result, XlogError};
pub use level::Level;
pub use message::{Caller, Message};
pub use registry::{Factory, Registry, CONSOLE, JSON_FORMAT};
pub use sinks::{Destination, Sink, SinkError, WorkerState};
pub use value::{MarshalText, Value};

use once_cell::sync::Lazy;
use std::future::Future;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

static DISPATCHER: Lazy<Dispatcher> = Lazy::new(Dispatcher::new);

/// The process-wide dispatcher behind the free functions and macros.
pub fn dispatcher() -> &'static Dispatcher {
    &DISPATCHER
}

/// Register a sink type in the global registry.
///
/// # Panics
///
/// If `mode` is empty or already registered.
pub fn register<F>(mode: &str, factory: F)
where
    F: Fn() -> Box<dyn Sink> + Send + Sync + 'static,
{
    registry::register(mode, factory)
}

/// Create (or replace) the global sink of type `mode`.
pub async fn new(mode: &str, config: impl Into<SinkConfig>) -> Result<()> {
    DISPATCHER.new_sink(mode, config).await
}

/// Destroy and remove the global sink of type `mode`, if any.
pub async fn delete(mode: &str) {
    DISPATCHER.delete(mode).await
}

/// See [`Dispatcher::write`].
#[track_caller]
pub fn write(level: Level, skip: usize, values: Vec<Value>) -> impl Future<Output = ()> {
    DISPATCHER.write(level, skip, values)
}

pub async fn trace(values: Vec<Value>) {
    DISPATCHER.trace(values).await
}

pub async fn info(values: Vec<Value>) {
    DISPATCHER.info(values).await
}

pub async fn warn(values: Vec<Value>) {
    DISPATCHER.warn(values).await
}

/// Log at ERROR; a positive `skip` appends the caller annotation.
#[track_caller]
pub fn error(skip: usize, values: Vec<Value>) -> impl Future<Output = ()> {
    DISPATCHER.error(skip, values)
}

/// Log at FATAL, shut down and exit the process with status 1.
#[track_caller]
pub fn fatal(skip: usize, values: Vec<Value>) -> impl Future<Output = ()> {
    DISPATCHER.fatal(skip, values)
}

/// Destroy every global sink and stop the error reporter.
pub async fn shutdown() {
    DISPATCHER.shutdown().await
}

/// Create the global sinks listed in `config`.
pub async fn init_with_config(config: LoggerConfig) -> Result<()> {
    DISPATCHER.init_with_config(config).await
}
