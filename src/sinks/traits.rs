//! xlog Sink Traits
//!
//! Defines the contract every output adapter implements. The dispatcher drives
//! a sink through a fixed sequence:
//!
//! 1. `init(config)` – validate the config shape, open the destination and
//!    allocate the inbound queue.
//! 2. `exchange_chans(errors)` – hand over the shared error channel, receive
//!    the queue handle messages are pushed into.
//! 3. `start()` – spawn the worker loop; returns immediately.
//! 4. `destroy()` – request shutdown and wait until the queue is drained.
//!
//! Most sinks only need to provide a [`Render`](crate::sinks::adapter::Render)
//! implementation and delegate the lifecycle to
//! [`Adapter`](crate::sinks::adapter::Adapter).
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use xlog::sinks::adapter::{Adapter, Render, WorkerState};
//! use xlog::sinks::traits::{ErrorSender, MessageSender, Sink, SinkError, SinkResult};
//! use xlog::{Level, Message, SinkConfig};
//!
//! #[derive(Debug, Clone)]
//! struct Threshold(Level);
//!
//! struct Discard;
//!
//! impl Render for Discard {
//!     fn render(&mut self, _msg: &Message) -> SinkResult<()> {
//!         Ok(())
//!     }
//! }
//!
//! #[derive(Debug, Default)]
//! struct DiscardSink {
//!     adapter: Adapter<Discard>,
//! }
//!
//! #[async_trait]
//! impl Sink for DiscardSink {
//!     fn level(&self) -> Level {
//!         self.adapter.level()
//!     }
//!
//!     fn init(&mut self, config: SinkConfig) -> SinkResult<()> {
//!         let level = match &config {
//!             SinkConfig::Custom(c) => c.downcast_ref::<Threshold>().map(|t| t.0),
//!             _ => None,
//!         }
//!         .ok_or_else(|| SinkError::config_object("Threshold", &config))?;
//!         self.adapter.configure(level, 16, Discard);
//!         Ok(())
//!     }
//!
//!     fn exchange_chans(&mut self, errors: ErrorSender) -> SinkResult<MessageSender> {
//!         self.adapter.exchange_chans(errors)
//!     }
//!
//!     fn start(&mut self) -> SinkResult<()> {
//!         self.adapter.start("discard")
//!     }
//!
//!     async fn destroy(&mut self) -> SinkResult<()> {
//!         self.adapter.destroy().await
//!     }
//!
//!     fn state(&self) -> WorkerState {
//!         self.adapter.state()
//!     }
//! }
//! ```

use crate::config::SinkConfig;
use crate::format::EncodeError;
use crate::level::Level;
use crate::message::Message;
use crate::sinks::adapter::WorkerState;
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Queue handle the dispatcher pushes messages into.
pub type MessageSender = mpsc::Sender<Arc<Message>>;

/// Worker side of a sink's inbound queue.
pub type MessageReceiver = mpsc::Receiver<Arc<Message>>;

/// Shared channel render failures are reported on.
pub type ErrorSender = mpsc::Sender<SinkError>;

/// An output adapter.
#[async_trait]
pub trait Sink: Send + Sync + Debug {
    /// Minimum level this sink accepts. Fixed once `init` succeeds.
    fn level(&self) -> Level;

    /// Configure the sink. Fails with [`SinkError::ConfigObject`] when the
    /// config is not the shape this sink expects.
    fn init(&mut self, config: SinkConfig) -> SinkResult<()>;

    /// Wire the shared error channel and return the inbound queue handle.
    /// Called once, after `init` and before `start`.
    fn exchange_chans(&mut self, errors: ErrorSender) -> SinkResult<MessageSender>;

    /// Spawn the worker loop. Must not block.
    fn start(&mut self) -> SinkResult<()>;

    /// Request shutdown and wait until every queued message is rendered and
    /// the worker has exited. Only the first call performs the handshake;
    /// later calls fail with [`SinkError::AlreadyDestroyed`].
    async fn destroy(&mut self) -> SinkResult<()>;

    /// Current worker state.
    fn state(&self) -> WorkerState;
}

/// Errors raised at the sink boundary
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// Config handed to `init` has the wrong shape
    #[error("config object is not an instance of {expect}, instead got '{got}'")]
    ConfigObject { expect: &'static str, got: String },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Text encoding error
    #[error("Encode error: {0}")]
    Encode(#[from] EncodeError),

    /// Structured encoding error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A lifecycle step was called before `init`/`exchange_chans`
    #[error("Sink is not initialized")]
    NotInitialized,

    /// `start` called twice
    #[error("Sink is already started")]
    AlreadyStarted,

    /// `destroy` called on a sink that never started
    #[error("Sink is not running")]
    NotStarted,

    /// `destroy` called a second time
    #[error("Sink is already destroyed")]
    AlreadyDestroyed,

    /// The worker went away without completing the handshake
    #[error("Sink is closed")]
    Closed,
}

impl SinkError {
    pub fn config_object(expect: &'static str, got: &SinkConfig) -> Self {
        SinkError::ConfigObject {
            expect,
            got: got.type_name().to_string(),
        }
    }
}

/// Sink result type
pub type SinkResult<T> = Result<T, SinkError>;
