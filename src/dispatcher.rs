//! Dispatcher
//!
//! Owns the live set of sinks ("receivers"), fans every message out to the
//! sinks whose threshold admits it and runs the background task printing
//! render failures.
//!
//! The receiver list sits behind an async `RwLock`: `write` takes the read
//! side, while `new_sink`, `delete` and `shutdown` take the write side and
//! hold it across the drain of any sink they tear down. A sink being replaced
//! or removed therefore never sees a message after its destroy began.
//!
//! The error reporter is started and stopped under the same write lock, so it
//! runs exactly while at least one sink is active.

use crate::config::{validate_config, LoggerConfig, SinkConfig};
use crate::diagnostics::get_diagnostics;
use crate::error::{Result, XlogError};
use crate::level::Level;
use crate::message::{Caller, Message};
use crate::registry::{global_registry, SharedRegistry};
use crate::sinks::destination::{Destination, Output};
use crate::sinks::traits::{ErrorSender, MessageSender, Sink, SinkError};
use crate::value::Value;
use std::fmt;
use std::future::Future;
use std::io;
use std::mem;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, RwLock};
use tokio::task::JoinHandle;

/// Capacity of the shared error channel
pub const DEFAULT_ERROR_CAPACITY: usize = 5;

/// Upper bound `fatal` waits for `shutdown` before exiting
pub const DEFAULT_FATAL_TIMEOUT: Duration = Duration::from_secs(5);

/// A live sink together with the queue it is fed through.
#[derive(Debug)]
struct Receiver {
    mode: String,
    level: Level,
    sink: Box<dyn Sink>,
    sender: MessageSender,
}

impl Receiver {
    async fn destroy(&mut self) {
        match self.sink.destroy().await {
            Ok(()) => tracing::debug!("'{}' sink destroyed", self.mode),
            Err(e) => tracing::warn!("failed to destroy '{}' sink: {}", self.mode, e),
        }
    }
}

/// Error reporter lifecycle. The running task hands the channel back when it
/// stops so the final drain can happen on the caller's side.
enum ReporterState {
    Idle(mpsc::Receiver<SinkError>),
    Running {
        quit: oneshot::Sender<()>,
        handle: JoinHandle<mpsc::Receiver<SinkError>>,
    },
    /// The task panicked and took the channel with it
    Lost,
}

/// Builder for [`Dispatcher`].
#[derive(Debug)]
pub struct DispatcherBuilder {
    registry: Option<SharedRegistry>,
    error_capacity: usize,
    diagnostic_output: Destination,
    fatal_timeout: Duration,
}

impl Default for DispatcherBuilder {
    fn default() -> Self {
        Self {
            registry: None,
            error_capacity: DEFAULT_ERROR_CAPACITY,
            diagnostic_output: Destination::Stderr,
            fatal_timeout: DEFAULT_FATAL_TIMEOUT,
        }
    }
}

impl DispatcherBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry to resolve modes against. Defaults to the global registry.
    pub fn registry(mut self, registry: SharedRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn error_capacity(mut self, capacity: usize) -> Self {
        self.error_capacity = capacity.max(1);
        self
    }

    /// Stream render failures are printed to. Defaults to stderr.
    pub fn diagnostic_output(mut self, output: Destination) -> Self {
        self.diagnostic_output = output;
        self
    }

    pub fn fatal_timeout(mut self, timeout: Duration) -> Self {
        self.fatal_timeout = timeout;
        self
    }

    pub fn build(self) -> Dispatcher {
        let (errors_tx, errors_rx) = mpsc::channel(self.error_capacity);
        Dispatcher {
            registry: self.registry.unwrap_or_else(global_registry),
            receivers: RwLock::new(Vec::new()),
            errors_tx,
            reporter: Mutex::new(ReporterState::Idle(errors_rx)),
            diagnostic_output: self.diagnostic_output,
            fatal_timeout: self.fatal_timeout,
        }
    }
}

/// Fan-out point between log calls and the active sinks.
pub struct Dispatcher {
    registry: SharedRegistry,
    receivers: RwLock<Vec<Receiver>>,
    errors_tx: ErrorSender,
    reporter: Mutex<ReporterState>,
    diagnostic_output: Destination,
    fatal_timeout: Duration,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("diagnostic_output", &self.diagnostic_output)
            .field("fatal_timeout", &self.fatal_timeout)
            .field("reporting", &self.is_reporting())
            .finish_non_exhaustive()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    /// Dispatcher over the global registry with default settings.
    pub fn new() -> Self {
        DispatcherBuilder::new().build()
    }

    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    /// Create, configure and start a sink of type `mode`.
    ///
    /// An active sink of the same type is destroyed (and fully drained) before
    /// the new one takes its place in the fan-out order.
    pub async fn new_sink(&self, mode: &str, config: impl Into<SinkConfig>) -> Result<()> {
        let mut sink = self
            .registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .create(mode)
            .ok_or_else(|| XlogError::unknown_mode(mode))?;

        sink.init(config.into())?;
        let sender = sink.exchange_chans(self.errors_tx.clone())?;

        let mut receivers = self.receivers.write().await;
        self.ensure_reporter();
        let position = receivers.iter().position(|r| r.mode == mode);
        if let Some(idx) = position {
            tracing::info!("replacing '{}' sink", mode);
            receivers[idx].destroy().await;
        }

        if let Err(e) = sink.start() {
            if let Some(idx) = position {
                receivers.remove(idx);
            }
            if receivers.is_empty() {
                self.stop_reporter().await;
            }
            return Err(e.into());
        }

        let receiver = Receiver {
            mode: mode.to_string(),
            level: sink.level(),
            sink,
            sender,
        };
        match position {
            Some(idx) => receivers[idx] = receiver,
            None => receivers.push(receiver),
        }
        tracing::info!("'{}' sink active", mode);
        Ok(())
    }

    /// Destroy and remove the sink of type `mode`, if any.
    ///
    /// Removing the last sink also stops the error reporter.
    pub async fn delete(&self, mode: &str) {
        let mut receivers = self.receivers.write().await;
        if let Some(idx) = receivers.iter().position(|r| r.mode == mode) {
            let mut receiver = receivers.remove(idx);
            receiver.destroy().await;
            if receivers.is_empty() {
                self.stop_reporter().await;
            }
        }
    }

    /// Emit a message at `level`.
    ///
    /// For ERROR and FATAL with a positive `skip`, the body gets a caller
    /// annotation for the location this call is made from. Resolution follows
    /// `#[track_caller]`, so wrappers marked with it are skipped.
    #[track_caller]
    pub fn write(
        &self,
        level: Level,
        skip: usize,
        values: Vec<Value>,
    ) -> impl Future<Output = ()> + '_ {
        let caller = if skip > 0 && level >= Level::Error {
            Some(Caller::here())
        } else {
            None
        };
        self.dispatch(Message::new(level, values), caller)
    }

    /// Fan a message out to every admitting sink, in insertion order.
    ///
    /// Waits while a sink's queue is full.
    pub async fn dispatch(&self, mut msg: Message, caller: Option<Caller>) {
        if msg.level >= Level::Error {
            if let Some(caller) = &caller {
                msg.annotate(caller);
            }
        }
        let msg = Arc::new(msg);
        let diagnostics = get_diagnostics();

        let receivers = self.receivers.read().await;
        for receiver in receivers.iter().filter(|r| r.level.admits(msg.level)) {
            if receiver.sender.send(msg.clone()).await.is_err() {
                tracing::warn!("'{}' sink is closed, message dropped", receiver.mode);
            } else {
                diagnostics.increment_messages_dispatched();
            }
        }
    }

    pub async fn trace(&self, values: Vec<Value>) {
        self.dispatch(Message::new(Level::Trace, values), None).await
    }

    pub async fn info(&self, values: Vec<Value>) {
        self.dispatch(Message::new(Level::Info, values), None).await
    }

    pub async fn warn(&self, values: Vec<Value>) {
        self.dispatch(Message::new(Level::Warn, values), None).await
    }

    #[track_caller]
    pub fn error(&self, skip: usize, values: Vec<Value>) -> impl Future<Output = ()> + '_ {
        self.write(Level::Error, skip, values)
    }

    /// Emit at FATAL, shut down, and exit the process with status 1.
    ///
    /// Never returns. Shutdown is bounded by the configured fatal timeout.
    #[track_caller]
    pub fn fatal(&self, skip: usize, values: Vec<Value>) -> impl Future<Output = ()> + '_ {
        let caller = if skip > 0 { Some(Caller::here()) } else { None };
        self.fatal_with_caller(caller, values)
    }

    /// [`fatal`](Self::fatal) with an explicit caller.
    pub async fn fatal_with_caller(&self, caller: Option<Caller>, values: Vec<Value>) {
        self.dispatch(Message::new(Level::Fatal, values), caller).await;
        if !self.shutdown_timeout(self.fatal_timeout).await {
            tracing::error!(
                "shutdown did not complete within {:?}, exiting anyway",
                self.fatal_timeout
            );
        }
        std::process::exit(1);
    }

    /// Destroy every sink, then stop the error reporter and print any
    /// failures still queued.
    pub async fn shutdown(&self) {
        let mut receivers = self.receivers.write().await;
        for mut receiver in mem::take(&mut *receivers) {
            receiver.destroy().await;
        }
        self.stop_reporter().await;
        drop(receivers);
        tracing::info!("xlog shutdown complete");
    }

    /// [`shutdown`](Self::shutdown) bounded by `limit`. Returns whether it
    /// completed in time.
    pub async fn shutdown_timeout(&self, limit: Duration) -> bool {
        tokio::time::timeout(limit, self.shutdown()).await.is_ok()
    }

    /// Load every sink listed in `config`.
    pub async fn init_with_config(&self, config: LoggerConfig) -> Result<()> {
        validate_config(&config)?;
        for sink in config.sinks {
            let mode = sink.mode().ok_or_else(|| {
                XlogError::config(format!(
                    "'{}' carries no mode; use new_sink for custom sinks",
                    sink.type_name()
                ))
            })?;
            self.new_sink(mode, sink).await?;
        }
        Ok(())
    }

    /// Active sink types, in fan-out order.
    pub async fn modes(&self) -> Vec<String> {
        self.receivers
            .read()
            .await
            .iter()
            .map(|r| r.mode.clone())
            .collect()
    }

    /// Whether the background error reporter is running.
    pub fn is_reporting(&self) -> bool {
        match &*self.reporter.lock().unwrap_or_else(PoisonError::into_inner) {
            ReporterState::Running { handle, .. } => !handle.is_finished(),
            _ => false,
        }
    }

    // Callers hold the receivers write lock.
    fn ensure_reporter(&self) {
        let mut state = self.reporter.lock().unwrap_or_else(PoisonError::into_inner);
        let errors = match mem::replace(&mut *state, ReporterState::Lost) {
            ReporterState::Idle(errors) => errors,
            other => {
                *state = other;
                return;
            }
        };

        let output = self.open_diagnostic_output();
        let (quit, quit_rx) = oneshot::channel();
        let handle = tokio::spawn(report_errors(errors, quit_rx, output));
        *state = ReporterState::Running { quit, handle };
        tracing::debug!("error reporter started");
    }

    // Callers hold the receivers write lock.
    async fn stop_reporter(&self) {
        let state = {
            let mut state = self.reporter.lock().unwrap_or_else(PoisonError::into_inner);
            mem::replace(&mut *state, ReporterState::Lost)
        };

        let mut errors = match state {
            ReporterState::Idle(errors) => errors,
            ReporterState::Running { quit, handle } => {
                let _ = quit.send(());
                match handle.await {
                    Ok(errors) => errors,
                    Err(e) => {
                        tracing::error!("error reporter failed: {}", e);
                        return;
                    }
                }
            }
            ReporterState::Lost => return,
        };

        let mut output = self.open_diagnostic_output();
        while let Ok(err) = errors.try_recv() {
            report(&mut output, &err);
        }

        *self.reporter.lock().unwrap_or_else(PoisonError::into_inner) = ReporterState::Idle(errors);
        tracing::debug!("error reporter stopped");
    }

    fn open_diagnostic_output(&self) -> Output {
        self.diagnostic_output.open().unwrap_or_else(|e| {
            tracing::warn!("diagnostic output unavailable, using stderr: {}", e);
            Output::Stderr(io::stderr())
        })
    }
}

async fn report_errors(
    mut errors: mpsc::Receiver<SinkError>,
    mut quit: oneshot::Receiver<()>,
    mut output: Output,
) -> mpsc::Receiver<SinkError> {
    loop {
        tokio::select! {
            _ = &mut quit => break,
            err = errors.recv() => match err {
                Some(err) => report(&mut output, &err),
                None => break,
            },
        }
    }
    errors
}

fn report(output: &mut Output, err: &SinkError) {
    get_diagnostics().increment_errors_reported();
    let line = format!("xlog: unable to write message: {}", err);
    if let Err(e) = output.write_line(line.as_bytes()) {
        tracing::error!("failed to print render error: {}", e);
    }
}
