//! Worker loop and shutdown handshake shared by sinks.
//!
//! The worker moves through `Running -> Draining -> Terminated`:
//!
//! - **Running**: wait for either a message (render it) or a quit request.
//! - **Draining**: the queue is closed and every message still buffered is
//!   rendered, then the quit request is acknowledged.
//! - **Terminated**: the task has exited; the sink cannot be used again.
//!
//! A quit request carries the acknowledgement channel, so `destroy` is exactly
//! two signals: request out, completion back.

use crate::diagnostics::get_diagnostics;
use crate::level::Level;
use crate::message::Message;
use crate::sinks::traits::{ErrorSender, MessageReceiver, MessageSender, SinkError, SinkResult};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Formats and writes one message to a sink's destination.
pub trait Render: Send + 'static {
    fn render(&mut self, msg: &Message) -> SinkResult<()>;
}

/// Sink 工作任务的生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkerState {
    /// Configured (or not yet) but not started
    Idle = 0,
    Running = 1,
    Draining = 2,
    Terminated = 3,
}

impl WorkerState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => WorkerState::Running,
            2 => WorkerState::Draining,
            3 => WorkerState::Terminated,
            _ => WorkerState::Idle,
        }
    }
}

#[derive(Debug)]
struct StateCell(AtomicU8);

impl StateCell {
    fn new() -> Self {
        Self(AtomicU8::new(WorkerState::Idle as u8))
    }

    fn get(&self) -> WorkerState {
        WorkerState::from_u8(self.0.load(Ordering::Acquire))
    }

    fn set(&self, state: WorkerState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

type QuitRequest = oneshot::Sender<()>;

/// Lifecycle plumbing a sink composes: level, queue, error channel and the
/// worker task rendering through `R`.
pub struct Adapter<R: Render> {
    level: Level,
    renderer: Option<R>,
    inbox: Option<MessageReceiver>,
    outbox: Option<MessageSender>,
    errors: Option<ErrorSender>,
    quit: Option<oneshot::Sender<QuitRequest>>,
    handle: Option<JoinHandle<()>>,
    state: Arc<StateCell>,
}

impl<R: Render> Default for Adapter<R> {
    fn default() -> Self {
        Self {
            level: Level::Trace,
            renderer: None,
            inbox: None,
            outbox: None,
            errors: None,
            quit: None,
            handle: None,
            state: Arc::new(StateCell::new()),
        }
    }
}

impl<R: Render> fmt::Debug for Adapter<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Adapter")
            .field("level", &self.level)
            .field("state", &self.state.get())
            .field("configured", &self.renderer.is_some())
            .finish()
    }
}

impl<R: Render> Adapter<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn state(&self) -> WorkerState {
        self.state.get()
    }

    /// Store the renderer and allocate the inbound queue.
    ///
    /// tokio has no rendezvous channel, so a capacity of 0 becomes 1.
    pub fn configure(&mut self, level: Level, capacity: usize, renderer: R) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        self.level = level;
        self.renderer = Some(renderer);
        self.inbox = Some(rx);
        self.outbox = Some(tx);
    }

    pub fn exchange_chans(&mut self, errors: ErrorSender) -> SinkResult<MessageSender> {
        let outbox = self.outbox.take().ok_or(SinkError::NotInitialized)?;
        self.errors = Some(errors);
        Ok(outbox)
    }

    /// 在当前 tokio 运行时上启动工作循环
    pub fn start(&mut self, name: &'static str) -> SinkResult<()> {
        if self.handle.is_some() {
            return Err(SinkError::AlreadyStarted);
        }
        let (renderer, inbox, errors) =
            match (self.renderer.take(), self.inbox.take(), self.errors.take()) {
                (Some(renderer), Some(inbox), Some(errors)) => (renderer, inbox, errors),
                _ => return Err(SinkError::NotInitialized),
            };

        let (quit_tx, quit_rx) = oneshot::channel();
        let state = self.state.clone();
        state.set(WorkerState::Running);
        let handle = tokio::spawn(run(name, renderer, inbox, quit_rx, errors, state));

        self.quit = Some(quit_tx);
        self.handle = Some(handle);
        get_diagnostics().increment_sinks_started();
        tracing::debug!("{} sink started", name);
        Ok(())
    }

    /// 发送退出请求并等待队列排空
    pub async fn destroy(&mut self) -> SinkResult<()> {
        let Some(quit) = self.quit.take() else {
            return Err(if self.handle.is_none() && self.state() == WorkerState::Terminated {
                SinkError::AlreadyDestroyed
            } else {
                SinkError::NotStarted
            });
        };

        let (ack_tx, ack_rx) = oneshot::channel();
        let acknowledged = quit.send(ack_tx).is_ok() && ack_rx.await.is_ok();

        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                tracing::error!("sink worker failed: {}", e);
            }
        }
        self.state.set(WorkerState::Terminated);
        get_diagnostics().increment_sinks_destroyed();

        if acknowledged {
            Ok(())
        } else {
            Err(SinkError::Closed)
        }
    }
}

async fn run<R: Render>(
    name: &'static str,
    mut renderer: R,
    mut inbox: MessageReceiver,
    mut quit: oneshot::Receiver<QuitRequest>,
    errors: ErrorSender,
    state: Arc<StateCell>,
) {
    let ack = loop {
        tokio::select! {
            request = &mut quit => break request.ok(),
            msg = inbox.recv() => match msg {
                Some(msg) => render(&mut renderer, &msg, &errors).await,
                // Every sender is gone; nothing left but the quit request.
                None => break (&mut quit).await.ok(),
            },
        }
    };

    state.set(WorkerState::Draining);
    inbox.close();
    let mut drained = 0usize;
    while let Ok(msg) = inbox.try_recv() {
        render(&mut renderer, &msg, &errors).await;
        drained += 1;
    }
    tracing::debug!("{} sink drained {} queued message(s)", name, drained);

    state.set(WorkerState::Terminated);
    if let Some(ack) = ack {
        let _ = ack.send(());
    }
}

async fn render<R: Render>(renderer: &mut R, msg: &Message, errors: &ErrorSender) {
    let diagnostics = get_diagnostics();
    match renderer.render(msg) {
        Ok(()) => diagnostics.increment_messages_rendered(),
        Err(e) => {
            diagnostics.increment_render_errors();
            if errors.send(e).await.is_err() {
                tracing::warn!("error channel closed, render failure dropped");
            }
        }
    }
}
