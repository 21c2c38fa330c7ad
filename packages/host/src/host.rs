//! # Host task
//!
//! ```text
//! UI ──────────┐                            ┌──► requests (to evaluator)
//!              ├─► command queue ─► session ┤
//! evaluator ───┘      (mpsc)                └──► notifications (to UI)
//! ```
//!
//! The session lives on one task and never leaves it. Handles only ever
//! enqueue commands, so there is no parallel mutation to guard against.

use crate::options::HostOptions;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info};
use worksheet_editor::{EditorError, Event, FixedTimeout, WorksheetSession, WorksheetSnapshot};

#[derive(Error, Debug)]
pub enum HostError {
    #[error("worksheet host has shut down")]
    Closed,

    #[error("Editor error: {0}")]
    Editor(#[from] EditorError),

    #[error("host task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

enum HostCommand {
    Dispatch(Event),
    Snapshot(oneshot::Sender<WorksheetSnapshot>),
    Source(oneshot::Sender<String>),
    Save(oneshot::Sender<Result<(), EditorError>>),
    Shutdown,
}

/// Cloneable handle for driving a hosted session
#[derive(Debug, Clone)]
pub struct HostHandle {
    tx: mpsc::Sender<HostCommand>,
}

impl HostHandle {
    /// Queue an inbound event (UI command or evaluator response)
    pub async fn dispatch(&self, event: Event) -> Result<(), HostError> {
        self.send(HostCommand::Dispatch(event)).await
    }

    /// Queue an event from a thread outside the runtime
    pub fn blocking_dispatch(&self, event: Event) -> Result<(), HostError> {
        self.tx
            .blocking_send(HostCommand::Dispatch(event))
            .map_err(|_| HostError::Closed)
    }

    /// State of the worksheet once every earlier command has been handled
    pub async fn snapshot(&self) -> Result<WorksheetSnapshot, HostError> {
        let (reply, rx) = oneshot::channel();
        self.send(HostCommand::Snapshot(reply)).await?;
        rx.await.map_err(|_| HostError::Closed)
    }

    /// Current serialized worksheet
    pub async fn source(&self) -> Result<String, HostError> {
        let (reply, rx) = oneshot::channel();
        self.send(HostCommand::Source(reply)).await?;
        rx.await.map_err(|_| HostError::Closed)
    }

    pub async fn save(&self) -> Result<(), HostError> {
        let (reply, rx) = oneshot::channel();
        self.send(HostCommand::Save(reply)).await?;
        Ok(rx.await.map_err(|_| HostError::Closed)??)
    }

    /// Stop the host after the commands already queued
    pub async fn shutdown(&self) -> Result<(), HostError> {
        self.send(HostCommand::Shutdown).await
    }

    async fn send(&self, command: HostCommand) -> Result<(), HostError> {
        self.tx.send(command).await.map_err(|_| HostError::Closed)
    }
}

/// Outbound traffic of a hosted session
pub struct HostChannels {
    /// `evaluation-request` events, for the evaluator transport
    pub requests: mpsc::UnboundedReceiver<Event>,

    /// Change notifications, for the UI
    pub notifications: UnboundedReceiverStream<Event>,
}

/// A session running on its own task
pub struct WorksheetHost {
    task: JoinHandle<WorksheetSession>,
}

impl WorksheetHost {
    /// Move `session` onto a new task. Must be called inside a tokio runtime.
    pub fn spawn(session: WorksheetSession, options: HostOptions) -> (Self, HostHandle, HostChannels) {
        let session = match options.evaluation_timeout() {
            Some(timeout) => session.with_timeout_policy(FixedTimeout(timeout)),
            None => session,
        };

        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (notify_tx, notify_rx) = mpsc::unbounded_channel();
        let channel = session.channel().clone();
        let subscription = channel.subscribe(move |event| {
            let target = match event {
                Event::EvaluationRequest { .. } => &request_tx,
                event if event.is_outbound() => &notify_tx,
                _ => return,
            };
            // Receivers may have been dropped; outbound traffic is best effort
            let _ = target.send(event.clone());
        });

        let (tx, rx) = mpsc::channel(options.queue_capacity.max(1));
        let sweep_every = options.sweep_interval();
        let task = tokio::spawn(async move {
            let session = run(session, rx, sweep_every).await;
            channel.unsubscribe(subscription);
            session
        });

        info!(?options, "worksheet host started");
        (
            Self { task },
            HostHandle { tx },
            HostChannels {
                requests: request_rx,
                notifications: UnboundedReceiverStream::new(notify_rx),
            },
        )
    }

    /// Wait for the host to stop and take the session back
    pub async fn join(self) -> Result<WorksheetSession, HostError> {
        Ok(self.task.await?)
    }
}

async fn run(
    mut session: WorksheetSession,
    mut commands: mpsc::Receiver<HostCommand>,
    sweep_every: std::time::Duration,
) -> WorksheetSession {
    let mut sweep = tokio::time::interval(sweep_every);
    sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(HostCommand::Dispatch(event)) => session.handle(event),
                Some(HostCommand::Snapshot(reply)) => {
                    let _ = reply.send(session.worksheet().snapshot());
                }
                Some(HostCommand::Source(reply)) => {
                    let _ = reply.send(session.document().source());
                }
                Some(HostCommand::Save(reply)) => {
                    let _ = reply.send(session.document_mut().save());
                }
                Some(HostCommand::Shutdown) | None => break,
            },
            _ = sweep.tick() => {
                let expired = session.expire_overdue(Instant::now());
                if !expired.is_empty() {
                    debug!(count = expired.len(), "expired overdue evaluations");
                }
            }
        }
    }

    info!("worksheet host stopped");
    session
}
