//! Session Actor - the persistent Python interpreter behind the playground
//!
//! This actor owns a `PythonSession` on a dedicated OS thread (the
//! interpreter is not `Send`) and serves requests over a channel:
//! - Execute source against the shared namespace
//! - Reset user bindings
//! - Health checks
//!
//! Timeouts are enforced by the handle. When a caller stops waiting, the
//! handle abandons the worker and starts a fresh session, so a runaway
//! execution can never touch the live namespace again.

use async_trait::async_trait;
use python_sandbox::{ExecutionResult, PythonSession, SessionConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, RwLock};
use tracing::{debug, error, info, warn};

use crate::backend::{timed_out, ExecutionBackend};
use crate::error::BackendError;

/// Maximum output size (in bytes) kept from a single execution
const MAX_OUTPUT_SIZE: usize = 1024 * 1024; // 1MB

/// Message types for the session actor
pub enum SessionMsg {
    /// Execute Python source
    Execute {
        source: String,
        respond_to: oneshot::Sender<ExecutionResult>,
    },
    /// Drop user bindings
    Reset {
        respond_to: oneshot::Sender<Result<(), String>>,
    },
    /// Check if the interpreter is up
    HealthCheck { respond_to: oneshot::Sender<bool> },
}

/// The actor that owns the interpreter
pub struct SessionActor {
    rx: mpsc::Receiver<SessionMsg>,
    session: PythonSession,
    generation: u64,
}

impl SessionActor {
    pub fn new(rx: mpsc::Receiver<SessionMsg>, session: PythonSession, generation: u64) -> Self {
        Self {
            rx,
            session,
            generation,
        }
    }

    /// Serve messages until every sender is dropped. Blocks the thread.
    pub fn run(mut self) {
        info!(generation = self.generation, "session actor started");

        while let Some(msg) = self.rx.blocking_recv() {
            match msg {
                SessionMsg::Execute { source, respond_to } => {
                    debug!(
                        generation = self.generation,
                        lines = source.lines().count(),
                        "executing source"
                    );
                    let mut result = self.session.execute(&source);
                    if result.output.len() > MAX_OUTPUT_SIZE {
                        let mut cut = MAX_OUTPUT_SIZE;
                        while !result.output.is_char_boundary(cut) {
                            cut -= 1;
                        }
                        result.output.truncate(cut);
                        result.output.push_str("\n... [output truncated]");
                    }
                    let _ = respond_to.send(result);
                }
                SessionMsg::Reset { respond_to } => {
                    let _ = respond_to.send(self.session.reset());
                }
                SessionMsg::HealthCheck { respond_to } => {
                    let _ = respond_to.send(true);
                }
            }
        }

        info!(generation = self.generation, "session actor shut down");
    }
}

/// Start a session on its own thread and return the channel to it.
///
/// If the interpreter fails to start the thread exits and the channel
/// closes, which callers observe as `BackendError::Unavailable`.
pub fn spawn_session_actor(
    config: SessionConfig,
    generation: u64,
) -> Result<mpsc::Sender<SessionMsg>, BackendError> {
    let (tx, rx) = mpsc::channel(32);

    std::thread::Builder::new()
        .name(format!("python-session-{}", generation))
        .spawn(move || match PythonSession::new(config) {
            Ok(session) => SessionActor::new(rx, session, generation).run(),
            Err(e) => error!(generation, error = %e, "python session failed to start"),
        })?;

    Ok(tx)
}

struct WorkerSlot {
    tx: mpsc::Sender<SessionMsg>,
    generation: u64,
}

/// Cloneable handle to the shared session
#[derive(Clone)]
pub struct SessionHandle {
    worker: Arc<RwLock<WorkerSlot>>,
    config: SessionConfig,
}

impl SessionHandle {
    pub fn start(config: SessionConfig) -> Result<Self, BackendError> {
        let tx = spawn_session_actor(config.clone(), 1)?;
        Ok(Self {
            worker: Arc::new(RwLock::new(WorkerSlot { tx, generation: 1 })),
            config,
        })
    }

    /// Which interpreter instance is serving requests; bumps on restart
    pub async fn generation(&self) -> u64 {
        self.worker.read().await.generation
    }

    async fn sender(&self) -> (mpsc::Sender<SessionMsg>, u64) {
        let slot = self.worker.read().await;
        (slot.tx.clone(), slot.generation)
    }

    /// Replace the worker that timed out with a fresh session.
    ///
    /// No-op if another caller already restarted past `stale_generation`.
    async fn restart(&self, stale_generation: u64) -> Result<(), BackendError> {
        let mut slot = self.worker.write().await;
        if slot.generation != stale_generation {
            return Ok(());
        }
        let generation = stale_generation + 1;
        slot.tx = spawn_session_actor(self.config.clone(), generation)?;
        slot.generation = generation;
        warn!(
            abandoned = stale_generation,
            generation, "python session restarted after timeout"
        );
        Ok(())
    }
}

#[async_trait]
impl ExecutionBackend for SessionHandle {
    async fn execute(&self, source: &str, timeout: Duration) -> Result<ExecutionResult, BackendError> {
        let (tx, generation) = self.sender().await;
        let (respond_to, rx) = oneshot::channel();

        tx.send(SessionMsg::Execute {
            source: source.to_string(),
            respond_to,
        })
        .await
        .map_err(|_| BackendError::Unavailable("session actor has stopped".to_string()))?;

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(_)) => Err(BackendError::Unavailable(
                "session actor dropped the request".to_string(),
            )),
            Err(_) => {
                warn!(generation, timeout_ms = timeout.as_millis() as u64, "execution timed out");
                self.restart(generation).await?;
                Ok(timed_out(timeout))
            }
        }
    }

    async fn reset(&self) -> Result<(), BackendError> {
        let (tx, _) = self.sender().await;
        let (respond_to, rx) = oneshot::channel();
        tx.send(SessionMsg::Reset { respond_to })
            .await
            .map_err(|_| BackendError::Unavailable("session actor has stopped".to_string()))?;
        rx.await
            .map_err(|_| BackendError::Unavailable("session actor dropped the request".to_string()))?
            .map_err(BackendError::Reset)
    }

    async fn is_alive(&self) -> bool {
        let (tx, _) = self.sender().await;
        let (respond_to, rx) = oneshot::channel();
        if tx.send(SessionMsg::HealthCheck { respond_to }).await.is_err() {
            return false;
        }
        rx.await.unwrap_or(false)
    }
}
