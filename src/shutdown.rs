//! Cooperative shutdown.
//!
//! A single `watch` flag is the cancellation signal every activity selects
//! on. The [`ShutdownCoordinator`] owns the spawned tasks and the display
//! guard: on shutdown it raises the flag, gives tasks a bounded grace period
//! to finish, aborts whatever is left and releases the display exactly once.

use crate::display::DisplayGuard;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

/// Receiving side of the cancellation flag.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once shutdown has been requested.
    ///
    /// Also resolves if every trigger is gone, since nothing could cancel
    /// the caller afterwards.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

/// Sending side of the cancellation flag.
#[derive(Debug, Clone)]
pub struct ShutdownTrigger {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownTrigger {
    /// Requests shutdown. Only the first request is logged.
    pub fn trigger(&self, reason: &str) {
        let first = self.tx.send_if_modified(|cancelled| {
            if *cancelled {
                false
            } else {
                *cancelled = true;
                true
            }
        });
        if first {
            tracing::info!(reason, "Shutdown requested");
        }
    }
}

/// Creates a connected trigger/signal pair.
pub fn pair() -> (ShutdownTrigger, ShutdownSignal) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx: Arc::new(tx) }, ShutdownSignal { rx })
}

/// Outcome of [`ShutdownCoordinator::shutdown`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Tasks that returned on their own within the grace period.
    pub finished: usize,
    /// Tasks that were aborted after the grace period ran out.
    pub aborted: Vec<String>,
    /// Whether this shutdown was the one that released the display.
    pub display_released: bool,
}

pub struct ShutdownCoordinator {
    trigger: ShutdownTrigger,
    signal: ShutdownSignal,
    tasks: Vec<(String, JoinHandle<()>)>,
    grace: Duration,
    display: DisplayGuard,
}

impl ShutdownCoordinator {
    pub fn new(display: DisplayGuard, grace: Duration) -> Self {
        let (trigger, signal) = pair();
        Self {
            trigger,
            signal,
            tasks: Vec::new(),
            grace,
            display,
        }
    }

    pub fn trigger(&self) -> ShutdownTrigger {
        self.trigger.clone()
    }

    pub fn signal(&self) -> ShutdownSignal {
        self.signal.clone()
    }

    pub fn display(&self) -> &DisplayGuard {
        &self.display
    }

    /// Spawns a task that will be joined (or aborted) on shutdown.
    pub fn spawn<F>(&mut self, name: impl Into<String>, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let name = name.into();
        tracing::debug!(task = %name, "Spawning task");
        self.tasks.push((name, tokio::spawn(task)));
    }

    /// Waits for SIGINT, SIGTERM or an internal trigger, whichever is first.
    pub async fn wait_for_termination(&self) -> std::io::Result<()> {
        #[cfg(unix)]
        {
            let mut sigterm = signal(SignalKind::terminate())?;
            let mut sigint = signal(SignalKind::interrupt())?;

            tokio::select! {
                biased;
                _ = sigterm.recv() => self.trigger.trigger("SIGTERM"),
                _ = sigint.recv() => self.trigger.trigger("SIGINT"),
                _ = self.signal.cancelled() => {}
            }
        }

        #[cfg(not(unix))]
        {
            tokio::select! {
                biased;
                result = tokio::signal::ctrl_c() => {
                    result?;
                    self.trigger.trigger("Ctrl-C");
                }
                _ = self.signal.cancelled() => {}
            }
        }

        Ok(())
    }

    /// Cancels every task, waits up to the grace period, aborts stragglers
    /// and releases the display.
    pub async fn shutdown(mut self) -> ShutdownReport {
        self.trigger.trigger("shutdown");

        let deadline = tokio::time::Instant::now() + self.grace;
        let mut finished = 0;
        let mut aborted = Vec::new();

        for (name, mut handle) in self.tasks.drain(..) {
            match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(Ok(())) => finished += 1,
                Ok(Err(e)) => {
                    tracing::warn!(task = %name, error = %e, "Task ended abnormally");
                    finished += 1;
                }
                Err(_) => {
                    tracing::warn!(task = %name, "Task did not stop within grace period, aborting");
                    handle.abort();
                    aborted.push(name);
                }
            }
        }

        let display_released = self.display.release();
        tracing::info!(finished, aborted = aborted.len(), "Shutdown complete");

        ShutdownReport {
            finished,
            aborted,
            display_released,
        }
    }
}
