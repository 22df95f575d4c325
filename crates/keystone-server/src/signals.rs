//! OS signal watching.
//!
//! [`watch_signals`] runs a background task that calls a registered
//! callback for each signal:
//!
//! | signal    | callback                          |
//! |-----------|-----------------------------------|
//! | `SIGHUP`  | [`SignalHandlers::on_reload`]     |
//! | `SIGINT`  | [`SignalHandlers::on_interrupt`]  |
//! | `SIGTERM` | [`SignalHandlers::on_terminate`]  |
//!
//! Missing callbacks are skipped. The task ends after `SIGTERM`, once its
//! callback has returned, with [`SignalOutcome::Terminated`]; the caller then
//! decides how to exit. On non-Unix targets only Ctrl-C is watched, as an
//! interrupt.
//!
//! Callbacks run on the watcher task and must not block.

use std::fmt;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::Span;

use crate::error::ServerError;
use crate::shutdown::ShutdownSignal;

/// A signal the watcher reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// `SIGHUP`.
    Reload,
    /// `SIGINT` or Ctrl-C.
    Interrupt,
    /// `SIGTERM`.
    Terminate,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Reload => "SIGHUP",
            Self::Interrupt => "SIGINT",
            Self::Terminate => "SIGTERM",
        })
    }
}

/// How the watcher task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalOutcome {
    /// A terminate signal was handled.
    Terminated,
    /// The signal source closed before any terminate signal.
    Closed,
}

/// A signal callback.
pub type SignalCallback = Box<dyn Fn() + Send + Sync + 'static>;

/// Callbacks for reload, interrupt and terminate.
#[derive(Default)]
pub struct SignalHandlers {
    reload: Option<SignalCallback>,
    interrupt: Option<SignalCallback>,
    terminate: Option<SignalCallback>,
}

impl fmt::Debug for SignalHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalHandlers")
            .field("reload", &self.reload.is_some())
            .field("interrupt", &self.interrupt.is_some())
            .field("terminate", &self.terminate.is_some())
            .finish()
    }
}

impl SignalHandlers {
    /// Creates an empty set of callbacks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the `SIGHUP` callback.
    pub fn on_reload(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.reload = Some(Box::new(f));
        self
    }

    /// Sets the `SIGINT` callback.
    pub fn on_interrupt(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.interrupt = Some(Box::new(f));
        self
    }

    /// Sets the `SIGTERM` callback.
    pub fn on_terminate(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.terminate = Some(Box::new(f));
        self
    }

    /// Runs the callback for `signal`, if any.
    ///
    /// Returns `Some` when the watcher should stop.
    pub fn handle(&self, signal: Signal) -> Option<SignalOutcome> {
        let callback = match signal {
            Signal::Reload => &self.reload,
            Signal::Interrupt => &self.interrupt,
            Signal::Terminate => &self.terminate,
        };
        if let Some(callback) = callback {
            callback();
        }
        (signal == Signal::Terminate).then_some(SignalOutcome::Terminated)
    }
}

/// Dispatches signals received on a channel until a terminate signal or
/// until every sender is dropped.
pub fn watch_channel(handlers: SignalHandlers, mut rx: mpsc::Receiver<Signal>) -> JoinHandle<SignalOutcome> {
    tokio::spawn(async move {
        while let Some(signal) = rx.recv().await {
            tracing::info!(%signal, "signal received");
            if let Some(outcome) = handlers.handle(signal) {
                return outcome;
            }
        }
        SignalOutcome::Closed
    })
}

/// Starts watching OS signals.
///
/// Must be called from within a tokio runtime. Installing the handlers
/// replaces the default `SIGTERM` action, so the process no longer exits
/// on its own: callers must await the returned handle and stop when it
/// yields [`SignalOutcome::Terminated`], for example through
/// [`shutdown_on_terminate`].
///
/// # Errors
///
/// Returns [`ServerError::Signal`] if a signal handler cannot be installed.
pub fn watch_signals(handlers: SignalHandlers) -> Result<JoinHandle<SignalOutcome>, ServerError> {
    let (tx, rx) = mpsc::channel(8);
    forward_os_signals(tx)?;
    Ok(watch_channel(handlers, rx))
}

#[cfg(unix)]
fn forward_os_signals(tx: mpsc::Sender<Signal>) -> Result<(), ServerError> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = signal(SignalKind::hangup()).map_err(ServerError::Signal)?;
    let mut interrupt = signal(SignalKind::interrupt()).map_err(ServerError::Signal)?;
    let mut terminate = signal(SignalKind::terminate()).map_err(ServerError::Signal)?;

    tokio::spawn(async move {
        loop {
            let received = tokio::select! {
                Some(()) = hangup.recv() => Signal::Reload,
                Some(()) = interrupt.recv() => Signal::Interrupt,
                Some(()) = terminate.recv() => Signal::Terminate,
                else => break,
            };
            if tx.send(received).await.is_err() {
                break;
            }
        }
    });
    Ok(())
}

#[cfg(not(unix))]
fn forward_os_signals(tx: mpsc::Sender<Signal>) -> Result<(), ServerError> {
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if tx.send(Signal::Interrupt).await.is_err() {
                break;
            }
        }
    });
    Ok(())
}

/// Triggers `shutdown` when `watcher` ends with
/// [`SignalOutcome::Terminated`], whatever the terminate callback did.
///
/// The returned handle yields the watcher's outcome. A watcher that
/// panicked or was aborted counts as [`SignalOutcome::Closed`].
pub fn shutdown_on_terminate(
    watcher: JoinHandle<SignalOutcome>,
    shutdown: ShutdownSignal,
) -> JoinHandle<SignalOutcome> {
    tokio::spawn(async move {
        let outcome = watcher.await.unwrap_or(SignalOutcome::Closed);
        if outcome == SignalOutcome::Terminated {
            shutdown.trigger(Signal::Terminate.to_string());
        }
        outcome
    })
}

/// Returns a callback that logs `shutting down because of <reason>` at
/// error level in `logger` and triggers `shutdown`.
pub fn fatal_callback(
    logger: Span,
    reason: impl Into<String>,
    shutdown: ShutdownSignal,
) -> impl Fn() + Send + Sync + 'static {
    let reason = reason.into();
    move || {
        tracing::error!(parent: &logger, "shutting down because of {}", reason);
        shutdown.trigger(reason.clone());
    }
}
