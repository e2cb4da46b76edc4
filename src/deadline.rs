// mipow Source Code File
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! Time budgets that also end on Ctrl-C.
//!
//! A [`Deadline`] owns the timer and the interrupt listener; any number of [`Scope`]s observe
//! it. Nothing is killed when a scope ends: long running work is expected to select on
//! [`Scope::done`] and wind itself down.

use crate::Error;
use log::{debug, warn};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Why a [`Scope`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeEnd {
    /// The time budget ran out.
    DeadlineExceeded,
    /// The interrupt fired first.
    Interrupted,
    /// The deadline was cancelled, or dropped, before either.
    Cancelled,
}

impl From<ScopeEnd> for Error {
    fn from(end: ScopeEnd) -> Self {
        match end {
            ScopeEnd::DeadlineExceeded => Error::DeadlineExceeded,
            ScopeEnd::Interrupted => Error::Interrupted,
            ScopeEnd::Cancelled => Error::Cancelled,
        }
    }
}

/// A view of a [`Deadline`] that can be cloned into every task working within it.
#[derive(Debug, Clone)]
pub struct Scope {
    state: watch::Receiver<Option<ScopeEnd>>,
}

impl Scope {
    /// Waits for the scope to end. Returns immediately if it already has.
    pub async fn done(&self) -> ScopeEnd {
        let mut state = self.state.clone();
        let end = match state.wait_for(Option::is_some).await {
            Ok(end) => *end,
            // The deadline was dropped without ever firing.
            Err(_) => None,
        };
        end.unwrap_or(ScopeEnd::Cancelled)
    }

    pub fn end(&self) -> Option<ScopeEnd> {
        *self.state.borrow()
    }

    pub fn is_done(&self) -> bool {
        self.end().is_some()
    }
}

/// Ends its scopes after a fixed duration or on an interrupt, whichever comes first.
///
/// The timer and interrupt listener live in a background task that exits as soon as the scope
/// ends and is aborted when the `Deadline` is dropped, so the listener is released on every
/// path. Must be created inside a tokio runtime.
#[derive(Debug)]
pub struct Deadline {
    state: Arc<watch::Sender<Option<ScopeEnd>>>,
    watcher: JoinHandle<()>,
}

impl Deadline {
    /// A deadline of `timeout` that Ctrl-C cuts short.
    ///
    /// Once tokio starts listening for SIGINT it never restores the default handler, so after
    /// this deadline ends Ctrl-C no longer terminates the process on its own. Anything that
    /// waits past the deadline has to race against [`ctrl_c`] itself.
    pub fn new(timeout: Duration) -> Self {
        Self::with_interrupt(timeout, ctrl_c())
    }

    /// A deadline of `timeout` that `interrupt` cuts short if it completes first.
    pub fn with_interrupt<F>(timeout: Duration, interrupt: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (state, _) = watch::channel(None);
        let state = Arc::new(state);

        let watcher = tokio::spawn({
            let state = state.clone();
            let mut cancelled = state.subscribe();
            async move {
                let end = tokio::select! {
                    _ = tokio::time::sleep(timeout) => ScopeEnd::DeadlineExceeded,
                    _ = interrupt => ScopeEnd::Interrupted,
                    _ = cancelled.wait_for(Option::is_some) => return,
                };
                debug!("Scope ended: {:?}", end);
                finish(&state, end);
            }
        });

        Self { state, watcher }
    }

    pub fn scope(&self) -> Scope {
        Scope {
            state: self.state.subscribe(),
        }
    }

    /// Ends the scope now, unless it already ended.
    pub fn cancel(&self) {
        finish(&self.state, ScopeEnd::Cancelled);
    }
}

impl Drop for Deadline {
    fn drop(&mut self) {
        self.watcher.abort();
    }
}

/// Resolves on the next Ctrl-C. Never resolves if the signal cannot be listened for.
pub async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Unable to listen for Ctrl-C: {}", e);
        futures::future::pending::<()>().await;
    }
}

// First end wins.
fn finish(state: &watch::Sender<Option<ScopeEnd>>, end: ScopeEnd) {
    state.send_if_modified(|current| {
        if current.is_none() {
            *current = Some(end);
            true
        } else {
            false
        }
    });
}
