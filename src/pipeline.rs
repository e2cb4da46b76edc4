// mipow Source Code File
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! The scan, dial, discover and dispatch pipeline.
//!
//! Three stages run concurrently for the lifetime of one [`Scope`]:
//!
//! 1. a scan task forwards the first advertisement of every bulb into an unbounded channel;
//! 2. a dial stage takes those one at a time, connects, runs [`Bulb::discover`] and hands
//!    each resulting [`Bulb`] over a single-slot channel;
//! 3. the dispatch loop, on the caller's task, passes each bulb to the caller's action.
//!
//! A peripheral that fails to connect or turns out not to be a bulb is logged and skipped.

use crate::api::{Advertisement, BDAddr, Central, Connection};
use crate::bulb::Bulb;
use crate::deadline::{Deadline, Scope};
use crate::scan::scan;
use crate::{Error, Result};
use log::{debug, error, info, warn};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
#[cfg(feature = "serde")]
use serde_cr as serde;
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

/// How long the CLI scans for bulbs unless told otherwise.
pub const DEFAULT_DISCOVERY_WINDOW: Duration = Duration::from_secs(15);

/// What the pipeline keeps of a matching advertisement.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_cr")
)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredBulb {
    pub address: BDAddr,
    pub local_name: Option<String>,
}

impl From<&Advertisement> for DiscoveredBulb {
    fn from(advertisement: &Advertisement) -> Self {
        Self {
            address: advertisement.address,
            local_name: advertisement.local_name.clone(),
        }
    }
}

/// Finds bulbs for `timeout`, or until Ctrl-C, and calls `each` with every one that connects.
///
/// See [`for_each_discovered_bulb_in`].
pub async fn for_each_discovered_bulb<C, F>(central: &C, timeout: Duration, each: F) -> Result<()>
where
    C: Central,
    F: FnMut(Bulb<C::Connection>),
{
    let deadline = Deadline::new(timeout);
    for_each_discovered_bulb_in(central, &deadline.scope(), each).await
}

/// Finds bulbs until `scope` ends and calls `each` with every one that connects, in the order
/// discovery completed.
///
/// `each` runs on the calling task and should return quickly; spawn the real work, e.g. onto
/// an [`ActionPool`]. Bulbs handed to `each` are owned by it and never closed here. Bulbs that
/// finish discovery after the scope ended are closed without being dispatched.
///
/// The scope running out is the normal way for this to finish and gives `Ok(())`. A scan that
/// failed for any other reason is returned as the error, after every dispatched bulb has been
/// handed over.
pub async fn for_each_discovered_bulb_in<C, F>(
    central: &C,
    scope: &Scope,
    mut each: F,
) -> Result<()>
where
    C: Central,
    F: FnMut(Bulb<C::Connection>),
{
    let (found_tx, found_rx) = mpsc::unbounded_channel::<DiscoveredBulb>();
    let scan_task = tokio::spawn({
        let central = central.clone();
        let scope = scope.clone();
        async move {
            scan(&central, &scope, |advertisement| {
                // Only fails once the dial stage is gone, which means the scope ended.
                let _ = found_tx.send(DiscoveredBulb::from(&advertisement));
            })
            .await
        }
    });

    let (bulb_tx, mut bulb_rx) = mpsc::channel(1);
    tokio::spawn(dial_and_discover(
        central.clone(),
        scope.clone(),
        found_rx,
        bulb_tx,
    ));

    loop {
        tokio::select! {
            biased;
            end = scope.done() => {
                debug!("Dispatch loop finished: {:?}", end);
                break;
            }
            bulb = bulb_rx.recv() => match bulb {
                Some(bulb) => each(bulb),
                None => break,
            },
        }
    }

    bulb_rx.close();
    while let Ok(bulb) = bulb_rx.try_recv() {
        close_undispatched(bulb).await;
    }

    match scan_task.await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) if e.is_scope_end() => Ok(()),
        Ok(Err(e)) => Err(e),
        Err(e) => Err(Error::Other(Box::new(e))),
    }
}

async fn dial_and_discover<C: Central>(
    central: C,
    scope: Scope,
    mut found: mpsc::UnboundedReceiver<DiscoveredBulb>,
    bulbs: mpsc::Sender<Bulb<C::Connection>>,
) {
    while let Some(candidate) = found.recv().await {
        let address = candidate.address;
        debug!("Dialing {} ({:?})", address, candidate.local_name);

        let connection = tokio::select! {
            biased;
            _ = scope.done() => {
                debug!("Abandoning dial to {}", address);
                return;
            }
            result = central.dial(address) => match result {
                Ok(connection) => connection,
                Err(e) => {
                    warn!("Failed to connect to {}: {}", address, e);
                    continue;
                }
            },
        };

        let bulb = match Bulb::discover(connection.clone()).await {
            Ok(bulb) => bulb,
            Err(e) => {
                warn!("Failed to discover bulb {}: {}", address, e);
                if let Err(e) = connection.close().await {
                    warn!("Error closing connection to {}: {}", address, e);
                }
                continue;
            }
        };

        info!("Connected to bulb {}", address);
        if let Err(mpsc::error::SendError(bulb)) = bulbs.send(bulb).await {
            close_undispatched(bulb).await;
            return;
        }
    }
}

async fn close_undispatched<C: Connection>(bulb: Bulb<C>) {
    let address = bulb.address();
    debug!("Dispatch loop is gone, closing {}", address);
    if let Err(e) = bulb.close().await {
        warn!("Error closing connection to {}: {}", address, e);
    }
}

/// A set of concurrently running per-bulb actions with an explicit join barrier.
#[derive(Debug, Default)]
pub struct ActionPool {
    units: JoinSet<Result<()>>,
}

impl ActionPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts `action` as its own task.
    pub fn spawn<F>(&mut self, action: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        self.units.spawn(action);
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Waits for every action to finish and returns how many failed or panicked.
    pub async fn join(mut self) -> usize {
        let mut failures = 0;
        while let Some(result) = self.units.join_next().await {
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!("Bulb action failed: {}", e);
                    failures += 1;
                }
                Err(e) => {
                    error!("Bulb action did not complete: {}", e);
                    failures += 1;
                }
            }
        }
        failures
    }

    /// Like [`join`](Self::join), but gives up with [`Error::Interrupted`] when `interrupt`
    /// resolves first. Actions still running at that point are aborted.
    pub async fn join_until<F>(self, interrupt: F) -> Result<usize>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            failures = self.join() => Ok(failures),
            _ = interrupt => Err(Error::Interrupted),
        }
    }
}
