// mipow Source Code File
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! mipow discovers MiPOW Bluetooth LE smart bulbs and drives their color, brightness and effect
//! modes.
//!
//! The crate is split along the path a command takes to reach a bulb:
//!
//! - [`api`] is the transport boundary: the [`Central`](api::Central) and
//!   [`Connection`](api::Connection) traits a Bluetooth stack has to provide, plus the
//!   advertisement and GATT data model.
//! - [`scan`] filters a raw advertisement stream down to bulbs, reporting each address once.
//! - [`bulb`] turns a fresh connection into a [`Bulb`](bulb::Bulb) handle by locating the color
//!   and effect characteristics.
//! - [`protocol`] encodes intents ("set color", "rainbow fade", ...) into command frames.
//! - [`deadline`] provides a time budget that also ends early on Ctrl-C.
//! - [`pipeline`] ties the above together: scan, dial and discover concurrently and hand each
//!   bulb to a caller-supplied action.
//!
//! With the `native` feature enabled, [`platform`] provides a `btleplug`-backed implementation
//! of the transport traits.
//!
//! ```no_run
//! # #[cfg(feature = "native")]
//! # async fn demo() -> mipow::Result<()> {
//! use mipow::pipeline::{for_each_discovered_bulb, ActionPool};
//! use mipow::platform::Adapter;
//! use std::time::Duration;
//!
//! let central = Adapter::new().await?;
//! let mut actions = ActionPool::new();
//! for_each_discovered_bulb(&central, Duration::from_secs(15), |bulb| {
//!     actions.spawn(async move {
//!         bulb.set_rainbow_fade(0x10).await?;
//!         bulb.close().await
//!     });
//! })
//! .await?;
//! actions.join().await;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod bulb;
pub mod deadline;
pub mod pipeline;
pub mod protocol;
pub mod scan;

#[cfg(feature = "native")]
mod common;
#[cfg(feature = "native")]
mod native;
#[cfg(feature = "native")]
pub mod platform;

#[cfg(test)]
mod mock;

use crate::api::BDAddr;
use std::result;
use uuid::Uuid;

/// The main error type returned by most methods in mipow.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("No Bluetooth adapter found")]
    NoAdapter,

    #[error("Device not found: {0}")]
    DeviceNotFound(BDAddr),

    #[error("The operation is not supported: {0}")]
    NotSupported(String),

    #[error("Transport error: {0}")]
    Transport(Box<dyn std::error::Error + Send + Sync>),

    #[error("Failed to discover services: {0}")]
    DiscoverServices(Box<Error>),

    #[error("Failed to discover characteristics (service {service}): {source}")]
    DiscoverCharacteristics { service: Uuid, source: Box<Error> },

    #[error("Color and effect characteristics not found on peripheral {0}")]
    CharacteristicsNotFound(BDAddr),

    #[error("Deadline exceeded")]
    DeadlineExceeded,

    #[error("Interrupted")]
    Interrupted,

    #[error("Cancelled")]
    Cancelled,


    #[error("{0}")]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// True for the signals a [`Scope`](deadline::Scope) ends with. These mark the normal end of
    /// a time-bounded operation rather than a failure.
    pub fn is_scope_end(&self) -> bool {
        matches!(
            self,
            Error::DeadlineExceeded | Error::Interrupted | Error::Cancelled
        )
    }

    /// True when a connected peripheral could not be turned into a [`Bulb`](bulb::Bulb).
    pub fn is_discovery_failure(&self) -> bool {
        matches!(
            self,
            Error::DiscoverServices(_)
                | Error::DiscoverCharacteristics { .. }
                | Error::CharacteristicsNotFound(_)
        )
    }
}

/// Convenience type for a result using the mipow [`Error`] type.
pub type Result<T> = result::Result<T, Error>;
