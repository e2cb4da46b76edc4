// mipow Source Code File
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! The `api` module contains the traits and types a Bluetooth stack must provide for mipow to
//! find and drive bulbs.
//!
//! A transport is split the same way BLE itself is: a [`Central`] scans for advertisements and
//! dials peripherals, and every successful dial produces a [`Connection`] over which services
//! and characteristics are discovered and written. The rest of the crate is generic over these
//! two traits, which keeps it testable without a radio.

mod bdaddr;
pub mod bleuuid;

pub use self::bdaddr::{BDAddr, ParseBDAddrError};

use crate::Result;
use async_trait::async_trait;
use bitflags::bitflags;
use futures::stream::Stream;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
#[cfg(feature = "serde")]
use serde_cr as serde;
use static_assertions::assert_impl_all;
use std::fmt::{self, Debug, Display, Formatter};
use std::pin::Pin;
use uuid::Uuid;

use self::bleuuid::BleUuid;

/// A broadcast received while scanning. Only lives as long as the scan callback that receives
/// it; anything worth keeping should be copied out.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_cr")
)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advertisement {
    /// The address of the advertising peripheral.
    pub address: BDAddr,
    /// The local name, if the peripheral included one.
    pub local_name: Option<String>,
    /// The service UUIDs listed in the advertisement.
    pub services: Vec<Uuid>,
}

impl Advertisement {
    /// Whether `service` is listed in this advertisement.
    pub fn advertises(&self, service: &Uuid) -> bool {
        self.services.iter().any(|s| s == service)
    }
}

/// A GATT service on a connected peripheral.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Service {
    /// The UUID of the service.
    pub uuid: Uuid,
    /// The attribute handle the service starts at. Distinguishes multiple instances of the same
    /// service UUID.
    pub handle: u16,
    /// Whether this is a primary service.
    pub primary: bool,
}

impl Display for Service {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(
            f,
            "service {} (handle: 0x{:04X})",
            self.uuid.to_short_string(),
            self.handle
        )
    }
}

bitflags! {
    /// A set of properties that indicate what operations are supported by a Characteristic.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct CharPropFlags: u8 {
        const BROADCAST = 0x01;
        const READ = 0x02;
        const WRITE_WITHOUT_RESPONSE = 0x04;
        const WRITE = 0x08;
        const NOTIFY = 0x10;
        const INDICATE = 0x20;
        const AUTHENTICATED_SIGNED_WRITES = 0x40;
        const EXTENDED_PROPERTIES = 0x80;
    }
}

/// A GATT characteristic. Characteristics are the main way you will interact with other BLE
/// devices.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Characteristic {
    /// The UUID for this characteristic. This uniquely identifies its behavior.
    pub uuid: Uuid,
    /// The UUID of the service this characteristic belongs to.
    pub service_uuid: Uuid,
    /// The attribute handle of the characteristic's value.
    pub handle: u16,
    /// The set of properties for this characteristic, which indicate what functionality it
    /// supports.
    pub properties: CharPropFlags,
}

impl Characteristic {
    /// Whether the peripheral accepts writes to this characteristic in either mode.
    pub fn is_writable(&self) -> bool {
        self.properties
            .intersects(CharPropFlags::WRITE | CharPropFlags::WRITE_WITHOUT_RESPONSE)
    }
}

impl Display for Characteristic {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(
            f,
            "uuid: {}, service: {}, handle: 0x{:04X}, properties: {:?}",
            self.uuid.to_short_string(),
            self.service_uuid.to_short_string(),
            self.handle,
            self.properties
        )
    }
}

/// The type of write operation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteType {
    /// A write operation where the device is expected to respond with a confirmation or error.
    /// Also known as a request.
    WithResponse,
    /// A write-without-response, also known as a command.
    WithoutResponse,
}

/// The stream of advertisements produced by [`Central::scan`].
pub type AdvertisementStream = Pin<Box<dyn Stream<Item = Advertisement> + Send>>;

/// Central is the "client" of BLE. It's able to scan for advertisements and establish
/// connections to peripherals.
#[async_trait]
pub trait Central: Send + Sync + Clone + 'static {
    type Connection: Connection;

    /// Starts scanning and returns every advertisement received from now on, unfiltered and
    /// possibly repeated. `active` requests scan responses from advertisers; transports that
    /// can't choose may ignore it.
    ///
    /// The stream ends only if the transport gives up; stop it with [`Central::stop_scan`].
    async fn scan(&self, active: bool) -> Result<AdvertisementStream>;

    /// Stops a scan started by [`Central::scan`].
    async fn stop_scan(&self) -> Result<()>;

    /// Connects to the peripheral with the given address. Each call is a single attempt.
    async fn dial(&self, address: BDAddr) -> Result<Self::Connection>;
}

/// A live connection to a peripheral, as returned by [`Central::dial`].
///
/// Clones refer to the same underlying link, so closing any clone closes all of them.
#[async_trait]
pub trait Connection: Send + Sync + Clone + Debug + 'static {
    /// The address of the connected peripheral.
    fn address(&self) -> BDAddr;

    /// Requests an ATT MTU of `mtu` bytes and returns the negotiated value.
    async fn exchange_mtu(&self, mtu: u16) -> Result<u16>;

    /// Discovers the services whose UUID is in `filter`, or all of them if `filter` is empty.
    async fn discover_services(&self, filter: &[Uuid]) -> Result<Vec<Service>>;

    /// Discovers the characteristics of `service` whose UUID is in `filter`, or all of them if
    /// `filter` is empty.
    async fn discover_characteristics(
        &self,
        filter: &[Uuid],
        service: &Service,
    ) -> Result<Vec<Characteristic>>;

    /// Write some data to the characteristic. Returns an error if the write couldn't be sent or (in
    /// the case of a write-with-response) if the device returns an error.
    async fn write_characteristic(
        &self,
        characteristic: &Characteristic,
        data: &[u8],
        write_type: WriteType,
    ) -> Result<()>;

    /// Terminates the connection.
    async fn close(&self) -> Result<()>;
}

assert_impl_all!(Advertisement: Clone, Debug, Send, Sync);
assert_impl_all!(Characteristic: Clone, Debug, Eq, Ord, Send, Sync);
assert_impl_all!(Service: Clone, Debug, Eq, Ord, Send, Sync);
