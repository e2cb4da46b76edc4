// mipow Source Code File
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! A scripted in-memory transport for tests.

use crate::api::{
    AdvertisementStream, Advertisement, BDAddr, Central, CharPropFlags, Characteristic,
    Connection, Service, WriteType,
};
use crate::protocol::{COLOR_CHARACTERISTIC_UUID, EFFECT_CHARACTERISTIC_UUID, SERVICE_UUID};
use crate::{Error, Result};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use uuid::Uuid;

pub(crate) fn addr(last: u8) -> BDAddr {
    [0x00, 0x11, 0x22, 0x33, 0x44, last].into()
}

pub(crate) fn advertisement(address: BDAddr, services: &[Uuid]) -> Advertisement {
    Advertisement {
        address,
        local_name: Some(format!("MIPOW {:x}", address)),
        services: services.to_vec(),
    }
}

pub(crate) fn bulb_advertisement(last: u8) -> Advertisement {
    advertisement(addr(last), &[SERVICE_UUID])
}

pub(crate) fn service(handle: u16) -> Service {
    Service {
        uuid: SERVICE_UUID,
        handle,
        primary: true,
    }
}

pub(crate) fn characteristic(uuid: Uuid, handle: u16) -> Characteristic {
    Characteristic {
        uuid,
        service_uuid: SERVICE_UUID,
        handle,
        properties: CharPropFlags::READ | CharPropFlags::WRITE,
    }
}

/// How a dial to a peripheral behaves.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) enum Dial {
    #[default]
    Succeed,
    Fail,
    After(Duration),
}

/// The GATT layout and failure switches of one simulated peripheral.
#[derive(Debug, Clone, Default)]
pub(crate) struct MockPeripheral {
    pub dial: Dial,
    pub services: Vec<(Service, Vec<Characteristic>)>,
    pub fail_mtu: bool,
    pub mtu_unsupported: bool,
    pub discover_delay: Option<Duration>,
    pub fail_services: bool,
    pub fail_characteristics: bool,
    pub fail_writes: bool,
}

impl MockPeripheral {
    /// A well-behaved bulb with one vendor service holding both characteristics.
    pub fn bulb() -> Self {
        Self {
            services: vec![(
                service(0x0010),
                vec![
                    characteristic(EFFECT_CHARACTERISTIC_UUID, 0x0012),
                    characteristic(COLOR_CHARACTERISTIC_UUID, 0x0015),
                ],
            )],
            ..Self::default()
        }
    }

    pub fn with_dial(mut self, dial: Dial) -> Self {
        self.dial = dial;
        self
    }

    pub fn with_discover_delay(mut self, delay: Duration) -> Self {
        self.discover_delay = Some(delay);
        self
    }
}

/// Everything a [`MockConnection`] was asked to do.
#[derive(Debug, Default)]
pub(crate) struct ConnectionLog {
    pub writes: Vec<(Characteristic, Vec<u8>, WriteType)>,
    pub characteristic_discoveries: usize,
    pub closes: usize,
}

#[derive(Debug, Clone)]
pub(crate) struct MockConnection {
    address: BDAddr,
    peripheral: Arc<MockPeripheral>,
    pub log: Arc<Mutex<ConnectionLog>>,
}

impl MockConnection {
    pub fn new(address: BDAddr, peripheral: MockPeripheral) -> Self {
        Self {
            address,
            peripheral: Arc::new(peripheral),
            log: Arc::default(),
        }
    }

    pub fn closes(&self) -> usize {
        self.log.lock().unwrap().closes
    }
}

fn transport_error(what: &str) -> Error {
    Error::Transport(format!("simulated {} failure", what).into())
}

#[async_trait]
impl Connection for MockConnection {
    fn address(&self) -> BDAddr {
        self.address
    }

    async fn exchange_mtu(&self, mtu: u16) -> Result<u16> {
        if self.peripheral.fail_mtu {
            return Err(transport_error("mtu"));
        }
        if self.peripheral.mtu_unsupported {
            return Err(Error::NotSupported("mtu exchange".into()));
        }
        Ok(mtu.min(247))
    }

    async fn discover_services(&self, filter: &[Uuid]) -> Result<Vec<Service>> {
        if let Some(delay) = self.peripheral.discover_delay {
            tokio::time::sleep(delay).await;
        }
        if self.peripheral.fail_services {
            return Err(transport_error("service discovery"));
        }
        Ok(self
            .peripheral
            .services
            .iter()
            .map(|(s, _)| s.clone())
            .filter(|s| filter.is_empty() || filter.contains(&s.uuid))
            .collect())
    }

    async fn discover_characteristics(
        &self,
        filter: &[Uuid],
        service: &Service,
    ) -> Result<Vec<Characteristic>> {
        self.log.lock().unwrap().characteristic_discoveries += 1;
        if self.peripheral.fail_characteristics {
            return Err(transport_error("characteristic discovery"));
        }
        Ok(self
            .peripheral
            .services
            .iter()
            .filter(|(s, _)| s == service)
            .flat_map(|(_, chars)| chars.iter().cloned())
            .filter(|c| filter.is_empty() || filter.contains(&c.uuid))
            .collect())
    }

    async fn write_characteristic(
        &self,
        characteristic: &Characteristic,
        data: &[u8],
        write_type: WriteType,
    ) -> Result<()> {
        if self.peripheral.fail_writes {
            return Err(transport_error("write"));
        }
        self.log
            .lock()
            .unwrap()
            .writes
            .push((characteristic.clone(), data.to_vec(), write_type));
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.log.lock().unwrap().closes += 1;
        Ok(())
    }
}

#[derive(Default)]
struct CentralState {
    advertisements: Mutex<Vec<Advertisement>>,
    live: Mutex<Option<mpsc::UnboundedReceiver<Advertisement>>>,
    peripherals: Mutex<HashMap<BDAddr, MockPeripheral>>,
    connections: Mutex<Vec<MockConnection>>,
    fail_scan: Mutex<bool>,
    stop_scans: AtomicUsize,
}

/// A central that replays scripted advertisements and dials simulated peripherals.
///
/// Scripted advertisements are delivered immediately, after which the stream stays open
/// without producing anything, the way a quiet radio would.
#[derive(Clone, Default)]
pub(crate) struct MockCentral {
    state: Arc<CentralState>,
}

impl MockCentral {
    pub fn new() -> Self {
        Self::default()
    }

    /// A central whose scan stream is fed from the returned sender and ends when it is dropped.
    pub fn live() -> (Self, mpsc::UnboundedSender<Advertisement>) {
        let central = Self::default();
        let (sender, receiver) = mpsc::unbounded_channel();
        *central.state.live.lock().unwrap() = Some(receiver);
        (central, sender)
    }

    pub fn advertise(&self, advertisement: Advertisement) -> &Self {
        self.state
            .advertisements
            .lock()
            .unwrap()
            .push(advertisement);
        self
    }

    pub fn add_peripheral(&self, address: BDAddr, peripheral: MockPeripheral) -> &Self {
        self.state
            .peripherals
            .lock()
            .unwrap()
            .insert(address, peripheral);
        self
    }

    pub fn fail_scan(&self) {
        *self.state.fail_scan.lock().unwrap() = true;
    }

    pub fn stop_scans(&self) -> usize {
        self.state.stop_scans.load(Ordering::SeqCst)
    }

    /// The connections handed out by `dial`, in dial order.
    pub fn connections(&self) -> Vec<MockConnection> {
        self.state.connections.lock().unwrap().clone()
    }
}

#[async_trait]
impl Central for MockCentral {
    type Connection = MockConnection;

    async fn scan(&self, _active: bool) -> Result<AdvertisementStream> {
        if *self.state.fail_scan.lock().unwrap() {
            return Err(transport_error("scan"));
        }
        if let Some(receiver) = self.state.live.lock().unwrap().take() {
            return Ok(Box::pin(UnboundedReceiverStream::new(receiver)));
        }
        let scripted = self.state.advertisements.lock().unwrap().clone();
        Ok(Box::pin(stream::iter(scripted).chain(stream::pending())))
    }

    async fn stop_scan(&self) -> Result<()> {
        self.state.stop_scans.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn dial(&self, address: BDAddr) -> Result<MockConnection> {
        let peripheral = self
            .state
            .peripherals
            .lock()
            .unwrap()
            .get(&address)
            .cloned()
            .ok_or(Error::DeviceNotFound(address))?;
        match peripheral.dial {
            Dial::Succeed => {}
            Dial::Fail => return Err(transport_error("dial")),
            Dial::After(delay) => tokio::time::sleep(delay).await,
        }
        let connection = MockConnection::new(address, peripheral);
        self.state
            .connections
            .lock()
            .unwrap()
            .push(connection.clone());
        Ok(connection)
    }
}
