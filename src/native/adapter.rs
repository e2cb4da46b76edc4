// mipow Source Code File
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

use super::connection::Connection;
use super::to_bdaddr;
use crate::api::{Advertisement, AdvertisementStream, BDAddr, Central};
use crate::common::adapter_manager::AdapterManager;
use crate::{Error, Result};
use async_trait::async_trait;
use btleplug::api::{Central as _, CentralEvent, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter as BtleAdapter, Manager, Peripheral, PeripheralId};
use futures::stream::StreamExt;
use log::{debug, info};
use std::sync::Arc;

/// Implementation of [api::Central](crate::api::Central) on the first adapter the platform
/// reports.
#[derive(Clone, Debug)]
pub struct Adapter {
    adapter: BtleAdapter,
    manager: Arc<AdapterManager<Peripheral>>,
}

impl Adapter {
    /// Opens the platform Bluetooth stack and picks its first adapter.
    pub async fn new() -> Result<Self> {
        let manager = Manager::new().await?;
        let adapter = manager
            .adapters()
            .await?
            .into_iter()
            .next()
            .ok_or(Error::NoAdapter)?;
        info!("Using adapter {}", adapter.adapter_info().await?);
        Ok(Self {
            adapter,
            manager: Arc::default(),
        })
    }

    async fn find_peripheral(&self, address: BDAddr) -> Result<Peripheral> {
        if let Some(peripheral) = self.manager.peripheral(&address) {
            return Ok(peripheral);
        }
        debug!(
            "{} not among {} scanned peripherals, asking the adapter",
            address,
            self.manager.len()
        );
        self.adapter
            .peripherals()
            .await?
            .into_iter()
            .find(|p| to_bdaddr(p.address()) == address)
            .ok_or(Error::DeviceNotFound(address))
    }
}

#[async_trait]
impl Central for Adapter {
    type Connection = Connection;

    async fn scan(&self, active: bool) -> Result<AdvertisementStream> {
        // btleplug always scans actively where the platform allows it.
        debug!("Starting scan (active requested: {})", active);
        let events = self.adapter.events().await?;
        self.adapter.start_scan(ScanFilter::default()).await?;

        let adapter = self.adapter.clone();
        let manager = self.manager.clone();
        let advertisements = events.filter_map(move |event| {
            advertisement(event, adapter.clone(), manager.clone())
        });
        Ok(Box::pin(advertisements))
    }

    async fn stop_scan(&self) -> Result<()> {
        self.adapter.stop_scan().await?;
        Ok(())
    }

    async fn dial(&self, address: BDAddr) -> Result<Connection> {
        let peripheral = self.find_peripheral(address).await?;
        peripheral.connect().await?;
        debug!("Connected to {}", address);
        Ok(Connection::new(address, peripheral))
    }
}

async fn advertisement(
    event: CentralEvent,
    adapter: BtleAdapter,
    manager: Arc<AdapterManager<Peripheral>>,
) -> Option<Advertisement> {
    let id: PeripheralId = match event {
        CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => id,
        CentralEvent::ServicesAdvertisement { id, .. } => id,
        _ => return None,
    };
    let peripheral = adapter.peripheral(&id).await.ok()?;
    let properties = peripheral.properties().await.ok()??;
    let address = to_bdaddr(peripheral.address());
    manager.add_peripheral(address, peripheral);
    Some(Advertisement {
        address,
        local_name: properties.local_name,
        services: properties.services,
    })
}
