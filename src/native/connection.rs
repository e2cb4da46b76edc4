// mipow Source Code File
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

use crate::api::{self, BDAddr, CharPropFlags, Characteristic, Service, WriteType};
use crate::{Error, Result};
use async_trait::async_trait;
use btleplug::api::Peripheral as _;
use btleplug::platform::Peripheral;
use uuid::Uuid;

/// Implementation of [api::Connection](crate::api::Connection) over a connected btleplug
/// peripheral.
///
/// btleplug does not expose attribute handles, so services and characteristics are numbered
/// in the order the peripheral reports them. Writes look characteristics up again by UUID.
#[derive(Clone, Debug)]
pub struct Connection {
    address: BDAddr,
    peripheral: Peripheral,
}

impl Connection {
    pub(crate) fn new(address: BDAddr, peripheral: Peripheral) -> Self {
        Self {
            address,
            peripheral,
        }
    }

    fn native_characteristic(
        &self,
        characteristic: &Characteristic,
    ) -> Result<btleplug::api::Characteristic> {
        self.peripheral
            .characteristics()
            .into_iter()
            .find(|c| {
                c.uuid == characteristic.uuid && c.service_uuid == characteristic.service_uuid
            })
            .ok_or_else(|| {
                let message = format!("{} has no characteristic {}", self.address, characteristic);
                Error::Transport(message.into())
            })
    }
}

fn wanted(filter: &[Uuid], uuid: &Uuid) -> bool {
    filter.is_empty() || filter.contains(uuid)
}

#[async_trait]
impl api::Connection for Connection {
    fn address(&self) -> BDAddr {
        self.address
    }

    async fn exchange_mtu(&self, _mtu: u16) -> Result<u16> {
        Err(Error::NotSupported(
            "MTU exchange is negotiated by the platform".into(),
        ))
    }

    async fn discover_services(&self, filter: &[Uuid]) -> Result<Vec<Service>> {
        self.peripheral.discover_services().await?;
        Ok(self
            .peripheral
            .services()
            .into_iter()
            .enumerate()
            .filter(|(_, service)| wanted(filter, &service.uuid))
            .map(|(index, service)| Service {
                uuid: service.uuid,
                handle: index as u16,
                primary: service.primary,
            })
            .collect())
    }

    async fn discover_characteristics(
        &self,
        filter: &[Uuid],
        service: &Service,
    ) -> Result<Vec<Characteristic>> {
        let native = self
            .peripheral
            .services()
            .into_iter()
            .nth(service.handle as usize)
            .filter(|s| s.uuid == service.uuid)
            .ok_or_else(|| {
                Error::Transport(format!("{} is gone from {}", service, self.address).into())
            })?;
        Ok(native
            .characteristics
            .into_iter()
            .enumerate()
            .filter(|(_, c)| wanted(filter, &c.uuid))
            .map(|(index, c)| Characteristic {
                uuid: c.uuid,
                service_uuid: c.service_uuid,
                handle: index as u16,
                properties: CharPropFlags::from_bits_truncate(c.properties.bits()),
            })
            .collect())
    }

    async fn write_characteristic(
        &self,
        characteristic: &Characteristic,
        data: &[u8],
        write_type: WriteType,
    ) -> Result<()> {
        let native = self.native_characteristic(characteristic)?;
        let write_type = match write_type {
            WriteType::WithResponse => btleplug::api::WriteType::WithResponse,
            WriteType::WithoutResponse => btleplug::api::WriteType::WithoutResponse,
        };
        self.peripheral.write(&native, data, write_type).await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.peripheral.disconnect().await?;
        Ok(())
    }
}
