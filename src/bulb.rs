// mipow Source Code File
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! A connected bulb and the discovery procedure that produces it.

use crate::api::{BDAddr, Characteristic, Connection, WriteType};
use crate::protocol::{
    Command, Target, COLOR_CHARACTERISTIC_UUID, EFFECT_CHARACTERISTIC_UUID, SERVICE_UUID,
};
use crate::{Error, Result};
use log::{debug, info, warn};

/// The ATT MTU requested before discovery. Every frame fits the default MTU, so a refusal is
/// not fatal.
pub const REQUESTED_MTU: u16 = 500;

/// A MiPOW bulb on a live connection, with its color and effect characteristics resolved.
///
/// Only bulb operations are exposed; the connection itself stays private. Closing consumes the
/// handle, so a bulb is closed at most once.
#[derive(Debug)]
pub struct Bulb<C: Connection> {
    connection: C,
    color: Characteristic,
    effect: Characteristic,
}

impl<C: Connection> Bulb<C> {
    /// Locates the vendor characteristics on a freshly dialed connection.
    ///
    /// Services are examined in the order the transport returns them, and discovery stops at the
    /// first service after which both characteristics have been seen. The connection is never
    /// closed here; on error, closing it is up to the caller.
    pub async fn discover(connection: C) -> Result<Self> {
        let address = connection.address();
        match connection.exchange_mtu(REQUESTED_MTU).await {
            Ok(mtu) => debug!("{}: negotiated MTU {}", address, mtu),
            Err(Error::NotSupported(e)) => {
                debug!("{}: MTU exchange not supported: {}", address, e)
            }
            Err(e) => warn!("{}: MTU exchange failed, continuing: {}", address, e),
        }

        let services = connection
            .discover_services(&[SERVICE_UUID])
            .await
            .map_err(|e| Error::DiscoverServices(Box::new(e)))?;

        let mut color = None;
        let mut effect = None;
        for service in &services {
            let characteristics = connection
                .discover_characteristics(
                    &[COLOR_CHARACTERISTIC_UUID, EFFECT_CHARACTERISTIC_UUID],
                    service,
                )
                .await
                .map_err(|e| Error::DiscoverCharacteristics {
                    service: service.uuid,
                    source: Box::new(e),
                })?;

            for characteristic in characteristics {
                if !characteristic.is_writable() {
                    warn!(
                        "{}: characteristic is not marked writable: {}",
                        address, characteristic
                    );
                }
                if characteristic.uuid == COLOR_CHARACTERISTIC_UUID {
                    color = Some(characteristic);
                } else if characteristic.uuid == EFFECT_CHARACTERISTIC_UUID {
                    effect = Some(characteristic);
                }
            }

            if let (Some(color), Some(effect)) = (&color, &effect) {
                info!("{}: found bulb characteristics in {}", address, service);
                return Ok(Self {
                    color: color.clone(),
                    effect: effect.clone(),
                    connection,
                });
            }
        }

        Err(Error::CharacteristicsNotFound(address))
    }

    pub fn address(&self) -> BDAddr {
        self.connection.address()
    }

    pub fn color_characteristic(&self) -> &Characteristic {
        &self.color
    }

    pub fn effect_characteristic(&self) -> &Characteristic {
        &self.effect
    }

    /// Encodes `command` and writes it, acknowledged, to the characteristic it targets.
    pub async fn send(&self, command: Command) -> Result<()> {
        let characteristic = match command.target() {
            Target::Color => &self.color,
            Target::Effect => &self.effect,
        };
        debug!("{}: sending {:?}", self.address(), command);
        self.connection
            .write_characteristic(characteristic, &command.to_bytes(), WriteType::WithResponse)
            .await
    }

    /// Sets an RGB intensity. This is a direct drive level rather than a perceptual color: the
    /// closer to (0, 0, 0), the dimmer the bulb.
    pub async fn set_color(&self, r: u8, g: u8, b: u8) -> Result<()> {
        self.send(Command::Color { r, g, b }).await
    }

    /// Sets the bulb's natural white mode. 0 turns the bulb off and 255 is maximum brightness.
    pub async fn set_white_brightness(&self, level: u8) -> Result<()> {
        self.send(Command::WhiteBrightness(level)).await
    }

    pub async fn set_rainbow_pulse(&self, speed: u8) -> Result<()> {
        self.send(Command::RainbowPulse { speed }).await
    }

    pub async fn set_rainbow_fade(&self, speed: u8) -> Result<()> {
        self.send(Command::RainbowFade { speed }).await
    }

    pub async fn set_pulse(&self, r: u8, g: u8, b: u8, speed: u8) -> Result<()> {
        self.send(Command::Pulse { r, g, b, speed }).await
    }

    /// Closes the underlying connection.
    pub async fn close(self) -> Result<()> {
        debug!("{}: closing", self.address());
        self.connection.close().await
    }
}
