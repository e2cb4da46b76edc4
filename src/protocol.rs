// mipow Source Code File
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! The MiPOW bulb command protocol.
//!
//! A bulb exposes one vendor service with two writable characteristics. The color
//! characteristic takes 4-byte frames, `[white, red, green, blue]`; the effect characteristic
//! takes 8-byte frames, `[white, red, green, blue, mode, 0, speed, 0]`. Every intensity is a
//! raw byte: the bulb maps them straight onto LED drive levels, so (0, 0, 0) is off rather than
//! black and there is no gamma or color-space correction.

use crate::api::bleuuid::uuid_from_u16;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
#[cfg(feature = "serde")]
use serde_cr as serde;
use uuid::Uuid;

/// The service every MiPOW bulb advertises.
pub const SERVICE_UUID: Uuid = uuid_from_u16(0xff0d);

/// Takes 4-byte color and white brightness frames.
pub const COLOR_CHARACTERISTIC_UUID: Uuid = uuid_from_u16(0xfffc);

/// Takes 8-byte effect frames.
pub const EFFECT_CHARACTERISTIC_UUID: Uuid = uuid_from_u16(0xfffb);

/// Effect mode byte for a single-color pulse. Carries the color in the RGB bytes.
pub const EFFECT_PULSE: u8 = 0x00;
pub const EFFECT_RAINBOW_PULSE: u8 = 0x02;
pub const EFFECT_RAINBOW_FADE: u8 = 0x03;

/// Sets the LEDs to an RGB intensity. The closer to the zero vector, the dimmer the bulb.
pub fn encode_color(r: u8, g: u8, b: u8) -> [u8; 4] {
    [0x00, r, g, b]
}

/// Switches to the bulb's natural white mode at `level`; 0 is off, 255 is full brightness.
pub fn encode_white_brightness(level: u8) -> [u8; 4] {
    [level, 0x00, 0x00, 0x00]
}

pub fn encode_rainbow_pulse(speed: u8) -> [u8; 8] {
    effect_frame(0, 0, 0, EFFECT_RAINBOW_PULSE, speed)
}

pub fn encode_rainbow_fade(speed: u8) -> [u8; 8] {
    effect_frame(0, 0, 0, EFFECT_RAINBOW_FADE, speed)
}

/// Pulses a single color. Unlike the rainbow effects the mode byte stays zero; the bulb keys
/// off the nonzero color instead.
pub fn encode_pulse(r: u8, g: u8, b: u8, speed: u8) -> [u8; 8] {
    effect_frame(r, g, b, EFFECT_PULSE, speed)
}

fn effect_frame(r: u8, g: u8, b: u8, mode: u8, speed: u8) -> [u8; 8] {
    [0x00, r, g, b, mode, 0x00, speed, 0x00]
}

/// Which of the bulb's two characteristics a frame is written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Color,
    Effect,
}

/// A high level intent that can be sent to a bulb.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_cr", rename_all = "snake_case")
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Color { r: u8, g: u8, b: u8 },
    WhiteBrightness(u8),
    RainbowPulse { speed: u8 },
    RainbowFade { speed: u8 },
    Pulse { r: u8, g: u8, b: u8, speed: u8 },
}

impl Command {
    pub fn target(&self) -> Target {
        match self {
            Self::Color { .. } | Self::WhiteBrightness(_) => Target::Color,
            Self::RainbowPulse { .. } | Self::RainbowFade { .. } | Self::Pulse { .. } => {
                Target::Effect
            }
        }
    }

    /// Convert the command to the frame written to [`Command::target`].
    pub fn to_bytes(&self) -> Vec<u8> {
        match *self {
            Self::Color { r, g, b } => encode_color(r, g, b).to_vec(),
            Self::WhiteBrightness(level) => encode_white_brightness(level).to_vec(),
            Self::RainbowPulse { speed } => encode_rainbow_pulse(speed).to_vec(),
            Self::RainbowFade { speed } => encode_rainbow_fade(speed).to_vec(),
            Self::Pulse { r, g, b, speed } => encode_pulse(r, g, b, speed).to_vec(),
        }
    }
}
