// mipow Source Code File
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! The 6 byte address that identifies a peripheral across advertisements and connections.

use std::fmt::{self, Debug, Display, Formatter, LowerHex};
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
#[cfg(feature = "serde")]
use serde_cr as serde;

/// A Bluetooth device address. `address[0]` is the most significant byte, so the address
/// displays in the same order it is stored.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_cr")
)]
#[derive(Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Default)]
pub struct BDAddr {
    address: [u8; 6],
}

#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum ParseBDAddrError {
    #[error("Bluetooth address has to be 6 bytes long")]
    IncorrectByteCount,
    #[error("Invalid digit in address: {0}")]
    InvalidDigit(#[from] std::num::ParseIntError),
}

impl BDAddr {
    /// Destruct the address into the underlying array.
    pub fn into_inner(self) -> [u8; 6] {
        self.address
    }
}

impl From<[u8; 6]> for BDAddr {
    fn from(address: [u8; 6]) -> Self {
        Self { address }
    }
}

impl Display for BDAddr {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let a = &self.address;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            a[0], a[1], a[2], a[3], a[4], a[5]
        )
    }
}

impl LowerHex for BDAddr {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let a = &self.address;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            a[0], a[1], a[2], a[3], a[4], a[5]
        )
    }
}

impl Debug for BDAddr {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        <Self as Display>::fmt(self, f)
    }
}

impl FromStr for BDAddr {
    type Err = ParseBDAddrError;

    /// Accepts `aa:bb:cc:dd:ee:ff` as well as `aabbccddeeff`, in either case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = if s.contains(':') {
            s.split(':').collect()
        } else if s.len() == 12 && s.is_ascii() {
            (0..6).map(|i| &s[i * 2..i * 2 + 2]).collect()
        } else {
            return Err(ParseBDAddrError::IncorrectByteCount);
        };
        if parts.len() != 6 {
            return Err(ParseBDAddrError::IncorrectByteCount);
        }

        let mut address = [0; 6];
        for (byte, part) in address.iter_mut().zip(parts) {
            *byte = u8::from_str_radix(part, 16)?;
        }
        Ok(Self { address })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDR: BDAddr = BDAddr {
        address: [0x1f, 0x2a, 0x00, 0xcc, 0x22, 0xf1],
    };

    #[test]
    fn parse_addr() {
        assert_eq!("1f:2a:00:cc:22:f1".parse::<BDAddr>(), Ok(ADDR));
        assert_eq!("1F2A00cc22F1".parse::<BDAddr>(), Ok(ADDR));
        assert_eq!(
            "1F:2A:00".parse::<BDAddr>(),
            Err(ParseBDAddrError::IncorrectByteCount)
        );
        assert!(matches!(
            "1F:2A:00:CC:22:ZZ".parse::<BDAddr>(),
            Err(ParseBDAddrError::InvalidDigit(_))
        ));
        assert!(matches!(
            "1F2A00CC22ZZ".parse::<BDAddr>(),
            Err(ParseBDAddrError::InvalidDigit(_))
        ));
    }

    #[test]
    fn display_addr() {
        assert_eq!(ADDR.to_string(), "1F:2A:00:CC:22:F1");
        assert_eq!(format!("{:?}", ADDR), "1F:2A:00:CC:22:F1");
        assert_eq!(format!("{:x}", ADDR), "1f:2a:00:cc:22:f1");
        assert_eq!(ADDR.to_string().parse::<BDAddr>(), Ok(ADDR));
    }
}
