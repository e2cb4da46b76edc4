// mipow Source Code File
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! Transport backed by the platform Bluetooth stack through `btleplug`.

pub(crate) mod adapter;
pub(crate) mod connection;

use crate::api::BDAddr;
use crate::Error;

impl From<btleplug::Error> for Error {
    fn from(error: btleplug::Error) -> Self {
        match error {
            btleplug::Error::NotSupported(what) => Error::NotSupported(what),
            other => Error::Transport(Box::new(other)),
        }
    }
}

fn to_bdaddr(address: btleplug::api::BDAddr) -> BDAddr {
    BDAddr::from(address.into_inner())
}
