// mipow Source Code File
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! Remembers the peripherals a scan has seen so they can be dialed by address.

use crate::api::BDAddr;
use dashmap::DashMap;
use log::trace;
use std::fmt::Debug;

/// Address-keyed registry shared by the scan stream, which fills it, and `dial`, which reads
/// it. Both can run at once on different tasks.
#[derive(Debug)]
pub(crate) struct AdapterManager<P>
where
    P: Clone + Debug,
{
    peripherals: DashMap<BDAddr, P>,
}

impl<P: Clone + Debug> Default for AdapterManager<P> {
    fn default() -> Self {
        AdapterManager {
            peripherals: DashMap::new(),
        }
    }
}

impl<P: Clone + Debug> AdapterManager<P> {
    /// Records `peripheral`, replacing any earlier handle for the same address.
    pub fn add_peripheral(&self, address: BDAddr, peripheral: P) {
        if self.peripherals.insert(address, peripheral).is_none() {
            trace!("Registered peripheral {}", address);
        }
    }

    pub fn peripheral(&self, address: &BDAddr) -> Option<P> {
        self.peripherals.get(address).map(|val| val.value().clone())
    }

    pub fn len(&self) -> usize {
        self.peripherals.len()
    }
}
