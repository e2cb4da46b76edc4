// mipow Source Code File
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! Scanning for bulbs.

use crate::api::{Advertisement, BDAddr, Central};
use crate::deadline::Scope;
use crate::protocol::SERVICE_UUID;
use crate::{Error, Result};
use futures::stream::StreamExt;
use log::{debug, trace, warn};
use std::collections::HashSet;
use uuid::Uuid;

/// Accepts advertisements for a service, each address at most once.
///
/// A filter is one scan session's worth of state; start each scan with a fresh one.
#[derive(Debug, Clone)]
pub struct ScanFilter {
    service: Uuid,
    seen: HashSet<BDAddr>,
}

impl Default for ScanFilter {
    fn default() -> Self {
        Self::new(SERVICE_UUID)
    }
}

impl ScanFilter {
    pub fn new(service: Uuid) -> Self {
        Self {
            service,
            seen: HashSet::new(),
        }
    }

    /// Whether `advertisement` should be passed on. An accepted address is remembered and
    /// rejected from then on; rejected addresses are not remembered, so a device that later
    /// starts advertising the service is still picked up.
    pub fn matches(&mut self, advertisement: &Advertisement) -> bool {
        if self.seen.contains(&advertisement.address) {
            return false;
        }
        if advertisement.advertises(&self.service) {
            self.seen.insert(advertisement.address);
            true
        } else {
            false
        }
    }

    /// The addresses accepted so far.
    pub fn seen(&self) -> impl Iterator<Item = &BDAddr> {
        self.seen.iter()
    }
}

/// Scans until `scope` ends, calling `on_match` for the first advertisement of every bulb.
///
/// `on_match` runs on the task polling the scan, so it must not block; hand the advertisement
/// off if there is real work to do.
///
/// This always returns an error describing why scanning stopped. When the scope ran out that is
/// [`Error::DeadlineExceeded`], the expected outcome; see [`Error::is_scope_end`].
pub async fn scan<C, F>(central: &C, scope: &Scope, mut on_match: F) -> Result<()>
where
    C: Central,
    F: FnMut(Advertisement),
{
    let mut advertisements = central.scan(false).await?;
    let mut filter = ScanFilter::default();
    debug!("Scanning for bulbs");

    let err = loop {
        tokio::select! {
            biased;
            end = scope.done() => break Error::from(end),
            advertisement = advertisements.next() => match advertisement {
                Some(advertisement) => {
                    if filter.matches(&advertisement) {
                        debug!("Found bulb {}", advertisement.address);
                        on_match(advertisement);
                    } else {
                        trace!("Ignoring advertisement from {}", advertisement.address);
                    }
                }
                None => break Error::Transport("advertisement stream ended".into()),
            },
        }
    };

    if let Err(e) = central.stop_scan().await {
        warn!("Failed to stop scan: {}", e);
    }
    debug!("Scan finished: {}", err);
    Err(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::bleuuid::uuid_from_u16;
    use crate::deadline::Deadline;
    use crate::mock::{addr, advertisement, bulb_advertisement, MockCentral};
    use std::time::Duration;

    #[test]
    fn filter_accepts_each_bulb_once() {
        let mut filter = ScanFilter::default();
        assert!(filter.matches(&bulb_advertisement(1)));
        assert!(!filter.matches(&bulb_advertisement(1)));
        assert!(filter.matches(&bulb_advertisement(2)));
        assert!(!filter.matches(&bulb_advertisement(2)));
        assert_eq!(filter.seen().count(), 2);
    }

    #[test]
    fn filter_rejects_other_devices_without_remembering_them() {
        let mut filter = ScanFilter::default();
        let heart_rate = advertisement(addr(3), &[uuid_from_u16(0x180d)]);
        assert!(!filter.matches(&heart_rate));
        assert!(!filter.matches(&advertisement(addr(3), &[])));
        assert_eq!(filter.seen().count(), 0);

        assert!(filter.matches(&bulb_advertisement(3)));
    }

    #[test]
    fn sessions_do_not_share_state() {
        let mut first = ScanFilter::default();
        let mut second = ScanFilter::default();
        assert!(first.matches(&bulb_advertisement(1)));
        assert!(second.matches(&bulb_advertisement(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn scan_reports_each_bulb_once_until_deadline() {
        let central = MockCentral::new();
        central
            .advertise(bulb_advertisement(1))
            .advertise(advertisement(addr(9), &[uuid_from_u16(0x180f)]))
            .advertise(bulb_advertisement(1))
            .advertise(bulb_advertisement(2))
            .advertise(bulb_advertisement(1));

        let deadline = Deadline::with_interrupt(Duration::from_secs(5), futures::future::pending());
        let mut matched = Vec::new();
        let result = scan(&central, &deadline.scope(), |ad| matched.push(ad.address)).await;

        assert!(matches!(result, Err(Error::DeadlineExceeded)));
        assert_eq!(matched, vec![addr(1), addr(2)]);
        assert_eq!(central.stop_scans(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn scan_ends_when_transport_gives_up() {
        let (central, sender) = MockCentral::live();
        sender.send(bulb_advertisement(4)).unwrap();
        drop(sender);

        let deadline = Deadline::with_interrupt(Duration::from_secs(5), futures::future::pending());
        let mut matched = 0;
        let result = scan(&central, &deadline.scope(), |_| matched += 1).await;

        let err = result.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
        assert!(!err.is_scope_end());
        assert_eq!(matched, 1);
    }

    #[tokio::test]
    async fn scan_start_failure() {
        let central = MockCentral::new();
        central.fail_scan();
        let deadline = Deadline::with_interrupt(Duration::from_secs(5), futures::future::pending());
        let result = scan(&central, &deadline.scope(), |_| {}).await;
        assert!(matches!(result, Err(Error::Transport(_))));
        assert_eq!(central.stop_scans(), 0);
    }
}
