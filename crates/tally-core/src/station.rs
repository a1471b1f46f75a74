//! Wireless stations associated with the access point
//!
//! The network stack owns the truth about who is connected. This module
//! only carries copies of it: typed events pushed by the Wi-Fi driver, and
//! a lease table the DHCP server fills in so the HTTP page and the notifier
//! can list `{MAC, IP}` pairs.

use core::cell::RefCell;
use core::fmt;
use core::net::Ipv4Addr;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender};
use log::{debug, warn};

use crate::config::MAX_STATIONS;

/// Depth of the station event queue.
pub const EVENT_CHANNEL_CAPACITY: usize = 8;

/// Notifications forwarded from the Wi-Fi driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StationEvent {
    AccessPointStarted,
    Connected,
    Disconnected,
}

pub type StationEventChannel =
    Channel<CriticalSectionRawMutex, StationEvent, EVENT_CHANNEL_CAPACITY>;
pub type StationEventSender<'a> =
    Sender<'a, CriticalSectionRawMutex, StationEvent, EVENT_CHANNEL_CAPACITY>;
pub type StationEventReceiver<'a> =
    Receiver<'a, CriticalSectionRawMutex, StationEvent, EVENT_CHANNEL_CAPACITY>;

/// Push an event without ever blocking the caller.
///
/// Driver callbacks must not wait, so a full queue drops the event.
pub fn publish(sender: &StationEventSender<'_>, event: StationEvent) {
    if sender.try_send(event).is_err() {
        warn!("Station event queue full, dropping {:?}", event);
    }
}

/// 48-bit hardware address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddress(pub [u8; 6]);

impl MacAddress {
    /// Take the first six bytes of a DHCP `chaddr` field.
    pub fn from_hardware_address(chaddr: &[u8]) -> Option<Self> {
        let bytes: [u8; 6] = chaddr.get(..6)?.try_into().ok()?;
        Some(Self(bytes))
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Station {
    pub mac: MacAddress,
    pub ip: Ipv4Addr,
}

pub type Stations = heapless::Vec<Station, MAX_STATIONS>;

/// Read access to the currently associated stations.
pub trait StationList {
    /// Ordered snapshot; never cached across waits by callers.
    fn stations(&self) -> Stations;
}

impl StationList for [Station] {
    fn stations(&self) -> Stations {
        self.iter().copied().take(MAX_STATIONS).collect()
    }
}

#[derive(Debug, Clone, Copy)]
struct Lease {
    station: Station,
    expires_at: u64,
}

/// Lease table filled in by the DHCP server.
///
/// Keyed by MAC, ordered by first lease. Entries disappear when released or
/// once their lease runs out.
pub struct StationRegistry {
    lease_secs: u64,
    leases: Mutex<CriticalSectionRawMutex, RefCell<heapless::Vec<Lease, MAX_STATIONS>>>,
}

impl StationRegistry {
    pub const fn new(lease_secs: u32) -> Self {
        Self {
            lease_secs: lease_secs as u64,
            leases: Mutex::new(RefCell::new(heapless::Vec::new())),
        }
    }

    /// Insert or refresh the lease of `mac`.
    ///
    /// A full table gives up the entry closest to expiry.
    pub fn record_lease(&self, mac: MacAddress, ip: Ipv4Addr, now_secs: u64) {
        let lease = Lease {
            station: Station { mac, ip },
            expires_at: now_secs.saturating_add(self.lease_secs),
        };
        self.leases.lock(|leases| {
            let mut leases = leases.borrow_mut();
            if let Some(existing) = leases.iter_mut().find(|l| l.station.mac == mac) {
                *existing = lease;
                return;
            }
            if let Err(lease) = leases.push(lease) {
                let oldest = leases
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, l)| l.expires_at)
                    .map(|(i, _)| i);
                if let Some(index) = oldest {
                    debug!("Lease table full, evicting {}", leases[index].station.mac);
                    leases.remove(index);
                    // Cannot fail: an entry was just removed.
                    let _ = leases.push(lease);
                }
            }
        });
    }

    pub fn release(&self, mac: MacAddress) {
        self.leases.lock(|leases| {
            leases.borrow_mut().retain(|l| l.station.mac != mac);
        });
    }

    /// Live stations at `now_secs`, dropping any that have expired.
    pub fn live_stations(&self, now_secs: u64) -> Stations {
        self.leases.lock(|leases| {
            let mut leases = leases.borrow_mut();
            leases.retain(|l| l.expires_at > now_secs);
            leases.iter().map(|l| l.station).collect()
        })
    }
}
