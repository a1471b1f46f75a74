//! Compile-time configuration for the vote counter
//!
//! Hardware shells (firmware, simulator) read these values instead of
//! hard-coding their own, so the strip, the HTTP surface and the access
//! point all agree on sizes and timings.

use core::net::Ipv4Addr;

use embassy_time::Duration;
use serde::{Deserialize, Serialize};
use smart_leds::RGB8;
use thiserror_no_std::Error;

/// Number of addressable pixels on the strip.
pub const STRIP_LENGTH: usize = 22;

/// Split point at power-on: the middle of the strip.
pub const INITIAL_SPLIT: usize = STRIP_LENGTH / 2;

/// Period of the render loop.
pub const RENDER_PERIOD: Duration = Duration::from_millis(30);

/// How long an indicator output stays high, and then low, per event.
pub const BLINK_DWELL: Duration = Duration::from_millis(300);

/// Plain HTTP, no TLS.
pub const HTTP_PORT: u16 = 80;

/// Size of the single receive buffer used per request.
pub const REQUEST_BUFFER_LEN: usize = 1024;

/// Upper bound on simultaneously associated stations.
pub const MAX_STATIONS: usize = 10;

/// DHCP lease handed to every station, in seconds.
pub const LEASE_SECS: u32 = 7200;

/// Pixels below the split point.
pub const RED: RGB8 = RGB8::new(5, 0, 0);

/// Pixels at or above the split point.
pub const BLUE: RGB8 = RGB8::new(0, 0, 5);

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("SSID must be between 1 and 32 bytes")]
    SsidLength,
    #[error("WPA2 passphrase must be between 8 and 63 bytes")]
    PassphraseLength,
    #[error("access point must accept at least one station")]
    NoConnections,
}

/// Wireless access point settings.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(bound(deserialize = "'de: 'a"))]
pub struct AccessPointConfig<'a> {
    pub ssid: &'a str,
    pub password: &'a str,
    pub channel: u8,
    pub hidden: bool,
    pub max_connections: u16,
}

impl Default for AccessPointConfig<'_> {
    fn default() -> Self {
        Self {
            ssid: "ESP_32",
            password: "12345678",
            channel: 1,
            hidden: false,
            max_connections: MAX_STATIONS as u16,
        }
    }
}

impl<'a> AccessPointConfig<'a> {
    /// Reject settings the radio would refuse for a WPA2-PSK network.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ssid.is_empty() || self.ssid.len() > 32 {
            return Err(ConfigError::SsidLength);
        }
        if !(8..=63).contains(&self.password.len()) {
            return Err(ConfigError::PassphraseLength);
        }
        if self.max_connections == 0 {
            return Err(ConfigError::NoConnections);
        }
        Ok(())
    }
}

/// Static addressing of the access point interface and its DHCP pool.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkConfig {
    pub address: [u8; 4],
    pub prefix_len: u8,
    pub pool_start: [u8; 4],
    pub pool_end: [u8; 4],
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            address: [192, 168, 2, 1],
            prefix_len: 24,
            pool_start: [192, 168, 2, 2],
            pool_end: [192, 168, 2, 254],
        }
    }
}

impl NetworkConfig {
    pub fn address(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.address)
    }

    /// The access point routes for its own clients.
    pub fn gateway(&self) -> Ipv4Addr {
        self.address()
    }

    pub fn pool(&self) -> (Ipv4Addr, Ipv4Addr) {
        (Ipv4Addr::from(self.pool_start), Ipv4Addr::from(self.pool_end))
    }
}
