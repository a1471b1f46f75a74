//! Station event notifier
//!
//! Waits for connect/disconnect events and pulses one of two indicator
//! outputs: high for one dwell, then low for one dwell. After each pulse the
//! current station list is logged.

use embedded_hal::digital::OutputPin;
use embedded_hal_async::delay::DelayNs;
use log::{info, warn};

use crate::config::BLINK_DWELL;
use crate::http::response::StationLine;
use crate::station::{StationEvent, StationEventReceiver, StationList};

/// Drives the connect and disconnect indicators.
pub struct StationNotifier<A, B, D> {
    connected: A,
    disconnected: B,
    delay: D,
    dwell_ms: u32,
}

impl<A, B, D> StationNotifier<A, B, D>
where
    A: OutputPin,
    B: OutputPin,
    D: DelayNs,
{
    pub fn new(connected: A, disconnected: B, delay: D) -> Self {
        Self {
            connected,
            disconnected,
            delay,
            dwell_ms: BLINK_DWELL.as_millis() as u32,
        }
    }

    /// React to one event. Returns whether an indicator was pulsed.
    pub async fn signal(&mut self, event: StationEvent) -> bool {
        match event {
            StationEvent::AccessPointStarted => {
                info!("Access point started");
                false
            }
            StationEvent::Connected => {
                info!("Station connected");
                pulse(&mut self.connected, &mut self.delay, self.dwell_ms).await;
                true
            }
            StationEvent::Disconnected => {
                info!("Station disconnected");
                pulse(&mut self.disconnected, &mut self.delay, self.dwell_ms).await;
                true
            }
        }
    }

    /// Consume events forever.
    pub async fn run<S>(&mut self, events: StationEventReceiver<'_>, stations: &S) -> !
    where
        S: StationList + ?Sized,
    {
        info!("Station notifier started");
        loop {
            let event = events.receive().await;
            if self.signal(event).await {
                log_stations(stations);
            }
        }
    }
}

async fn pulse<P, D>(pin: &mut P, delay: &mut D, dwell_ms: u32)
where
    P: OutputPin,
    D: DelayNs,
{
    if let Err(e) = pin.set_high() {
        warn!("Indicator set_high failed: {:?}", e);
    }
    delay.delay_ms(dwell_ms).await;
    if let Err(e) = pin.set_low() {
        warn!("Indicator set_low failed: {:?}", e);
    }
    delay.delay_ms(dwell_ms).await;
}

/// Log every associated station on its own line.
pub fn log_stations<S>(stations: &S)
where
    S: StationList + ?Sized,
{
    let stations = stations.stations();
    info!("Connected stations: {}", stations.len());
    for (index, station) in stations.iter().enumerate() {
        info!(
            "{}",
            StationLine {
                number: index + 1,
                station,
            }
        );
    }
}
