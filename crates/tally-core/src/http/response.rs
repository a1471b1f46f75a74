//! Response fragments written by the request handler

use core::fmt;

use crate::station::Station;
use crate::tally::{Tally, Vote};

/// Header plus greeting sent before the scoreboard.
pub const BANNER: &str =
    "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n Hola desde ESP32! :) \n";

/// Header sent before the embedded page.
pub const OK_HEADER: &str = "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n";

pub const LINE_BREAK: &str = "<br>";

/// Counts and shares of a tally snapshot, rendered as an HTML fragment.
pub struct Scoreboard(pub Tally);

impl fmt::Display for Scoreboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tally = &self.0;
        write!(
            f,
            "<br> Score: <br> RED: {} = {:.6} <br> BLUE: {} = {:.6} <br> <br> Players: <br>",
            tally.red_count,
            tally.fraction(Vote::Red),
            tally.blue_count,
            tally.fraction(Vote::Blue),
        )
    }
}

/// One numbered entry of the station list, numbered from 1.
pub struct StationLine<'a> {
    pub number: usize,
    pub station: &'a Station,
}

impl fmt::Display for StationLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - mac: {} - IP: {}",
            self.number, self.station.mac, self.station.ip
        )
    }
}
