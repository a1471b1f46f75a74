//! One-request-per-connection HTTP handler

use core::fmt::Write as _;

use embedded_io_async::{Read, Write};
use log::{debug, info, warn};

use super::request::{RequestLine, Route, first_line, has_complete_line};
use super::response::{BANNER, LINE_BREAK, OK_HEADER, Scoreboard, StationLine};
use crate::config::REQUEST_BUFFER_LEN;
use crate::server::Connection;
use crate::station::StationList;
use crate::tally::TallyStore;

/// Room for the scoreboard fragment with two 20-digit counters.
const SCOREBOARD_CAPACITY: usize = 256;

/// Room for one station line.
const STATION_LINE_CAPACITY: usize = 64;

/// Answers requests against a shared tally and station list.
pub struct RequestHandler<'a, S: ?Sized> {
    tally: &'a TallyStore,
    stations: &'a S,
    page: Option<&'a [u8]>,
}

impl<'a, S> RequestHandler<'a, S>
where
    S: StationList + ?Sized,
{
    pub const fn new(tally: &'a TallyStore, stations: &'a S) -> Self {
        Self {
            tally,
            stations,
            page: None,
        }
    }

    /// Serve `page` verbatim on `GET /bear`.
    pub const fn with_page(self, page: &'a [u8]) -> Self {
        Self {
            tally: self.tally,
            stations: self.stations,
            page: Some(page),
        }
    }

    /// Handle exactly one exchange on `conn`, then close it.
    ///
    /// The connection is closed on every path, including receive failures
    /// and write errors halfway through a response.
    pub async fn serve<C: Connection>(&self, mut conn: C) {
        match self.respond(&mut conn).await {
            Ok(Some(route)) => debug!("Handled {:?}", route),
            Ok(None) => {}
            Err(e) => warn!("Dropping connection after I/O error: {:?}", e),
        }
        conn.close().await;
    }

    /// Read one request from `conn` and write its response.
    ///
    /// Returns the route taken, or `None` when nothing routable arrived.
    pub async fn respond<C>(&self, conn: &mut C) -> Result<Option<Route>, C::Error>
    where
        C: Read + Write,
    {
        let mut buf = [0u8; REQUEST_BUFFER_LEN];
        let len = receive_line(conn, &mut buf).await?;
        if len == 0 {
            debug!("Client closed before sending a request");
            return Ok(None);
        }

        let Some(raw) = first_line(&buf[..len]) else {
            info!("Unknown request");
            return Ok(None);
        };

        let route = match RequestLine::parse(raw).map(|line| Route::classify(&line)) {
            Some(Route::Page) if self.page.is_none() => Route::Unknown,
            Some(route) => route,
            None => Route::Unknown,
        };

        match route {
            Route::Scoreboard => self.write_scoreboard(conn).await?,
            Route::Page => {
                if let Some(page) = self.page {
                    conn.write_all(OK_HEADER.as_bytes()).await?;
                    conn.write_all(page).await?;
                }
            }
            Route::Vote(vote) => {
                self.tally.record_vote(vote);
                info!("Got {} vote", vote.name());
            }
            Route::Favicon => {}
            Route::Unknown => info!("Unknown request: {}", raw),
        }

        conn.flush().await?;
        Ok(Some(route))
    }

    async fn write_scoreboard<C: Write>(&self, conn: &mut C) -> Result<(), C::Error> {
        conn.write_all(BANNER.as_bytes()).await?;

        let mut text = heapless::String::<SCOREBOARD_CAPACITY>::new();
        if write!(text, "{}", Scoreboard(self.tally.read_snapshot())).is_err() {
            warn!("Scoreboard truncated");
        }
        conn.write_all(text.as_bytes()).await?;
        conn.write_all(LINE_BREAK.as_bytes()).await?;

        for (index, station) in self.stations.stations().iter().enumerate() {
            let mut line = heapless::String::<STATION_LINE_CAPACITY>::new();
            let entry = StationLine {
                number: index + 1,
                station,
            };
            if write!(line, "{entry}").is_err() {
                warn!("Station line truncated");
            }
            conn.write_all(line.as_bytes()).await?;
            conn.write_all(LINE_BREAK.as_bytes()).await?;
        }
        Ok(())
    }
}

/// Read until the first line is terminated or no more bytes fit or arrive.
/// Returns the number of bytes received.
async fn receive_line<C: Read>(conn: &mut C, buf: &mut [u8]) -> Result<usize, C::Error> {
    let mut len = 0;
    while len < buf.len() {
        let read = conn.read(&mut buf[len..]).await?;
        if read == 0 {
            break;
        }
        len += read;
        if has_complete_line(&buf[..len]) {
            break;
        }
    }
    Ok(len)
}

#[cfg(test)]
mod tests {
    extern crate std;

    use core::convert::Infallible;
    use core::fmt;
    use core::net::Ipv4Addr;
    use std::collections::VecDeque;
    use std::vec::Vec;

    use embassy_futures::block_on;
    use embedded_io_async::{ErrorKind, ErrorType};

    use super::*;
    use crate::station::{MacAddress, Station};
    use crate::tally::Vote;

    /// Connection that replays one request and records the response.
    struct ScriptedConnection {
        request: &'static [u8],
        response: Vec<u8>,
        closed: bool,
    }

    impl ScriptedConnection {
        fn new(request: &'static [u8]) -> Self {
            Self {
                request,
                response: Vec::new(),
                closed: false,
            }
        }
    }

    impl ErrorType for ScriptedConnection {
        type Error = Infallible;
    }

    impl Read for ScriptedConnection {
        async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
            let len = self.request.len().min(buf.len());
            buf[..len].copy_from_slice(&self.request[..len]);
            self.request = &self.request[len..];
            Ok(len)
        }
    }

    impl Write for ScriptedConnection {
        async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
            self.response.extend_from_slice(buf);
            Ok(buf.len())
        }

        async fn flush(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }
    }

    impl Connection for &mut ScriptedConnection {
        async fn close(&mut self) {
            self.closed = true;
        }
    }

    #[derive(Debug)]
    struct LinkDown;

    impl fmt::Display for LinkDown {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("link down")
        }
    }

    impl core::error::Error for LinkDown {}

    impl embedded_io_async::Error for LinkDown {
        fn kind(&self) -> ErrorKind {
            ErrorKind::ConnectionReset
        }
    }

    /// Connection that delivers its request in segments and can drop out.
    struct FlakyConnection {
        segments: VecDeque<&'static [u8]>,
        /// Fail reads once the segments run out, instead of reporting EOF.
        read_fails: bool,
        /// Writes accepted before the link drops.
        writes_left: usize,
        response: Vec<u8>,
        closed: bool,
    }

    impl FlakyConnection {
        fn new(segments: &[&'static [u8]]) -> Self {
            Self {
                segments: segments.iter().copied().collect(),
                read_fails: false,
                writes_left: usize::MAX,
                response: Vec::new(),
                closed: false,
            }
        }

        fn failing_read(mut self) -> Self {
            self.read_fails = true;
            self
        }

        fn writes_before_failure(mut self, writes: usize) -> Self {
            self.writes_left = writes;
            self
        }
    }

    impl ErrorType for FlakyConnection {
        type Error = LinkDown;
    }

    impl Read for FlakyConnection {
        async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
            match self.segments.pop_front() {
                Some(segment) => {
                    let len = segment.len().min(buf.len());
                    buf[..len].copy_from_slice(&segment[..len]);
                    if len < segment.len() {
                        self.segments.push_front(&segment[len..]);
                    }
                    Ok(len)
                }
                None if self.read_fails => Err(LinkDown),
                None => Ok(0),
            }
        }
    }

    impl Write for FlakyConnection {
        async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
            if self.writes_left == 0 {
                return Err(LinkDown);
            }
            self.writes_left -= 1;
            self.response.extend_from_slice(buf);
            Ok(buf.len())
        }

        async fn flush(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }
    }

    impl Connection for &mut FlakyConnection {
        async fn close(&mut self) {
            self.closed = true;
        }
    }

    const NO_STATIONS: &[Station] = &[];

    fn stations() -> [Station; 2] {
        [
            Station {
                mac: MacAddress([0x24, 0x0a, 0xc4, 0x01, 0x02, 0x03]),
                ip: Ipv4Addr::new(192, 168, 2, 2),
            },
            Station {
                mac: MacAddress([0x24, 0x0a, 0xc4, 0x0a, 0x0b, 0x0c]),
                ip: Ipv4Addr::new(192, 168, 2, 3),
            },
        ]
    }

    fn exchange(
        handler: &RequestHandler<'_, [Station]>,
        request: &'static [u8],
    ) -> ScriptedConnection {
        let mut conn = ScriptedConnection::new(request);
        block_on(handler.serve(&mut conn));
        conn
    }

    #[test]
    fn test_vote_routes_update_tally() {
        let tally = TallyStore::new(22);
        let handler = RequestHandler::new(&tally, NO_STATIONS);

        let conn = exchange(&handler, b"POST /red HTTP/1.1\r\n\r\n");
        assert!(conn.response.is_empty());
        assert!(conn.closed);
        exchange(&handler, b"POST /blue HTTP/1.1\r\n\r\n");
        exchange(&handler, b"POST /blue HTTP/1.1\r\n\r\n");

        let snapshot = tally.read_snapshot();
        assert_eq!(snapshot.red_count, 1);
        assert_eq!(snapshot.blue_count, 2);
        assert_eq!(snapshot.split_point, 10);
    }

    #[test]
    fn test_scoreboard_lists_stations() {
        let tally = TallyStore::new(22);
        tally.record_vote(Vote::Red);
        let list = stations();
        let handler = RequestHandler::new(&tally, &list[..]);

        let conn = exchange(&handler, b"GET / HTTP/1.1\r\nHost: 192.168.2.1\r\n\r\n");
        let body = core::str::from_utf8(&conn.response).unwrap();
        assert!(body.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(body.contains("RED: 1 = 1.000000 <br> BLUE: 0 = 0.000000"));
        assert!(body.contains("1 - mac: 24:0a:c4:01:02:03 - IP: 192.168.2.2<br>"));
        assert!(body.ends_with("2 - mac: 24:0a:c4:0a:0b:0c - IP: 192.168.2.3<br>"));
        assert!(conn.closed);
    }

    #[test]
    fn test_scoreboard_is_idempotent() {
        let tally = TallyStore::new(22);
        tally.record_vote(Vote::Blue);
        let list = stations();
        let handler = RequestHandler::new(&tally, &list[..]);

        let first = exchange(&handler, b"GET / HTTP/1.1\r\n\r\n");
        let second = exchange(&handler, b"GET / HTTP/1.1\r\n\r\n");
        assert_eq!(first.response, second.response);
    }

    #[test]
    fn test_page_served_only_when_configured() {
        let tally = TallyStore::new(22);
        let without = RequestHandler::new(&tally, NO_STATIONS);
        assert!(exchange(&without, b"GET /bear HTTP/1.1\r\n\r\n").response.is_empty());

        let with = RequestHandler::new(&tally, NO_STATIONS).with_page(b"<html>bear</html>");
        let conn = exchange(&with, b"GET /bear HTTP/1.1\r\n\r\n");
        assert_eq!(conn.response, [OK_HEADER.as_bytes(), b"<html>bear</html>"].concat());
    }

    #[test]
    fn test_ignored_and_unknown_requests_write_nothing() {
        let tally = TallyStore::new(22);
        let handler = RequestHandler::new(&tally, NO_STATIONS);

        for request in [
            &b"GET /favicon.ico HTTP/1.1\r\n\r\n"[..],
            b"PUT /red HTTP/1.1\r\n\r\n",
            b"GET /nowhere HTTP/1.1\r\n\r\n",
            b"garbage without newline",
            b"\r\n\r\n",
            b"",
        ] {
            let conn = exchange(&handler, request);
            assert!(conn.response.is_empty());
            assert!(conn.closed);
        }
        assert_eq!(tally.read_snapshot().total(), 0);
    }

    #[test]
    fn test_respond_reports_route() {
        let tally = TallyStore::new(22);
        let handler = RequestHandler::new(&tally, NO_STATIONS);

        let mut conn = ScriptedConnection::new(b"POST /red HTTP/1.1\r\n\r\n");
        let route = block_on(handler.respond(&mut conn)).unwrap();
        assert_eq!(route, Some(Route::Vote(Vote::Red)));

        let mut empty = ScriptedConnection::new(b"");
        assert_eq!(block_on(handler.respond(&mut empty)).unwrap(), None);
    }

    #[test]
    fn test_request_line_split_across_segments() {
        let tally = TallyStore::new(22);
        let handler = RequestHandler::new(&tally, NO_STATIONS);

        let mut vote = FlakyConnection::new(&[b"POST /red HTTP/1.1", b"\r\n\r\n"]);
        block_on(handler.serve(&mut vote));
        assert!(vote.closed);
        assert_eq!(tally.read_snapshot().red_count, 1);

        let mut board = FlakyConnection::new(&[b"GET / HT", b"TP/1.1\r", b"\nHost: x\r\n\r\n"]);
        block_on(handler.serve(&mut board));
        assert!(board.response.starts_with(BANNER.as_bytes()));
        assert!(board.segments.is_empty());
    }

    #[test]
    fn test_unterminated_request_still_routed() {
        let tally = TallyStore::new(22);
        let handler = RequestHandler::new(&tally, NO_STATIONS);

        let conn = exchange(&handler, b"POST /blue HTTP/1.1");
        assert!(conn.closed);
        assert_eq!(tally.read_snapshot().blue_count, 1);
    }

    #[test]
    fn test_receive_failure_closes_without_voting() {
        let tally = TallyStore::new(22);
        let handler = RequestHandler::new(&tally, NO_STATIONS);

        let mut silent = FlakyConnection::new(&[]).failing_read();
        assert!(block_on(handler.respond(&mut silent)).is_err());

        let mut cut_off = FlakyConnection::new(&[b"POST /red HTTP/1.1"]).failing_read();
        block_on(handler.serve(&mut cut_off));
        assert!(cut_off.closed);
        assert!(cut_off.response.is_empty());
        assert_eq!(tally.read_snapshot(), TallyStore::new(22).read_snapshot());
    }

    #[test]
    fn test_write_failure_after_banner_still_closes() {
        let tally = TallyStore::new(22);
        tally.record_vote(Vote::Red);
        let list = stations();
        let handler = RequestHandler::new(&tally, &list[..]);
        let before = tally.read_snapshot();

        let mut conn = FlakyConnection::new(&[b"GET / HTTP/1.1\r\n\r\n"]).writes_before_failure(1);
        block_on(handler.serve(&mut conn));
        assert!(conn.closed);
        assert_eq!(conn.response, BANNER.as_bytes());
        assert_eq!(tally.read_snapshot(), before);

        let mut again = FlakyConnection::new(&[b"GET / HTTP/1.1\r\n\r\n"]).writes_before_failure(1);
        assert!(block_on(handler.respond(&mut again)).is_err());
    }
}
