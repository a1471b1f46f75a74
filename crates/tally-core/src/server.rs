//! Connection accept loop
//!
//! Connections are accepted one at a time and handed to the
//! [`RequestHandler`] on the same task. A connection that fails on its own
//! is dropped and the loop carries on; a listener that fails stops the loop,
//! since only re-initialising the network stack can bring it back.

use core::future::Future;

use embassy_futures::yield_now;
use embedded_io_async::{Read, Write};
use log::{debug, error, info, warn};
use thiserror_no_std::Error;

use crate::http::RequestHandler;
use crate::station::StationList;

/// An accepted byte stream that must be released after use.
pub trait Connection: Read + Write {
    /// Flush pending output and shut the connection down.
    fn close(&mut self) -> impl Future<Output = ()>;
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptError {
    /// The peer went away before the connection was established.
    #[error("connection aborted during accept")]
    ConnectionAborted,
    /// The listening endpoint itself is unusable.
    #[error("listening endpoint failed")]
    ListenerFailed,
}

/// Source of incoming connections.
pub trait Listener {
    type Connection<'a>: Connection
    where
        Self: 'a;

    /// Port the listener is bound to, for logging.
    fn port(&self) -> u16;

    /// Wait for the next connection.
    fn accept(&mut self) -> impl Future<Output = Result<Self::Connection<'_>, AcceptError>>;
}

/// Accept and serve connections until the listener fails.
///
/// Only returns on [`AcceptError::ListenerFailed`]; the listener is dropped
/// by the caller afterwards.
pub async fn serve<L, S>(listener: &mut L, handler: &RequestHandler<'_, S>) -> AcceptError
where
    L: Listener,
    S: StationList + ?Sized,
{
    info!("HTTP server listening on port {}", listener.port());
    loop {
        match listener.accept().await {
            Ok(conn) => {
                debug!("New client connected");
                handler.serve(conn).await;
            }
            Err(AcceptError::ConnectionAborted) => {
                warn!("Client aborted before the connection was accepted");
            }
            Err(AcceptError::ListenerFailed) => {
                error!("Listener failed, stopping HTTP server");
                return AcceptError::ListenerFailed;
            }
        }
        yield_now().await;
    }
}
