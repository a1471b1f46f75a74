//! Minimal HTTP/1.x surface: one request per connection, always closed after
//! the exchange.

pub mod handler;
pub mod request;
pub mod response;

pub use handler::RequestHandler;
pub use request::{Method, RequestLine, Route};
