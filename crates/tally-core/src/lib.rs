//! Hardware-independent core of the tally-rs vote counter
//!
//! Clients vote red or blue over a tiny HTTP interface; the running tally is
//! shown on an addressable LED strip as a two-colour split, and station
//! connect/disconnect events pulse two indicator outputs.
//!
//! Everything with state or concurrency lives here: the lock-protected
//! [`tally::TallyStore`], the request tokenizer and handler, the accept loop,
//! the station notifier and the render loop. Hardware sits behind
//! `embedded-hal`, `embedded-io-async` and `smart-leds` traits, so the crate
//! is `#![no_std]` yet runs its tests on the host.

#![no_std]

pub mod config;
pub mod http;
pub mod notifier;
pub mod render;
pub mod server;
pub mod station;
pub mod tally;
