//! Link and transport layer for the Squid controller protocol.
//!
//! A [`Transport`] owns one byte link (a serial port, a serial-over-TCP
//! bridge or a Unix socket), serializes every request/response cycle on it
//! and turns the raw byte stream into packets within a deadline.

pub mod error;
pub mod link;
pub mod serial;
pub mod transport;

pub use error::{Result, TransportError};
pub use link::{connect_tcp, Endpoint, SerialLink};
pub use serial::{available_ports, detect_port, PortInfo, SerialConfig};
pub use transport::{Transport, TransportConfig, DEFAULT_POLL_INTERVAL};
