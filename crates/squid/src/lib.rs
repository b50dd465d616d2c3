//! Host-side driver for the Squid multi-axis stepper controller.
//!
//! # Crate Structure
//!
//! - [`frame`]: packet framing, protocol dictionary and stream reassembly
//! - [`transport`]: serial and TCP links, request/response cycles with deadlines
//! - [`client`]: typed controller operations (version, status, stop, moves)

/// Re-export frame types.
pub mod frame {
    pub use squid_frame::*;
}

/// Re-export transport types.
pub mod transport {
    pub use squid_transport::*;
}

/// Re-export client types.
pub mod client {
    pub use squid_client::*;
}

pub use squid_client::{Client, ClientConfig, ClientError, MotorCommand, MotorStatus};
