//! Typed client for the Squid multi-axis stepper controller.
//!
//! ```no_run
//! use squid_client::{Client, ClientConfig, MotorCommand};
//! use squid_transport::{Endpoint, SerialConfig};
//!
//! # fn main() -> squid_client::Result<()> {
//! let endpoint = Endpoint::parse("/dev/ttyUSB0");
//! let client = Client::open(&endpoint, &SerialConfig::default(), ClientConfig::default())?;
//!
//! println!("firmware {:?}", client.version()?);
//! client.sync_move(&[MotorCommand::new(1, 500, 1000, 5000)])?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod motor;
pub mod status;

pub use client::{Client, ClientConfig};
pub use error::{ClientError, Result};
pub use motor::{MotorCommand, MOTOR_COMMAND_SIZE};
pub use status::{FirmwareVersion, MotorStatus};
