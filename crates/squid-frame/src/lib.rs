//! Packet framing for the Squid stepper-controller protocol.
//!
//! Every packet on the wire is framed as:
//! - a start sentinel (`0x02`)
//! - a 2-byte big-endian length covering the whole frame
//! - a 1-byte command or response code
//! - up to 251 payload bytes
//! - a 1-byte XOR checksum over everything after the sentinel
//!
//! [`Reassembler`] recovers those frames from a raw, possibly noisy stream.

pub mod codec;
pub mod dictionary;
pub mod error;
#[cfg(feature = "async")]
pub mod framed;
pub mod reassembler;

pub use codec::{checksum, decode, encode, encode_into, Packet};
pub use dictionary::{
    code_name, Command, ErrorCode, Response, HEADER_SIZE, MAX_AXES, MAX_FRAME_SIZE, MAX_PAYLOAD,
    MIN_FRAME_SIZE, RESULT_BUSY, RESULT_SUCCESS, START,
};
pub use error::{FrameError, Result};
#[cfg(feature = "async")]
pub use framed::SquidCodec;
pub use reassembler::{Reassembler, State};
