use bytes::{BufMut, Bytes, BytesMut};

use crate::dictionary::{HEADER_SIZE, MAX_FRAME_SIZE, MIN_FRAME_SIZE, START};
use crate::error::{FrameError, Result};

/// A command or response with its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Request or response code.
    pub command: u8,
    /// Bytes between the header and the checksum.
    pub payload: Bytes,
}

impl Packet {
    /// Create a new packet.
    pub fn new(command: impl Into<u8>, payload: impl Into<Bytes>) -> Self {
        Self {
            command: command.into(),
            payload: payload.into(),
        }
    }

    /// A packet without payload.
    pub fn bare(command: impl Into<u8>) -> Self {
        Self::new(command, Bytes::new())
    }

    /// The total wire size of this packet once framed.
    pub fn wire_size(&self) -> usize {
        MIN_FRAME_SIZE + self.payload.len()
    }

    /// Encode this packet into a complete frame.
    pub fn to_bytes(&self) -> Bytes {
        encode(self.command, &self.payload)
    }
}

/// XOR of every byte in `data`; zero for empty input.
pub fn checksum(data: &[u8]) -> u8 {
    data.iter().fold(0, |acc, byte| acc ^ byte)
}

/// Encode a command and payload into a new frame.
pub fn encode(command: u8, payload: &[u8]) -> Bytes {
    let mut dst = BytesMut::with_capacity(MIN_FRAME_SIZE + payload.len());
    encode_into(command, payload, &mut dst);
    dst.freeze()
}

/// Append a frame to `dst`.
///
/// Wire format:
/// ```text
/// ┌───────┬─────────────┬─────────┬─────────────┬──────────┐
/// │ START │ Length (2B) │ Command │ Payload     │ XOR      │
/// │ 0x02  │ big-endian  │ (1B)    │ (0..251 B)  │ (1B)     │
/// └───────┴─────────────┴─────────┴─────────────┴──────────┘
/// ```
///
/// Length counts every byte of the frame. The checksum covers everything
/// except START. Keeping the payload within `MAX_PAYLOAD` is up to the caller.
pub fn encode_into(command: u8, payload: &[u8], dst: &mut BytesMut) {
    let total = MIN_FRAME_SIZE + payload.len();
    let start = dst.len();

    dst.reserve(total);
    dst.put_u8(START);
    dst.put_u16(total as u16);
    dst.put_u8(command);
    dst.put_slice(payload);

    let xor = checksum(&dst[start + 1..]);
    dst.put_u8(xor);
}

/// Decode one complete frame.
///
/// `frame` must hold exactly one frame, from START through the checksum byte.
pub fn decode(frame: &[u8]) -> Result<Packet> {
    if frame.len() < MIN_FRAME_SIZE {
        return Err(FrameError::FrameTooShort { len: frame.len() });
    }

    if frame[0] != START {
        return Err(FrameError::InvalidStart { found: frame[0] });
    }

    let declared = declared_length(frame[1], frame[2]);
    if declared != frame.len() {
        return Err(FrameError::LengthMismatch {
            declared,
            actual: frame.len(),
        });
    }

    if declared > MAX_FRAME_SIZE {
        return Err(FrameError::FrameTooLong {
            declared,
            max: MAX_FRAME_SIZE,
        });
    }

    let last = frame.len() - 1;
    let expected = checksum(&frame[1..last]);
    let actual = frame[last];
    if expected != actual {
        return Err(FrameError::ChecksumMismatch { expected, actual });
    }

    Ok(Packet {
        command: frame[3],
        payload: Bytes::copy_from_slice(&frame[HEADER_SIZE..last]),
    })
}

/// Big-endian length from the two bytes after START.
pub fn declared_length(hi: u8, lo: u8) -> usize {
    u16::from_be_bytes([hi, lo]) as usize
}
