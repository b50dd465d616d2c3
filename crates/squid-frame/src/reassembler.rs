use bytes::{Buf, BytesMut};
use tracing::{debug, trace};

use crate::codec::{declared_length, decode, Packet};
use crate::dictionary::{MAX_FRAME_SIZE, MIN_FRAME_SIZE, START};
use crate::error::{FrameError, Result};

/// Where the reassembler is within the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Discarding bytes until a start sentinel shows up.
    SeekingStart,
    /// Collecting the two length bytes after the sentinel.
    ReadingHeader,
    /// Collecting the rest of a frame of `expected` bytes.
    ReadingBody { expected: usize },
}

/// Recovers frames from an unbounded byte stream.
///
/// Noise before a sentinel is dropped, and a sentinel followed by an
/// impossible length is treated as noise too. A complete frame with a bad
/// checksum is reported to the caller instead.
#[derive(Debug)]
pub struct Reassembler {
    state: State,
    buf: BytesMut,
}

impl Default for Reassembler {
    fn default() -> Self {
        Self::new()
    }
}

impl Reassembler {
    pub fn new() -> Self {
        Self {
            state: State::SeekingStart,
            buf: BytesMut::with_capacity(MAX_FRAME_SIZE),
        }
    }

    /// Current state.
    pub fn state(&self) -> State {
        self.state
    }

    /// Number of bytes held for the frame in progress.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Drop any partial frame and go back to seeking a sentinel.
    pub fn reset(&mut self) {
        if !self.buf.is_empty() {
            trace!(discarded = self.buf.len(), "discarding partial frame");
        }
        self.buf.clear();
        self.state = State::SeekingStart;
    }

    /// Feed one byte.
    ///
    /// Returns `Ok(Some(packet))` when the byte completes a valid frame and
    /// `Err(FrameError::ChecksumMismatch)` when it completes a corrupted one.
    pub fn push(&mut self, byte: u8) -> Result<Option<Packet>> {
        match self.state {
            State::SeekingStart => {
                if byte == START {
                    self.buf.clear();
                    self.buf.extend_from_slice(&[byte]);
                    self.state = State::ReadingHeader;
                } else {
                    trace!(byte, "skipping noise byte");
                }
                Ok(None)
            }
            State::ReadingHeader => {
                self.buf.extend_from_slice(&[byte]);
                if self.buf.len() < 3 {
                    return Ok(None);
                }

                let expected = declared_length(self.buf[1], self.buf[2]);
                if !(MIN_FRAME_SIZE..=MAX_FRAME_SIZE).contains(&expected) {
                    debug!(expected, "implausible frame length, resynchronizing");
                    self.reset();
                    return Ok(None);
                }

                self.state = State::ReadingBody { expected };
                Ok(None)
            }
            State::ReadingBody { expected } => {
                self.buf.extend_from_slice(&[byte]);
                if self.buf.len() < expected {
                    return Ok(None);
                }

                let result = decode(&self.buf);
                self.reset();
                match result {
                    Ok(packet) => {
                        trace!(command = packet.command, len = expected, "frame complete");
                        Ok(Some(packet))
                    }
                    Err(err @ FrameError::ChecksumMismatch { .. }) => Err(err),
                    Err(err) => {
                        debug!(error = %err, "dropping malformed frame");
                        Ok(None)
                    }
                }
            }
        }
    }

    /// Feed bytes from `src` until a frame completes or `src` runs dry.
    ///
    /// Only the bytes up to the end of the completed frame are consumed; the
    /// rest stay in `src` for the next call.
    pub fn feed(&mut self, src: &mut BytesMut) -> Result<Option<Packet>> {
        while src.has_remaining() {
            let byte = src.get_u8();
            if let Some(packet) = self.push(byte)? {
                return Ok(Some(packet));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use bytes::BufMut;

    use super::*;
    use crate::codec::encode;

    fn feed_all(reassembler: &mut Reassembler, bytes: &[u8]) -> Vec<Result<Option<Packet>>> {
        bytes.iter().map(|b| reassembler.push(*b)).collect()
    }

    #[test]
    fn single_frame_byte_by_byte() {
        let frame = encode(0x81, &[0x10]);
        let mut reassembler = Reassembler::new();

        let results = feed_all(&mut reassembler, &frame);
        let (last, rest) = results.split_last().unwrap();
        assert!(rest.iter().all(|r| matches!(r, Ok(None))));

        let packet = last.as_ref().unwrap().as_ref().unwrap();
        assert_eq!(packet.command, 0x81);
        assert_eq!(packet.payload.as_ref(), &[0x10]);
        assert_eq!(reassembler.state(), State::SeekingStart);
    }

    #[test]
    fn state_transitions() {
        let frame = encode(0x82, &[1, 2]);
        let mut reassembler = Reassembler::new();

        reassembler.push(0x00).unwrap();
        assert_eq!(reassembler.state(), State::SeekingStart);
        reassembler.push(frame[0]).unwrap();
        assert_eq!(reassembler.state(), State::ReadingHeader);
        reassembler.push(frame[1]).unwrap();
        assert_eq!(reassembler.state(), State::ReadingHeader);
        reassembler.push(frame[2]).unwrap();
        assert_eq!(reassembler.state(), State::ReadingBody { expected: 7 });
        assert_eq!(reassembler.buffered(), 3);
    }

    #[test]
    fn recovers_after_leading_noise() {
        let mut wire = BytesMut::new();
        wire.put_slice(&[0x00, 0xFF, 0x13, 0x37, 0x81, 0x90]);
        wire.put_slice(&encode(0x83, &[0x00]));

        let mut reassembler = Reassembler::new();
        let packet = reassembler.feed(&mut wire).unwrap().unwrap();
        assert_eq!(packet.command, 0x83);
        assert_eq!(packet.payload.as_ref(), &[0x00]);
        assert!(wire.is_empty());
    }

    #[test]
    fn resynchronizes_on_implausible_length() {
        let mut wire = BytesMut::new();
        // A sentinel followed by a length below the minimum.
        wire.put_slice(&[START, 0x00, 0x02]);
        // A sentinel followed by a length above the maximum.
        wire.put_slice(&[START, 0x7F, 0xFF]);
        wire.put_slice(&encode(0x81, &[0x10]));

        let mut reassembler = Reassembler::new();
        let packet = reassembler.feed(&mut wire).unwrap().unwrap();
        assert_eq!(packet.command, 0x81);
    }

    #[test]
    fn checksum_failure_is_reported() {
        let mut bad = encode(0x82, &[1, 2, 3, 4, 5, 6]).to_vec();
        let last = bad.len() - 1;
        bad[last] ^= 0xA5;

        let mut wire = BytesMut::from(bad.as_slice());
        wire.put_slice(&encode(0x83, &[0x00]));

        let mut reassembler = Reassembler::new();
        let err = reassembler.feed(&mut wire).unwrap_err();
        assert!(matches!(err, FrameError::ChecksumMismatch { .. }));
        assert_eq!(reassembler.state(), State::SeekingStart);
        assert_eq!(reassembler.buffered(), 0);

        // The stream stays usable for the following frame.
        let packet = reassembler.feed(&mut wire).unwrap().unwrap();
        assert_eq!(packet.command, 0x83);
    }

    #[test]
    fn feed_leaves_trailing_bytes() {
        let mut wire = BytesMut::new();
        wire.put_slice(&encode(0x81, &[0x10]));
        wire.put_slice(&encode(0x82, &[0x01, 0x00]));

        let mut reassembler = Reassembler::new();
        let first = reassembler.feed(&mut wire).unwrap().unwrap();
        assert_eq!(first.command, 0x81);
        assert_eq!(wire.len(), 7);

        let second = reassembler.feed(&mut wire).unwrap().unwrap();
        assert_eq!(second.command, 0x82);
        assert!(wire.is_empty());
    }

    #[test]
    fn partial_frame_across_feeds() {
        let frame = encode(0x90, &[0x00]);
        let mut reassembler = Reassembler::new();

        let mut head = BytesMut::from(&frame[..4]);
        assert!(reassembler.feed(&mut head).unwrap().is_none());
        assert_eq!(reassembler.buffered(), 4);

        let mut tail = BytesMut::from(&frame[4..]);
        let packet = reassembler.feed(&mut tail).unwrap().unwrap();
        assert_eq!(packet.command, 0x90);
    }

    #[test]
    fn reset_drops_partial_frame() {
        let frame = encode(0x82, &[9, 9, 9]);
        let mut reassembler = Reassembler::new();
        feed_all(&mut reassembler, &frame[..5]);
        assert!(reassembler.buffered() > 0);

        reassembler.reset();
        assert_eq!(reassembler.state(), State::SeekingStart);
        assert_eq!(reassembler.buffered(), 0);
    }

    #[test]
    fn minimum_frame_without_payload() {
        let frame = encode(0x83, &[]);
        let mut reassembler = Reassembler::new();
        let mut wire = BytesMut::from(frame.as_ref());
        let packet = reassembler.feed(&mut wire).unwrap().unwrap();
        assert!(packet.payload.is_empty());
    }
}
