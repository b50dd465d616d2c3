//! `tokio_util::codec` adapter around the packet codec and reassembler.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{encode_into, Packet};
use crate::dictionary::MAX_PAYLOAD;
use crate::error::FrameError;
use crate::reassembler::Reassembler;

/// Frames packets for `tokio_util::codec::Framed`.
///
/// Decoding follows the same resynchronization rules as [`Reassembler`]:
/// line noise is skipped, checksum failures are returned as errors.
#[derive(Debug, Default)]
pub struct SquidCodec {
    reassembler: Reassembler,
}

impl SquidCodec {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for SquidCodec {
    type Item = Packet;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        self.reassembler.feed(src)
    }
}

impl Encoder<Packet> for SquidCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Packet, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if item.payload.len() > MAX_PAYLOAD {
            return Err(FrameError::PayloadTooLarge {
                size: item.payload.len(),
                max: MAX_PAYLOAD,
            });
        }
        encode_into(item.command, &item.payload, dst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use futures_util::{SinkExt, StreamExt};
    use tokio_util::codec::{FramedRead, FramedWrite};

    use super::*;
    use crate::codec::encode;
    use crate::dictionary::START;

    #[tokio::test]
    async fn decodes_frames_from_async_reader() {
        let mut wire = vec![0x00, 0x11];
        wire.extend_from_slice(&encode(0x81, &[0x10]));
        wire.extend_from_slice(&[START, 0x00, 0x01]);
        wire.extend_from_slice(&encode(0x82, &[0x03, 0x00, 0x01, 0x00, 0x00, 0x00]));

        let mut framed = FramedRead::new(wire.as_slice(), SquidCodec::new());

        let first = framed.next().await.unwrap().unwrap();
        assert_eq!(first.command, 0x81);
        let second = framed.next().await.unwrap().unwrap();
        assert_eq!(second.command, 0x82);
        assert_eq!(second.payload.len(), 6);
        assert!(framed.next().await.is_none());
    }

    #[tokio::test]
    async fn surfaces_checksum_errors() {
        let mut frame = encode(0x83, &[0x00]).to_vec();
        let last = frame.len() - 1;
        frame[last] ^= 0xFF;

        let mut framed = FramedRead::new(frame.as_slice(), SquidCodec::new());
        let err = framed.next().await.unwrap().unwrap_err();
        assert!(err.is_checksum());
    }

    #[tokio::test]
    async fn encodes_packets_to_async_writer() {
        let mut framed = FramedWrite::new(Vec::new(), SquidCodec::new());
        framed.send(Packet::bare(0x01)).await.unwrap();

        let wire = framed.into_inner();
        assert_eq!(wire, encode(0x01, &[]).to_vec());
    }

    #[test]
    fn encoder_rejects_oversized_payload() {
        let mut codec = SquidCodec::new();
        let mut dst = BytesMut::new();
        let err = codec
            .encode(Packet::new(0x10, vec![0u8; MAX_PAYLOAD + 1]), &mut dst)
            .unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { .. }));
        assert!(dst.is_empty());
    }
}
