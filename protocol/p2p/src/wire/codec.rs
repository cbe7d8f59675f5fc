//! A tokio codec mapping byte streams to p2p message streams. Each frame is
//! `magic (4, LE) | command (1) | payload_len (4, LE) | crc32c (4, LE) | payload`.

use super::{Command, Message};
use crate::errors::ProtocolError;
use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// The fixed length of a frame header preceding the payload
pub const FRAME_HEADER_SIZE: usize = 4 + 1 + 4 + 4;

/// Maximum size of a single message payload
pub const MAX_PAYLOAD_SIZE: usize = 32 * 1024 * 1024;

/// A codec producing p2p messages from byte streams and vice versa, bound to
/// a specific network magic
pub struct FrameCodec {
    magic: u32,
}

impl FrameCodec {
    pub fn new(magic: u32) -> Self {
        Self { magic }
    }
}

impl Encoder<Message> for FrameCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let payload = item.serialize_payload();
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::OversizePayload(payload.len(), MAX_PAYLOAD_SIZE));
        }
        dst.reserve(FRAME_HEADER_SIZE + payload.len());
        dst.put_u32_le(self.magic);
        dst.put_u8(item.command() as u8);
        dst.put_u32_le(payload.len() as u32);
        dst.put_u32_le(crc32c::crc32c(&payload));
        dst.extend_from_slice(&payload);
        Ok(())
    }
}

impl Decoder for FrameCodec {
    type Item = Message;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < FRAME_HEADER_SIZE {
            return Ok(None);
        }

        // Peek the header without consuming so partial frames stay buffered
        let magic = u32::from_le_bytes(src[0..4].try_into().expect("slice is exactly 4 bytes"));
        if magic != self.magic {
            return Err(ProtocolError::WrongNetworkMagic(magic, self.magic));
        }
        let command_byte = src[4];
        let payload_len = u32::from_le_bytes(src[5..9].try_into().expect("slice is exactly 4 bytes")) as usize;
        if payload_len > MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::OversizePayload(payload_len, MAX_PAYLOAD_SIZE));
        }
        let checksum = u32::from_le_bytes(src[9..13].try_into().expect("slice is exactly 4 bytes"));

        if src.len() < FRAME_HEADER_SIZE + payload_len {
            // Reserve what the full frame needs and wait for more bytes
            src.reserve(FRAME_HEADER_SIZE + payload_len - src.len());
            return Ok(None);
        }

        src.advance(FRAME_HEADER_SIZE);
        let payload = src.split_to(payload_len);
        if crc32c::crc32c(&payload) != checksum {
            return Err(ProtocolError::ChecksumMismatch);
        }

        let command = Command::try_from(command_byte)?;
        Ok(Some(Message::deserialize_payload(command, &payload)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_round_trip() {
        let mut codec = FrameCodec::new(0x3ddcf71d);
        let mut buf = BytesMut::new();
        codec.encode(Message::Ping { nonce: 42 }, &mut buf).unwrap();
        codec.encode(Message::RequestAddresses, &mut buf).unwrap();

        match codec.decode(&mut buf).unwrap() {
            Some(Message::Ping { nonce }) => assert_eq!(nonce, 42),
            other => panic!("unexpected decode result: {other:?}"),
        }
        assert!(matches!(codec.decode(&mut buf).unwrap(), Some(Message::RequestAddresses)));
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_partial_frame_waits() {
        let mut codec = FrameCodec::new(7);
        let mut buf = BytesMut::new();
        codec.encode(Message::Ping { nonce: 1 }, &mut buf).unwrap();
        let full = buf.clone();

        let mut partial = BytesMut::from(&full[..FRAME_HEADER_SIZE + 3]);
        assert!(codec.decode(&mut partial).unwrap().is_none());
        partial.extend_from_slice(&full[FRAME_HEADER_SIZE + 3..]);
        assert!(matches!(codec.decode(&mut partial).unwrap(), Some(Message::Ping { nonce: 1 })));
    }

    #[test]
    fn test_wrong_magic_rejected() {
        let mut encoder = FrameCodec::new(1);
        let mut buf = BytesMut::new();
        encoder.encode(Message::Ping { nonce: 1 }, &mut buf).unwrap();

        let mut decoder = FrameCodec::new(2);
        assert!(matches!(decoder.decode(&mut buf), Err(ProtocolError::WrongNetworkMagic(1, 2))));
    }

    #[test]
    fn test_corrupted_payload_rejected() {
        let mut codec = FrameCodec::new(7);
        let mut buf = BytesMut::new();
        codec.encode(Message::Ping { nonce: 1 }, &mut buf).unwrap();
        let last = buf.len() - 1;
        buf[last] ^= 0xff;
        assert!(matches!(codec.decode(&mut buf), Err(ProtocolError::ChecksumMismatch)));
    }
}
