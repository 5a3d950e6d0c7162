//! Frame encoding and decoding.
//!
//! A frame is one wire-level transmission unit: a cumulative acknowledgment
//! followed by zero or more multiplexed application messages.
//!
//! Wire format (all multi-byte integers big-endian):
//!
//! ```text
//! +0   Ack (2 bytes BE16)
//! then, for each message:
//! +0   Sequence (2 bytes BE16)
//! +2   Length (1 byte)
//! +3   Payload (Length bytes)
//! ```
//!
//! The codec is pure and stateless. It writes whatever lengths it is given;
//! the 255-byte payload ceiling is enforced by the channel before a message
//! ever reaches encoding.

use thiserror::Error;

use crate::core::constants::{FRAME_HEADER_SIZE, MESSAGE_HEADER_SIZE};

/// One application message as carried inside a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Sequence number assigned by the sending channel (never 0).
    pub seq: u16,
    /// Application payload (at most 255 bytes on a compliant channel).
    pub payload: Vec<u8>,
}

impl Message {
    /// Create a message.
    pub fn new(seq: u16, payload: Vec<u8>) -> Self {
        Self { seq, payload }
    }

    /// Encoded size: (seq, len) header plus the payload.
    pub fn encoded_len(&self) -> usize {
        MESSAGE_HEADER_SIZE + self.payload.len()
    }

    /// Encode into a fresh buffer.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        self.encode_into(&mut buf);
        buf
    }

    /// Append the encoded representation to `buf`.
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.seq.to_be_bytes());
        buf.push(self.payload.len() as u8);
        buf.extend_from_slice(&self.payload);
    }
}

/// A decoded or to-be-encoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Cumulative acknowledgment: highest sequence the sender has received.
    pub ack: u16,
    /// Multiplexed application messages, in send order.
    pub messages: Vec<Message>,
}

impl Frame {
    /// Create a frame.
    pub fn new(ack: u16, messages: Vec<Message>) -> Self {
        Self { ack, messages }
    }

    /// Create an empty frame carrying only an acknowledgment.
    pub fn ack_only(ack: u16) -> Self {
        Self {
            ack,
            messages: Vec::new(),
        }
    }

    /// Total wire size.
    pub fn wire_size(&self) -> usize {
        FRAME_HEADER_SIZE + self.messages.iter().map(Message::encoded_len).sum::<usize>()
    }

    /// Encode to wire format. Pure and deterministic.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.wire_size());
        buf.extend_from_slice(&self.ack.to_be_bytes());
        for msg in &self.messages {
            msg.encode_into(&mut buf);
        }
        buf
    }

    /// Decode from wire format.
    ///
    /// Reads the leading acknowledgment, then (seq, len, payload) triples
    /// until the buffer is exhausted. Any truncation is a [`FrameError`];
    /// the caller must then discard the frame whole.
    pub fn decode(data: &[u8]) -> Result<Self, FrameError> {
        if data.len() < FRAME_HEADER_SIZE {
            return Err(FrameError::TooShort {
                expected: FRAME_HEADER_SIZE,
                actual: data.len(),
            });
        }

        let ack = u16::from_be_bytes([data[0], data[1]]);

        let mut messages = Vec::new();
        let mut offset = FRAME_HEADER_SIZE;
        while offset < data.len() {
            if data.len() - offset < MESSAGE_HEADER_SIZE {
                return Err(FrameError::TruncatedHeader { offset });
            }

            let seq = u16::from_be_bytes([data[offset], data[offset + 1]]);
            let len = data[offset + 2] as usize;
            offset += MESSAGE_HEADER_SIZE;

            if data.len() - offset < len {
                return Err(FrameError::TruncatedPayload {
                    seq,
                    declared: len,
                    available: data.len() - offset,
                });
            }

            messages.push(Message::new(seq, data[offset..offset + len].to_vec()));
            offset += len;
        }

        Ok(Self { ack, messages })
    }
}

/// Frame decoding errors (the malformed-frame condition).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Input is shorter than the frame header.
    #[error("frame too short: expected at least {expected} bytes, got {actual}")]
    TooShort {
        /// Minimum bytes required.
        expected: usize,
        /// Actual bytes received.
        actual: usize,
    },

    /// A message header was cut off at the end of the buffer.
    #[error("truncated message header at offset {offset}")]
    TruncatedHeader {
        /// Byte offset where the header was expected.
        offset: usize,
    },

    /// A declared payload length reads past the end of the buffer.
    #[error("message {seq} declares {declared} payload bytes but only {available} remain")]
    TruncatedPayload {
        /// Sequence number of the truncated message.
        seq: u16,
        /// Declared payload length.
        declared: usize,
        /// Bytes actually remaining.
        available: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_single_message() {
        let frame = Frame::new(0, vec![Message::new(1, vec![1, 2, 3, 4])]);

        // 2 (ack) + 3 (seq + len) + 4 (payload)
        assert_eq!(frame.wire_size(), 9);

        let encoded = frame.encode();
        assert_eq!(hex::encode(&encoded), "000000010401020304");
    }

    #[test]
    fn test_encode_ack_only() {
        let frame = Frame::ack_only(0x1234);
        assert_eq!(hex::encode(frame.encode()), "1234");
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let frame = Frame::new(
            7,
            vec![
                Message::new(8, vec![5, 4, 255]),
                Message::new(9, Vec::new()),
                Message::new(10, vec![0; 255]),
            ],
        );

        let decoded = Frame::decode(&frame.encode()).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn test_decode_empty_payload_message() {
        let frame = Frame::decode(&[0, 0, 0, 3, 0]).unwrap();
        assert_eq!(frame.ack, 0);
        assert_eq!(frame.messages, vec![Message::new(3, Vec::new())]);
    }

    #[test]
    fn test_decode_too_short() {
        assert_eq!(
            Frame::decode(&[0x12]),
            Err(FrameError::TooShort {
                expected: 2,
                actual: 1
            })
        );
        assert_eq!(
            Frame::decode(&[]),
            Err(FrameError::TooShort {
                expected: 2,
                actual: 0
            })
        );
    }

    #[test]
    fn test_decode_truncated_header() {
        // ack followed by a single stray byte
        let result = Frame::decode(&[0, 0, 0xAB]);
        assert_eq!(result, Err(FrameError::TruncatedHeader { offset: 2 }));

        // two bytes of a (seq, len) header
        let result = Frame::decode(&[0, 0, 0, 1]);
        assert_eq!(result, Err(FrameError::TruncatedHeader { offset: 2 }));
    }

    #[test]
    fn test_decode_truncated_payload() {
        // message 1 declares 4 payload bytes, only 2 present
        let result = Frame::decode(&[0, 0, 0, 1, 4, 0xAA, 0xBB]);
        assert_eq!(
            result,
            Err(FrameError::TruncatedPayload {
                seq: 1,
                declared: 4,
                available: 2,
            })
        );
    }

    #[test]
    fn test_decode_truncation_after_valid_message() {
        let mut bytes = Frame::new(0, vec![Message::new(1, vec![9, 9])]).encode();
        bytes.extend_from_slice(&[0, 2, 5, 1]); // seq 2 declares 5 bytes, has 1

        let result = Frame::decode(&bytes);
        assert_eq!(
            result,
            Err(FrameError::TruncatedPayload {
                seq: 2,
                declared: 5,
                available: 1,
            })
        );
    }

    #[test]
    fn test_big_endian_fields() {
        let frame = Frame::new(0x0102, vec![Message::new(0x0304, vec![0xFF])]);
        let encoded = frame.encode();

        assert_eq!(&encoded[..2], &[0x01, 0x02]); // ack BE
        assert_eq!(&encoded[2..4], &[0x03, 0x04]); // seq BE
        assert_eq!(encoded[4], 1); // len
        assert_eq!(encoded[5], 0xFF);
    }

    #[test]
    fn test_max_length_payload() {
        let payload = vec![0x5A; 255];
        let frame = Frame::new(1, vec![Message::new(2, payload.clone())]);

        let encoded = frame.encode();
        assert_eq!(encoded.len(), 2 + 3 + 255);
        assert_eq!(encoded[4], 255);

        let decoded = Frame::decode(&encoded).unwrap();
        assert_eq!(decoded.messages[0].payload, payload);
    }

    #[test]
    fn test_message_encoded_len() {
        assert_eq!(Message::new(1, Vec::new()).encoded_len(), 3);
        assert_eq!(Message::new(1, vec![0; 10]).encoded_len(), 13);
    }
}
