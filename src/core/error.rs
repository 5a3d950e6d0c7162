//! Error types for the channel layer.
//!
//! Nothing here is fatal to the process: an oversized payload is rejected
//! before any state change, a malformed frame is discarded whole, and a
//! failing delivery callback is isolated to its message. A lost frame
//! degrades to "wait for the next resend", never to a crash.

use thiserror::Error;

use super::constants::MAX_PAYLOAD_SIZE;
use crate::frame::FrameError;

/// Errors surfaced by channel operations.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// Application payload exceeds the per-message ceiling.
    ///
    /// Rejected before any state mutation; the caller can recover by
    /// fragmenting or shrinking the payload.
    #[error("payload too large: {size} bytes exceeds the {MAX_PAYLOAD_SIZE}-byte limit")]
    PayloadTooLarge {
        /// Size of the rejected payload.
        size: usize,
    },

    /// Inbound bytes did not decode as a frame.
    ///
    /// The frame is discarded with no partial state change; the channel
    /// keeps operating.
    #[error("malformed frame: {0}")]
    MalformedFrame(#[from] FrameError),

    /// The transport advertises guaranteed, ordered delivery.
    ///
    /// A reliability layer over it would be redundant and wasteful; use the
    /// transport directly instead.
    #[error("transport is reliable; use it directly instead of wrapping it")]
    ReliableTransport,

    /// The channel is already bound to a transport.
    #[error("channel is already bound to a transport")]
    AlreadyBound,
}

/// Failure reported by an application's message-delivery callback.
///
/// Delivery failures are isolated per message: they never stop processing
/// of the remaining messages in a frame, and they never touch channel state.
/// They are surfaced to the channel owner through
/// [`ReceiveReport::failures`](crate::channel::ReceiveReport::failures) so
/// tests and callers can assert on them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("delivery callback failed: {reason}")]
pub struct DeliveryError {
    /// Application-provided description of the failure.
    pub reason: String,
}

impl DeliveryError {
    /// Create a delivery error with the given reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}
