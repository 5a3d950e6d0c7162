//! Protocol constants.
//!
//! These values are fixed by the wire format and the reference retransmission
//! policy and MUST NOT be changed.

use std::time::Duration;

// =============================================================================
// WIRE FORMAT
// =============================================================================

/// Maximum application payload per message (8-bit length field).
pub const MAX_PAYLOAD_SIZE: usize = 255;

/// Per-message header size: sequence (u16 BE) + length (u8).
pub const MESSAGE_HEADER_SIZE: usize = 3;

/// Frame header size: cumulative acknowledgment (u16 BE).
pub const FRAME_HEADER_SIZE: usize = 2;

/// Reserved sequence number meaning "nothing sent / nothing acknowledged".
///
/// Real messages are numbered starting at 1.
pub const SEQ_NONE: u16 = 0;

// =============================================================================
// RETRANSMISSION
// =============================================================================

/// Suggested interval for the periodic resend of the unacknowledged tail.
///
/// Resending is opt-in; see `ChannelConfig::resend_interval`.
pub const DEFAULT_RESEND_INTERVAL: Duration = Duration::from_millis(50);

// =============================================================================
// LATENCY ESTIMATION
// =============================================================================

/// Number of round-trip samples kept in the circular buffer.
pub const LATENCY_SAMPLE_WINDOW: usize = 30;

/// The estimate is recomputed after every this many new samples.
pub const LATENCY_RECOMPUTE_INTERVAL: u64 = 10;
