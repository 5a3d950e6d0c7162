//! # NetChannel
//!
//! A thin reliability layer for unreliable, unordered, message-oriented
//! transports (UDP, unreliable WebRTC data channels, and the like). It adds:
//!
//! - **Sequencing**: every outgoing message carries a 16-bit sequence number
//! - **Cumulative acknowledgment**: every frame leads with the highest
//!   sequence number received so far
//! - **Buffered retransmission**: unacknowledged messages are resent,
//!   piggy-backed on every subsequent frame, until the peer acknowledges
//! - **Latency estimation**: an optional outlier-trimmed round-trip estimate
//!   derived from acknowledgment timing
//!
//! Inspired by NetChan from Id software. Appropriate for small, low-rate
//! control or game-state channels; this is not a general-purpose reliable
//! transport (no congestion control, no flow control, no reordering).
//!
//! ## Feature Flags
//!
//! - `runtime` (default): async [`NetChannel`] handle with the periodic
//!   resend task (requires tokio)
//!
//! ## Modules
//!
//! - [`core`]: constants, error types, and the [`Transport`] contract
//! - [`frame`]: the binary wire codec
//! - [`channel`]: retransmission buffer, latency estimator, and the channel
//!   state machine
//!
//! ## Example Usage
//!
//! ```rust
//! use netchan::prelude::*;
//!
//! struct LossyLink;
//!
//! impl Transport for LossyLink {
//!     fn is_reliable(&self) -> bool {
//!         false
//!     }
//!
//!     fn send(&mut self, _frame: &[u8]) {
//!         // hand the bytes to the wire; losing them is fine
//!     }
//! }
//!
//! # fn main() -> Result<(), ChannelError> {
//! let mut channel = Channel::new(ChannelConfig::default());
//! channel.on_message(|payload| {
//!     println!("got {} bytes", payload.len());
//!     Ok(())
//! });
//! channel.bind(LossyLink)?;
//!
//! let seq = channel.send(&[1, 2, 3, 4])?;
//! assert_eq!(seq, 1);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Core module (always included)
pub mod core;

// Wire codec
pub mod frame;

// Channel state machine and its components
pub mod channel;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::core::{ChannelError, DeliveryError, Transport, constants};

    pub use crate::frame::{Frame, FrameError, Message};

    pub use crate::channel::{
        Channel, ChannelConfig, ChannelPhase, ChannelStats, DeliveryFailure, LatencyEstimator,
        PendingMessage, ReceiveReport, RetransmitBuffer,
    };

    #[cfg(feature = "runtime")]
    pub use crate::channel::NetChannel;
}

// Re-export commonly used items at crate root
pub use crate::core::{ChannelError, DeliveryError, Transport};

pub use crate::channel::{Channel, ChannelConfig, ChannelPhase, ChannelStats, ReceiveReport};

pub use crate::frame::{Frame, FrameError, Message};

#[cfg(feature = "runtime")]
pub use crate::channel::NetChannel;
