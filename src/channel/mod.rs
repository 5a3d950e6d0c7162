//! The channel: retransmission buffer, latency estimator, and the
//! orchestrating state machine.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │            Application                  │
//! ├─────────────────────────────────────────┤
//! │         Channel / NetChannel            │  ← this module
//! │   sequencing, acks, retransmission      │
//! ├─────────────────────────────────────────┤
//! │     Unreliable transport (external)     │
//! └─────────────────────────────────────────┘
//! ```
//!
//! [`Channel`] is the synchronous protocol engine: it assigns sequence
//! numbers, keeps the unacknowledged tail in a [`RetransmitBuffer`], resends
//! the whole tail on every flush, and prunes it as cumulative
//! acknowledgments arrive. [`LatencyEstimator`] turns acknowledgment timing
//! into a round-trip estimate. [`NetChannel`] (feature `runtime`) wraps the
//! engine in a shared handle and drives the periodic resend task.

mod buffer;
mod latency;
mod state;

#[cfg(feature = "runtime")]
mod handle;

pub use buffer::{PendingMessage, Pruned, RetransmitBuffer};
pub use latency::LatencyEstimator;
pub use state::{
    Channel, ChannelConfig, ChannelPhase, ChannelStats, DeliveryFailure, ReceiveReport,
};

#[cfg(feature = "runtime")]
#[cfg_attr(docsrs, doc(cfg(feature = "runtime")))]
pub use handle::NetChannel;
