//! Core constants, error types, and the transport contract.
//!
//! Everything in this module is independent of the wire codec and the
//! channel state machine; the rest of the crate builds on it.

pub mod constants;
mod error;
mod traits;

pub use error::{ChannelError, DeliveryError};
pub use traits::Transport;
