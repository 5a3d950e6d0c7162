//! The channel state machine.
//!
//! Orchestrates the codec, the retransmission buffer, and the latency
//! estimator: assigns sequence numbers on send, advances the acknowledgment
//! watermark and dispatches payloads on receive, and keeps flushing the
//! unacknowledged tail through the transport until the peer's acknowledgment
//! covers it.

use std::fmt;
use std::time::{Duration, Instant};

use crate::core::constants::{MAX_PAYLOAD_SIZE, SEQ_NONE};
use crate::core::{ChannelError, DeliveryError, Transport};
use crate::frame::{Frame, Message};

use super::buffer::RetransmitBuffer;
use super::latency::LatencyEstimator;

/// Channel lifecycle state.
///
/// `Idle` channels buffer sends without transmitting (useful for tests and
/// for queueing before the link is up). Binding a transport moves the
/// channel to `Bound`; there is no reverse transition — destruction ends
/// the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelPhase {
    /// No transport attached; sends accumulate in the buffer.
    Idle,
    /// Attached to a live transport, actively sending.
    Bound,
}

/// Channel configuration.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Whether to keep a round-trip latency estimate.
    pub track_latency: bool,
    /// Interval for the periodic resend of the unacknowledged tail.
    ///
    /// `None` disables periodic resending: loss is then only repaired when
    /// the next application send flushes the tail again. The suggested
    /// value is [`DEFAULT_RESEND_INTERVAL`](crate::core::constants::DEFAULT_RESEND_INTERVAL).
    /// Only the [`NetChannel`](crate::channel::NetChannel) handle acts on
    /// this; the bare state machine has no timer.
    pub resend_interval: Option<Duration>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            track_latency: true,
            resend_interval: None,
        }
    }
}

/// Snapshot of channel state for diagnostics and testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelStats {
    /// Next sequence number to assign.
    pub next_seq: u16,
    /// Highest sequence received from the peer.
    pub ack: u16,
    /// Messages awaiting acknowledgment.
    pub pending_count: usize,
    /// Encoded bytes awaiting acknowledgment.
    pub pending_bytes: usize,
    /// Current round-trip estimate, if tracking is enabled and enough
    /// samples exist.
    pub latency: Option<Duration>,
}

impl fmt::Display for ChannelStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "seq: {} ack: {} pending: {} ({} bytes) latency: {}",
            self.next_seq,
            self.ack,
            self.pending_count,
            self.pending_bytes,
            match self.latency {
                Some(d) => format!("{:?}", d),
                None => "n/a".to_string(),
            }
        )
    }
}

/// A delivery callback failure, attributed to the message that caused it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryFailure {
    /// Sequence number of the message whose delivery failed.
    pub seq: u16,
    /// The error the callback returned.
    pub error: DeliveryError,
}

/// What a call to [`Channel::receive`] did.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReceiveReport {
    /// Messages dispatched to the callback for the first time (a failing
    /// callback still counts; the failure is listed separately).
    pub delivered: usize,
    /// Messages suppressed as retransmitted duplicates.
    pub duplicates: usize,
    /// Buffer bytes freed by the frame's acknowledgment.
    pub freed_bytes: usize,
    /// Delivery callback failures, one per failing message.
    ///
    /// A failure never aborts the rest of the frame and never blocks the
    /// acknowledgment watermark.
    pub failures: Vec<DeliveryFailure>,
}

/// Type of the registered message-delivery callback.
type MessageCallback = Box<dyn FnMut(&[u8]) -> Result<(), DeliveryError> + Send>;

/// The reliability channel.
///
/// One instance per logical unreliable link, owned exclusively by the
/// application that created it. `send` and `receive` are synchronous and
/// non-blocking; when they may race (the transport delivering inbound frames
/// asynchronously to application sends), serialize them behind one lock —
/// the [`NetChannel`](crate::channel::NetChannel) handle does exactly that.
pub struct Channel<T: Transport> {
    /// Next sequence number to assign; starts at 1, strictly increasing.
    /// 0 is reserved for "nothing yet". The counter does not handle 16-bit
    /// wraparound: acknowledgment comparison would have to become modular
    /// before a channel could outlive 65535 messages.
    next_seq: u16,
    /// Highest sequence received from the peer; monotonically non-decreasing.
    ack: u16,
    /// Sent-but-unacknowledged messages.
    buffer: RetransmitBuffer,
    /// Optional round-trip estimation.
    latency: Option<LatencyEstimator>,
    /// The bound transport; `None` while idle.
    transport: Option<T>,
    /// Application delivery callback.
    on_message: Option<MessageCallback>,
}

impl<T: Transport> Channel<T> {
    /// Create an idle channel.
    pub fn new(config: ChannelConfig) -> Self {
        Self {
            next_seq: 1,
            ack: SEQ_NONE,
            buffer: RetransmitBuffer::new(),
            latency: config.track_latency.then(LatencyEstimator::new),
            transport: None,
            on_message: None,
        }
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> ChannelPhase {
        if self.transport.is_some() {
            ChannelPhase::Bound
        } else {
            ChannelPhase::Idle
        }
    }

    /// Register the delivery callback invoked once per newly received
    /// message.
    pub fn on_message<F>(&mut self, callback: F)
    where
        F: FnMut(&[u8]) -> Result<(), DeliveryError> + Send + 'static,
    {
        self.on_message = Some(Box::new(callback));
    }

    /// Attach an unreliable transport and transition to `Bound`.
    ///
    /// Fails with [`ChannelError::ReliableTransport`] if the transport
    /// advertises guaranteed delivery, and with
    /// [`ChannelError::AlreadyBound`] on a second bind. Anything buffered
    /// while idle is flushed immediately.
    pub fn bind(&mut self, transport: T) -> Result<(), ChannelError> {
        if self.transport.is_some() {
            return Err(ChannelError::AlreadyBound);
        }
        if transport.is_reliable() {
            return Err(ChannelError::ReliableTransport);
        }

        self.transport = Some(transport);
        tracing::debug!(pending = self.buffer.len(), "channel: bound to transport");
        self.flush();
        Ok(())
    }

    /// Queue a payload for reliable delivery and flush.
    ///
    /// Assigns the next sequence number and returns it. Fails with
    /// [`ChannelError::PayloadTooLarge`] — before any state change — if the
    /// payload exceeds 255 bytes.
    pub fn send(&mut self, payload: &[u8]) -> Result<u16, ChannelError> {
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(ChannelError::PayloadTooLarge {
                size: payload.len(),
            });
        }

        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);

        let encoded = Message::new(seq, payload.to_vec()).encode();
        self.buffer.append(seq, encoded);

        if let Some(latency) = &mut self.latency {
            latency.record_send(seq, Instant::now());
        }

        tracing::trace!(
            seq,
            len = payload.len(),
            pending = self.buffer.len(),
            "channel: queued message"
        );

        self.flush();
        Ok(seq)
    }

    /// Serialize the pending set and hand it to the transport.
    ///
    /// No-op while idle or when nothing is pending. Every flush resends the
    /// entire unacknowledged tail; this is the whole retransmission policy.
    pub fn flush(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        if let Some(transport) = &mut self.transport {
            let frame = self.buffer.serialize(self.ack);
            tracing::trace!(bytes = frame.len(), "channel: flushed pending frame");
            transport.send(frame);
        }
    }

    /// Process one raw inbound frame.
    ///
    /// Decoding failure surfaces [`ChannelError::MalformedFrame`] and leaves
    /// all state untouched. On success: each embedded message with a
    /// sequence above the current watermark is delivered exactly once (a
    /// failing callback is recorded in the report and the frame keeps
    /// processing); messages at or below the watermark are retransmitted
    /// duplicates and are suppressed. The frame's leading acknowledgment —
    /// the peer's statement of what it has received from us — then prunes
    /// the retransmission buffer and feeds the latency estimator, and
    /// anything still pending is flushed again.
    pub fn receive(&mut self, raw: &[u8]) -> Result<ReceiveReport, ChannelError> {
        let frame = match Frame::decode(raw) {
            Ok(frame) => frame,
            Err(err) => {
                tracing::warn!(error = %err, len = raw.len(), "channel: discarded malformed frame");
                return Err(ChannelError::MalformedFrame(err));
            }
        };

        let mut report = ReceiveReport::default();

        for msg in &frame.messages {
            if msg.seq <= self.ack {
                report.duplicates += 1;
                continue;
            }

            if let Some(callback) = &mut self.on_message {
                if let Err(error) = callback(&msg.payload) {
                    tracing::warn!(seq = msg.seq, error = %error, "channel: delivery callback failed");
                    report.failures.push(DeliveryFailure {
                        seq: msg.seq,
                        error,
                    });
                }
            }
            report.delivered += 1;
            self.ack = msg.seq;
        }

        let pruned = self.buffer.prune(frame.ack);
        report.freed_bytes = pruned.freed_bytes;

        if let Some(latency) = &mut self.latency {
            let now = Instant::now();
            for seq in &pruned.seqs {
                latency.record_ack(*seq, now);
            }
        }

        self.flush();
        Ok(report)
    }

    /// Highest sequence received from the peer so far.
    pub fn ack(&self) -> u16 {
        self.ack
    }

    /// Next sequence number a send would be assigned.
    pub fn next_seq(&self) -> u16 {
        self.next_seq
    }

    /// Current round-trip estimate, if available.
    pub fn latency(&self) -> Option<Duration> {
        self.latency.as_ref().and_then(LatencyEstimator::estimate)
    }

    /// Snapshot the channel state for diagnostics.
    pub fn stats(&self) -> ChannelStats {
        ChannelStats {
            next_seq: self.next_seq,
            ack: self.ack,
            pending_count: self.buffer.len(),
            pending_bytes: self.buffer.pending_bytes(),
            latency: self.latency(),
        }
    }
}

impl<T: Transport> fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("phase", &self.phase())
            .field("next_seq", &self.next_seq)
            .field("ack", &self.ack)
            .field("pending_count", &self.buffer.len())
            .field("pending_bytes", &self.buffer.pending_bytes())
            .finish_non_exhaustive()
    }
}
