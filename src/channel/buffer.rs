//! Retransmission buffer.
//!
//! Holds every sent-but-unacknowledged message and serializes the whole set
//! into one outgoing frame. Every flush resends the *entire* unacknowledged
//! tail — there is no selective retransmission and no backoff. That trades
//! bandwidth under loss for simplicity, which is the right trade for small,
//! low-rate control channels.

use std::collections::VecDeque;

use crate::core::constants::FRAME_HEADER_SIZE;

/// One sent-but-unacknowledged message.
///
/// Created on send, destroyed when the peer's acknowledgment advances past
/// its sequence number. The framed (seq, len, payload) bytes are kept so a
/// flush never re-encodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMessage {
    /// Sequence number assigned at send time.
    pub seq: u16,
    /// Framed representation: seq (BE16), length (u8), payload.
    pub encoded: Vec<u8>,
}

/// Result of pruning acknowledged messages.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Pruned {
    /// Encoded bytes removed from the buffer.
    pub freed_bytes: usize,
    /// Sequence numbers of the pruned messages, ascending.
    pub seqs: Vec<u16>,
}

/// The ordered set of unacknowledged outgoing messages.
///
/// Entries are ascending by sequence number — insertion order equals
/// sequence order because the channel assigns sequence numbers
/// monotonically. Mutated only by [`append`](Self::append) (tail push) and
/// [`prune`](Self::prune) (prefix removal).
#[derive(Debug, Default)]
pub struct RetransmitBuffer {
    /// Pending messages, ascending by `seq`, no duplicates.
    pending: VecDeque<PendingMessage>,
    /// Sum of encoded lengths across `pending`. A cache, not a source of
    /// truth: kept consistent on every append and prune.
    pending_bytes: usize,
    /// Cached full-frame serialization, tagged with the ack watermark it
    /// embeds. Cleared whenever `pending` changes.
    cached: Option<CachedFrame>,
}

#[derive(Debug)]
struct CachedFrame {
    ack: u16,
    bytes: Vec<u8>,
}

impl RetransmitBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pending messages.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Total encoded bytes across all pending messages.
    pub fn pending_bytes(&self) -> usize {
        self.pending_bytes
    }

    /// Size of the frame [`serialize`](Self::serialize) would produce.
    pub fn frame_size(&self) -> usize {
        FRAME_HEADER_SIZE + self.pending_bytes
    }

    /// Iterate over the pending messages, head (oldest) first.
    pub fn iter(&self) -> impl Iterator<Item = &PendingMessage> {
        self.pending.iter()
    }

    /// Add a freshly encoded message to the tail.
    ///
    /// Never fails: the payload ceiling and sequence monotonicity are
    /// enforced by the channel before this call.
    pub fn append(&mut self, seq: u16, encoded: Vec<u8>) {
        self.pending_bytes += encoded.len();
        self.pending.push_back(PendingMessage { seq, encoded });
        self.cached = None;
    }

    /// Remove every entry acknowledged by `ack`, from the head.
    ///
    /// Entries are ascending and the watermark only increases, so this is a
    /// contiguous prefix removal: scan from the head and stop at the first
    /// entry with `seq > ack`. The scan never skips ahead past an
    /// unacknowledged entry, even if a later entry would also be covered.
    pub fn prune(&mut self, ack: u16) -> Pruned {
        let mut pruned = Pruned::default();

        while let Some(front) = self.pending.front() {
            if front.seq > ack {
                break;
            }
            if let Some(msg) = self.pending.pop_front() {
                pruned.freed_bytes += msg.encoded.len();
                pruned.seqs.push(msg.seq);
            }
        }

        if !pruned.seqs.is_empty() {
            self.pending_bytes -= pruned.freed_bytes;
            self.cached = None;
            tracing::debug!(
                ack,
                pruned = pruned.seqs.len(),
                freed_bytes = pruned.freed_bytes,
                remaining = self.pending.len(),
                "buffer: pruned acknowledged messages"
            );
        }

        pruned
    }

    /// Produce the full outgoing frame: `ack` followed by every pending
    /// message's stored encoding.
    ///
    /// The result is cached until the next [`append`](Self::append) or
    /// [`prune`](Self::prune). The cache records the watermark it embeds and
    /// is rebuilt if `ack` has moved since, so a flush never transmits a
    /// stale acknowledgment.
    pub fn serialize(&mut self, ack: u16) -> &[u8] {
        let stale = match &self.cached {
            Some(cached) => cached.ack != ack,
            None => true,
        };

        if stale {
            let mut bytes = Vec::with_capacity(self.frame_size());
            bytes.extend_from_slice(&ack.to_be_bytes());
            for msg in &self.pending {
                bytes.extend_from_slice(&msg.encoded);
            }
            self.cached = Some(CachedFrame { ack, bytes });
        }

        // cached is always Some here
        self.cached.as_ref().map(|c| c.bytes.as_slice()).unwrap_or(&[])
    }
}
