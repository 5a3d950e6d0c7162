//! The transport capability contract.

/// An unreliable, unordered, message-oriented transport.
///
/// The channel owns a transport after [`bind`](crate::channel::Channel::bind)
/// and pushes every outgoing frame through [`send`](Transport::send).
/// Outbound frames are fire-and-forget: the transport gives no delivery or
/// ordering guarantee, and losing a frame is expected — the channel repairs
/// loss by resending its unacknowledged tail.
///
/// Inbound wiring is the application's responsibility: hand each raw frame
/// the transport delivers to [`Channel::receive`](crate::channel::Channel::receive).
///
/// # Reliability check
///
/// [`is_reliable`](Transport::is_reliable) must report whether the transport
/// guarantees ordered delivery. Binding a channel to a reliable transport
/// fails fast with [`ChannelError::ReliableTransport`](crate::core::ChannelError::ReliableTransport):
/// layering retransmission over a reliable link is redundant and wasteful.
///
/// # Example
///
/// ```rust
/// use netchan::Transport;
///
/// struct UnreliableLink {
///     wire: Vec<Vec<u8>>,
/// }
///
/// impl Transport for UnreliableLink {
///     fn is_reliable(&self) -> bool {
///         false
///     }
///
///     fn send(&mut self, frame: &[u8]) {
///         self.wire.push(frame.to_vec());
///     }
/// }
/// ```
pub trait Transport {
    /// Whether this transport guarantees ordered delivery.
    fn is_reliable(&self) -> bool;

    /// Transmit one raw frame. Best effort; loss is acceptable.
    fn send(&mut self, frame: &[u8]);
}
