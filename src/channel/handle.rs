//! Shared channel handle with the periodic resend task.
//!
//! [`NetChannel`] wraps the synchronous [`Channel`] in an `Arc<Mutex<_>>` —
//! the single mutual-exclusion boundary that serializes application sends
//! against asynchronously delivered inbound frames. When a resend interval
//! is configured, binding spawns a tokio task that takes the same lock and
//! flushes the unacknowledged tail on every tick; that task is owned by the
//! handle and aborted when the handle is dropped.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::core::{ChannelError, DeliveryError, Transport};

use super::state::{Channel, ChannelConfig, ChannelPhase, ChannelStats, ReceiveReport};

/// Async handle around a [`Channel`].
///
/// The handle is the channel's single owner; dropping it cancels the resend
/// task.
pub struct NetChannel<T: Transport + Send + 'static> {
    channel: Arc<Mutex<Channel<T>>>,
    resend_interval: Option<Duration>,
    resend_task: Option<JoinHandle<()>>,
}

impl<T: Transport + Send + 'static> NetChannel<T> {
    /// Create an idle handle.
    pub fn new(config: ChannelConfig) -> Self {
        let resend_interval = config.resend_interval;
        Self {
            channel: Arc::new(Mutex::new(Channel::new(config))),
            resend_interval,
            resend_task: None,
        }
    }

    /// Register the delivery callback.
    pub fn on_message<F>(&self, callback: F)
    where
        F: FnMut(&[u8]) -> Result<(), DeliveryError> + Send + 'static,
    {
        self.lock().on_message(callback);
    }

    /// Attach an unreliable transport.
    ///
    /// Starts the periodic resend task if the channel was configured with a
    /// resend interval (in that case this must be called within a tokio
    /// runtime). The task keeps retransmitting the unacknowledged tail even
    /// when the application stops sending — this is how loss is eventually
    /// repaired.
    pub fn bind(&mut self, transport: T) -> Result<(), ChannelError> {
        self.lock().bind(transport)?;

        if let Some(interval) = self.resend_interval {
            let channel = Arc::clone(&self.channel);
            self.resend_task = Some(tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                // The first tick fires immediately; skip it, the bind
                // already flushed.
                ticker.tick().await;
                loop {
                    ticker.tick().await;
                    let mut guard = match channel.lock() {
                        Ok(guard) => guard,
                        Err(poisoned) => poisoned.into_inner(),
                    };
                    guard.flush();
                }
            }));
            tracing::debug!(?interval, "netchannel: resend task started");
        }

        Ok(())
    }

    /// Queue a payload for reliable delivery; returns the assigned sequence
    /// number.
    pub fn send(&self, payload: &[u8]) -> Result<u16, ChannelError> {
        self.lock().send(payload)
    }

    /// Process one raw inbound frame.
    pub fn receive(&self, raw: &[u8]) -> Result<ReceiveReport, ChannelError> {
        self.lock().receive(raw)
    }

    /// Retransmit the unacknowledged tail now.
    pub fn flush(&self) {
        self.lock().flush();
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> ChannelPhase {
        self.lock().phase()
    }

    /// Snapshot the channel state.
    pub fn stats(&self) -> ChannelStats {
        self.lock().stats()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Channel<T>> {
        // The only panic inside the lock would come from a poisoned mutex;
        // channel operations themselves never panic, so recover the guard.
        match self.channel.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<T: Transport + Send + 'static> Drop for NetChannel<T> {
    fn drop(&mut self) {
        if let Some(task) = self.resend_task.take() {
            task.abort();
            tracing::debug!("netchannel: resend task cancelled");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;
    use std::time::Duration;

    #[derive(Clone, Default)]
    struct MockTransport {
        frames: Arc<Mutex<Vec<Vec<u8>>>>,
    }

    impl MockTransport {
        fn sent(&self) -> usize {
            self.frames.lock().unwrap().len()
        }
    }

    impl Transport for MockTransport {
        fn is_reliable(&self) -> bool {
            false
        }

        fn send(&mut self, frame: &[u8]) {
            self.frames.lock().unwrap().push(frame.to_vec());
        }
    }

    fn config(resend: Option<Duration>) -> ChannelConfig {
        ChannelConfig {
            track_latency: true,
            resend_interval: resend,
        }
    }

    #[tokio::test]
    async fn test_send_receive_through_handle() {
        let mut handle = NetChannel::new(config(None));
        handle.bind(MockTransport::default()).unwrap();

        let seq = handle.send(&[1, 2, 3, 4]).unwrap();
        assert_eq!(seq, 1);
        assert_eq!(handle.stats().pending_bytes, 7);

        let ack = Frame::ack_only(1).encode();
        handle.receive(&ack).unwrap();
        assert_eq!(handle.stats().pending_count, 0);
    }

    #[tokio::test]
    async fn test_resend_task_retransmits_without_new_sends() {
        let transport = MockTransport::default();
        let mut handle = NetChannel::new(config(Some(Duration::from_millis(10))));
        handle.bind(transport.clone()).unwrap();

        handle.send(&[9]).unwrap();
        let after_send = transport.sent();

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(
            transport.sent() > after_send,
            "unacknowledged tail was not retransmitted"
        );
    }

    #[tokio::test]
    async fn test_resend_stops_once_acknowledged() {
        let transport = MockTransport::default();
        let mut handle = NetChannel::new(config(Some(Duration::from_millis(10))));
        handle.bind(transport.clone()).unwrap();

        handle.send(&[9]).unwrap();
        handle.receive(&Frame::ack_only(1).encode()).unwrap();
        assert_eq!(handle.stats().pending_count, 0);

        let after_ack = transport.sent();
        tokio::time::sleep(Duration::from_millis(50)).await;
        // flush() is a no-op on an empty buffer, so the count stays put.
        assert_eq!(transport.sent(), after_ack);
    }

    #[tokio::test]
    async fn test_drop_cancels_resend_task() {
        let transport = MockTransport::default();
        let mut handle = NetChannel::new(config(Some(Duration::from_millis(10))));
        handle.bind(transport.clone()).unwrap();
        handle.send(&[9]).unwrap();

        drop(handle);
        tokio::time::sleep(Duration::from_millis(30)).await;
        let quiesced = transport.sent();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(transport.sent(), quiesced, "resend task outlived its channel");
    }

    #[tokio::test]
    async fn test_no_resend_task_without_interval() {
        let transport = MockTransport::default();
        let mut handle = NetChannel::new(config(None));
        handle.bind(transport.clone()).unwrap();

        handle.send(&[9]).unwrap();
        let after_send = transport.sent();

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(transport.sent(), after_send);
    }
}
