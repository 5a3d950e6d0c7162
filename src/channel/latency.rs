//! Round-trip latency estimation from acknowledgment timing.
//!
//! Send timestamps are recorded per sequence number; when a cumulative
//! acknowledgment covers a sequence, the elapsed time becomes a sample in a
//! fixed-capacity circular buffer. The estimate is an outlier-trimmed mean:
//! samples further than one standard deviation from the median are dropped
//! before averaging. A single lost-then-retransmitted message produces a
//! wildly inflated sample, and the trimming step exists to absorb exactly
//! that.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::core::constants::{LATENCY_RECOMPUTE_INTERVAL, LATENCY_SAMPLE_WINDOW};

/// Tracks in-flight send timestamps and computes a robust round-trip
/// estimate.
///
/// The estimator is optional equipment on a channel: when disabled the
/// channel simply never records sends or acks and the estimate stays absent.
#[derive(Debug, Default)]
pub struct LatencyEstimator {
    /// Send timestamp per in-flight sequence number. Entries are removed
    /// once acknowledged.
    sent_at: HashMap<u16, Instant>,
    /// Circular buffer of the most recent round-trip samples.
    samples: Vec<Duration>,
    /// Next write position, wrapping modulo the window size.
    cursor: usize,
    /// Total samples ever recorded; drives the recompute cadence.
    recorded: u64,
    /// Last computed trimmed mean.
    estimate: Option<Duration>,
}

impl LatencyEstimator {
    /// Create an estimator with no samples.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that the message numbered `seq` was sent at `now`.
    ///
    /// Retransmissions do not call this again, so a retransmitted message's
    /// eventual sample measures from its first transmission — inflated, and
    /// left for the trimming step to discard.
    pub fn record_send(&mut self, seq: u16, now: Instant) {
        self.sent_at.insert(seq, now);
    }

    /// Record that `seq` was acknowledged at `now`.
    ///
    /// Returns the round-trip sample if a send timestamp was on file. Every
    /// [`LATENCY_RECOMPUTE_INTERVAL`]-th sample triggers a recompute of the
    /// estimate.
    pub fn record_ack(&mut self, seq: u16, now: Instant) -> Option<Duration> {
        let sent = self.sent_at.remove(&seq)?;
        let sample = now.saturating_duration_since(sent);

        if self.samples.len() < LATENCY_SAMPLE_WINDOW {
            self.samples.push(sample);
        } else {
            self.samples[self.cursor] = sample;
        }
        self.cursor = (self.cursor + 1) % LATENCY_SAMPLE_WINDOW;
        self.recorded += 1;

        if self.recorded % LATENCY_RECOMPUTE_INTERVAL == 0 {
            self.recompute();
        }

        tracing::trace!(seq, ?sample, "latency: recorded round-trip sample");
        Some(sample)
    }

    /// The last computed estimate. Absent until enough samples exist.
    pub fn estimate(&self) -> Option<Duration> {
        self.estimate
    }

    /// Number of samples currently held.
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Number of sends awaiting acknowledgment.
    pub fn in_flight(&self) -> usize {
        self.sent_at.len()
    }

    /// Recompute the trimmed mean over the current sample set.
    ///
    /// Median and standard deviation of the set, then the mean of only the
    /// samples within one standard deviation of the median. The degenerate
    /// single-sample case survives trimming (distance 0 is within deviation
    /// 0); if trimming somehow discards everything the estimate goes absent.
    fn recompute(&mut self) {
        if self.samples.is_empty() {
            self.estimate = None;
            return;
        }

        let secs: Vec<f64> = self.samples.iter().map(Duration::as_secs_f64).collect();
        let mid = median(&secs);
        let dev = std_deviation(&secs);

        let kept: Vec<f64> = secs
            .iter()
            .copied()
            .filter(|s| (s - mid).abs() <= dev)
            .collect();

        self.estimate = if kept.is_empty() {
            None
        } else {
            let mean = kept.iter().sum::<f64>() / kept.len() as f64;
            Some(Duration::from_secs_f64(mean))
        };

        tracing::debug!(
            samples = secs.len(),
            kept = kept.len(),
            estimate = ?self.estimate,
            "latency: recomputed estimate"
        );
    }
}

/// Median of a non-empty slice (mean of the middle pair for even lengths).
fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Population standard deviation of a non-empty slice.
fn std_deviation(values: &[f64]) -> f64 {
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Instant {
        Instant::now()
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    /// Feed `rtts` as consecutive send/ack pairs starting at sequence 1.
    fn feed(est: &mut LatencyEstimator, rtts: &[u64]) {
        let t0 = base();
        for (i, rtt) in rtts.iter().enumerate() {
            let seq = (i + 1) as u16;
            est.record_send(seq, t0);
            est.record_ack(seq, t0 + ms(*rtt));
        }
    }

    #[test]
    fn test_new_estimator_absent() {
        let est = LatencyEstimator::new();
        assert!(est.estimate().is_none());
        assert_eq!(est.sample_count(), 0);
        assert_eq!(est.in_flight(), 0);
    }

    #[test]
    fn test_ack_without_send_is_ignored() {
        let mut est = LatencyEstimator::new();
        assert!(est.record_ack(7, base()).is_none());
        assert_eq!(est.sample_count(), 0);
    }

    #[test]
    fn test_ack_removes_in_flight_entry() {
        let mut est = LatencyEstimator::new();
        let t0 = base();

        est.record_send(1, t0);
        assert_eq!(est.in_flight(), 1);

        let sample = est.record_ack(1, t0 + ms(40));
        assert_eq!(sample, Some(ms(40)));
        assert_eq!(est.in_flight(), 0);

        // A duplicate ack yields nothing.
        assert!(est.record_ack(1, t0 + ms(80)).is_none());
    }

    #[test]
    fn test_no_estimate_before_recompute_interval() {
        let mut est = LatencyEstimator::new();
        feed(&mut est, &[50; 9]);
        assert!(est.estimate().is_none());
    }

    #[test]
    fn test_estimate_after_ten_samples() {
        let mut est = LatencyEstimator::new();
        feed(&mut est, &[50; 10]);

        let estimate = est.estimate().expect("ten samples computed an estimate");
        assert_eq!(estimate, ms(50));
    }

    #[test]
    fn test_estimate_trims_retransmission_outlier() {
        let mut est = LatencyEstimator::new();
        // Nine ordinary round trips and one lost-then-retransmitted message.
        feed(&mut est, &[50, 50, 50, 50, 50, 50, 50, 50, 50, 2000]);

        let estimate = est.estimate().expect("estimate present");
        // The 2s outlier is more than one deviation from the median and is
        // discarded; a plain mean would report 245ms.
        assert_eq!(estimate, ms(50));
    }

    #[test]
    fn test_circular_buffer_overwrites_oldest() {
        let mut est = LatencyEstimator::new();
        // Fill the window with slow samples, then overwrite it with fast ones.
        feed(&mut est, &[200; 30]);
        assert_eq!(est.sample_count(), 30);

        let t0 = base();
        for i in 0..30u16 {
            let seq = 100 + i;
            est.record_send(seq, t0);
            est.record_ack(seq, t0 + ms(20));
        }

        assert_eq!(est.sample_count(), 30);
        assert_eq!(est.estimate(), Some(ms(20)));
    }

    #[test]
    fn test_median_odd_even() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), 2.5);
        assert_eq!(median(&[5.0]), 5.0);
    }

    #[test]
    fn test_std_deviation() {
        assert_eq!(std_deviation(&[2.0, 2.0, 2.0]), 0.0);
        // Population deviation of {2, 4}: mean 3, variance 1.
        assert_eq!(std_deviation(&[2.0, 4.0]), 1.0);
    }
}
