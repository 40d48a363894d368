//! In-memory network and simulation metrics.
//!
//! RTT, jitter, loss, bandwidth, prediction error, and tick time are kept as
//! rolling in-memory samples and surfaced through `tracing` rather than
//! written to disk - periodic metrics export is an external concern this
//! crate doesn't own.

use std::collections::VecDeque;

/// Bound on how many rolling samples of each kind are kept.
const SAMPLE_HISTORY: usize = 120;

/// A point-in-time rollup of [`Metrics`], suitable for a single log line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricsSummary {
    pub rtt_ms: f64,
    pub jitter_ms: f64,
    pub packet_loss: f64,
    pub bandwidth_kbps: f64,
    pub prediction_error: f64,
    pub avg_tick_time_ms: f64,
}

/// Accumulates rolling samples of RTT, jitter, loss, bandwidth, prediction
/// error, and tick time.
#[derive(Debug, Default)]
pub struct Metrics {
    rtt_samples: VecDeque<f64>,
    jitter_ms: f64,
    last_rtt_ms: Option<f64>,
    tick_times_ms: VecDeque<f64>,
    bandwidth_bytes_per_window: VecDeque<u64>,
    prediction_errors: VecDeque<f64>,
    packet_loss: f64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a round-trip sample (e.g. from a PING/PONG exchange) and
    /// updates the RFC 3550-style smoothed jitter estimate.
    pub fn record_rtt(&mut self, rtt_ms: f64) {
        push_bounded(&mut self.rtt_samples, rtt_ms);
        if let Some(last) = self.last_rtt_ms {
            let delta = (rtt_ms - last).abs();
            self.jitter_ms += (delta - self.jitter_ms) / 16.0;
        }
        self.last_rtt_ms = Some(rtt_ms);
    }

    pub fn record_tick_time(&mut self, tick_ms: f64) {
        push_bounded(&mut self.tick_times_ms, tick_ms);
    }

    pub fn record_bandwidth_bytes(&mut self, bytes: u64) {
        push_bounded(&mut self.bandwidth_bytes_per_window, bytes);
    }

    pub fn record_prediction_error(&mut self, error: f64) {
        push_bounded(&mut self.prediction_errors, error);
    }

    pub fn set_packet_loss(&mut self, loss_rate: f64) {
        self.packet_loss = loss_rate;
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            rtt_ms: average(&self.rtt_samples),
            jitter_ms: self.jitter_ms,
            packet_loss: self.packet_loss,
            bandwidth_kbps: average(&self.bandwidth_bytes_per_window.iter().map(|b| *b as f64).collect())
                * 8.0
                / 1000.0,
            prediction_error: average(&self.prediction_errors),
            avg_tick_time_ms: average(&self.tick_times_ms),
        }
    }

    /// Logs the current summary at `info` level.
    pub fn log_summary(&self, context: &str) {
        let s = self.summary();
        tracing::info!(
            context,
            rtt_ms = s.rtt_ms,
            jitter_ms = s.jitter_ms,
            packet_loss = s.packet_loss,
            bandwidth_kbps = s.bandwidth_kbps,
            prediction_error = s.prediction_error,
            avg_tick_time_ms = s.avg_tick_time_ms,
            "metrics"
        );
    }
}

fn push_bounded<T>(buf: &mut VecDeque<T>, value: T) {
    if buf.len() == SAMPLE_HISTORY {
        buf.pop_front();
    }
    buf.push_back(value);
}

fn average(samples: &VecDeque<f64>) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().sum::<f64>() / samples.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_is_zeroed_with_no_samples() {
        let m = Metrics::new();
        let s = m.summary();
        assert_eq!(s.rtt_ms, 0.0);
        assert_eq!(s.jitter_ms, 0.0);
    }

    #[test]
    fn rtt_average_reflects_samples() {
        let mut m = Metrics::new();
        m.record_rtt(10.0);
        m.record_rtt(20.0);
        assert_eq!(m.summary().rtt_ms, 15.0);
    }

    #[test]
    fn jitter_accumulates_from_rtt_deltas() {
        let mut m = Metrics::new();
        m.record_rtt(10.0);
        assert_eq!(m.summary().jitter_ms, 0.0);
        m.record_rtt(50.0);
        assert!(m.summary().jitter_ms > 0.0);
    }

    #[test]
    fn sample_history_is_bounded() {
        let mut m = Metrics::new();
        for i in 0..(SAMPLE_HISTORY * 2) {
            m.record_tick_time(i as f64);
        }
        assert_eq!(m.tick_times_ms.len(), SAMPLE_HISTORY);
    }
}
