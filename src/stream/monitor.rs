use std::collections::VecDeque;
use std::time::{Duration, Instant};
#[derive(Clone, Copy, Debug)]
struct BatchRecord {
    at: Instant,
    samples: usize,
    bytes: usize,
    latency: Duration,
}
/// Rolling throughput / latency figures over the monitor window.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PerformanceSnapshot {
    pub batches_per_sec: f64,
    pub samples_per_sec: f64,
    pub bytes_per_sec: f64,
    pub mean_latency: Duration,
    pub max_latency: Duration,
    pub total_batches: u64,
    pub total_samples: u64,
    pub dropped_batches: u64,
    pub out_of_order_batches: u64,
    pub spectra_applied: u64,
    pub frames_rendered: u64,
}
/// Rolling counters shared by the time- and frequency-domain consumers.
/// Every recording method has an `_at` form taking the clock explicitly.
pub struct PerformanceMonitor {
    window: Duration,
    records: VecDeque<BatchRecord>,
    total_batches: u64,
    total_samples: u64,
    dropped_batches: u64,
    out_of_order_batches: u64,
    spectra_applied: u64,
    frames_rendered: u64,
    report_interval: Duration,
    last_report: Option<Instant>,
}
impl PerformanceMonitor {
    pub fn new(window: Duration, report_interval: Duration) -> Self {
        Self {
            window: window.max(Duration::from_millis(1)),
            records: VecDeque::new(),
            total_batches: 0,
            total_samples: 0,
            dropped_batches: 0,
            out_of_order_batches: 0,
            spectra_applied: 0,
            frames_rendered: 0,
            report_interval,
            last_report: None,
        }
    }
    pub fn record_batch_at(&mut self, at: Instant, samples: usize, bytes: usize, latency: Duration) {
        self.records.push_back(BatchRecord {
            at,
            samples,
            bytes,
            latency,
        });
        self.total_batches += 1;
        self.total_samples += samples as u64;
        self.prune(at);
    }
    pub fn record_drop(&mut self) {
        self.dropped_batches += 1;
    }
    pub fn record_out_of_order(&mut self) {
        self.out_of_order_batches += 1;
    }
    pub fn record_spectrum(&mut self) {
        self.spectra_applied += 1;
    }
    pub fn record_frame(&mut self) {
        self.frames_rendered += 1;
    }
    pub fn snapshot(&self) -> PerformanceSnapshot {
        self.snapshot_at(Instant::now())
    }
    pub fn snapshot_at(&self, now: Instant) -> PerformanceSnapshot {
        let recent: Vec<&BatchRecord> = self
            .records
            .iter()
            .filter(|r| now.saturating_duration_since(r.at) <= self.window)
            .collect();
        let secs = self.window.as_secs_f64();
        let count = recent.len();
        let samples: usize = recent.iter().map(|r| r.samples).sum();
        let bytes: usize = recent.iter().map(|r| r.bytes).sum();
        let latency_sum: Duration = recent.iter().map(|r| r.latency).sum();
        let max_latency = recent.iter().map(|r| r.latency).max().unwrap_or_default();
        PerformanceSnapshot {
            batches_per_sec: count as f64 / secs,
            samples_per_sec: samples as f64 / secs,
            bytes_per_sec: bytes as f64 / secs,
            mean_latency: if count == 0 {
                Duration::ZERO
            } else {
                latency_sum / count as u32
            },
            max_latency,
            total_batches: self.total_batches,
            total_samples: self.total_samples,
            dropped_batches: self.dropped_batches,
            out_of_order_batches: self.out_of_order_batches,
            spectra_applied: self.spectra_applied,
            frames_rendered: self.frames_rendered,
        }
    }
    /// True at most once per report interval; the first call arms the timer.
    pub fn should_report(&mut self, now: Instant) -> bool {
        match self.last_report {
            None => {
                self.last_report = Some(now);
                false
            }
            Some(last) if now.saturating_duration_since(last) >= self.report_interval => {
                self.last_report = Some(now);
                true
            }
            Some(_) => false,
        }
    }
    fn prune(&mut self, now: Instant) {
        while let Some(front) = self.records.front() {
            if now.saturating_duration_since(front.at) > self.window {
                self.records.pop_front();
            } else {
                break;
            }
        }
    }
}
/// Throttles "frame rendered" notifications to one per interval.
pub struct FramePacer {
    interval: Duration,
    last: Option<Instant>,
    suppressed: u64,
}
impl FramePacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
            suppressed: 0,
        }
    }
    pub fn ready(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.saturating_duration_since(last) < self.interval => {
                self.suppressed += 1;
                false
            }
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
    pub fn suppressed(&self) -> u64 {
        self.suppressed
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn rates_cover_only_the_rolling_window() {
        let mut monitor = PerformanceMonitor::new(Duration::from_secs(1), Duration::from_secs(5));
        let t0 = Instant::now();
        for i in 0..10u64 {
            monitor.record_batch_at(
                t0 + Duration::from_millis(100 * i),
                8,
                100,
                Duration::from_millis(i),
            );
        }
        let snap = monitor.snapshot_at(t0 + Duration::from_millis(900));
        assert_eq!(snap.batches_per_sec, 10.0);
        assert_eq!(snap.samples_per_sec, 80.0);
        assert_eq!(snap.bytes_per_sec, 1000.0);
        assert_eq!(snap.max_latency, Duration::from_millis(9));
        assert_eq!(snap.mean_latency, Duration::from_micros(4500));
        let later = monitor.snapshot_at(t0 + Duration::from_millis(1450));
        assert_eq!(later.batches_per_sec, 5.0);
        assert_eq!(later.total_batches, 10);
        assert_eq!(later.total_samples, 80);
        let idle = monitor.snapshot_at(t0 + Duration::from_secs(10));
        assert_eq!(idle.batches_per_sec, 0.0);
        assert_eq!(idle.mean_latency, Duration::ZERO);
    }
    #[test]
    fn counters_accumulate() {
        let mut monitor = PerformanceMonitor::new(Duration::from_secs(1), Duration::from_secs(5));
        monitor.record_drop();
        monitor.record_drop();
        monitor.record_out_of_order();
        monitor.record_spectrum();
        monitor.record_frame();
        let snap = monitor.snapshot();
        assert_eq!(snap.dropped_batches, 2);
        assert_eq!(snap.out_of_order_batches, 1);
        assert_eq!(snap.spectra_applied, 1);
        assert_eq!(snap.frames_rendered, 1);
    }
    #[test]
    fn reports_are_rate_limited() {
        let mut monitor = PerformanceMonitor::new(Duration::from_secs(1), Duration::from_secs(2));
        let t0 = Instant::now();
        assert!(!monitor.should_report(t0));
        assert!(!monitor.should_report(t0 + Duration::from_secs(1)));
        assert!(monitor.should_report(t0 + Duration::from_secs(2)));
        assert!(!monitor.should_report(t0 + Duration::from_secs(3)));
    }
    #[test]
    fn pacer_lets_one_frame_through_per_interval() {
        let mut pacer = FramePacer::new(Duration::from_millis(33));
        let t0 = Instant::now();
        assert!(pacer.ready(t0));
        assert!(!pacer.ready(t0 + Duration::from_millis(10)));
        assert!(!pacer.ready(t0 + Duration::from_millis(32)));
        assert!(pacer.ready(t0 + Duration::from_millis(33)));
        assert_eq!(pacer.suppressed(), 2);
    }
}
