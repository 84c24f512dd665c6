use std::collections::VecDeque;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use crate::stream::error::StreamError;
use crate::stream::frame::encode_frame_into;
/// Something that yields encoded batches on demand.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Option<Vec<u8>>, StreamError>;
}
/// In-memory source useful for tests and deterministic playback.
pub struct ManualSource {
    queue: VecDeque<Vec<u8>>,
}
impl ManualSource {
    pub fn new(frames: impl IntoIterator<Item = Vec<u8>>) -> Self {
        Self {
            queue: frames.into_iter().collect(),
        }
    }
}
impl FrameSource for ManualSource {
    fn next_frame(&mut self) -> Result<Option<Vec<u8>>, StreamError> {
        Ok(self.queue.pop_front())
    }
}
/// EEG-like test signal: a per-channel alpha/beta sine mix plus Gaussian-ish
/// noise, encoded with consecutive batch ids.
pub struct SyntheticSource {
    channels: usize,
    sample_rate: f64,
    samples_per_batch: usize,
    next_batch_id: u64,
    sample_clock: u64,
    remaining: Option<u64>,
    rng: StdRng,
    lanes: Vec<Vec<f32>>,
}
impl SyntheticSource {
    pub fn new(channels: usize, sample_rate: f64, samples_per_batch: usize, seed: u64) -> Self {
        Self {
            channels,
            sample_rate,
            samples_per_batch,
            next_batch_id: 0,
            sample_clock: 0,
            remaining: None,
            rng: StdRng::seed_from_u64(seed),
            lanes: vec![Vec::with_capacity(samples_per_batch); channels],
        }
    }
    /// Stop after `batches` more frames.
    pub fn with_limit(mut self, batches: u64) -> Self {
        self.remaining = Some(batches);
        self
    }
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }
    fn fill_lanes(&mut self) {
        let start = self.sample_clock;
        for (ch, lane) in self.lanes.iter_mut().enumerate() {
            lane.clear();
            // Alpha band around 8-12 Hz, one channel in four carries beta.
            let alpha = 8.0 + (ch % 5) as f64;
            let beta = if ch % 4 == 3 { 20.0 } else { 0.0 };
            for i in 0..self.samples_per_batch {
                let t = (start + i as u64) as f64 / self.sample_rate;
                let mut value = 40.0 * (std::f64::consts::TAU * alpha * t).sin();
                if beta > 0.0 {
                    value += 15.0 * (std::f64::consts::TAU * beta * t).sin();
                }
                let noise: f64 = (0..3).map(|_| self.rng.gen_range(-4.0..4.0)).sum();
                lane.push((value + noise) as f32);
            }
        }
        self.sample_clock += self.samples_per_batch as u64;
    }
}
impl FrameSource for SyntheticSource {
    fn next_frame(&mut self) -> Result<Option<Vec<u8>>, StreamError> {
        if let Some(remaining) = self.remaining.as_mut() {
            if *remaining == 0 {
                return Ok(None);
            }
            *remaining -= 1;
        }
        self.fill_lanes();
        let timestamp = self.sample_clock as f64 / self.sample_rate;
        let mut out = Vec::new();
        encode_frame_into(&mut out, self.next_batch_id, timestamp, self.sample_rate, &self.lanes);
        self.next_batch_id += 1;
        Ok(Some(out))
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::frame::{decode_frame, validate_frame};
    #[test]
    fn manual_source_replays_in_order() {
        let mut source = ManualSource::new(vec![vec![1u8], vec![2u8]]);
        assert_eq!(source.next_frame().unwrap(), Some(vec![1u8]));
        assert_eq!(source.next_frame().unwrap(), Some(vec![2u8]));
        assert_eq!(source.next_frame().unwrap(), None);
    }
    #[test]
    fn synthetic_frames_are_valid_and_numbered() {
        let mut source = SyntheticSource::new(4, 250.0, 10, 1).with_limit(3);
        let mut ids = Vec::new();
        while let Some(bytes) = source.next_frame().unwrap() {
            assert!(validate_frame(&bytes).valid);
            let frame = decode_frame(&bytes).unwrap();
            assert_eq!(frame.header().channels_count, 4);
            assert_eq!(frame.samples_per_channel(), 10);
            assert!(frame.channels()[0]
                .samples
                .iter()
                .all(|v| v.is_finite() && v.abs() < 100.0));
            ids.push(frame.header().batch_id);
        }
        assert_eq!(ids, vec![0, 1, 2]);
    }
    #[test]
    fn same_seed_gives_same_stream() {
        let mut a = SyntheticSource::new(2, 100.0, 5, 9);
        let mut b = SyntheticSource::new(2, 100.0, 5, 9);
        assert_eq!(a.next_frame().unwrap(), b.next_frame().unwrap());
    }
}
