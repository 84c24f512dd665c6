use std::sync::Arc;
use rustfft::{num_complex::Complex32, Fft, FftPlanner};
use crate::stream::spectrum::SpectrumEntry;
/// Magnitude spectrum sampled at each integer frequency in `min_hz..=max_hz`.
pub struct SpectrumBuilder {
    fft_size: usize,
    sample_rate: f64,
    min_hz: u32,
    max_hz: u32,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    scratch: Vec<Complex32>,
}
impl SpectrumBuilder {
    pub fn new(fft_size: usize, sample_rate: f64, min_hz: u32, max_hz: u32) -> Self {
        let fft_size = fft_size.max(2);
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(fft_size);
        let denom = (fft_size - 1) as f32;
        let window = (0..fft_size)
            .map(|i| 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / denom).cos()))
            .collect();
        Self {
            fft_size,
            sample_rate,
            min_hz,
            max_hz: max_hz.max(min_hz),
            fft,
            window,
            scratch: vec![Complex32::ZERO; fft_size],
        }
    }
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }
    pub fn bin_count(&self) -> usize {
        (self.max_hz - self.min_hz + 1) as usize
    }
    pub fn frequencies(&self) -> Vec<f64> {
        (self.min_hz..=self.max_hz).map(f64::from).collect()
    }
    /// Hann-windowed FFT of the last `fft_size` samples (zero-padded in
    /// front when shorter).
    pub fn magnitudes(&mut self, samples: &[f32]) -> Vec<f64> {
        let take = samples.len().min(self.fft_size);
        let pad = self.fft_size - take;
        let tail = &samples[samples.len() - take..];
        for (i, slot) in self.scratch.iter_mut().enumerate() {
            let value = if i < pad { 0.0 } else { tail[i - pad] };
            *slot = Complex32::new(value * self.window[i], 0.0);
        }
        self.fft.process(&mut self.scratch);
        let resolution = self.sample_rate / self.fft_size as f64;
        let nyquist_bin = self.fft_size / 2;
        (self.min_hz..=self.max_hz)
            .map(|hz| {
                let bin = (f64::from(hz) / resolution).round() as usize;
                if bin < nyquist_bin {
                    (self.scratch[bin].norm() / self.fft_size as f32) as f64
                } else {
                    0.0
                }
            })
            .collect()
    }
    pub fn entry(&mut self, channel_index: u32, samples: &[f32], batch_id: Option<u64>) -> SpectrumEntry {
        SpectrumEntry {
            channel_index,
            spectrum: self.magnitudes(samples),
            frequency_bins: self.frequencies(),
            batch_id,
        }
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    fn tone(freq_hz: f64, sample_rate: f64, len: usize, amplitude: f32) -> Vec<f32> {
        (0..len)
            .map(|i| {
                amplitude * (2.0 * std::f64::consts::PI * freq_hz * i as f64 / sample_rate).sin() as f32
            })
            .collect()
    }
    #[test]
    fn pure_tone_peaks_at_its_frequency() {
        let mut builder = SpectrumBuilder::new(256, 256.0, 1, 50);
        assert_eq!(builder.bin_count(), 50);
        let spectrum = builder.magnitudes(&tone(10.0, 256.0, 256, 40.0));
        let (peak_idx, _) = spectrum
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .unwrap();
        assert_eq!(peak_idx + 1, 10);
        assert!(spectrum[9] > 5.0);
        assert!(spectrum[29] < spectrum[9] * 0.01);
    }
    #[test]
    fn frequencies_above_nyquist_read_zero() {
        let mut builder = SpectrumBuilder::new(64, 40.0, 1, 50);
        let spectrum = builder.magnitudes(&tone(5.0, 40.0, 64, 1.0));
        assert_eq!(spectrum.len(), 50);
        assert!(spectrum[25..].iter().all(|&m| m == 0.0));
        assert!(spectrum.iter().all(|m| m.is_finite() && *m >= 0.0));
    }
    #[test]
    fn short_input_is_padded_and_entry_carries_grid() {
        let mut builder = SpectrumBuilder::new(128, 250.0, 1, 50);
        let entry = builder.entry(3, &[1.0; 10], Some(42));
        assert_eq!(entry.channel_index, 3);
        assert_eq!(entry.batch_id, Some(42));
        assert_eq!(entry.spectrum.len(), entry.frequency_bins.len());
        assert_eq!(entry.frequency_bins[0], 1.0);
    }
}
