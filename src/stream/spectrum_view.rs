use log::debug;
use crate::stream::spectrum::SpectrumEntry;
use crate::stream::wavefront::{band_height, channel_offset};
/// Frequency-domain display: `bin_count` points per channel, each channel
/// stacked in the same vertical band it has in the wavefront view.
///
/// A channel missing from a message keeps whatever it last showed.
pub struct SpectrumRenderState {
    bin_count: usize,
    reference_amplitude: f64,
    lines: Vec<Vec<f32>>,
    floors: Vec<f32>,
    half_span: f32,
    xs: Vec<f32>,
    updates: u64,
}
impl SpectrumRenderState {
    pub fn new(bin_count: usize, reference_amplitude: f64) -> Self {
        let bin_count = bin_count.max(1);
        let last = (bin_count - 1).max(1) as f32;
        let xs = (0..bin_count)
            .map(|i| if bin_count == 1 { 0.0 } else { -1.0 + 2.0 * i as f32 / last })
            .collect();
        Self {
            bin_count,
            reference_amplitude,
            lines: Vec::new(),
            floors: Vec::new(),
            half_span: 0.0,
            xs,
            updates: 0,
        }
    }
    pub fn bin_count(&self) -> usize {
        self.bin_count
    }
    pub fn channels(&self) -> usize {
        self.lines.len()
    }
    /// Number of `apply` calls that touched at least one channel.
    pub fn updates(&self) -> u64 {
        self.updates
    }
    /// Rebuilds every line at its band floor.
    pub fn configure(&mut self, channels: usize) {
        self.half_span = band_height(channels) * 0.4;
        self.floors = (0..channels)
            .map(|ch| channel_offset(ch, channels) - self.half_span)
            .collect();
        self.lines = self
            .floors
            .iter()
            .map(|&floor| vec![floor; self.bin_count])
            .collect();
    }
    pub fn teardown(&mut self) {
        self.lines = Vec::new();
        self.floors = Vec::new();
    }
    pub fn floor(&self, channel: usize) -> Option<f32> {
        self.floors.get(channel).copied()
    }
    pub fn line(&self, channel: usize) -> Option<&[f32]> {
        self.lines.get(channel).map(Vec::as_slice)
    }
    pub fn points(&self, channel: usize) -> Option<impl Iterator<Item = [f32; 2]> + '_> {
        let line = self.lines.get(channel)?;
        Some(self.xs.iter().zip(line).map(|(&x, &y)| [x, y]))
    }
    /// Returns how many channels were redrawn.
    pub fn apply(&mut self, entries: &[SpectrumEntry]) -> usize {
        let mut touched = 0;
        for entry in entries {
            let ch = entry.channel_index as usize;
            let Some(line) = self.lines.get_mut(ch) else {
                debug!(
                    "spectrum for channel {} ignored ({} channels configured)",
                    ch,
                    self.floors.len()
                );
                continue;
            };
            let floor = self.floors[ch];
            let span = 2.0 * self.half_span;
            for (i, y) in line.iter_mut().enumerate() {
                let magnitude = entry.spectrum.get(i).copied().unwrap_or(0.0);
                *y = floor + normalize(magnitude, self.reference_amplitude) * span;
            }
            touched += 1;
        }
        if touched > 0 {
            self.updates += 1;
        }
        touched
    }
}
fn normalize(magnitude: f64, reference: f64) -> f32 {
    if reference <= 0.0 || !magnitude.is_finite() {
        return 0.0;
    }
    (magnitude / reference).clamp(0.0, 1.0) as f32
}
