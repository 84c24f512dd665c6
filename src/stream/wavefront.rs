use std::collections::BTreeSet;
use log::{debug, info};
use crate::stream::error::StreamError;
use crate::stream::frame::Frame;
/// Vertical span one channel owns in normalized `[-1, 1]` display space.
/// Zero or one channel gets the whole range.
pub fn band_height(channels: usize) -> f32 {
    if channels <= 1 {
        2.0
    } else {
        2.0 / channels as f32
    }
}
/// Baseline (zero signal) of `channel`, counting bands from the top.
pub fn channel_offset(channel: usize, channels: usize) -> f32 {
    1.0 - (channel as f32 + 0.5) * band_height(channels)
}
/// Amplitude-to-display factor: a signal of `assumed_signal_range` fills 80%
/// of the band on each side of the baseline.
pub fn channel_scale(channels: usize, assumed_signal_range: f32) -> f32 {
    if assumed_signal_range <= 0.0 {
        return 0.0;
    }
    band_height(channels) * 0.8 / assumed_signal_range
}
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);
impl Rgb {
    fn mix(self, other: Rgb, amount: f32) -> Rgb {
        let lerp = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * amount).round() as u8;
        Rgb(lerp(self.0, other.0), lerp(self.1, other.1), lerp(self.2, other.2))
    }
}
pub const PALETTE: [Rgb; 8] = [
    Rgb(66, 135, 245),
    Rgb(245, 166, 35),
    Rgb(80, 200, 120),
    Rgb(235, 87, 87),
    Rgb(190, 120, 230),
    Rgb(170, 110, 80),
    Rgb(100, 80, 200),
    Rgb(240, 220, 70),
];
const BACKGROUND: Rgb = Rgb(10, 10, 10);
const WHITE: Rgb = Rgb(255, 255, 255);
/// Channel visibility and selection, owned by the application. The pipeline
/// only reads it, and every lookup is bounds-checked so the application may
/// resize it between batches.
#[derive(Clone, Debug, Default)]
pub struct ChannelSelection {
    pub visible: Vec<bool>,
    pub selected: BTreeSet<usize>,
}
impl ChannelSelection {
    pub fn all_visible(channels: usize) -> Self {
        Self {
            visible: vec![true; channels],
            selected: BTreeSet::new(),
        }
    }
    /// Channels without an entry count as visible.
    pub fn is_visible(&self, channel: usize) -> bool {
        self.visible.get(channel).copied().unwrap_or(true)
    }
    pub fn is_selected(&self, channel: usize) -> bool {
        self.selected.contains(&channel)
    }
    pub fn has_selection(&self) -> bool {
        !self.selected.is_empty()
    }
    pub fn resize(&mut self, channels: usize) {
        self.visible.resize(channels, true);
        self.selected.retain(|&ch| ch < channels);
    }
}
/// Color for a channel's line this draw. Selected channels are lifted toward
/// white; the rest fade toward the background while anything is selected.
pub fn line_color(channel: usize, selection: &ChannelSelection) -> Rgb {
    let base = PALETTE[channel % PALETTE.len()];
    if selection.is_selected(channel) {
        base.mix(WHITE, 0.4)
    } else if selection.has_selection() {
        base.mix(BACKGROUND, 0.55)
    } else {
        base
    }
}
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderPhase {
    Uninitialized,
    Ready,
    Reinitializing,
}
/// Scrolling time-domain display: one fixed-length line per channel and a
/// single cursor (the wavefront) shared by every channel.
pub struct WavefrontRenderState {
    phase: RenderPhase,
    display_seconds: f64,
    assumed_signal_range: f32,
    channels: usize,
    sample_rate: f64,
    display_points: usize,
    cursor: usize,
    lines: Vec<Vec<f32>>,
    offsets: Vec<f32>,
    scale: f32,
    xs: Vec<f32>,
}
impl WavefrontRenderState {
    pub fn new(display_seconds: f64, assumed_signal_range: f32) -> Self {
        Self {
            phase: RenderPhase::Uninitialized,
            display_seconds,
            assumed_signal_range,
            channels: 0,
            sample_rate: 0.0,
            display_points: 0,
            cursor: 0,
            lines: Vec::new(),
            offsets: Vec::new(),
            scale: 0.0,
            xs: Vec::new(),
        }
    }
    pub fn phase(&self) -> RenderPhase {
        self.phase
    }
    pub fn channels(&self) -> usize {
        self.channels
    }
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }
    pub fn display_points(&self) -> usize {
        self.display_points
    }
    pub fn cursor(&self) -> usize {
        self.cursor
    }
    pub fn scale(&self) -> f32 {
        self.scale
    }
    pub fn offset(&self, channel: usize) -> Option<f32> {
        self.offsets.get(channel).copied()
    }
    pub fn line(&self, channel: usize) -> Option<&[f32]> {
        self.lines.get(channel).map(Vec::as_slice)
    }
    /// `[x, y]` pairs for one channel, `x` spread over `[-1, 1]`.
    pub fn points(&self, channel: usize) -> Option<impl Iterator<Item = [f32; 2]> + '_> {
        let line = self.lines.get(channel)?;
        Some(self.xs.iter().zip(line).map(|(&x, &y)| [x, y]))
    }
    /// Allocates lines for a stream. Returns `true` when anything was rebuilt.
    /// Zero channels leaves the state uninitialized.
    pub fn configure(&mut self, channels: usize, sample_rate: f64) -> Result<bool, StreamError> {
        if !(sample_rate > 0.0) || !sample_rate.is_finite() {
            return Err(StreamError::InvalidSampleRate);
        }
        if self.phase == RenderPhase::Ready
            && channels == self.channels
            && sample_rate == self.sample_rate
        {
            return Ok(false);
        }
        self.channels = channels;
        self.sample_rate = sample_rate;
        self.rebuild();
        Ok(true)
    }
    /// Changes how many seconds the display spans; rebuilds when ready.
    pub fn set_display_seconds(&mut self, seconds: f64) {
        let seconds = seconds.max(0.1);
        if seconds == self.display_seconds {
            return;
        }
        self.display_seconds = seconds;
        if self.phase == RenderPhase::Ready {
            self.rebuild();
        }
    }
    pub fn set_assumed_signal_range(&mut self, range: f32) {
        self.assumed_signal_range = range;
        self.scale = channel_scale(self.channels, range);
    }
    /// Releases the lines. Later `advance` calls are no-ops until the next
    /// `configure`.
    pub fn teardown(&mut self) {
        self.phase = RenderPhase::Uninitialized;
        self.lines = Vec::new();
        self.offsets = Vec::new();
        self.xs = Vec::new();
        self.cursor = 0;
        self.channels = 0;
        self.sample_rate = 0.0;
    }
    /// Writes one batch at the cursor and moves the cursor once by
    /// `samples_per_channel`. Hidden channels get their baseline instead of
    /// samples. Returns `false` (and changes nothing) when not ready.
    pub fn advance(&mut self, frame: &Frame<'_>, selection: &ChannelSelection) -> bool {
        if self.phase != RenderPhase::Ready || self.lines.is_empty() {
            debug!(
                "wavefront not ready ({:?}); batch {} ignored",
                self.phase,
                frame.header().batch_id
            );
            return false;
        }
        let n = self.display_points;
        let m = frame.samples_per_channel();
        // Only the last `n` samples of an oversized batch survive on screen.
        let skip = m.saturating_sub(n);
        let first_pos = (self.cursor + skip % n) % n;
        for block in frame.channels() {
            let ch = block.index as usize;
            let Some(line) = self.lines.get_mut(ch) else {
                continue;
            };
            let baseline = self.offsets[ch];
            let mut pos = first_pos;
            if selection.is_visible(ch) {
                for sample in block.samples.iter().skip(skip) {
                    line[pos] = baseline + sample * self.scale;
                    pos = if pos + 1 == n { 0 } else { pos + 1 };
                }
            } else {
                for _ in skip..block.samples.len() {
                    line[pos] = baseline;
                    pos = if pos + 1 == n { 0 } else { pos + 1 };
                }
            }
        }
        self.cursor = (self.cursor + m % n) % n;
        true
    }
    fn rebuild(&mut self) {
        let was_ready = self.phase == RenderPhase::Ready;
        if was_ready {
            self.phase = RenderPhase::Reinitializing;
        }
        if self.channels == 0 {
            self.teardown();
            return;
        }
        self.display_points = ((self.sample_rate * self.display_seconds).ceil() as usize).max(1);
        self.cursor = 0;
        self.offsets = (0..self.channels)
            .map(|ch| channel_offset(ch, self.channels))
            .collect();
        self.scale = channel_scale(self.channels, self.assumed_signal_range);
        self.lines = self
            .offsets
            .iter()
            .map(|&baseline| vec![baseline; self.display_points])
            .collect();
        let last = (self.display_points - 1).max(1) as f32;
        self.xs = (0..self.display_points)
            .map(|i| {
                if self.display_points == 1 {
                    0.0
                } else {
                    -1.0 + 2.0 * i as f32 / last
                }
            })
            .collect();
        self.phase = RenderPhase::Ready;
        info!(
            "wavefront {}: {} channels @ {} Hz, {} display points",
            if was_ready { "reinitialized" } else { "initialized" },
            self.channels,
            self.sample_rate,
            self.display_points
        );
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::frame::{decode_frame, encode_frame};
    fn make_frame(batch_id: u64, lanes: &[Vec<f32>]) -> Vec<u8> {
        encode_frame(batch_id, 0.0, 100.0, lanes)
    }
    fn ready_state(channels: usize, display_seconds: f64) -> WavefrontRenderState {
        let mut state = WavefrontRenderState::new(display_seconds, 100.0);
        state.configure(channels, 100.0).unwrap();
        state
    }
    #[test]
    fn layout_handles_degenerate_channel_counts() {
        assert_eq!(channel_offset(0, 0), 0.0);
        assert_eq!(channel_offset(0, 1), 0.0);
        assert_eq!(band_height(1), 2.0);
        assert!((channel_offset(0, 4) - 0.75).abs() < 1e-6);
        assert!((channel_offset(3, 4) + 0.75).abs() < 1e-6);
        assert!((channel_scale(2, 100.0) - 0.008).abs() < 1e-7);
        assert_eq!(channel_scale(2, 0.0), 0.0);
        assert!(channel_scale(0, 50.0).is_finite());
    }
    #[test]
    fn signal_range_rescales_later_samples() {
        let mut state = ready_state(2, 1.0);
        assert!((state.scale() - channel_scale(2, 100.0)).abs() < 1e-7);
        state.set_assumed_signal_range(50.0);
        assert!((state.scale() - channel_scale(2, 50.0)).abs() < 1e-7);
        let bytes = make_frame(0, &[vec![25.0; 4], vec![-25.0; 4]]);
        let selection = ChannelSelection::all_visible(2);
        assert!(state.advance(&decode_frame(&bytes).unwrap(), &selection));
        // Half the assumed range reaches 40% of the band.
        let top = state.line(0).unwrap()[0];
        assert!((top - (channel_offset(0, 2) + band_height(2) * 0.4)).abs() < 1e-5);
        let bottom = state.line(1).unwrap()[0];
        assert!((bottom - (channel_offset(1, 2) - band_height(2) * 0.4)).abs() < 1e-5);
    }
    #[test]
    fn cursor_advances_once_per_batch_regardless_of_channels_or_visibility() {
        let mut state = ready_state(3, 0.1); // 10 display points
        assert_eq!(state.display_points(), 10);
        let mut selection = ChannelSelection::all_visible(3);
        selection.visible[1] = false;
        let mut expected = 0;
        for (i, m) in [1usize, 4, 9, 10, 23, 0, 7].into_iter().enumerate() {
            let lanes = vec![vec![1.0; m]; 3];
            let bytes = make_frame(i as u64, &lanes);
            let frame = decode_frame(&bytes).unwrap();
            assert!(state.advance(&frame, &selection));
            expected = (expected + m) % 10;
            assert_eq!(state.cursor(), expected, "after batch of {m}");
        }
        let single = make_frame(99, &[vec![0.0; 3]]);
        let mut one_channel = ready_state(1, 0.1);
        one_channel.advance(&decode_frame(&single).unwrap(), &selection);
        assert_eq!(one_channel.cursor(), 3);
    }
    #[test]
    fn visible_channels_write_scaled_samples_with_wraparound() {
        let mut state = ready_state(2, 0.05); // 5 display points
        let selection = ChannelSelection::all_visible(2);
        let first = make_frame(1, &[vec![0.0; 3], vec![0.0; 3]]);
        state.advance(&decode_frame(&first).unwrap(), &selection);
        let second = make_frame(2, &[vec![10.0, 20.0, 30.0, 40.0], vec![-10.0; 4]]);
        state.advance(&decode_frame(&second).unwrap(), &selection);
        let offset = state.offset(0).unwrap();
        let scale = state.scale();
        let line = state.line(0).unwrap();
        assert_eq!(line[3], offset + 10.0 * scale);
        assert_eq!(line[4], offset + 20.0 * scale);
        assert_eq!(line[0], offset + 30.0 * scale);
        assert_eq!(line[1], offset + 40.0 * scale);
        assert_eq!(line[2], offset);
        assert_eq!(state.cursor(), 2);
    }
    #[test]
    fn hidden_channels_only_ever_show_their_baseline() {
        let mut state = ready_state(2, 0.05);
        let visible = ChannelSelection::all_visible(2);
        let bytes = make_frame(1, &[vec![50.0; 5], vec![80.0; 5]]);
        state.advance(&decode_frame(&bytes).unwrap(), &visible);
        let mut hidden = ChannelSelection::all_visible(2);
        hidden.visible[1] = false;
        let bytes = make_frame(2, &[vec![60.0; 7], vec![90.0; 7]]);
        state.advance(&decode_frame(&bytes).unwrap(), &hidden);
        let baseline = state.offset(1).unwrap();
        assert!(state.line(1).unwrap().iter().all(|&y| y == baseline));
        assert!(state.line(0).unwrap().iter().all(|&y| y != state.offset(0).unwrap()));
    }
    #[test]
    fn short_visibility_array_is_tolerated() {
        let mut state = ready_state(3, 0.05);
        let selection = ChannelSelection {
            visible: vec![false],
            selected: BTreeSet::new(),
        };
        let bytes = make_frame(1, &[vec![5.0; 2], vec![5.0; 2], vec![5.0; 2]]);
        assert!(state.advance(&decode_frame(&bytes).unwrap(), &selection));
        assert_eq!(state.line(0).unwrap()[0], state.offset(0).unwrap());
        assert_ne!(state.line(2).unwrap()[0], state.offset(2).unwrap());
    }
    #[test]
    fn advance_before_configure_or_after_teardown_is_a_no_op() {
        let bytes = make_frame(1, &[vec![1.0; 4]]);
        let frame = decode_frame(&bytes).unwrap();
        let selection = ChannelSelection::default();
        let mut state = WavefrontRenderState::new(1.0, 100.0);
        assert_eq!(state.phase(), RenderPhase::Uninitialized);
        assert!(!state.advance(&frame, &selection));
        state.configure(1, 100.0).unwrap();
        assert!(state.advance(&frame, &selection));
        state.teardown();
        assert!(!state.advance(&frame, &selection));
        assert_eq!(state.cursor(), 0);
        assert!(state.line(0).is_none());
        state.configure(0, 100.0).unwrap();
        assert_eq!(state.phase(), RenderPhase::Uninitialized);
    }
    #[test]
    fn config_changes_rebuild_and_reset_the_cursor() {
        let mut state = ready_state(2, 0.1);
        let selection = ChannelSelection::all_visible(2);
        let bytes = make_frame(1, &[vec![1.0; 4], vec![1.0; 4]]);
        state.advance(&decode_frame(&bytes).unwrap(), &selection);
        assert_eq!(state.cursor(), 4);
        assert!(!state.configure(2, 100.0).unwrap());
        assert_eq!(state.cursor(), 4);
        assert!(state.configure(4, 100.0).unwrap());
        assert_eq!(state.phase(), RenderPhase::Ready);
        assert_eq!(state.cursor(), 0);
        assert_eq!(state.channels(), 4);
        assert!(state.configure(4, 200.0).unwrap());
        assert_eq!(state.display_points(), 20);
        state.set_display_seconds(0.5);
        assert_eq!(state.display_points(), 100);
        assert_eq!(state.cursor(), 0);
        assert!(state.configure(1, -5.0).is_err());
    }
    #[test]
    fn points_span_the_normalized_width() {
        let state = ready_state(1, 0.05);
        let points: Vec<[f32; 2]> = state.points(0).unwrap().collect();
        assert_eq!(points.len(), 5);
        assert_eq!(points[0][0], -1.0);
        assert_eq!(points[4][0], 1.0);
        assert!(points.iter().all(|p| p[1] == 0.0));
    }
    #[test]
    fn selection_recolors_without_touching_samples() {
        let mut state = ready_state(2, 0.05);
        let bytes = make_frame(1, &[vec![3.0; 5], vec![4.0; 5]]);
        let mut selection = ChannelSelection::all_visible(2);
        state.advance(&decode_frame(&bytes).unwrap(), &selection);
        let before = state.line(0).unwrap().to_vec();
        assert_eq!(line_color(0, &selection), PALETTE[0]);
        selection.selected.insert(1);
        let highlighted = line_color(1, &selection);
        let dimmed = line_color(0, &selection);
        assert_ne!(highlighted, PALETTE[1]);
        assert!(dimmed.0 <= PALETTE[0].0 && dimmed.2 <= PALETTE[0].2);
        assert_eq!(state.line(0).unwrap(), before.as_slice());
        selection.resize(1);
        assert!(!selection.has_selection());
    }
}
