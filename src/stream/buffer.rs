use crate::stream::error::StreamError;
use crate::stream::frame::Frame;
/// Most recent `count` samples of one lane, oldest first, borrowed in place.
///
/// `start_index` is the lane position of the oldest sample. When the window
/// crosses the end of the lane, `older` runs to the end and `newer` continues
/// from position 0; otherwise `newer` is empty. Callers that need one
/// contiguous slice ask for [`WindowView::to_vec`] explicitly.
#[derive(Clone, Copy, Debug)]
pub struct WindowView<'a> {
    pub start_index: usize,
    pub older: &'a [f32],
    pub newer: &'a [f32],
}
impl<'a> WindowView<'a> {
    pub fn len(&self) -> usize {
        self.older.len() + self.newer.len()
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    pub fn is_wrapped(&self) -> bool {
        !self.newer.is_empty()
    }
    pub fn get(&self, index: usize) -> Option<f32> {
        if index < self.older.len() {
            Some(self.older[index])
        } else {
            self.newer.get(index - self.older.len()).copied()
        }
    }
    pub fn iter(&self) -> impl Iterator<Item = f32> + 'a {
        self.older.iter().chain(self.newer.iter()).copied()
    }
    pub fn to_vec(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.len());
        out.extend_from_slice(self.older);
        out.extend_from_slice(self.newer);
        out
    }
}
/// Fixed-capacity circular store, one lane per channel, one shared write head.
pub struct ChannelRingBuffer {
    lanes: Vec<Vec<f32>>,
    sample_rate: f64,
    capacity: usize,
    head: usize,
    filled: usize,
    total_written: u64,
}
impl ChannelRingBuffer {
    pub fn with_history_seconds(
        channels: usize,
        sample_rate: f64,
        history_seconds: f64,
    ) -> Result<Self, StreamError> {
        if !(sample_rate > 0.0) || !sample_rate.is_finite() {
            return Err(StreamError::InvalidSampleRate);
        }
        if !(history_seconds > 0.0) {
            return Err(StreamError::InvalidConfig(format!(
                "ring window must be positive, got {history_seconds}s"
            )));
        }
        let capacity = ((sample_rate * history_seconds).ceil() as usize).max(1);
        Ok(Self {
            lanes: vec![vec![0.0; capacity]; channels],
            sample_rate,
            capacity,
            head: 0,
            filled: 0,
            total_written: 0,
        })
    }
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }
    pub fn channels(&self) -> usize {
        self.lanes.len()
    }
    pub fn capacity(&self) -> usize {
        self.capacity
    }
    /// Lane position the next sample slot will be written to.
    pub fn head(&self) -> usize {
        self.head
    }
    /// Number of valid slots, saturating at capacity.
    pub fn filled(&self) -> usize {
        self.filled
    }
    pub fn total_written(&self) -> u64 {
        self.total_written
    }
    /// Writes `samples_per_channel` slots. Lanes the frame does not carry get
    /// zeros for those slots.
    pub fn ingest_batch(&mut self, frame: &Frame<'_>) -> Result<(), StreamError> {
        let header = frame.header();
        if header.channels_count as usize != self.lanes.len() || header.sample_rate != self.sample_rate
        {
            return Err(StreamError::ConfigMismatch {
                expected_channels: self.lanes.len(),
                expected_rate: self.sample_rate,
                actual_channels: header.channels_count as usize,
                actual_rate: header.sample_rate,
            });
        }
        let slots = frame.samples_per_channel();
        let mut touched = vec![false; self.lanes.len()];
        for block in frame.channels() {
            let lane_idx = block.index as usize;
            if let Some(lane) = self.lanes.get_mut(lane_idx) {
                write_lane(lane, self.head, block.samples.iter());
                touched[lane_idx] = true;
            }
        }
        for (lane, _) in self.lanes.iter_mut().zip(&touched).filter(|(_, t)| !**t) {
            write_lane(lane, self.head, std::iter::repeat(0.0).take(slots));
        }
        self.advance_head(slots);
        Ok(())
    }
    /// Owned-data variant of [`ingest_batch`](Self::ingest_batch); `per_channel[i]`
    /// feeds lane `i`. Fewer channels than lanes is fine, more is a mismatch.
    pub fn ingest_slices<S: AsRef<[f32]>>(&mut self, per_channel: &[S]) -> Result<(), StreamError> {
        if per_channel.len() > self.lanes.len() {
            return Err(StreamError::ConfigMismatch {
                expected_channels: self.lanes.len(),
                expected_rate: self.sample_rate,
                actual_channels: per_channel.len(),
                actual_rate: self.sample_rate,
            });
        }
        let slots = per_channel
            .iter()
            .map(|c| c.as_ref().len())
            .max()
            .unwrap_or(0);
        for (idx, lane) in self.lanes.iter_mut().enumerate() {
            let given = per_channel.get(idx).map(|c| c.as_ref()).unwrap_or(&[]);
            let padded = given
                .iter()
                .copied()
                .chain(std::iter::repeat(0.0))
                .take(slots);
            write_lane(lane, self.head, padded);
        }
        self.advance_head(slots);
        Ok(())
    }
    pub fn read_window(&self, channel: usize, count: usize) -> Option<WindowView<'_>> {
        let lane = self.lanes.get(channel)?;
        let count = count.min(self.filled);
        let start_index = (self.head + self.capacity - count) % self.capacity;
        let view = if start_index + count <= self.capacity {
            WindowView {
                start_index,
                older: &lane[start_index..start_index + count],
                newer: &[],
            }
        } else {
            WindowView {
                start_index,
                older: &lane[start_index..],
                newer: &lane[..self.head],
            }
        };
        Some(view)
    }
    fn advance_head(&mut self, slots: usize) {
        self.head = (self.head + slots % self.capacity) % self.capacity;
        self.filled = (self.filled + slots).min(self.capacity);
        self.total_written += slots as u64;
    }
}
fn write_lane(lane: &mut [f32], head: usize, values: impl Iterator<Item = f32>) {
    let capacity = lane.len();
    let mut pos = head;
    for value in values {
        lane[pos] = value;
        pos += 1;
        if pos == capacity {
            pos = 0;
        }
    }
}
