use std::collections::{HashMap, VecDeque};
use log::debug;
use crate::stream::frame::OwnedFrame;
use crate::stream::spectrum::{empty_entries, SpectrumEntry};
/// Time and frequency data that share a batch id. Either side may be missing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SyncedFrame {
    pub batch_id: u64,
    pub time: Option<OwnedFrame>,
    pub freq: Option<Vec<SpectrumEntry>>,
}
/// Bounded join of the two domains keyed by `batch_id`.
///
/// At most `retention` entries are pending; a new id beyond that evicts the
/// oldest inserted one (FIFO). Updating an existing id never evicts.
pub struct FrameSynchronizer {
    retention: usize,
    pending: HashMap<u64, SyncedFrame>,
    order: VecDeque<u64>,
    evicted: u64,
}
impl FrameSynchronizer {
    pub fn new(retention: usize) -> Self {
        let retention = retention.max(1);
        Self {
            retention,
            pending: HashMap::with_capacity(retention + 1),
            order: VecDeque::with_capacity(retention + 1),
            evicted: 0,
        }
    }
    pub fn len(&self) -> usize {
        self.pending.len()
    }
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
    pub fn evicted(&self) -> u64 {
        self.evicted
    }
    pub fn contains(&self, batch_id: u64) -> bool {
        self.pending.contains_key(&batch_id)
    }
    pub fn add_time_data(&mut self, frame: OwnedFrame) {
        let batch_id = frame.batch_id();
        self.entry(batch_id).time = Some(frame);
    }
    pub fn add_freq_data(&mut self, batch_id: u64, entries: Vec<SpectrumEntry>) {
        self.entry(batch_id).freq = Some(entries);
    }
    /// True once either domain has arrived for `batch_id`.
    pub fn is_complete(&self, batch_id: u64) -> bool {
        self.pending
            .get(&batch_id)
            .map(|f| f.time.is_some() || f.freq.is_some())
            .unwrap_or(false)
    }
    pub fn take(&mut self, batch_id: u64) -> Option<SyncedFrame> {
        let frame = self.pending.remove(&batch_id)?;
        self.order.retain(|&id| id != batch_id);
        Some(frame)
    }
    /// Releases the oldest pending batch that has time data. A missing
    /// spectrum is replaced by zeros on the `min_hz..=max_hz` grid.
    pub fn take_next(&mut self, min_hz: u32, max_hz: u32) -> Option<SyncedFrame> {
        let batch_id = self
            .order
            .iter()
            .copied()
            .find(|id| self.pending.get(id).map_or(false, |f| f.time.is_some()))?;
        let mut frame = self.take(batch_id)?;
        if frame.freq.is_none() {
            let channels = frame
                .time
                .as_ref()
                .map_or(0, |t| t.header.channels_count);
            frame.freq = Some(empty_entries(channels, min_hz, max_hz));
        }
        Some(frame)
    }
    fn entry(&mut self, batch_id: u64) -> &mut SyncedFrame {
        if !self.pending.contains_key(&batch_id) {
            while self.order.len() >= self.retention {
                if let Some(oldest) = self.order.pop_front() {
                    self.pending.remove(&oldest);
                    self.evicted += 1;
                    debug!("sync: evicted pending batch {oldest}");
                }
            }
            self.order.push_back(batch_id);
        }
        self.pending.entry(batch_id).or_insert_with(|| SyncedFrame {
            batch_id,
            ..SyncedFrame::default()
        })
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::frame::{decode_frame, encode_frame};
    fn owned(batch_id: u64) -> OwnedFrame {
        let bytes = encode_frame(batch_id, 0.0, 250.0, &[vec![1.0, 2.0], vec![3.0, 4.0]]);
        decode_frame(&bytes).unwrap().to_owned_frame()
    }
    #[test]
    fn third_batch_evicts_the_first_with_retention_two() {
        let mut sync = FrameSynchronizer::new(2);
        sync.add_time_data(owned(1));
        sync.add_time_data(owned(2));
        assert!(sync.contains(1));
        sync.add_time_data(owned(3));
        assert!(!sync.contains(1));
        assert!(!sync.is_complete(1));
        assert!(sync.is_complete(2));
        assert!(sync.is_complete(3));
        assert_eq!(sync.len(), 2);
        assert_eq!(sync.evicted(), 1);
    }
    #[test]
    fn either_domain_completes_a_batch() {
        let mut sync = FrameSynchronizer::new(4);
        assert!(!sync.is_complete(7));
        sync.add_freq_data(7, empty_entries(2, 1, 50));
        assert!(sync.is_complete(7));
        sync.add_time_data(owned(7));
        assert_eq!(sync.len(), 1);
        let frame = sync.take(7).unwrap();
        assert!(frame.time.is_some() && frame.freq.is_some());
        assert!(sync.is_empty());
        assert!(sync.take(7).is_none());
    }
    #[test]
    fn eviction_is_fifo_even_after_updates() {
        let mut sync = FrameSynchronizer::new(2);
        sync.add_time_data(owned(1));
        sync.add_time_data(owned(2));
        // Touching batch 1 again does not make it newer.
        sync.add_freq_data(1, Vec::new());
        sync.add_freq_data(3, Vec::new());
        assert!(!sync.contains(1));
        assert!(sync.contains(2) && sync.contains(3));
    }
    #[test]
    fn take_next_skips_spectrum_only_batches_and_fills_gaps() {
        let mut sync = FrameSynchronizer::new(8);
        sync.add_freq_data(4, Vec::new());
        sync.add_time_data(owned(5));
        sync.add_time_data(owned(6));
        let next = sync.take_next(1, 50).unwrap();
        assert_eq!(next.batch_id, 5);
        let freq = next.freq.unwrap();
        assert_eq!(freq.len(), 2);
        assert_eq!(freq[1].spectrum.len(), 50);
        assert_eq!(sync.take_next(1, 50).unwrap().batch_id, 6);
        assert!(sync.take_next(1, 50).is_none());
        assert!(sync.contains(4));
    }
}
