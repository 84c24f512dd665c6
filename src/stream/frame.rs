//! Binary batch codec.
//!
//! Layout (all little-endian):
//!
//! ```text
//! 0   u64 batch_id
//! 8   f64 timestamp (seconds)
//! 16  u32 channels_count
//! 20  u32 samples_per_channel
//! 24  f64 sample_rate (Hz)
//! 32  channels_count x { u32 channel_index, samples_per_channel x f32 }
//! ```
//!
//! Decoding never copies sample data: each channel run is a [`SampleView`]
//! over the caller's buffer.
use crate::stream::error::{DecodeError, ValidationError};
pub const HEADER_LEN: usize = 32;
const INDEX_LEN: usize = 4;
const SAMPLE_LEN: usize = 4;
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameHeader {
    pub batch_id: u64,
    pub timestamp: f64,
    pub channels_count: u32,
    pub samples_per_channel: u32,
    pub sample_rate: f64,
}
impl FrameHeader {
    /// Bytes taken by one channel block (index + samples).
    pub fn block_len(&self) -> usize {
        INDEX_LEN + SAMPLE_LEN * self.samples_per_channel as usize
    }
    /// Total frame size declared by this header.
    pub fn frame_len(&self) -> usize {
        (self.channels_count as usize)
            .saturating_mul(self.block_len())
            .saturating_add(HEADER_LEN)
    }
    fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.batch_id.to_le_bytes());
        out.extend_from_slice(&self.timestamp.to_le_bytes());
        out.extend_from_slice(&self.channels_count.to_le_bytes());
        out.extend_from_slice(&self.samples_per_channel.to_le_bytes());
        out.extend_from_slice(&self.sample_rate.to_le_bytes());
    }
}
/// Borrowed run of little-endian `f32` samples.
#[derive(Clone, Copy, Debug)]
pub struct SampleView<'a> {
    bytes: &'a [u8],
}
impl<'a> SampleView<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        debug_assert_eq!(bytes.len() % SAMPLE_LEN, 0);
        Self { bytes }
    }
    pub fn len(&self) -> usize {
        self.bytes.len() / SAMPLE_LEN
    }
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
    pub fn get(&self, index: usize) -> Option<f32> {
        let start = index.checked_mul(SAMPLE_LEN)?;
        let raw = self.bytes.get(start..start.checked_add(SAMPLE_LEN)?)?;
        Some(read_f32(raw))
    }
    pub fn iter(&self) -> impl ExactSizeIterator<Item = f32> + 'a {
        self.bytes.chunks_exact(SAMPLE_LEN).map(read_f32)
    }
    /// The underlying bytes, still pointing into the decoded buffer.
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }
    pub fn to_vec(&self) -> Vec<f32> {
        self.iter().collect()
    }
}
#[derive(Clone, Copy, Debug)]
pub struct ChannelBlock<'a> {
    pub index: u32,
    pub samples: SampleView<'a>,
}
/// Decoded frame borrowing its sample data from the wire buffer.
#[derive(Clone, Debug)]
pub struct Frame<'a> {
    header: FrameHeader,
    channels: Vec<ChannelBlock<'a>>,
    truncated: bool,
}
impl<'a> Frame<'a> {
    pub fn header(&self) -> &FrameHeader {
        &self.header
    }
    pub fn channels(&self) -> &[ChannelBlock<'a>] {
        &self.channels
    }
    pub fn channel(&self, index: u32) -> Option<&ChannelBlock<'a>> {
        self.channels.iter().find(|block| block.index == index)
    }
    /// True when the buffer ended before every declared channel block.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }
    pub fn samples_per_channel(&self) -> usize {
        self.header.samples_per_channel as usize
    }
    /// Copies the sample data out so it can outlive the wire buffer.
    pub fn to_owned_frame(&self) -> OwnedFrame {
        OwnedFrame {
            header: self.header,
            channels: self
                .channels
                .iter()
                .map(|block| (block.index, block.samples.to_vec()))
                .collect(),
        }
    }
    /// Samples laid out by channel index, `channels_count` lanes.
    pub fn to_lanes(&self) -> Vec<Vec<f32>> {
        let mut lanes = vec![Vec::new(); self.header.channels_count as usize];
        for block in &self.channels {
            if let Some(lane) = lanes.get_mut(block.index as usize) {
                *lane = block.samples.to_vec();
            }
        }
        lanes
    }
}
/// Frame detached from its wire buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct OwnedFrame {
    pub header: FrameHeader,
    pub channels: Vec<(u32, Vec<f32>)>,
}
impl OwnedFrame {
    pub fn batch_id(&self) -> u64 {
        self.header.batch_id
    }
    pub fn channel(&self, index: u32) -> Option<&[f32]> {
        self.channels
            .iter()
            .find(|(idx, _)| *idx == index)
            .map(|(_, samples)| samples.as_slice())
    }
}
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameValidation {
    pub valid: bool,
    pub expected_size: usize,
    pub actual_size: usize,
}
impl FrameValidation {
    pub fn into_result(self) -> Result<(), ValidationError> {
        if self.valid {
            Ok(())
        } else {
            Err(ValidationError::SizeMismatch {
                expected: self.expected_size,
                actual: self.actual_size,
            })
        }
    }
}
pub fn decode_header(buffer: &[u8]) -> Result<FrameHeader, DecodeError> {
    if buffer.len() < HEADER_LEN {
        return Err(DecodeError::TooShort {
            needed: HEADER_LEN,
            actual: buffer.len(),
        });
    }
    Ok(FrameHeader {
        batch_id: read_u64(&buffer[0..8]),
        timestamp: read_f64(&buffer[8..16]),
        channels_count: read_u32(&buffer[16..20]),
        samples_per_channel: read_u32(&buffer[20..24]),
        sample_rate: read_f64(&buffer[24..32]),
    })
}
/// Strict decode: a frame missing any declared channel block is an error.
pub fn decode_frame(buffer: &[u8]) -> Result<Frame<'_>, DecodeError> {
    let frame = decode_frame_partial(buffer)?;
    if frame.truncated {
        return Err(DecodeError::Truncated {
            expected: frame.header.frame_len(),
            actual: buffer.len(),
            parsed_channels: frame.channels.len(),
        });
    }
    Ok(frame)
}
/// Decodes as many whole channel blocks as the buffer holds. Check
/// [`Frame::is_truncated`] before treating the result as a complete batch.
pub fn decode_frame_partial(buffer: &[u8]) -> Result<Frame<'_>, DecodeError> {
    let header = decode_header(buffer)?;
    let block_len = header.block_len();
    let whole_blocks = (buffer.len() - HEADER_LEN) / block_len;
    let mut channels = Vec::with_capacity(whole_blocks.min(header.channels_count as usize));
    let mut truncated = false;
    let mut offset = HEADER_LEN;
    for _ in 0..header.channels_count {
        let Some(block) = buffer.get(offset..offset.saturating_add(block_len)) else {
            truncated = true;
            break;
        };
        let index = read_u32(&block[..INDEX_LEN]);
        if index >= header.channels_count {
            return Err(DecodeError::ChannelOutOfRange {
                index,
                channels: header.channels_count,
            });
        }
        channels.push(ChannelBlock {
            index,
            samples: SampleView::new(&block[INDEX_LEN..]),
        });
        offset += block_len;
    }
    Ok(Frame {
        header,
        channels,
        truncated,
    })
}
/// Fast path to one channel's samples by stride arithmetic, assuming blocks
/// are written in channel order.
pub fn extract_channel(buffer: &[u8], channel: usize) -> Option<SampleView<'_>> {
    let header = decode_header(buffer).ok()?;
    if channel >= header.channels_count as usize {
        return None;
    }
    let start = channel
        .checked_mul(header.block_len())?
        .checked_add(HEADER_LEN + INDEX_LEN)?;
    let end = start.checked_add(header.block_len() - INDEX_LEN)?;
    buffer.get(start..end).map(SampleView::new)
}
pub fn validate_frame(buffer: &[u8]) -> FrameValidation {
    let expected_size = match decode_header(buffer) {
        Ok(header) => header.frame_len(),
        Err(_) => HEADER_LEN,
    };
    FrameValidation {
        valid: buffer.len() == expected_size,
        expected_size,
        actual_size: buffer.len(),
    }
}
/// Encodes one batch. `lanes[i]` becomes channel `i`; shorter lanes are
/// zero-padded to the longest.
pub fn encode_frame<S: AsRef<[f32]>>(
    batch_id: u64,
    timestamp: f64,
    sample_rate: f64,
    lanes: &[S],
) -> Vec<u8> {
    let mut out = Vec::new();
    encode_frame_into(&mut out, batch_id, timestamp, sample_rate, lanes);
    out
}
pub fn encode_frame_into<S: AsRef<[f32]>>(
    out: &mut Vec<u8>,
    batch_id: u64,
    timestamp: f64,
    sample_rate: f64,
    lanes: &[S],
) {
    let samples_per_channel = lanes.iter().map(|l| l.as_ref().len()).max().unwrap_or(0);
    let header = FrameHeader {
        batch_id,
        timestamp,
        channels_count: lanes.len() as u32,
        samples_per_channel: samples_per_channel as u32,
        sample_rate,
    };
    out.clear();
    out.reserve(header.frame_len());
    header.write_to(out);
    for (index, lane) in lanes.iter().enumerate() {
        let lane = lane.as_ref();
        out.extend_from_slice(&(index as u32).to_le_bytes());
        for &sample in lane {
            out.extend_from_slice(&sample.to_le_bytes());
        }
        for _ in lane.len()..samples_per_channel {
            out.extend_from_slice(&0f32.to_le_bytes());
        }
    }
}
fn read_u32(raw: &[u8]) -> u32 {
    u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]])
}
fn read_f32(raw: &[u8]) -> f32 {
    f32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]])
}
fn read_u64(raw: &[u8]) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&raw[..8]);
    u64::from_le_bytes(bytes)
}
fn read_f64(raw: &[u8]) -> f64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&raw[..8]);
    f64::from_le_bytes(bytes)
}
