use serde::{Deserialize, Serialize};
use crate::stream::error::DecodeError;
/// One channel's magnitude spectrum as sent by the producer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpectrumEntry {
    pub channel_index: u32,
    pub spectrum: Vec<f64>,
    pub frequency_bins: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<u64>,
}
impl SpectrumEntry {
    pub fn len(&self) -> usize {
        self.spectrum.len()
    }
    pub fn is_empty(&self) -> bool {
        self.spectrum.is_empty()
    }
    fn validate(&self) -> Result<(), DecodeError> {
        if self.spectrum.len() != self.frequency_bins.len() {
            return Err(DecodeError::SpectrumLengthMismatch {
                channel: self.channel_index,
                spectrum: self.spectrum.len(),
                bins: self.frequency_bins.len(),
            });
        }
        if let Some((bin, &value)) = self
            .spectrum
            .iter()
            .enumerate()
            .find(|(_, v)| !v.is_finite() || **v < 0.0)
        {
            return Err(DecodeError::InvalidMagnitude {
                channel: self.channel_index,
                bin,
                value,
            });
        }
        Ok(())
    }
}
/// Parses a spectrum message (JSON array of entries) and checks every entry.
/// Channel order is whatever the producer sent.
pub fn decode(message: &str) -> Result<Vec<SpectrumEntry>, DecodeError> {
    let entries: Vec<SpectrumEntry> = serde_json::from_str(message.trim())?;
    for entry in &entries {
        entry.validate()?;
    }
    Ok(entries)
}
pub fn encode(entries: &[SpectrumEntry]) -> Result<String, DecodeError> {
    Ok(serde_json::to_string(entries)?)
}
/// Zero spectra on the integer-Hz grid `min_hz..=max_hz`, one per channel.
/// Stands in for a batch whose spectrum never arrived.
pub fn empty_entries(channels: u32, min_hz: u32, max_hz: u32) -> Vec<SpectrumEntry> {
    let frequency_bins: Vec<f64> = (min_hz..=max_hz).map(f64::from).collect();
    (0..channels)
        .map(|channel_index| SpectrumEntry {
            channel_index,
            spectrum: vec![0.0; frequency_bins.len()],
            frequency_bins: frequency_bins.clone(),
            batch_id: None,
        })
        .collect()
}
