//! Spectral transform on its own thread.
//!
//! Sample vectors travel to the worker by move inside a [`SpectrumRequest`]
//! and come back, cleared, in [`SpectrumResponse::recycled`] so the sender
//! can refill them without allocating.
use std::collections::VecDeque;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use log::{debug, info, warn};
use crate::stream::error::StreamError;
use crate::stream::fft::SpectrumBuilder;
use crate::stream::spectrum::SpectrumEntry;
#[derive(Debug)]
pub struct SpectrumRequest {
    pub batch_id: u64,
    /// `samples[ch]` holds this batch's samples for channel `ch`.
    pub samples: Vec<Vec<f32>>,
}
#[derive(Debug)]
pub struct SpectrumResponse {
    pub batch_id: u64,
    /// Empty until every channel has a full FFT window.
    pub entries: Vec<SpectrumEntry>,
    pub recycled: Vec<Vec<f32>>,
}
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub requests: u64,
    pub spectra: u64,
}
#[derive(Clone, Copy, Debug)]
pub struct WorkerSettings {
    pub channels: usize,
    pub sample_rate: f64,
    pub fft_size: usize,
    pub min_hz: u32,
    pub max_hz: u32,
    /// Requests allowed in flight before `submit` starts dropping.
    pub queue_depth: usize,
}
pub struct SpectrumWorker {
    requests: Option<Sender<SpectrumRequest>>,
    responses: Option<Receiver<SpectrumResponse>>,
    handle: Option<JoinHandle<WorkerStats>>,
}
impl SpectrumWorker {
    pub fn spawn(settings: WorkerSettings) -> Result<Self, StreamError> {
        if !(settings.sample_rate > 0.0) {
            return Err(StreamError::InvalidSampleRate);
        }
        let depth = settings.queue_depth.max(1);
        let (request_tx, request_rx) = bounded::<SpectrumRequest>(depth);
        let (response_tx, response_rx) = bounded::<SpectrumResponse>(depth);
        let handle = thread::Builder::new()
            .name("spectrum-worker".into())
            .spawn(move || run(settings, request_rx, response_tx))?;
        Ok(Self {
            requests: Some(request_tx),
            responses: Some(response_rx),
            handle: Some(handle),
        })
    }
    /// Queues a batch. `Ok(false)` means the worker is behind and the batch
    /// was dropped; its buffers are lost with it.
    pub fn submit(&self, batch_id: u64, samples: Vec<Vec<f32>>) -> Result<bool, StreamError> {
        let sender = self.requests.as_ref().ok_or(StreamError::WorkerDisconnected)?;
        match sender.try_send(SpectrumRequest { batch_id, samples }) {
            Ok(()) => Ok(true),
            Err(TrySendError::Full(_)) => {
                debug!("spectrum worker busy; batch {batch_id} skipped");
                Ok(false)
            }
            Err(TrySendError::Disconnected(_)) => Err(StreamError::WorkerDisconnected),
        }
    }
    pub fn try_recv(&self) -> Option<SpectrumResponse> {
        self.responses.as_ref()?.try_recv().ok()
    }
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<SpectrumResponse>, StreamError> {
        let responses = self.responses.as_ref().ok_or(StreamError::WorkerDisconnected)?;
        match responses.recv_timeout(timeout) {
            Ok(response) => Ok(Some(response)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(StreamError::WorkerDisconnected),
        }
    }
    /// Closes both channels and waits for the thread. Responses not yet
    /// received are discarded.
    pub fn shutdown(mut self) -> WorkerStats {
        self.stop()
    }
    fn stop(&mut self) -> WorkerStats {
        self.requests.take();
        // A worker blocked on a full response queue sees the disconnect and exits.
        self.responses.take();
        match self.handle.take().map(JoinHandle::join) {
            Some(Ok(stats)) => stats,
            Some(Err(_)) => {
                warn!("spectrum worker panicked");
                WorkerStats::default()
            }
            None => WorkerStats::default(),
        }
    }
}
impl Drop for SpectrumWorker {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.stop();
        }
    }
}
fn run(
    settings: WorkerSettings,
    requests: Receiver<SpectrumRequest>,
    responses: Sender<SpectrumResponse>,
) -> WorkerStats {
    info!(
        "spectrum worker started: {} channels, fft {} @ {} Hz, {}-{} Hz",
        settings.channels, settings.fft_size, settings.sample_rate, settings.min_hz, settings.max_hz
    );
    let mut builder = SpectrumBuilder::new(
        settings.fft_size,
        settings.sample_rate,
        settings.min_hz,
        settings.max_hz,
    );
    let fft_size = builder.fft_size();
    let mut windows: Vec<VecDeque<f32>> = (0..settings.channels)
        .map(|_| VecDeque::with_capacity(fft_size + 1))
        .collect();
    let mut stats = WorkerStats::default();
    for SpectrumRequest {
        batch_id,
        mut samples,
    } in requests.iter()
    {
        stats.requests += 1;
        for (window, lane) in windows.iter_mut().zip(&samples) {
            for &value in lane {
                window.push_back(value);
                if window.len() > fft_size {
                    window.pop_front();
                }
            }
        }
        let warm = !windows.is_empty() && windows.iter().all(|w| w.len() >= fft_size);
        let entries = if warm {
            stats.spectra += 1;
            windows
                .iter_mut()
                .enumerate()
                .map(|(ch, window)| builder.entry(ch as u32, window.make_contiguous(), Some(batch_id)))
                .collect()
        } else {
            Vec::new()
        };
        for lane in &mut samples {
            lane.clear();
        }
        let response = SpectrumResponse {
            batch_id,
            entries,
            recycled: samples,
        };
        if responses.send(response).is_err() {
            debug!("spectrum worker: response receiver dropped");
            break;
        }
    }
    info!(
        "spectrum worker stopped: {} requests, {} spectra",
        stats.requests, stats.spectra
    );
    stats
}
