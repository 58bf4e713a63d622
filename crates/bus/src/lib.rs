//! Lossless audio fan-out bus.
//!
//! Every tier worker needs to see every sample, each at its own pace: a
//! continuous L1 tier drains almost as fast as audio arrives, while an L4
//! tier sitting on a 20s chunk window may not drain for seconds at a time.
//! Unlike a single shared channel, each subscriber here gets its own
//! unbounded queue, so a slow tier never starves a fast one and no audio is
//! ever dropped because one subscriber fell behind.

use mtste_core::Sample;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// One slice of audio, tagged with a monotonic sequence number so
/// subscribers can detect drops or reordering even though none should occur.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Monotonic sequence number, shared across all subscribers of one bus.
    pub seq: u64,
    /// Wall-clock capture timestamp in milliseconds.
    pub ts_ms: i64,
    pub sample_rate: u32,
    /// Shared ownership avoids copying the buffer per subscriber.
    pub samples: Arc<[Sample]>,
}

impl AudioChunk {
    pub fn new(seq: u64, ts_ms: i64, sample_rate: u32, samples: impl Into<Arc<[Sample]>>) -> Self {
        Self {
            seq,
            ts_ms,
            sample_rate,
            samples: samples.into(),
        }
    }

    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        (self.samples.len() as u64 * 1000) / self.sample_rate as u64
    }
}

/// Producer handle. Cloning is cheap; every clone shares the same sequence
/// counter and subscriber list.
#[derive(Clone)]
pub struct AudioBusSender {
    subscribers: Arc<std::sync::Mutex<Vec<mpsc::UnboundedSender<AudioChunk>>>>,
    seq_counter: Arc<AtomicU64>,
}

impl AudioBusSender {
    /// Push a chunk to every current subscriber. Never blocks and never
    /// drops: a subscriber whose receiver was dropped is pruned instead.
    pub fn send(&self, ts_ms: i64, sample_rate: u32, samples: impl Into<Arc<[Sample]>>) {
        let seq = self.seq_counter.fetch_add(1, Ordering::Relaxed);
        let chunk = AudioChunk::new(seq, ts_ms, sample_rate, samples);

        let mut subs = self.subscribers.lock().unwrap();
        subs.retain(|tx| tx.send(chunk.clone()).is_ok());
        if subs.is_empty() {
            tracing::trace!(seq, "audio bus has no subscribers");
        }
    }

    pub fn current_seq(&self) -> u64 {
        self.seq_counter.load(Ordering::Relaxed)
    }
}

/// Consumer handle, one per tier worker.
pub struct AudioBusReceiver {
    rx: mpsc::UnboundedReceiver<AudioChunk>,
    last_seq: Option<u64>,
    gaps_detected: u64,
}

impl AudioBusReceiver {
    pub async fn recv(&mut self) -> Option<AudioChunk> {
        let chunk = self.rx.recv().await?;
        self.track_gap(&chunk);
        Some(chunk)
    }

    pub fn try_recv(&mut self) -> Option<AudioChunk> {
        match self.rx.try_recv() {
            Ok(chunk) => {
                self.track_gap(&chunk);
                Some(chunk)
            }
            Err(_) => None,
        }
    }

    fn track_gap(&mut self, chunk: &AudioChunk) {
        if let Some(last) = self.last_seq {
            if chunk.seq > last + 1 {
                self.gaps_detected += chunk.seq - last - 1;
            }
        }
        self.last_seq = Some(chunk.seq);
    }

    pub fn gaps_detected(&self) -> u64 {
        self.gaps_detected
    }
}

/// Fan-out bus: one sender, any number of independently-paced receivers.
pub struct AudioBus {
    sender: AudioBusSender,
}

impl AudioBus {
    pub fn new() -> Self {
        Self {
            sender: AudioBusSender {
                subscribers: Arc::new(std::sync::Mutex::new(Vec::new())),
                seq_counter: Arc::new(AtomicU64::new(0)),
            },
        }
    }

    pub fn sender(&self) -> AudioBusSender {
        self.sender.clone()
    }

    /// Register a new subscriber. Safe to call after audio has already
    /// started flowing; the new subscriber simply sees chunks from here on.
    pub fn subscribe(&self) -> AudioBusReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        self.sender.subscribers.lock().unwrap().push(tx);
        AudioBusReceiver {
            rx,
            last_seq: None,
            gaps_detected: 0,
        }
    }
}

impl Default for AudioBus {
    fn default() -> Self {
        Self::new()
    }
}
