//! Offline demo harness: feeds a WAV file through the full orchestrator with
//! a scripted mock adapter standing in for real model weights, and renders
//! every engine event through a [`TracingSink`]-style log line.
//!
//! No real ASR backend ships with this binary; wiring `mtste-asr::WhisperAdapter`
//! instead of [`MockAsrAdapter`] behind [`DemoAdapterFactory`] is the only
//! change needed to drive this against real weights.

use std::sync::Arc;
use std::time::Duration;

use mtste_asr::{AsrModelAdapter, Device, Dtype, MockAsrAdapter};
use mtste_core::{default_tier_configs, seconds_to_samples, Result, Sample, TierConfig};
use mtste_orchestrator::{AdapterFactory, EngineConfig, EngineEvent, Orchestrator};
use mtste_sink::{TracingSink, TranscriptSink};
use tracing_subscriber::EnvFilter;

/// Builds a [`MockAsrAdapter`] per tier. Every tier gets the same scripted
/// token sequence; in practice each tier's adapter would decode independently
/// from its own window, but the mock is only here to exercise the pipeline.
struct DemoAdapterFactory {
    script: Vec<mtste_core::Token>,
}

impl AdapterFactory for DemoAdapterFactory {
    fn create(&self, config: &TierConfig) -> Result<Arc<dyn AsrModelAdapter>> {
        Ok(Arc::new(MockAsrAdapter::new(
            format!("mock-tier-{}", config.level),
            self.script.clone(),
        )))
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,mtste=debug")),
        )
        .init();

    let path = match std::env::args().nth(1) {
        Some(path) => path,
        None => {
            eprintln!("usage: mtste-demo <path-to-16khz-mono-wav>");
            std::process::exit(1);
        }
    };

    tracing::info!(%path, "reading input audio");
    let samples = match read_wav_as_samples(&path) {
        Ok(samples) => samples,
        Err(err) => {
            tracing::error!(%err, "failed to read input WAV");
            std::process::exit(1);
        }
    };
    tracing::info!(sample_count = samples.len(), "decoded input audio");

    let script: Vec<mtste_core::Token> = vec![50, 51, 52, 53, 54, 55, 56, 57, 58];
    let factory = Arc::new(DemoAdapterFactory { script });
    let (mut orchestrator, mut events) = Orchestrator::new(factory);

    let sink = TracingSink;
    let drain = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                EngineEvent::Transcript { segments, partials, timing } => {
                    sink.on_update(&segments, &partials, &timing);
                }
                EngineEvent::Status { text } => sink.on_status(&text),
                EngineEvent::LoadProgress { level, progress, file } => {
                    sink.on_load_progress(level, progress, file.as_deref());
                }
            }
        }
    });

    let config = EngineConfig {
        language: None,
        model_id: "demo-mock".into(),
        device: Device::Cpu,
        dtype: Dtype::F32,
        enabled_tiers: default_tier_configs().to_vec(),
    };

    if let Err(err) = orchestrator.start(config).await {
        tracing::error!(%err, "failed to start engine");
        std::process::exit(1);
    }

    let chunk_samples = seconds_to_samples(0.1);
    let mut ts_ms: i64 = 0;
    for chunk in samples.chunks(chunk_samples.max(1)) {
        orchestrator.push_audio(chunk, ts_ms);
        ts_ms += 100;
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    tokio::time::sleep(Duration::from_millis(200)).await;
    orchestrator.commit();
    tokio::time::sleep(Duration::from_millis(200)).await;

    orchestrator.stop().await;
    drop(orchestrator);
    let _ = drain.await;

    tracing::info!("demo run complete");
}

/// Reads a 16kHz mono WAV into normalized `[-1.0, 1.0]` samples. Audio
/// capture and format negotiation are the caller's responsibility, not the
/// engine's, so this harness rejects anything else outright rather than
/// attempting to resample.
fn read_wav_as_samples(path: &str) -> std::result::Result<Vec<Sample>, String> {
    let mut reader = hound::WavReader::open(path).map_err(|e| e.to_string())?;
    let spec = reader.spec();
    if spec.channels != 1 {
        return Err(format!("expected mono audio, got {} channels", spec.channels));
    }
    if spec.sample_rate != mtste_core::SAMPLE_RATE {
        return Err(format!(
            "expected {} Hz audio, got {} Hz",
            mtste_core::SAMPLE_RATE,
            spec.sample_rate
        ));
    }

    let samples: Vec<Sample> = match spec.sample_format {
        hound::SampleFormat::Int => reader
            .samples::<i16>()
            .map(|s| s.map(|v| v as f32 / i16::MAX as f32))
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| e.to_string())?,
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| e.to_string())?,
    };
    Ok(samples)
}
