use std::sync::Arc;

use mtste_core::{Sample, TierMode, Token};
use mtste_worker::{TierOutput, TierWorker, TimingSnapshot};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Inbound messages a tier task accepts, mirroring the Tier-internal
/// message set: `audio(samples)`, `draft_tokens(tokens)`, `commit`.
pub enum TierInbound {
    Audio(Arc<[Sample]>),
    Draft { upstream_mode: TierMode, tokens: Vec<Token> },
    Commit,
}

/// A firing's output, tagged with the tier that produced it so the
/// aggregator can route draft tokens to `level + 1` and timing stats per
/// level.
pub struct TierOutboundMessage {
    pub level: u8,
    pub mode: TierMode,
    pub output: TierOutput,
    /// This tier's timing stats immediately after producing `output`, so the
    /// aggregator can fold it into the per-tier stats it exports to the
    /// Sink without needing its own access to the worker.
    pub timing: TimingSnapshot,
}

/// Drive one tier worker until cancelled. Audio is accepted in any state;
/// `try_fire` only actually attempts inference from `Ready`/`Idle`, so a
/// message arriving during `Loading` is simply buffered.
pub async fn run_tier_task(
    mut worker: TierWorker,
    mut inbound: mpsc::UnboundedReceiver<TierInbound>,
    outbound: mpsc::UnboundedSender<TierOutboundMessage>,
    cancel: CancellationToken,
) {
    worker.mark_ready();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                worker.terminate();
                break;
            }
            msg = inbound.recv() => {
                match msg {
                    Some(TierInbound::Audio(samples)) => worker.push_audio(&samples),
                    Some(TierInbound::Draft { upstream_mode, tokens }) => worker.receive_draft(upstream_mode, tokens),
                    Some(TierInbound::Commit) => worker.commit(),
                    None => break,
                }
            }
        }

        while let Some(output) = worker.try_fire() {
            let message = TierOutboundMessage {
                level: worker.level(),
                mode: worker.mode(),
                output,
                timing: worker.timing().snapshot(),
            };
            if outbound.send(message).is_err() {
                return;
            }
        }
    }
}
