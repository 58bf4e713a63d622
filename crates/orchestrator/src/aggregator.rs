use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use mtste_core::{Segment, Token};
use mtste_merge::Transcript;
use mtste_worker::{TierOutput, TimingSnapshot};
use tokio::sync::mpsc;

use crate::messages::EngineEvent;
use crate::tier_task::{TierInbound, TierOutboundMessage};

/// Fans in every tier's output: feeds the Merge Engine, forwards draft
/// tokens to the next tier in the cascade, surfaces per-tier status as
/// engine events, and republishes a full `Transcript` snapshot to the Sink
/// after every change.
#[tracing::instrument(skip_all)]
pub async fn run_aggregator(
    mut outbound_rx: mpsc::UnboundedReceiver<TierOutboundMessage>,
    cascade: Vec<u8>,
    tier_inbound: Arc<Mutex<HashMap<u8, mpsc::UnboundedSender<TierInbound>>>>,
    transcript: Arc<Mutex<Transcript>>,
    timing: Arc<Mutex<HashMap<u8, TimingSnapshot>>>,
    events_tx: mpsc::UnboundedSender<EngineEvent>,
) {
    while let Some(message) = outbound_rx.recv().await {
        let TierOutboundMessage { level, mode, output, timing: tier_timing } = message;
        timing.lock().unwrap().insert(level, tier_timing);

        let mut changed = true;
        match output {
            TierOutput::Partial { text, tokens, .. } => {
                transcript.lock().unwrap().set_hypothesis(level, text);
                route_draft(level, tokens, mode, &cascade, &tier_inbound);
            }
            TierOutput::Segment { start_s, end_s, text, tokens, .. } => {
                let draft_tokens = tokens.clone();
                let segment = Segment::content(start_s, end_s, text, level, Some(tokens));
                transcript.lock().unwrap().insert(segment);
                route_draft(level, draft_tokens, mode, &cascade, &tier_inbound);
            }
            TierOutput::Status { text, .. } => {
                changed = false;
                let _ = events_tx.send(EngineEvent::Status {
                    text: format!("tier {level}: {text}"),
                });
            }
        }

        if changed {
            let snapshot = {
                let t = transcript.lock().unwrap();
                EngineEvent::Transcript {
                    segments: t.segments().to_vec(),
                    partials: t.hypotheses(),
                    timing: timing.lock().unwrap().clone(),
                }
            };
            let _ = events_tx.send(snapshot);
        }
    }
}

fn route_draft(
    level: u8,
    tokens: Vec<Token>,
    upstream_mode: mtste_core::TierMode,
    cascade: &[u8],
    tier_inbound: &Arc<Mutex<HashMap<u8, mpsc::UnboundedSender<TierInbound>>>>,
) {
    if tokens.is_empty() {
        return;
    }
    let Some(position) = cascade.iter().position(|&l| l == level) else {
        return;
    };
    let Some(&downstream_level) = cascade.get(position + 1) else {
        return;
    };
    let map = tier_inbound.lock().unwrap();
    if let Some(tx) = map.get(&downstream_level) {
        let _ = tx.send(TierInbound::Draft { upstream_mode, tokens });
    }
}
