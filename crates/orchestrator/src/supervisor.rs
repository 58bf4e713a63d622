use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use mtste_asr::QuantizationCheck;
use mtste_core::TierConfig;
use mtste_worker::TierWorker;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::adapter_factory::AdapterFactory;
use crate::messages::EngineEvent;
use crate::tier_task::{run_tier_task, TierInbound, TierOutboundMessage};

/// Runs one tier for the lifetime of the engine, restarting it once after a
/// panic with the original stored configuration (`config` is moved into this
/// future and re-used verbatim on every retry, so there is no separate
/// recovery-config store). A second crash is fatal for this tier only — it
/// stops contributing output but does not bring down any other tier.
///
/// `ready_tx` fires exactly once, after the *first* model-load attempt
/// (success or failure), so `Orchestrator::start` can await every tier
/// reaching a terminal initial state without blocking on later restarts.
pub async fn supervise_tier(
    config: TierConfig,
    factory: Arc<dyn AdapterFactory>,
    tier_inbound: Arc<Mutex<HashMap<u8, mpsc::UnboundedSender<TierInbound>>>>,
    outbound_tx: mpsc::UnboundedSender<TierOutboundMessage>,
    events_tx: mpsc::UnboundedSender<EngineEvent>,
    cancel: CancellationToken,
    mut ready_tx: Option<oneshot::Sender<()>>,
) {
    let level = config.level;
    let mut crash_count = 0;

    loop {
        let (tx, rx) = mpsc::unbounded_channel();
        tier_inbound.lock().unwrap().insert(level, tx);

        let adapter = match factory.create(&config) {
            Ok(adapter) => adapter,
            Err(err) => {
                let _ = events_tx.send(EngineEvent::Status {
                    text: format!("tier {level} model load failed: {err}"),
                });
                tier_inbound.lock().unwrap().remove(&level);
                if let Some(tx) = ready_tx.take() {
                    let _ = tx.send(());
                }
                return;
            }
        };

        let _ = events_tx.send(EngineEvent::LoadProgress {
            level,
            progress: 1.0,
            file: None,
        });
        match adapter.quantization_check() {
            None | Some(QuantizationCheck::Ok) => {}
            Some(QuantizationCheck::Uncertain) => {
                let _ = events_tx.send(EngineEvent::Status {
                    text: format!("tier {level}: quantization of loaded weights could not be confirmed"),
                });
            }
            Some(QuantizationCheck::Mismatch) => {
                let _ = events_tx.send(EngineEvent::Status {
                    text: format!("tier {level}: loaded weights do not match the requested quantization"),
                });
            }
        }

        let worker = TierWorker::new(config.clone(), adapter);
        if let Some(tx) = ready_tx.take() {
            let _ = tx.send(());
        }
        let handle = tokio::spawn(run_tier_task(worker, rx, outbound_tx.clone(), cancel.clone()));

        match handle.await {
            Ok(()) => return, // clean shutdown via cancellation
            Err(join_err) if join_err.is_panic() => {
                crash_count += 1;
                if crash_count >= 2 {
                    let _ = events_tx.send(EngineEvent::Status {
                        text: format!("tier {level} worker crashed a second time, not restarting"),
                    });
                    tier_inbound.lock().unwrap().remove(&level);
                    return;
                }
                let _ = events_tx.send(EngineEvent::Status {
                    text: format!("tier {level} worker crashed, restarting"),
                });
            }
            Err(_) => return, // task was aborted/cancelled, not a panic
        }
    }
}
