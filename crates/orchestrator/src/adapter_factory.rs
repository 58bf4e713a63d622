use std::sync::Arc;

use mtste_asr::AsrModelAdapter;
use mtste_core::{Result, TierConfig};

/// Builds a fresh [`AsrModelAdapter`] for a tier, given that tier's stored
/// configuration. Invoked once at startup and again on every restart after
/// a worker crash, so implementations should be cheap to call repeatedly
/// (or cache internally, partitioned by `sessionId`/tier).
pub trait AdapterFactory: Send + Sync {
    fn create(&self, config: &TierConfig) -> Result<Arc<dyn AsrModelAdapter>>;
}
