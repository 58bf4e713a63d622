//! ASR backend adapter: the one interface every tier worker calls through to
//! reach an actual speech model. Feature extraction, generation, tokenizer
//! decode, and a low-level forward pass all live behind [`AsrModelAdapter`]
//! so the rest of the engine never depends on a specific backend.

mod adapter;
mod mock;
mod whisper;

pub use adapter::{
    AdapterConfig, AsrModelAdapter, Device, Dtype, Features, GenerationOptions, Logits,
    QuantizationCheck, Task,
};
pub use mock::MockAsrAdapter;
pub use whisper::WhisperAdapter;
