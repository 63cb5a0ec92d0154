// src/lib.rs
//
// Library entry point for Rust, FFI (iOS/C) and web consumers.

mod audio_buffer;
mod bridge;
mod config;
mod engine;
mod error;
mod event;
mod external_data;
mod object;
mod parameter;
mod patcher;
mod preset;
mod sample;
mod scheduler;

pub mod ffi;
pub mod synth;

#[cfg(feature = "web")]
pub mod wasm;

// Re-export key types for Rust consumers
pub use audio_buffer::{AudioInputs, AudioOutputs};
pub use bridge::{Controller, create_bridge};
pub use config::{DEFAULT_BLOCK_SIZE, DEFAULT_SAMPLE_RATE, EngineConfig};
pub use engine::Processor;
pub use error::{EngineError, EngineResult, PresetError};
pub use event::{MAX_EVENT_PAYLOAD, MidiEvent};
pub use external_data::{DataType, ExternalData, ExternalDataRegistry, ReleaseFn};
pub use object::CoreObject;
pub use parameter::{INVALID_PARAMETER_INDEX, ParameterInfo, ParameterTable};
pub use patcher::{Patcher, PatcherFactory, ProcessContext, SimplePatcherFactory};
pub use preset::{Preset, PresetEntry, PresetList};
pub use sample::Sample;
pub use synth::{SimpleSynth, simple_synth_factory};
