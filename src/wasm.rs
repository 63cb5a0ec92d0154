//! WebAssembly bindings via wasm-bindgen for browser integration.
//!
//! This module is only compiled when the `web` feature is enabled.
//!
//! # Usage
//!
//! Build with wasm-pack:
//! ```bash
//! wasm-pack build --target web --features web
//! ```
//!
//! # JavaScript Example
//!
//! ```javascript
//! import init, { patcher_init, PatcherObject } from './patcher.js';
//!
//! await init();
//! patcher_init();
//!
//! const synth = new PatcherObject();
//! synth.initialize();
//! synth.prepare(sampleRate, 128);
//! synth.set_parameter_value(synth.parameter_index_for_id("gain"), 0.3);
//! synth.note_on(60, 100);
//!
//! // In the AudioWorklet
//! synth.render(128, interleavedStereo);
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use wasm_bindgen::prelude::*;

use crate::config::EngineConfig;
use crate::external_data::{DataType, ExternalData};
use crate::object::CoreObject;
use crate::parameter::INVALID_PARAMETER_INDEX;
use crate::preset::{Preset, PresetList};
use crate::synth::simple_synth_factory;

// ═══════════════════════════════════════════════════════════════════════════
// Initialization
// ═══════════════════════════════════════════════════════════════════════════

/// Initialize the wasm module. Call this once before using any other functions.
/// Sets up panic hooks and console logging.
#[wasm_bindgen]
pub fn patcher_init() {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Debug).ok();
}

fn js_error(err: impl std::fmt::Display) -> JsError {
    JsError::new(&err.to_string())
}

// ═══════════════════════════════════════════════════════════════════════════
// Presets
// ═══════════════════════════════════════════════════════════════════════════

/// A parsed preset collection.
#[wasm_bindgen]
pub struct PatcherPresetList {
    inner: PresetList,
}

#[wasm_bindgen]
impl PatcherPresetList {
    #[wasm_bindgen(constructor)]
    pub fn new(json: &str) -> Result<PatcherPresetList, JsError> {
        let inner = PresetList::from_json(json).map_err(js_error)?;
        Ok(Self { inner })
    }

    pub fn names(&self) -> Vec<String> {
        self.inner.names().map(str::to_owned).collect()
    }

    /// JSON of the preset called `name`, if present.
    pub fn preset_json(&self, name: &str) -> Option<String> {
        self.inner.preset_with_name(name).map(|preset| preset.to_json())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Engine Object
// ═══════════════════════════════════════════════════════════════════════════

/// One instance of the bundled synth, rendering 32-bit float audio.
///
/// Sample buffers handed to [`PatcherObject::set_sample`] are copied into
/// wasm memory and freed once the engine releases them.
#[wasm_bindgen]
pub struct PatcherObject {
    inner: CoreObject<f32>,

    /// Sample memory lent to the engine, by address
    owned: HashMap<usize, Box<[f32]>>,

    /// Addresses the engine has released, filled by release callbacks
    released: Arc<Mutex<Vec<usize>>>,
}

#[wasm_bindgen]
impl PatcherObject {
    #[wasm_bindgen(constructor)]
    pub fn new() -> PatcherObject {
        Self::with_config(EngineConfig::default())
    }

    pub fn new_with_capacities(
        event_capacity: u32,
        command_capacity: u32,
        max_external_data: u32,
    ) -> PatcherObject {
        Self::with_config(EngineConfig {
            event_capacity,
            command_capacity,
            max_external_data,
            ..EngineConfig::default()
        })
    }

    fn with_config(config: EngineConfig) -> PatcherObject {
        let factory = simple_synth_factory::<f32>();
        let capacity = config.max_external_data as usize * 2;
        Self {
            inner: CoreObject::new(&factory, config),
            owned: HashMap::new(),
            released: Arc::new(Mutex::new(Vec::with_capacity(capacity))),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────

    pub fn initialize(&mut self) -> Result<(), JsError> {
        self.inner.initialize().map_err(js_error)
    }

    pub fn prepare(&mut self, sample_rate: f64, block_size: u32) -> Result<(), JsError> {
        self.inner
            .prepare(sample_rate, block_size as usize)
            .map_err(js_error)
    }

    /// Render interleaved audio.
    pub fn process(
        &mut self,
        input: &[f32],
        input_channels: u32,
        output: &mut [f32],
        output_channels: u32,
        frames: u32,
    ) {
        self.inner.process_interleaved(
            input,
            input_channels as usize,
            output,
            output_channels as usize,
            frames as usize,
        );
    }

    /// Render interleaved stereo with no input.
    /// Output format: [L0, R0, L1, R1, L2, R2, ...]
    pub fn render(&mut self, frames: u32, output: &mut [f32]) {
        self.inner
            .process_interleaved(&[], 0, output, 2, frames as usize);
    }

    // ─────────────────────────────────────────────────────────────────────
    // Parameters
    // ─────────────────────────────────────────────────────────────────────

    pub fn num_parameters(&self) -> u32 {
        self.inner.parameter_count() as u32
    }

    pub fn parameter_id(&self, index: u32) -> Option<String> {
        self.inner
            .parameter_info(index as usize)
            .map(|info| info.id.clone())
    }

    /// Index of the parameter called `id`, or -1.
    pub fn parameter_index_for_id(&self, id: &str) -> i32 {
        self.inner
            .parameter_index_for_id(id)
            .map_or(INVALID_PARAMETER_INDEX, |index| index as i32)
    }

    pub fn parameter_value(&self, index: u32) -> f32 {
        self.inner.parameter_value(index as usize)
    }

    pub fn set_parameter_value(&mut self, index: u32, value: f32) -> Result<(), JsError> {
        self.collect_released();
        self.inner
            .set_parameter_value(index as usize, value)
            .map_err(js_error)
    }

    pub fn set_parameter_value_at(
        &mut self,
        index: u32,
        value: f32,
        offset_ms: f64,
    ) -> Result<(), JsError> {
        self.collect_released();
        self.inner
            .set_parameter_value_at(index as usize, value, offset_ms)
            .map_err(js_error)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Events
    // ─────────────────────────────────────────────────────────────────────

    pub fn current_time(&self) -> f64 {
        self.inner.current_time_ms()
    }

    pub fn schedule_midi_event(&mut self, time_ms: f64, port: u32, data: &[u8]) -> Result<(), JsError> {
        self.inner
            .schedule_midi_event(time_ms, port as usize, data)
            .map_err(js_error)
    }

    /// Note-on on channel 1 at the start of the next block.
    pub fn note_on(&mut self, note: u8, velocity: u8) -> Result<(), JsError> {
        let now = self.inner.current_time_ms();
        self.schedule_midi_event(now, 0, &[0x90, note & 0x7F, velocity & 0x7F])
    }

    pub fn note_off(&mut self, note: u8) -> Result<(), JsError> {
        let now = self.inner.current_time_ms();
        self.schedule_midi_event(now, 0, &[0x80, note & 0x7F, 0])
    }

    // ─────────────────────────────────────────────────────────────────────
    // External data
    // ─────────────────────────────────────────────────────────────────────

    /// Copy interleaved samples into wasm memory and register them under `id`.
    pub fn set_sample(
        &mut self,
        id: &str,
        samples: Vec<f32>,
        channels: u32,
        sample_rate: f64,
    ) -> Result<(), JsError> {
        self.collect_released();

        let mut samples = samples.into_boxed_slice();
        let address = samples.as_mut_ptr() as *mut u8;
        let size = std::mem::size_of_val(&*samples);
        self.owned.insert(address as usize, samples);

        let released = Arc::clone(&self.released);
        // SAFETY: the boxed slice stays in `owned` until its address comes
        // back through `released`.
        let data = unsafe {
            ExternalData::from_raw_parts(
                id,
                address,
                size,
                DataType::Float32 {
                    channels,
                    sample_rate,
                },
                move |_: &str, address: *mut u8| {
                    released.lock().push(address as usize);
                },
            )
        };

        let result = self.inner.set_external_data(data).map_err(js_error);
        self.collect_released();
        result
    }

    pub fn release_sample(&mut self, id: &str) -> Result<(), JsError> {
        self.collect_released();
        self.inner.release_external_data(id).map_err(js_error)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Presets
    // ─────────────────────────────────────────────────────────────────────

    /// Apply the preset called `name` from `list`. Returns false if absent.
    pub fn apply_preset_named(
        &mut self,
        list: &PatcherPresetList,
        name: &str,
    ) -> Result<bool, JsError> {
        self.collect_released();
        match list.inner.preset_with_name(name) {
            Some(preset) => self.inner.apply_preset(preset).map(|()| true).map_err(js_error),
            None => Ok(false),
        }
    }

    pub fn apply_preset_json(&mut self, json: &str) -> Result<(), JsError> {
        self.collect_released();
        let preset = Preset::from_json(json).map_err(js_error)?;
        self.inner.apply_preset(preset).map_err(js_error)
    }

    /// JSON snapshot of the applied parameter values.
    pub fn preset_json(&self) -> String {
        self.inner.preset().to_json()
    }
}

impl PatcherObject {
    /// Free sample memory the engine has released.
    fn collect_released(&mut self) {
        self.inner.controller().collect_garbage();
        let released: Vec<usize> = self.released.lock().drain(..).collect();
        for address in released {
            self.owned.remove(&address);
        }
    }
}

impl Default for PatcherObject {
    fn default() -> Self {
        Self::new()
    }
}
