// C-compatible FFI bindings.
//
// Every engine function exists twice, `patcher_f32_*` and `patcher_f64_*`,
// differing only in sample and parameter value width.
//
// Safety requirements:
// - Handles must be created by this module and not fabricated
// - String parameters must be NUL-terminated UTF-8
// - Caller must call the corresponding _destroy function for each _new
// - `object_process*` may run concurrently with the control functions, but
//   not with `object_initialize`, `object_prepare_to_process` or
//   `object_destroy`

mod panic_guard;

use std::ffi::{CStr, CString, c_char};
use std::ptr;
use std::slice;

use crate::bridge::Controller;
use crate::config::EngineConfig;
use crate::engine::Processor;
use crate::error::{EngineError, EngineResult};
use crate::external_data::{DataType, ExternalData};
use crate::object::CoreObject;
use crate::parameter::INVALID_PARAMETER_INDEX;
use crate::preset::{Preset, PresetList};
use crate::sample::Sample;
use crate::synth::simple_synth_factory;

use panic_guard::{ffi_guard, ffi_guard_or, ffi_guard_ptr};

/// Most channels a single `object_process` call can address.
pub const MAX_FFI_CHANNELS: usize = 64;

pub const PATCHER_BUFFER_FLOAT32: u32 = 0;
pub const PATCHER_BUFFER_FLOAT64: u32 = 1;
pub const PATCHER_BUFFER_UNTYPED: u32 = 2;

#[cfg(feature = "ios")]
const LOG_SUBSYSTEM: &str = "com.patcher.engine";

// ═══════════════════════════════════════════════════════════════════════════
// Logger Initialization
// ═══════════════════════════════════════════════════════════════════════════

/// Initialize the oslog logger.
///
/// Call once at application startup, before any other function. Output
/// appears in Console.app and Xcode's debug console.
#[cfg(feature = "ios")]
#[unsafe(no_mangle)]
pub extern "C" fn patcher_init_logger() {
    oslog::OsLogger::new(LOG_SUBSYSTEM)
        .level_filter(log::LevelFilter::Debug)
        .init()
        .ok();
}

// ═══════════════════════════════════════════════════════════════════════════
// FFI Types
// ═══════════════════════════════════════════════════════════════════════════

/// Opaque handle to one engine instance.
pub struct PatcherHandle<S: Sample> {
    inner: CoreObject<S>,
}

/// Result code of fallible calls.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatcherStatus {
    Ok = 0,
    NullPointer = 1,
    InvalidArgument = 2,
    NotInitialized = 3,
    AlreadyInitialized = 4,
    InvalidParameter = 5,
    PayloadTooLarge = 6,
    QueueFull = 7,
    UnknownExternalData = 8,
    TooManyExternalData = 9,
    Internal = 10,
}

impl From<EngineError> for PatcherStatus {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::AlreadyInitialized => PatcherStatus::AlreadyInitialized,
            EngineError::NotInitialized(_) => PatcherStatus::NotInitialized,
            EngineError::InvalidConfiguration { .. }
            | EngineError::InvalidValue(_)
            | EngineError::InvalidTime(_) => PatcherStatus::InvalidArgument,
            EngineError::InvalidParameter { .. } => PatcherStatus::InvalidParameter,
            EngineError::PayloadTooLarge { .. } => PatcherStatus::PayloadTooLarge,
            EngineError::QueueFull(_) => PatcherStatus::QueueFull,
            EngineError::TooManyExternalData(_) => PatcherStatus::TooManyExternalData,
            EngineError::UnknownExternalData(_) => PatcherStatus::UnknownExternalData,
        }
    }
}

fn status(result: EngineResult<()>) -> PatcherStatus {
    match result {
        Ok(()) => PatcherStatus::Ok,
        Err(err) => err.into(),
    }
}

/// Parameter metadata for UI controls.
///
/// String pointers stay valid until the owning object is destroyed.
#[repr(C)]
pub struct PatcherParameterInfo {
    pub id: *const c_char,
    pub name: *const c_char,
    pub unit: *const c_char,
    pub min_value: f64,
    pub max_value: f64,
    pub default_value: f64,
    /// Number of discrete values, or 0 for a continuous parameter
    pub steps: u32,
}

/// Interpretation of an external buffer.
///
/// `tag` is one of the `PATCHER_BUFFER_*` constants; `channels` and
/// `sample_rate` are ignored for untyped buffers.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct PatcherBufferType {
    pub tag: u32,
    pub channels: u32,
    pub sample_rate: f64,
}

impl PatcherBufferType {
    fn to_data_type(self) -> Option<DataType> {
        let (channels, sample_rate) = (self.channels, self.sample_rate);
        match self.tag {
            PATCHER_BUFFER_FLOAT32 => Some(DataType::Float32 {
                channels,
                sample_rate,
            }),
            PATCHER_BUFFER_FLOAT64 => Some(DataType::Float64 {
                channels,
                sample_rate,
            }),
            PATCHER_BUFFER_UNTYPED => Some(DataType::Untyped),
            _ => None,
        }
    }
}

/// Called exactly once per registration with the id and the address that
/// was registered. After it returns the host may free the memory.
pub type PatcherReleaseCallback = Option<unsafe extern "C" fn(id: *const c_char, data: *mut c_char)>;

// ═══════════════════════════════════════════════════════════════════════════
// Shared Helpers
// ═══════════════════════════════════════════════════════════════════════════

unsafe fn c_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().ok()
}

/// The control half of `object`.
///
/// Only this field is borrowed so control calls never alias the processor.
unsafe fn controller<'a, S: Sample>(object: *const PatcherHandle<S>) -> Option<&'a Controller<S>> {
    if object.is_null() {
        None
    } else {
        Some(unsafe { &(*object).inner.controller })
    }
}

unsafe fn processor<'a, S: Sample>(object: *mut PatcherHandle<S>) -> Option<&'a mut Processor<S>> {
    if object.is_null() {
        None
    } else {
        Some(unsafe { &mut (*object).inner.processor })
    }
}

fn new_handle<S: Sample>(config: EngineConfig) -> *mut PatcherHandle<S> {
    let factory = simple_synth_factory::<S>();
    let inner = CoreObject::new(&factory, config);
    Box::into_raw(Box::new(PatcherHandle { inner }))
}

unsafe fn process_planar<S: Sample>(
    object: *mut PatcherHandle<S>,
    inputs: *const *const S,
    num_inputs: usize,
    outputs: *const *mut S,
    num_outputs: usize,
    frames: usize,
) {
    let Some(processor) = (unsafe { processor(object) }) else {
        return;
    };

    let mut ins: [&[S]; MAX_FFI_CHANNELS] = [<&[S]>::default(); MAX_FFI_CHANNELS];
    let num_inputs = if inputs.is_null() {
        0
    } else {
        num_inputs.min(MAX_FFI_CHANNELS)
    };
    for (ch, slot) in ins.iter_mut().enumerate().take(num_inputs) {
        let channel = unsafe { *inputs.add(ch) };
        if !channel.is_null() {
            *slot = unsafe { slice::from_raw_parts(channel, frames) };
        }
    }

    // A null output pointer ends the channel list.
    let mut outs: [&mut [S]; MAX_FFI_CHANNELS] = std::array::from_fn(|_| <&mut [S]>::default());
    let mut connected = 0;
    if !outputs.is_null() {
        for (ch, slot) in outs.iter_mut().enumerate().take(num_outputs) {
            let channel = unsafe { *outputs.add(ch) };
            if channel.is_null() {
                break;
            }
            *slot = unsafe { slice::from_raw_parts_mut(channel, frames) };
            connected += 1;
        }
    }

    processor.process(&ins[..num_inputs], &mut outs[..connected], frames);
}

unsafe fn process_interleaved<S: Sample>(
    object: *mut PatcherHandle<S>,
    input: *const S,
    input_channels: usize,
    output: *mut S,
    output_channels: usize,
    frames: usize,
) {
    let Some(processor) = (unsafe { processor(object) }) else {
        return;
    };
    if output.is_null() {
        return;
    }
    let (Some(input_len), Some(output_len)) = (
        frames.checked_mul(input_channels),
        frames.checked_mul(output_channels),
    ) else {
        return;
    };

    let input: &[S] = if input.is_null() {
        &[]
    } else {
        unsafe { slice::from_raw_parts(input, input_len) }
    };
    let output = unsafe { slice::from_raw_parts_mut(output, output_len) };
    let input_channels = if input.is_empty() { 0 } else { input_channels };

    processor.process_interleaved(input, input_channels, output, output_channels, frames);
}

unsafe fn parameter_info<S: Sample>(
    object: *const PatcherHandle<S>,
    index: u32,
    out: *mut PatcherParameterInfo,
) -> PatcherStatus {
    let Some(controller) = (unsafe { controller(object) }) else {
        return PatcherStatus::NullPointer;
    };
    if out.is_null() {
        return PatcherStatus::NullPointer;
    }
    let index = index as usize;
    let table = controller.parameters();
    let (Some(info), Some(strings)) = (table.info(index), table.c_strings(index)) else {
        return PatcherStatus::InvalidParameter;
    };
    unsafe {
        out.write(PatcherParameterInfo {
            id: strings.id.as_ptr(),
            name: strings.name.as_ptr(),
            unit: strings.unit.as_ptr(),
            min_value: info.min,
            max_value: info.max,
            default_value: info.default,
            steps: info.steps,
        });
    }
    PatcherStatus::Ok
}

/// Fire `release` for a registration that never reached the engine.
unsafe fn release_rejected(release: PatcherReleaseCallback, id: *const c_char, data: *mut c_char) {
    if let Some(release) = release {
        unsafe { release(id, data) };
    }
}

unsafe fn set_external_data<S: Sample>(
    object: *const PatcherHandle<S>,
    id: *const c_char,
    data: *mut c_char,
    size: usize,
    data_type: PatcherBufferType,
    release: PatcherReleaseCallback,
) -> PatcherStatus {
    let Some(controller) = (unsafe { controller(object) }) else {
        unsafe { release_rejected(release, id, data) };
        return PatcherStatus::NullPointer;
    };
    let (Some(id_str), Some(data_type)) = (unsafe { c_str(id) }, data_type.to_data_type()) else {
        log::warn!("rejecting external data with invalid id or buffer type");
        unsafe { release_rejected(release, id, data) };
        return PatcherStatus::InvalidArgument;
    };

    // The host's id string may not outlive this call; the callback gets a copy.
    let c_id = CString::from(unsafe { CStr::from_ptr(id) });
    let external = unsafe {
        ExternalData::from_raw_parts(
            id_str,
            data.cast(),
            size,
            data_type,
            move |_: &str, address: *mut u8| {
                if let Some(release) = release {
                    unsafe { release(c_id.as_ptr(), address.cast()) };
                }
            },
        )
    };
    status(controller.set_external_data(external))
}

unsafe fn schedule_midi_event<S: Sample>(
    object: *const PatcherHandle<S>,
    time_ms: f64,
    port: u32,
    data: *const u8,
    len: usize,
) -> PatcherStatus {
    let Some(controller) = (unsafe { controller(object) }) else {
        return PatcherStatus::NullPointer;
    };
    let payload: &[u8] = if data.is_null() || len == 0 {
        &[]
    } else {
        unsafe { slice::from_raw_parts(data, len) }
    };
    status(controller.schedule_midi_event(time_ms, port as usize, payload))
}

unsafe fn set_preset<S: Sample>(object: *const PatcherHandle<S>, preset: *mut Preset) -> PatcherStatus {
    if preset.is_null() {
        return PatcherStatus::NullPointer;
    }
    let preset = unsafe { Box::from_raw(preset) };
    let Some(controller) = (unsafe { controller(object) }) else {
        return PatcherStatus::NullPointer;
    };
    status(controller.apply_preset(*preset))
}

// ═══════════════════════════════════════════════════════════════════════════
// Engine Functions
// ═══════════════════════════════════════════════════════════════════════════

macro_rules! patcher_ffi {
    ($sample:ident) => {
        paste::paste! {
            /// Create an instance of the bundled topology with default configuration.
            ///
            /// Returns null on failure. Free with the matching `object_destroy`.
            #[unsafe(no_mangle)]
            pub extern "C" fn [<patcher_ $sample _object_new>]() -> *mut PatcherHandle<$sample> {
                ffi_guard_ptr! { new_handle::<$sample>(EngineConfig::default()) }
            }

            /// Create an instance with custom queue and registry sizes.
            ///
            /// # Safety
            /// `config` must be null (defaults) or point to a valid `EngineConfig`.
            #[unsafe(no_mangle)]
            pub unsafe extern "C" fn [<patcher_ $sample _object_new_with_config>](
                config: *const EngineConfig,
            ) -> *mut PatcherHandle<$sample> {
                ffi_guard_ptr! {
                    let config = if config.is_null() {
                        EngineConfig::default()
                    } else {
                        unsafe { ptr::read(config) }
                    };
                    new_handle::<$sample>(config)
                }
            }

            /// One-time setup; must precede `object_prepare_to_process`.
            ///
            /// # Safety
            /// `object` must be null or a live handle from `object_new`.
            #[unsafe(no_mangle)]
            pub unsafe extern "C" fn [<patcher_ $sample _object_initialize>](
                object: *mut PatcherHandle<$sample>,
            ) -> PatcherStatus {
                ffi_guard! {
                    match unsafe { processor(object) } {
                        Some(processor) => status(processor.initialize()),
                        None => PatcherStatus::NullPointer,
                    }
                }
            }

            /// Destroy an instance, releasing every external buffer it holds.
            ///
            /// # Safety
            /// `object` must be null or a live handle from `object_new`; it is
            /// invalid afterwards.
            #[unsafe(no_mangle)]
            pub unsafe extern "C" fn [<patcher_ $sample _object_destroy>](
                object: *mut PatcherHandle<$sample>,
            ) {
                ffi_guard_or! { ();
                    if !object.is_null() {
                        unsafe { drop(Box::from_raw(object)) };
                    }
                }
            }

            /// Size buffers for `block_size` frames at `sample_rate`.
            ///
            /// # Safety
            /// `object` must be null or a live handle, not concurrently processing.
            #[unsafe(no_mangle)]
            pub unsafe extern "C" fn [<patcher_ $sample _object_prepare_to_process>](
                object: *mut PatcherHandle<$sample>,
                sample_rate: f64,
                block_size: usize,
            ) -> PatcherStatus {
                ffi_guard! {
                    match unsafe { processor(object) } {
                        Some(processor) => status(processor.prepare(sample_rate, block_size)),
                        None => PatcherStatus::NullPointer,
                    }
                }
            }

            /// Render `frames` frames from per-channel buffers.
            ///
            /// # Safety
            /// - `inputs` is null or holds `num_inputs` pointers, each null or
            ///   valid for `frames` reads
            /// - `outputs` is null or holds `num_outputs` pointers, each valid for
            ///   `frames` writes; a null pointer ends the list
            #[unsafe(no_mangle)]
            pub unsafe extern "C" fn [<patcher_ $sample _object_process>](
                object: *mut PatcherHandle<$sample>,
                inputs: *const *const $sample,
                num_inputs: usize,
                outputs: *const *mut $sample,
                num_outputs: usize,
                frames: usize,
            ) {
                ffi_guard_or! { ();
                    unsafe { process_planar(object, inputs, num_inputs, outputs, num_outputs, frames) }
                }
            }

            /// Render `frames` frames from interleaved buffers.
            ///
            /// # Safety
            /// `input` is null or valid for `frames * input_channels` reads;
            /// `output` is valid for `frames * output_channels` writes.
            #[unsafe(no_mangle)]
            pub unsafe extern "C" fn [<patcher_ $sample _object_process_interleaved>](
                object: *mut PatcherHandle<$sample>,
                input: *const $sample,
                input_channels: usize,
                output: *mut $sample,
                output_channels: usize,
                frames: usize,
            ) {
                ffi_guard_or! { ();
                    unsafe {
                        process_interleaved(
                            object,
                            input,
                            input_channels,
                            output,
                            output_channels,
                            frames,
                        )
                    }
                }
            }

            /// Index of the parameter called `id`, or -1.
            ///
            /// # Safety
            /// `id` must be null or a NUL-terminated string.
            #[unsafe(no_mangle)]
            pub unsafe extern "C" fn [<patcher_ $sample _object_get_parameter_index_for_id>](
                object: *const PatcherHandle<$sample>,
                id: *const c_char,
            ) -> i32 {
                ffi_guard_or! { INVALID_PARAMETER_INDEX;
                    let controller = unsafe { controller(object) };
                    let id = unsafe { c_str(id) };
                    controller
                        .zip(id)
                        .and_then(|(controller, id)| controller.parameter_index_for_id(id))
                        .map_or(INVALID_PARAMETER_INDEX, |index| index as i32)
                }
            }

            /// # Safety
            /// `object` must be null or a live handle.
            #[unsafe(no_mangle)]
            pub unsafe extern "C" fn [<patcher_ $sample _object_get_num_parameters>](
                object: *const PatcherHandle<$sample>,
            ) -> u32 {
                ffi_guard_or! { 0;
                    unsafe { controller(object) }.map_or(0, |c| c.parameter_count() as u32)
                }
            }

            /// Fill `out` with the metadata of parameter `index`.
            ///
            /// # Safety
            /// `out` must be null or valid for one write.
            #[unsafe(no_mangle)]
            pub unsafe extern "C" fn [<patcher_ $sample _object_get_parameter_info>](
                object: *const PatcherHandle<$sample>,
                index: u32,
                out: *mut PatcherParameterInfo,
            ) -> PatcherStatus {
                ffi_guard! { unsafe { parameter_info(object, index, out) } }
            }

            /// Most recently applied value; 0 for an unknown index.
            ///
            /// # Safety
            /// `object` must be null or a live handle.
            #[unsafe(no_mangle)]
            pub unsafe extern "C" fn [<patcher_ $sample _object_get_parameter_value>](
                object: *const PatcherHandle<$sample>,
                index: u32,
            ) -> $sample {
                ffi_guard_or! { 0.0;
                    unsafe { controller(object) }
                        .map_or(0.0, |c| c.parameter_value(index as usize))
                }
            }

            /// Set a value at the start of the next processed block.
            ///
            /// # Safety
            /// `object` must be null or a live handle.
            #[unsafe(no_mangle)]
            pub unsafe extern "C" fn [<patcher_ $sample _object_set_parameter_value>](
                object: *const PatcherHandle<$sample>,
                index: u32,
                value: $sample,
            ) -> PatcherStatus {
                ffi_guard! {
                    match unsafe { controller(object) } {
                        Some(c) => status(c.set_parameter_value(index as usize, value)),
                        None => PatcherStatus::NullPointer,
                    }
                }
            }

            /// Set a value `offset_ms` after the current engine time.
            ///
            /// # Safety
            /// `object` must be null or a live handle.
            #[unsafe(no_mangle)]
            pub unsafe extern "C" fn [<patcher_ $sample _object_set_parameter_value_time>](
                object: *const PatcherHandle<$sample>,
                index: u32,
                value: $sample,
                offset_ms: f64,
            ) -> PatcherStatus {
                ffi_guard! {
                    match unsafe { controller(object) } {
                        Some(c) => status(c.set_parameter_value_at(index as usize, value, offset_ms)),
                        None => PatcherStatus::NullPointer,
                    }
                }
            }

            /// Lend `size` bytes at `data` to the engine under `id`.
            ///
            /// `release` fires exactly once with `id` and `data`: when the
            /// buffer is replaced or released, when the object is destroyed,
            /// or before this call returns if the registration is rejected.
            ///
            /// # Safety
            /// `data` must stay valid and unmodified until `release` fires.
            #[unsafe(no_mangle)]
            pub unsafe extern "C" fn [<patcher_ $sample _object_set_external_data>](
                object: *const PatcherHandle<$sample>,
                id: *const c_char,
                data: *mut c_char,
                size: usize,
                data_type: PatcherBufferType,
                release: PatcherReleaseCallback,
            ) -> PatcherStatus {
                ffi_guard! { unsafe { set_external_data(object, id, data, size, data_type, release) } }
            }

            /// Release the buffer registered under `id` at the next block.
            ///
            /// # Safety
            /// `id` must be null or a NUL-terminated string.
            #[unsafe(no_mangle)]
            pub unsafe extern "C" fn [<patcher_ $sample _object_release_external_data>](
                object: *const PatcherHandle<$sample>,
                id: *const c_char,
            ) -> PatcherStatus {
                ffi_guard! {
                    match (unsafe { controller(object) }, unsafe { c_str(id) }) {
                        (Some(c), Some(id)) => status(c.release_external_data(id)),
                        (None, _) => PatcherStatus::NullPointer,
                        (_, None) => PatcherStatus::InvalidArgument,
                    }
                }
            }

            /// Queue a MIDI message at `time_ms` on the engine clock.
            ///
            /// # Safety
            /// `data` must be null or valid for `len` reads.
            #[unsafe(no_mangle)]
            pub unsafe extern "C" fn [<patcher_ $sample _object_schedule_midi_event>](
                object: *const PatcherHandle<$sample>,
                time_ms: f64,
                port: u32,
                data: *const u8,
                len: usize,
            ) -> PatcherStatus {
                ffi_guard! { unsafe { schedule_midi_event(object, time_ms, port, data, len) } }
            }

            /// Engine time, in milliseconds, at which the next block starts.
            ///
            /// # Safety
            /// `object` must be null or a live handle.
            #[unsafe(no_mangle)]
            pub unsafe extern "C" fn [<patcher_ $sample _object_current_time>](
                object: *const PatcherHandle<$sample>,
            ) -> f64 {
                ffi_guard_or! { 0.0;
                    unsafe { controller(object) }.map_or(0.0, |c| c.current_time_ms())
                }
            }

            /// Apply `preset` at the next block. Takes ownership of `preset`
            /// whatever the outcome.
            ///
            /// # Safety
            /// `preset` must be null or come from this library and not be
            /// used afterwards.
            #[unsafe(no_mangle)]
            pub unsafe extern "C" fn [<patcher_ $sample _object_set_preset>](
                object: *const PatcherHandle<$sample>,
                preset: *mut Preset,
            ) -> PatcherStatus {
                ffi_guard! { unsafe { set_preset(object, preset) } }
            }

            /// Snapshot of the applied state. Free with `patcher_preset_destroy`.
            ///
            /// # Safety
            /// `object` must be null or a live handle.
            #[unsafe(no_mangle)]
            pub unsafe extern "C" fn [<patcher_ $sample _object_get_preset>](
                object: *const PatcherHandle<$sample>,
            ) -> *mut Preset {
                ffi_guard_ptr! {
                    match unsafe { controller(object) } {
                        Some(c) => Box::into_raw(Box::new(c.preset())),
                        None => ptr::null_mut(),
                    }
                }
            }
        }
    };
}

patcher_ffi!(f32);
patcher_ffi!(f64);

// ═══════════════════════════════════════════════════════════════════════════
// Shared Functions
// ═══════════════════════════════════════════════════════════════════════════

/// Get the default configuration values.
#[unsafe(no_mangle)]
pub extern "C" fn patcher_default_config() -> EngineConfig {
    EngineConfig::default()
}

/// Parse a serialized preset collection.
///
/// Returns null if the data is malformed. Free with
/// `patcher_preset_list_destroy`.
///
/// # Safety
/// `data` must be null or valid for `size` reads.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn patcher_preset_list_from_memory(
    data: *const u8,
    size: usize,
) -> *mut PresetList {
    ffi_guard_ptr! {
        if data.is_null() {
            return ptr::null_mut();
        }
        let bytes = unsafe { slice::from_raw_parts(data, size) };
        match PresetList::from_bytes(bytes) {
            Ok(list) => Box::into_raw(Box::new(list)),
            Err(err) => {
                log::warn!("failed to load preset collection: {}", err);
                ptr::null_mut()
            }
        }
    }
}

/// # Safety
/// `list` must be null or come from `patcher_preset_list_from_memory`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn patcher_preset_list_destroy(list: *mut PresetList) {
    ffi_guard_or! { ();
        if !list.is_null() {
            unsafe { drop(Box::from_raw(list)) };
        }
    }
}

/// Copy of the preset called `name`, or null.
///
/// The copy is independent of the list. Free it with
/// `patcher_preset_destroy` or hand it to `object_set_preset`.
///
/// # Safety
/// `list` must be null or a live list; `name` null or NUL-terminated.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn patcher_preset_list_preset_with_name(
    list: *const PresetList,
    name: *const c_char,
) -> *mut Preset {
    ffi_guard_ptr! {
        if list.is_null() {
            return ptr::null_mut();
        }
        let list = unsafe { &*list };
        unsafe { c_str(name) }
            .and_then(|name| list.preset_with_name(name))
            .map_or(ptr::null_mut(), |preset| Box::into_raw(Box::new(preset)))
    }
}

/// # Safety
/// `preset` must be null or an unconsumed preset from this library.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn patcher_preset_destroy(preset: *mut Preset) {
    ffi_guard_or! { ();
        if !preset.is_null() {
            unsafe { drop(Box::from_raw(preset)) };
        }
    }
}
