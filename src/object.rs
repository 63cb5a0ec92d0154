// src/object.rs
//
// An engine instance: one patcher behind a controller/processor pair.

use crate::bridge::{Controller, create_bridge};
use crate::config::EngineConfig;
use crate::engine::Processor;
use crate::error::EngineResult;
use crate::external_data::ExternalData;
use crate::parameter::ParameterInfo;
use crate::patcher::{Patcher, PatcherFactory};
use crate::preset::Preset;
use crate::sample::Sample;

/// Owned handle to one engine instance.
///
/// Lifecycle is `new -> initialize -> prepare -> process...`, with `prepare`
/// repeatable. Hosts that drive control and audio from different threads
/// use [`CoreObject::split`] to get the two halves.
pub struct CoreObject<S: Sample> {
    pub(crate) controller: Controller<S>,
    pub(crate) processor: Processor<S>,
}

impl<S: Sample> CoreObject<S> {
    /// Create an uninitialized instance of the topology built by `factory`.
    pub fn new(factory: &dyn PatcherFactory<S>, config: EngineConfig) -> Self {
        log::info!("creating engine instance '{}'", factory.name());
        Self::with_patcher(factory.create(), config)
    }

    pub fn with_patcher(patcher: Box<dyn Patcher<S>>, config: EngineConfig) -> Self {
        let (controller, processor) = create_bridge(patcher, config);
        Self {
            controller,
            processor,
        }
    }

    // ═══════════════════════════════════════════
    // Lifecycle and processing
    // ═══════════════════════════════════════════

    pub fn initialize(&mut self) -> EngineResult<()> {
        self.processor.initialize()
    }

    pub fn prepare(&mut self, sample_rate: f64, block_size: usize) -> EngineResult<()> {
        self.processor.prepare(sample_rate, block_size)
    }

    #[inline]
    pub fn process(&mut self, inputs: &[&[S]], outputs: &mut [&mut [S]], frames: usize) {
        self.processor.process(inputs, outputs, frames);
    }

    #[inline]
    pub fn process_interleaved(
        &mut self,
        input: &[S],
        input_channels: usize,
        output: &mut [S],
        output_channels: usize,
        frames: usize,
    ) {
        self.processor
            .process_interleaved(input, input_channels, output, output_channels, frames);
    }

    pub fn sample_rate(&self) -> f64 {
        self.processor.sample_rate()
    }

    pub fn block_size(&self) -> usize {
        self.processor.block_size()
    }

    pub fn controller(&self) -> &Controller<S> {
        &self.controller
    }

    /// Borrow the control half and the real-time half separately.
    pub fn split(&mut self) -> (&Controller<S>, &mut Processor<S>) {
        (&self.controller, &mut self.processor)
    }

    // ═══════════════════════════════════════════
    // Control
    // ═══════════════════════════════════════════

    pub fn parameter_count(&self) -> usize {
        self.controller.parameter_count()
    }

    pub fn parameter_info(&self, index: usize) -> Option<&ParameterInfo> {
        self.controller.parameter_info(index)
    }

    pub fn parameter_index_for_id(&self, id: &str) -> Option<usize> {
        self.controller.parameter_index_for_id(id)
    }

    pub fn parameter_value(&self, index: usize) -> S {
        self.controller.parameter_value(index)
    }

    pub fn set_parameter_value(&self, index: usize, value: S) -> EngineResult<()> {
        self.controller.set_parameter_value(index, value)
    }

    pub fn set_parameter_value_at(&self, index: usize, value: S, offset_ms: f64) -> EngineResult<()> {
        self.controller.set_parameter_value_at(index, value, offset_ms)
    }

    pub fn current_time_ms(&self) -> f64 {
        self.controller.current_time_ms()
    }

    pub fn schedule_midi_event(&self, time_ms: f64, port: usize, payload: &[u8]) -> EngineResult<()> {
        self.controller.schedule_midi_event(time_ms, port, payload)
    }

    pub fn set_external_data(&self, data: ExternalData) -> EngineResult<()> {
        self.controller.set_external_data(data)
    }

    pub fn release_external_data(&self, id: &str) -> EngineResult<()> {
        self.controller.release_external_data(id)
    }

    pub fn apply_preset(&self, preset: Preset) -> EngineResult<()> {
        self.controller.apply_preset(preset)
    }

    pub fn preset(&self) -> Preset {
        self.controller.preset()
    }
}

impl<S: Sample> Drop for CoreObject<S> {
    fn drop(&mut self) {
        log::info!("destroying engine instance");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_buffer::{AudioInputs, AudioOutputs};
    use crate::error::EngineError;
    use crate::event::MidiEvent;
    use crate::external_data::DataType;
    use crate::patcher::ProcessContext;
    use crate::preset::PresetList;
    use crate::synth::{SimpleSynth, params, simple_synth_factory};
    use std::sync::{Arc, Mutex};

    /// What a probe patcher observed, shared with the test.
    #[derive(Default)]
    struct Observed {
        /// (sample position, note) per delivered note-on
        notes: Vec<(u64, u8)>,
        /// (slice start, value of param 0) per processed slice
        values: Vec<(u64, f64)>,
        /// (sample position, first sample) per slice while "buf" is visible
        data_seen: Vec<(u64, f32)>,
        changed: Vec<String>,
        state: Vec<serde_json::Value>,
    }

    struct Probe {
        observed: Arc<Mutex<Observed>>,
        level: f64,
        pending_notes: Vec<u8>,
    }

    impl Patcher<f32> for Probe {
        fn parameters(&self) -> Vec<ParameterInfo> {
            vec![
                ParameterInfo::new("level").range(0.0, 1.0).default(0.25),
                ParameterInfo::new("mode").range(0.0, 3.0).steps(4),
            ]
        }

        fn num_inputs(&self) -> usize {
            1
        }

        fn num_outputs(&self) -> usize {
            1
        }

        fn prepare(&mut self, _sample_rate: f64, _max_block: usize) {}

        fn set_parameter(&mut self, index: usize, value: f64) {
            if index == 0 {
                self.level = value;
            }
        }

        fn handle_midi(&mut self, event: &MidiEvent) {
            self.pending_notes.push(event.data()[1]);
        }

        fn external_data_changed(&mut self, id: &str) {
            self.observed.lock().unwrap().changed.push(id.to_owned());
        }

        fn apply_state(&mut self, preset: &Preset) {
            if let Some(state) = preset.state("__probe") {
                self.observed.lock().unwrap().state.push(state.clone());
            }
        }

        fn process(
            &mut self,
            ctx: &ProcessContext<'_>,
            _inputs: &AudioInputs<'_, f32>,
            outputs: &mut AudioOutputs<'_, '_, f32>,
        ) {
            let mut observed = self.observed.lock().unwrap();
            for note in self.pending_notes.drain(..) {
                observed.notes.push((ctx.sample_pos, note));
            }
            observed.values.push((ctx.sample_pos, self.level));
            if let Some(first) = ctx
                .external_data("buf")
                .and_then(|data| data.samples_f32())
                .and_then(|samples| samples.first())
            {
                observed.data_seen.push((ctx.sample_pos, *first));
            }
            if let Some(out) = outputs.channel_mut(0) {
                out.fill(self.level as f32);
            }
        }
    }

    fn probe() -> (CoreObject<f32>, Arc<Mutex<Observed>>) {
        probe_with(EngineConfig::default())
    }

    fn probe_with(config: EngineConfig) -> (CoreObject<f32>, Arc<Mutex<Observed>>) {
        let observed = Arc::new(Mutex::new(Observed::default()));
        let patcher = Probe {
            observed: Arc::clone(&observed),
            level: 0.0,
            pending_notes: Vec::with_capacity(64),
        };
        let mut object = CoreObject::with_patcher(Box::new(patcher), config);
        object.initialize().unwrap();
        object.prepare(1000.0, 10).unwrap();
        (object, observed)
    }

    fn run(object: &mut CoreObject<f32>, frames: usize) -> Vec<f32> {
        let mut out = vec![-1.0f32; frames];
        object.process(&[], &mut [out.as_mut_slice()], frames);
        out
    }

    type ReleaseLog = Arc<Mutex<Vec<(String, usize)>>>;

    fn buffer(id: &str, samples: &mut [f32], log: &ReleaseLog) -> ExternalData {
        let log = Arc::clone(log);
        unsafe {
            ExternalData::from_raw_parts(
                id,
                samples.as_mut_ptr() as *mut u8,
                std::mem::size_of_val(samples),
                DataType::Float32 {
                    channels: 1,
                    sample_rate: 1000.0,
                },
                move |id: &str, address: *mut u8| {
                    log.lock().unwrap().push((id.to_owned(), address as usize));
                },
            )
        }
    }

    // ═══════════════════════════════════════════
    // Lifecycle
    // ═══════════════════════════════════════════

    #[test]
    fn test_end_to_end_with_bundled_synth() {
        let factory = simple_synth_factory::<f32>();
        let mut object = CoreObject::new(&factory, EngineConfig::default());
        object.initialize().unwrap();
        object.prepare(48_000.0, 128).unwrap();

        let input = vec![0.0f32; 128];
        let mut left = vec![1.0f32; 128];
        let mut right = vec![1.0f32; 128];
        object.process(
            &[input.as_slice(), input.as_slice()],
            &mut [left.as_mut_slice(), right.as_mut_slice()],
            128,
        );

        assert!(left.iter().chain(&right).all(|&v| v == 0.0));
        assert!((object.current_time_ms() - 128.0 / 48.0).abs() < 1e-9);
    }

    #[test]
    fn test_lifecycle_errors() {
        let mut object = CoreObject::<f64>::with_patcher(
            Box::new(SimpleSynth::<f64>::new()),
            EngineConfig::default(),
        );
        assert_eq!(object.prepare(48_000.0, 128), Err(EngineError::NotInitialized("prepare")));
        object.initialize().unwrap();
        assert_eq!(object.initialize(), Err(EngineError::AlreadyInitialized));
        assert!(matches!(
            object.prepare(0.0, 128),
            Err(EngineError::InvalidConfiguration { .. })
        ));
        assert!(object.prepare(44_100.0, 0).is_err());
        object.prepare(44_100.0, 64).unwrap();
        assert_eq!(object.block_size(), 64);
    }

    #[test]
    fn test_process_before_prepare_writes_silence() {
        let mut object = CoreObject::<f32>::with_patcher(
            Box::new(SimpleSynth::<f32>::new()),
            EngineConfig::default(),
        );
        let out = run(&mut object, 16);
        assert!(out.iter().all(|&v| v == 0.0));

        let mut interleaved = vec![1.0f32; 32];
        object.process_interleaved(&[], 0, &mut interleaved, 2, 16);
        assert!(interleaved.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_every_output_channel_gets_frames_samples() {
        let (mut object, _) = probe();
        let mut first = vec![-1.0f32; 25];
        let mut extra = vec![-1.0f32; 25];
        object.process(&[], &mut [first.as_mut_slice(), extra.as_mut_slice()], 25);

        assert!(first.iter().all(|&v| v == 0.25));
        assert!(extra.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_interleaved_matches_planar_shape() {
        let (mut object, _) = probe();
        let mut output = vec![-1.0f32; 3 * 12];
        object.process_interleaved(&[], 0, &mut output, 3, 12);

        for frame in output.chunks(3) {
            assert_eq!(frame, &[0.25, 0.0, 0.0]);
        }
    }

    #[test]
    fn test_interleaved_input_matches_planar() {
        fn synth() -> CoreObject<f32> {
            let mut object = CoreObject::<f32>::with_patcher(
                Box::new(SimpleSynth::new()),
                EngineConfig::default(),
            );
            object.initialize().unwrap();
            object.prepare(48_000.0, 64).unwrap();
            object.set_parameter_value(params::THRU, 1.0).unwrap();
            object.schedule_midi_event(1.0, 0, &[0x90, 69, 100]).unwrap();
            object
        }

        const FRAMES: usize = 150;
        let left: Vec<f32> = (0..FRAMES).map(|i| (i as f32 * 0.01).sin()).collect();
        let right: Vec<f32> = (0..FRAMES).map(|i| 0.5 - i as f32 / FRAMES as f32).collect();

        let mut planar = synth();
        let mut out_left = vec![0.0f32; FRAMES];
        let mut out_right = vec![0.0f32; FRAMES];
        planar.process(
            &[left.as_slice(), right.as_slice()],
            &mut [out_left.as_mut_slice(), out_right.as_mut_slice()],
            FRAMES,
        );

        let mut interleaved = synth();
        let input: Vec<f32> = left.iter().zip(&right).flat_map(|(&l, &r)| [l, r]).collect();
        let mut output = vec![0.0f32; 2 * FRAMES];
        interleaved.process_interleaved(&input, 2, &mut output, 2, FRAMES);

        assert!(out_left.iter().any(|&v| v != 0.0));
        for (i, frame) in output.chunks(2).enumerate() {
            assert_eq!(frame, &[out_left[i], out_right[i]], "frame {}", i);
        }
    }

    // ═══════════════════════════════════════════
    // Parameters
    // ═══════════════════════════════════════════

    #[test]
    fn test_defaults_applied_on_initialize() {
        let (object, _) = probe();
        assert_eq!(object.parameter_value(0), 0.25);
        assert_eq!(object.parameter_value(1), 0.0);
        assert_eq!(object.parameter_value(7), 0.0);
    }

    #[test]
    fn test_immediate_value_visible_after_one_block() {
        let (mut object, observed) = probe();
        object.set_parameter_value(0, 0.75).unwrap();
        assert_eq!(object.parameter_value(0), 0.25);

        run(&mut object, 10);
        assert_eq!(object.parameter_value(0), 0.75);
        assert_eq!(observed.lock().unwrap().values.last(), Some(&(0, 0.75)));
    }

    #[test]
    fn test_values_are_clamped_and_quantized() {
        let (mut object, _) = probe();
        object.set_parameter_value(0, 4.0).unwrap();
        object.set_parameter_value(1, 1.4).unwrap();
        run(&mut object, 10);
        assert_eq!(object.parameter_value(0), 1.0);
        assert_eq!(object.parameter_value(1), 1.0);
    }

    #[test]
    fn test_invalid_parameter_changes_are_rejected() {
        let (object, _) = probe();
        assert_eq!(
            object.set_parameter_value(9, 0.5),
            Err(EngineError::InvalidParameter { index: 9, count: 2 })
        );
        assert!(object.set_parameter_value(0, f32::NAN).is_err());
        assert!(object.set_parameter_value_at(0, 0.5, f64::INFINITY).is_err());
    }

    #[test]
    fn test_index_for_id_is_pure() {
        let (mut object, _) = probe();
        let before = object.parameter_index_for_id("mode");
        run(&mut object, 10);
        assert_eq!(object.parameter_index_for_id("mode"), before);
        assert_eq!(before, Some(1));
        assert_eq!(object.parameter_index_for_id("nope"), None);
    }

    #[test]
    fn test_scheduled_value_lands_at_its_frame() {
        let (mut object, observed) = probe();
        object.set_parameter_value_at(0, 0.5, 15.0).unwrap();

        run(&mut object, 10);
        assert_eq!(object.parameter_value(0), 0.25);

        let out = run(&mut object, 10);
        assert_eq!(object.parameter_value(0), 0.5);
        assert_eq!(&out[..5], &[0.25; 5]);
        assert_eq!(&out[5..], &[0.5; 5]);
        assert!(observed.lock().unwrap().values.contains(&(15, 0.5)));
    }

    #[test]
    fn test_same_time_changes_last_one_wins() {
        let (mut object, _) = probe();
        object.set_parameter_value_at(0, 0.1, 3.0).unwrap();
        object.set_parameter_value_at(0, 0.9, 3.0).unwrap();
        object.set_parameter_value_at(0, 0.6, 1.0).unwrap();

        let out = run(&mut object, 10);
        assert_eq!(out[0], 0.25);
        assert_eq!(out[1], 0.6);
        assert_eq!(out[3], 0.9);
        assert_eq!(object.parameter_value(0), 0.9);
    }

    #[test]
    fn test_immediate_and_scheduled_changes_keep_call_order() {
        let (mut object, _) = probe();
        object.set_parameter_value_at(0, 0.5, 0.0).unwrap();
        object.set_parameter_value(0, 0.75).unwrap();
        run(&mut object, 10);
        assert_eq!(object.parameter_value(0), 0.75);

        object.set_parameter_value(0, 0.1).unwrap();
        object.set_parameter_value_at(0, 0.3, 0.0).unwrap();
        run(&mut object, 10);
        assert_eq!(object.parameter_value(0), 0.3);

        object.set_parameter_value_at(0, 0.2, 0.0).unwrap();
        let mut preset = Preset::new();
        preset.set_value("level", 0.9);
        object.apply_preset(preset).unwrap();
        run(&mut object, 10);
        assert_eq!(object.parameter_value(0), 0.9);
    }

    // ═══════════════════════════════════════════
    // Events
    // ═══════════════════════════════════════════

    #[test]
    fn test_midi_delivered_in_time_order() {
        let (mut object, observed) = probe();
        object.schedule_midi_event(7.0, 0, &[0x90, 3, 1]).unwrap();
        object.schedule_midi_event(2.0, 0, &[0x90, 1, 1]).unwrap();
        object.schedule_midi_event(2.0, 0, &[0x90, 2, 1]).unwrap();
        object.schedule_midi_event(12.0, 0, &[0x90, 4, 1]).unwrap();

        run(&mut object, 10);
        run(&mut object, 10);

        let notes = observed.lock().unwrap().notes.clone();
        assert_eq!(notes, vec![(2, 1), (2, 2), (7, 3), (12, 4)]);
    }

    #[test]
    fn test_late_events_land_at_block_start() {
        let (mut object, observed) = probe();
        run(&mut object, 10);
        object.schedule_midi_event(1.0, 0, &[0x90, 9, 1]).unwrap();
        run(&mut object, 10);
        assert_eq!(observed.lock().unwrap().notes, vec![(10, 9)]);
    }

    #[test]
    fn test_event_limit_keeps_accepted_events_in_order() {
        let config = EngineConfig {
            pending_event_capacity: 2,
            ..EngineConfig::default()
        };
        let (mut object, observed) = probe_with(config);
        object.schedule_midi_event(100.0, 0, &[0x90, 100, 1]).unwrap();
        object.schedule_midi_event(101.0, 0, &[0x90, 101, 1]).unwrap();
        run(&mut object, 10);

        assert_eq!(
            object.schedule_midi_event(5.0, 0, &[0x90, 5, 1]),
            Err(EngineError::QueueFull("event"))
        );
        assert_eq!(
            object.set_parameter_value_at(0, 0.5, 0.0),
            Err(EngineError::QueueFull("event"))
        );

        for _ in 0..10 {
            run(&mut object, 10);
        }
        object.schedule_midi_event(5.0, 0, &[0x90, 5, 1]).unwrap();
        run(&mut object, 10);

        let notes = observed.lock().unwrap().notes.clone();
        assert_eq!(notes, vec![(100, 100), (101, 101), (110, 5)]);
    }

    #[test]
    fn test_oversized_payload_is_rejected() {
        let (object, _) = probe();
        let payload = [0u8; 17];
        assert!(matches!(
            object.schedule_midi_event(0.0, 0, &payload),
            Err(EngineError::PayloadTooLarge { len: 17, .. })
        ));
    }

    #[test]
    fn test_large_calls_are_chunked() {
        let (mut object, observed) = probe();
        object.schedule_midi_event(23.0, 0, &[0x90, 5, 1]).unwrap();
        let out = run(&mut object, 35);
        assert_eq!(out.len(), 35);
        assert!(out.iter().all(|&v| v == 0.25));
        assert_eq!(observed.lock().unwrap().notes, vec![(23, 5)]);
        assert!((object.current_time_ms() - 35.0).abs() < 1e-9);
    }

    // ═══════════════════════════════════════════
    // External data
    // ═══════════════════════════════════════════

    #[test]
    fn test_replacement_releases_old_buffer_once_before_new_is_seen() {
        let (mut object, observed) = probe();
        let log = ReleaseLog::default();
        let mut first = vec![1.0f32; 4];
        let mut second = vec![2.0f32; 4];
        let first_addr = first.as_ptr() as usize;

        object.set_external_data(buffer("buf", &mut first, &log)).unwrap();
        run(&mut object, 10);
        assert!(log.lock().unwrap().is_empty());

        object.set_external_data(buffer("buf", &mut second, &log)).unwrap();
        assert!(log.lock().unwrap().is_empty());
        run(&mut object, 10);

        assert_eq!(*log.lock().unwrap(), vec![("buf".to_owned(), first_addr)]);
        let seen = observed.lock().unwrap().data_seen.clone();
        assert_eq!(seen, vec![(0, 1.0), (10, 2.0)]);
        assert_eq!(observed.lock().unwrap().changed, vec!["buf", "buf"]);
    }

    #[test]
    fn test_explicit_release_and_unknown_id() {
        let (mut object, observed) = probe();
        let log = ReleaseLog::default();
        let mut samples = vec![1.0f32; 4];
        let addr = samples.as_ptr() as usize;

        object.set_external_data(buffer("buf", &mut samples, &log)).unwrap();
        run(&mut object, 10);
        object.release_external_data("buf").unwrap();
        assert_eq!(
            object.release_external_data("buf"),
            Err(EngineError::UnknownExternalData("buf".to_owned()))
        );
        run(&mut object, 10);

        assert_eq!(*log.lock().unwrap(), vec![("buf".to_owned(), addr)]);
        assert_eq!(observed.lock().unwrap().data_seen.len(), 1);
    }

    #[test]
    fn test_destroy_releases_registered_and_queued_buffers() {
        let (mut object, _) = probe();
        let log = ReleaseLog::default();
        let mut installed = vec![1.0f32; 4];
        let mut queued = vec![2.0f32; 4];

        object.set_external_data(buffer("a", &mut installed, &log)).unwrap();
        run(&mut object, 10);
        object.set_external_data(buffer("b", &mut queued, &log)).unwrap();
        drop(object);

        let mut released: Vec<String> =
            log.lock().unwrap().iter().map(|(id, _)| id.clone()).collect();
        released.sort();
        assert_eq!(released, vec!["a", "b"]);
    }

    #[test]
    fn test_registry_overflow_releases_rejected_buffer() {
        let config = EngineConfig {
            max_external_data: 1,
            ..EngineConfig::default()
        };
        let mut object = CoreObject::<f32>::with_patcher(Box::new(SimpleSynth::new()), config);
        object.initialize().unwrap();

        let log = ReleaseLog::default();
        let mut a = vec![0.0f32; 2];
        let mut b = vec![0.0f32; 2];
        object.set_external_data(buffer("a", &mut a, &log)).unwrap();
        assert_eq!(
            object.set_external_data(buffer("b", &mut b, &log)),
            Err(EngineError::TooManyExternalData("b".to_owned()))
        );
        assert_eq!(log.lock().unwrap().len(), 1);
        assert_eq!(log.lock().unwrap()[0].0, "b");
    }

    // ═══════════════════════════════════════════
    // Presets
    // ═══════════════════════════════════════════

    #[test]
    fn test_preset_applies_all_values_in_one_block() {
        let (mut object, observed) = probe();
        let list = PresetList::from_json(
            r#"[{ "name": "loud", "preset": {
                "level": { "value": 0.9 },
                "mode": 2,
                "unknown": 1,
                "__probe": { "x": 1 }
            } }]"#,
        )
        .unwrap();
        let preset = list.preset_with_name("loud").unwrap();

        object.apply_preset(preset).unwrap();
        assert_eq!(object.parameter_value(0), 0.25);

        run(&mut object, 10);
        assert_eq!(object.parameter_value(0), 0.9);
        assert_eq!(object.parameter_value(1), 2.0);
        assert_eq!(observed.lock().unwrap().values, vec![(0, 0.9)]);
        assert_eq!(observed.lock().unwrap().state, vec![serde_json::json!({ "x": 1 })]);
    }

    #[test]
    fn test_preset_snapshot_round_trips() {
        let (mut object, _) = probe();
        object.set_parameter_value(0, 0.6).unwrap();
        run(&mut object, 10);

        let snapshot = object.preset();
        assert_eq!(snapshot.value("level"), Some(0.6f32 as f64));

        object.set_parameter_value(0, 0.1).unwrap();
        run(&mut object, 10);
        object.apply_preset(snapshot).unwrap();
        run(&mut object, 10);
        assert_eq!(object.parameter_value(0), 0.6);
    }

    #[test]
    fn test_snapshot_carries_applied_state() {
        let (mut object, observed) = probe();
        let mut preset = Preset::new();
        preset.set_value("level", 0.5);
        preset.set_state("__probe", serde_json::json!({ "steps": [1, 2] }));
        object.apply_preset(preset).unwrap();
        run(&mut object, 10);

        let snapshot = object.preset();
        assert_eq!(snapshot.value("level"), Some(0.5));
        assert_eq!(
            snapshot.state("__probe"),
            Some(&serde_json::json!({ "steps": [1, 2] }))
        );

        object.apply_preset(snapshot).unwrap();
        run(&mut object, 10);
        let state = observed.lock().unwrap().state.clone();
        assert_eq!(state.len(), 2);
        assert_eq!(state[0], state[1]);
    }

    #[test]
    fn test_split_halves_work_across_threads() {
        let (mut object, _) = probe();
        let (controller, processor) = object.split();

        std::thread::scope(|scope| {
            scope.spawn(|| {
                for i in 0..50 {
                    controller
                        .schedule_midi_event(i as f64, 0, &[0x90, i as u8, 1])
                        .unwrap();
                }
            });
        });

        let mut out = vec![0.0f32; 10];
        for _ in 0..5 {
            processor.process(&[], &mut [out.as_mut_slice()], 10);
        }
        assert!((controller.current_time_ms() - 50.0).abs() < 1e-9);
    }
}
