// src/main.rs
//
// Renders one second of the bundled synth through the library API and
// prints the output level of each block group.

use patcher::{
    CoreObject, DEFAULT_BLOCK_SIZE, DEFAULT_SAMPLE_RATE, EngineConfig, EngineResult, PresetList,
    simple_synth_factory,
};

const PRESETS: &str = r#"[
    { "name": "pluck", "preset": { "gain": 0.4, "attack": 2, "release": 150, "waveform": 1 } }
]"#;

/// ===============================
/// Main
/// ===============================

fn main() -> EngineResult<()> {
    let sample_rate = DEFAULT_SAMPLE_RATE;
    let block_frames = DEFAULT_BLOCK_SIZE;

    // --------------------------------
    // Engine
    // --------------------------------

    let factory = simple_synth_factory::<f32>();
    let mut synth = CoreObject::new(&factory, EngineConfig::default());
    synth.initialize()?;
    synth.prepare(sample_rate, block_frames)?;

    match PresetList::from_json(PRESETS) {
        Ok(list) => {
            if let Some(preset) = list.preset_with_name("pluck") {
                synth.apply_preset(preset)?;
            }
        }
        Err(err) => println!("Preset collection rejected: {}", err),
    }

    // --------------------------------
    // A short arpeggio
    // --------------------------------

    for (i, note) in [60u8, 64, 67, 72].into_iter().enumerate() {
        let on = i as f64 * 200.0;
        synth.schedule_midi_event(on, 0, &[0x90, note, 100])?;
        synth.schedule_midi_event(on + 150.0, 0, &[0x80, note, 0])?;
    }

    // --------------------------------
    // Render one second
    // --------------------------------

    println!("Rendering {} Hz, {} frame blocks…", sample_rate, block_frames);

    let mut left = vec![0.0f32; block_frames];
    let mut right = vec![0.0f32; block_frames];
    let blocks = (sample_rate as usize).div_ceil(block_frames);
    let group = blocks / 8;

    let (mut peak, mut sum_sq, mut count) = (0.0f32, 0.0f64, 0usize);
    for block in 0..blocks {
        synth.process(&[], &mut [left.as_mut_slice(), right.as_mut_slice()], block_frames);

        for &sample in left.iter().chain(&right) {
            peak = peak.max(sample.abs());
            sum_sq += (sample as f64) * (sample as f64);
            count += 1;
        }

        if (block + 1) % group == 0 || block + 1 == blocks {
            let rms = (sum_sq / count.max(1) as f64).sqrt();
            println!(
                "{:>7.1} ms  peak {:.3}  rms {:.3}",
                synth.current_time_ms(),
                peak,
                rms
            );
            (peak, sum_sq, count) = (0.0, 0.0, 0);
        }
    }

    println!("Render completed.");
    Ok(())
}
