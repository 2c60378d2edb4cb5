
pub trait ToneGenerator {
    fn output(&self) -> f32;
    fn advance(&mut self);
}

pub mod dual_tone;

use crate::detector::dtmf;
use self::dual_tone::DualToneGenerator;

/// Per-tone amplitude that keeps the superposed pair well inside int16
/// range while staying far above the detector threshold at the probed
/// frequencies and below it everywhere else.
const SYNTH_AMPLITUDE: f32 = 0.5;

/// Synthesize `length` int16-scale samples of the given keypad symbol.
/// Returns None for characters outside the 16-key plan.
pub fn synthesize_symbol(symbol: char, sample_rate_hz: f32, length: usize) -> Option<Vec<i16>> {
    let (row_hz, column_hz) = dtmf::tone_pair(symbol)?;
    let mut generator = DualToneGenerator::new(row_hz, column_hz, sample_rate_hz, SYNTH_AMPLITUDE);
    Some(
        (0..length)
            .map(|_| {
                generator.advance();
                (generator.output() * f32::from(i16::MAX)) as i16
            })
            .collect(),
    )
}
