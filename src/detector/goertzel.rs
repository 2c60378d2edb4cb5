use std::f32::consts::TAU;

/// Tone presence threshold for one detection window. Calibrated against
/// int16-scale input over a 1024-sample window; neither the window length
/// nor the input gain is normalized out, so changing either requires
/// re-deriving this value.
const MAGNITUDE_THRESHOLD: f32 = 250_000.0;

/// Single-bin Goertzel magnitude estimator, tuned to one target frequency
/// at construction.
pub struct Goertzel {
    coeff: f32,
}

impl Goertzel {
    pub fn new(target_hz: f32, sample_rate_hz: f32) -> Self {
        let omega = TAU * target_hz / sample_rate_hz;
        Self {
            coeff: omega.cos() * 2.0,
        }
    }

    /// Magnitude of the target frequency component over one window.
    pub fn magnitude(&self, window: &[i16]) -> f32 {
        let mut q1 = 0.0f32;
        let mut q2 = 0.0f32;
        for &sample in window {
            let q0 = (self.coeff * q1) - q2 + f32::from(sample);
            q2 = q1;
            q1 = q0;
        }
        ((q1 * q1) + (q2 * q2) - (self.coeff * q1 * q2)).sqrt()
    }

    pub fn detect(&self, window: &[i16]) -> bool {
        self.magnitude(window) > MAGNITUDE_THRESHOLD
    }
}
