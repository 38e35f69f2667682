//! Quadrature encoder wheel, decoded by polling.
//!
//! The control loop runs far faster than anyone can turn the wheel, so
//! sampling both phases once per tick is sufficient; no PIO program needed.

use embassy_rp::gpio::Input;
use spacemouse_core::EncoderSource;

/// Valid Gray-code transitions: +1 clockwise, -1 counter-clockwise, 0 for
/// no movement or an invalid (bounced) transition. Indexed by
/// `prev_state << 2 | state`.
const TRANSITIONS: [i32; 16] = [0, -1, 1, 0, 1, 0, 0, -1, -1, 0, 0, 1, 0, 1, -1, 0];

/// Quadrature steps per mechanical detent.
const STEPS_PER_DETENT: i32 = 4;

/// [`EncoderSource`] over two active-low quadrature phases.
pub struct QuadratureEncoder {
    phase_a: Input<'static>,
    phase_b: Input<'static>,
    prev_state: u8,
    steps: i32,
}

impl QuadratureEncoder {
    pub fn new(phase_a: Input<'static>, phase_b: Input<'static>) -> Self {
        let mut enc = Self {
            phase_a,
            phase_b,
            prev_state: 0,
            steps: 0,
        };
        enc.prev_state = enc.state();
        enc
    }

    fn state(&mut self) -> u8 {
        (u8::from(self.phase_a.is_high()) << 1) | u8::from(self.phase_b.is_high())
    }
}

impl EncoderSource for QuadratureEncoder {
    fn position(&mut self) -> i32 {
        let state = self.state();
        self.steps += TRANSITIONS[usize::from(self.prev_state << 2 | state)];
        self.prev_state = state;
        self.steps.div_euclid(STEPS_PER_DETENT)
    }
}
