//! Encoder wheel: turns position deltas of a mechanical encoder into either
//! a simulated velocity channel or simulated key presses.
//!
//! The encoder reports positions but the space mouse reports velocities, so
//! both modes derive a filtered rate from the position delta.

use libm::roundf;

use crate::types::{Velocity, VelocityChannel, SPACE_RANGE};

/// How the encoder wheel feeds into the rest of the pipeline. The two
/// active modes are mutually exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EncoderMode {
    Off,
    /// Fade the delta into one velocity channel over several iterations
    /// (smooth zoom/throttle simulation).
    Axis,
    /// Convert the delta into key-press pulses, one key per direction.
    Keys,
}

/// Encoder wheel settings.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EncoderParams {
    pub mode: EncoderMode,
    /// Target channel in axis mode.
    pub axis: VelocityChannel,
    /// Iterations one delta is echoed over in axis mode.
    pub echoes: u16,
    /// Velocity per detent at full echo intensity in axis mode.
    pub axis_strength: f32,
    /// Pulse iterations per detent in key mode.
    pub key_strength: i32,
    /// Simulated key index for positive rotation in key mode.
    pub key_a: u8,
    /// Simulated key index for negative rotation in key mode.
    pub key_b: u8,
}

impl Default for EncoderParams {
    fn default() -> Self {
        Self {
            mode: EncoderMode::Off,
            axis: VelocityChannel::TransZ,
            echoes: 10,
            axis_strength: 15.0,
            key_strength: 2,
            key_a: 0,
            key_b: 1,
        }
    }
}

/// Runtime state of the encoder wheel.
pub struct EncoderWheel {
    prev_position: i32,
    delta: i32,
    echo: u16,
}

impl EncoderWheel {
    /// `initial_position` avoids a spurious jump on the first read.
    #[must_use]
    pub fn new(initial_position: i32) -> Self {
        Self {
            prev_position: initial_position,
            delta: 0,
            echo: u16::MAX,
        }
    }

    /// Axis mode: fade the last delta into `params.axis` with linearly
    /// decreasing intensity over `params.echoes` iterations.
    pub fn apply_axis(&mut self, position: i32, params: &EncoderParams, velocity: &mut Velocity) {
        if position != self.prev_position {
            self.delta = position - self.prev_position;
            self.prev_position = position;
            self.echo = 0;
        }
        if self.echo >= params.echoes {
            return;
        }
        let factor = 1.0 - f32::from(self.echo) / f32::from(params.echoes.max(1));
        let pull = roundf(factor * params.axis_strength * self.delta as f32) as i32;
        self.echo += 1;

        let ch = velocity.get_mut(params.axis);
        *ch = (i32::from(*ch) + pull).clamp(-i32::from(SPACE_RANGE), i32::from(SPACE_RANGE)) as i16;
    }

    /// Key mode: accumulate the delta into a pulse counter and hold one of
    /// the two direction keys pressed until it drains.
    pub fn key_pulses(&mut self, position: i32, params: &EncoderParams) -> (bool, bool) {
        if position != self.prev_position {
            self.delta += (position - self.prev_position) * params.key_strength;
            self.prev_position = position;
        }
        if self.delta > 0 {
            self.delta -= 1;
            (true, false)
        } else if self.delta < 0 {
            self.delta += 1;
            (false, true)
        } else {
            (false, false)
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;

    fn axis_params() -> EncoderParams {
        EncoderParams {
            mode: EncoderMode::Axis,
            axis: VelocityChannel::TransZ,
            echoes: 4,
            axis_strength: 10.0,
            ..EncoderParams::default()
        }
    }

    #[test]
    fn test_axis_fade_decreases_and_ends() {
        let mut wheel = EncoderWheel::new(0);
        let p = axis_params();

        // one detent forward
        let mut pulls = std::vec::Vec::new();
        for _ in 0..6 {
            let mut v = Velocity::ZERO;
            wheel.apply_axis(1, &p, &mut v);
            pulls.push(v.tz);
        }
        // 4 echoes fading linearly (10, 7.5->8, 5, 2.5->3), then nothing
        assert_eq!(pulls, std::vec![10, 8, 5, 3, 0, 0]);
    }

    #[test]
    fn test_axis_new_detent_restarts_fade() {
        let mut wheel = EncoderWheel::new(0);
        let p = axis_params();
        let mut v = Velocity::ZERO;
        wheel.apply_axis(1, &p, &mut v);
        assert_eq!(v.tz, 10);

        // turning again resets the echo counter at full intensity
        let mut v = Velocity::ZERO;
        wheel.apply_axis(3, &p, &mut v);
        assert_eq!(v.tz, 20); // delta of 2 detents
    }

    #[test]
    fn test_axis_clamps_to_logical_range() {
        let mut wheel = EncoderWheel::new(0);
        let p = axis_params();
        let mut v = Velocity::ZERO;
        v.tz = 345;
        wheel.apply_axis(5, &p, &mut v);
        assert_eq!(v.tz, 350);
    }

    #[test]
    fn test_key_pulses_drain_to_zero() {
        let mut wheel = EncoderWheel::new(0);
        let p = EncoderParams {
            mode: EncoderMode::Keys,
            key_strength: 2,
            ..EncoderParams::default()
        };

        // one detent forward -> 2 pulses on key a
        assert_eq!(wheel.key_pulses(1, &p), (true, false));
        assert_eq!(wheel.key_pulses(1, &p), (true, false));
        assert_eq!(wheel.key_pulses(1, &p), (false, false));

        // two detents back -> 4 pulses on key b
        for _ in 0..4 {
            assert_eq!(wheel.key_pulses(-1, &p), (false, true));
        }
        assert_eq!(wheel.key_pulses(-1, &p), (false, false));
    }
}
