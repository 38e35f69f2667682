//! Kinematics engine: maps the eight centered channel values onto the six
//! velocity channels.
//!
//! The channel-to-axis geometry is a design constant reflecting the sensor
//! placement (joystick A front, B right, C back, D left, X = depth axis,
//! Y = tangential axis):
//!
//! | velocity | combination              |
//! |----------|--------------------------|
//! | TransX   | `AY - CY`                |
//! | TransY   | `DY - BY`                |
//! | TransZ   | `-(AX + BX + CX + DX)`   |
//! | RotX     | `AX - CX`                |
//! | RotY     | `DX - BX`                |
//! | RotZ     | `AY + BY + CY + DY`      |

use libm::{fabsf, powf, roundf, tanf};

use crate::types::{channel::*, Sample, Velocity, SPACE_RANGE};

/// Nonlinear response curve applied to each velocity channel.
///
/// The curve operates on the normalized input `xn = x / 350 ∈ [-1, 1]` and
/// is odd-symmetric by construction, so direction never changes.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Modifier {
    /// No reshaping.
    Linear,
    /// `|xn|^a * sign(xn)`: flattens the response near zero.
    Power { a: f32 },
    /// `tan(b * |xn|^a * sign(xn)) / tan(b)`: flat near zero, amplified
    /// near the extremes. `b` must stay below `π/2`.
    PowerTangent { a: f32, b: f32 },
}

impl Modifier {
    /// Apply the curve. Input is clamped to `±`[`SPACE_RANGE`] first and the
    /// result is rounded and clamped back into the same range.
    #[must_use]
    pub fn apply(&self, x: f32) -> i16 {
        let limit = SPACE_RANGE as f32;
        let xn = x.clamp(-limit, limit) / limit;
        let shaped = match *self {
            Modifier::Linear => xn,
            Modifier::Power { a } => signed_pow(xn, a),
            Modifier::PowerTangent { a, b } => tanf(b * signed_pow(xn, a)) / tanf(b),
        };
        roundf((shaped * limit).clamp(-limit, limit)) as i16
    }
}

fn signed_pow(xn: f32, a: f32) -> f32 {
    let sign = if xn < 0.0 { -1.0 } else { 1.0 };
    powf(fabsf(xn), a) * sign
}

/// Per-axis sensitivities, gates and whole-vector options.
///
/// Sensitivities divide, so values below 1.0 make an axis more sensitive.
/// TransZ carries two sensitivities because pushing and pulling the knob
/// are physically asymmetric.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KinematicsParams {
    pub sens_tx: f32,
    pub sens_ty: f32,
    /// Sensitivity for pushing the knob down (positive Z).
    pub sens_pos_tz: f32,
    /// Sensitivity for pulling the knob up (negative Z).
    pub sens_neg_tz: f32,
    /// Additional deadzone on the negative-Z result.
    pub gate_neg_tz: f32,
    pub sens_rx: f32,
    pub sens_ry: f32,
    pub sens_rz: f32,
    /// Rotation results with a magnitude below the gate are forced to zero.
    pub gate_rx: i16,
    pub gate_ry: i16,
    pub gate_rz: i16,
    pub modifier: Modifier,
    pub inv_tx: bool,
    pub inv_ty: bool,
    pub inv_tz: bool,
    pub inv_rx: bool,
    pub inv_ry: bool,
    pub inv_rz: bool,
    /// Swap X and Y after the transform.
    pub swap_xy: bool,
    /// Swap Y and Z after the transform (zoom direction option).
    pub swap_yz: bool,
    /// Only report the dominant group (translation or rotation) per tick.
    pub exclusive: bool,
}

impl Default for KinematicsParams {
    fn default() -> Self {
        Self {
            sens_tx: 2.5,
            sens_ty: 2.5,
            sens_pos_tz: 15.0,
            sens_neg_tz: 7.0,
            gate_neg_tz: 0.01,
            sens_rx: 0.75,
            sens_ry: 0.75,
            sens_rz: 2.0,
            gate_rx: 1,
            gate_ry: 1,
            gate_rz: 1,
            modifier: Modifier::Linear,
            inv_tx: false,
            inv_ty: false,
            inv_tz: false,
            inv_rx: false,
            inv_ry: false,
            inv_rz: false,
            swap_xy: false,
            swap_yz: false,
            exclusive: false,
        }
    }
}

/// Compute the six velocity channels from one centered sample.
///
/// Every output is within `±`[`SPACE_RANGE`].
#[must_use]
pub fn compute_velocity(centered: &Sample, p: &KinematicsParams) -> Velocity {
    let c = |i: usize| f32::from(centered[i]);
    let mut v = Velocity::ZERO;

    v.tx = p.modifier.apply((c(AY) - c(CY)) / p.sens_tx);
    v.ty = p.modifier.apply((c(DY) - c(BY)) / p.sens_ty);

    // Pushing and pulling the knob differ: pulling upwards is much heavier,
    // so the negative side gets the modifier and its own gate while the
    // positive side stays linear.
    let tz_raw = -(c(AX) + c(BX) + c(CX) + c(DX));
    if tz_raw < 0.0 {
        v.tz = p.modifier.apply(tz_raw / p.sens_neg_tz);
        if fabsf(f32::from(v.tz)) < p.gate_neg_tz {
            v.tz = 0;
        }
    } else {
        let limit = SPACE_RANGE as f32;
        v.tz = roundf((tz_raw / p.sens_pos_tz).clamp(-limit, limit)) as i16;
    }

    v.rx = gate(p.modifier.apply((c(AX) - c(CX)) / p.sens_rx), p.gate_rx);
    v.ry = gate(p.modifier.apply((c(DX) - c(BX)) / p.sens_ry), p.gate_ry);
    v.rz = gate(
        p.modifier.apply((c(AY) + c(BY) + c(CY) + c(DY)) / p.sens_rz),
        p.gate_rz,
    );

    if p.inv_tx {
        v.tx = -v.tx;
    }
    if p.inv_ty {
        v.ty = -v.ty;
    }
    if p.inv_tz {
        v.tz = -v.tz;
    }
    if p.inv_rx {
        v.rx = -v.rx;
    }
    if p.inv_ry {
        v.ry = -v.ry;
    }
    if p.inv_rz {
        v.rz = -v.rz;
    }

    if p.swap_xy {
        v.swap_xy();
    }
    if p.swap_yz {
        v.swap_yz();
    }
    if p.exclusive {
        exclusive_mode(&mut v);
    }
    v
}

fn gate(value: i16, threshold: i16) -> i16 {
    if value.abs() < threshold {
        0
    } else {
        value
    }
}

/// Zero the weaker of the two velocity groups so a single gesture never
/// reports simultaneous translation and rotation drift. Ties zero the
/// rotation group.
pub fn exclusive_mode(v: &mut Velocity) {
    if v.rotation_sum() > v.translation_sum() {
        v.zero_translation();
    } else {
        v.zero_rotation();
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::types::VelocityChannel;

    fn centered_with(pairs: &[(usize, i16)]) -> Sample {
        let mut s = [0i16; 8];
        for &(i, v) in pairs {
            s[i] = v;
        }
        s
    }

    /// xorshift32, good enough for randomized range checks.
    struct Rng(u32);

    impl Rng {
        fn next(&mut self) -> u32 {
            let mut x = self.0;
            x ^= x << 13;
            x ^= x >> 17;
            x ^= x << 5;
            self.0 = x;
            x
        }

        fn sample(&mut self) -> i16 {
            // centered values span ±SPACE_RANGE
            (self.next() % 701) as i16 - 350
        }
    }

    #[test]
    fn test_modifier_zero_and_odd_symmetry() {
        let shapes = [
            Modifier::Linear,
            Modifier::Power { a: 2.0 },
            Modifier::Power { a: 1.15 },
            Modifier::PowerTangent { a: 1.0, b: 1.15 },
            Modifier::PowerTangent { a: 3.0, b: 1.5 },
        ];
        for shape in shapes {
            assert_eq!(shape.apply(0.0), 0, "{shape:?}");
            for x in [1.0f32, 17.5, 100.0, 349.0, 350.0, 1000.0] {
                assert_eq!(shape.apply(-x), -shape.apply(x), "{shape:?} x={x}");
            }
        }
    }

    #[test]
    fn test_modifier_preserves_endpoints() {
        let shapes = [
            Modifier::Linear,
            Modifier::Power { a: 2.0 },
            Modifier::PowerTangent { a: 1.15, b: 1.15 },
        ];
        for shape in shapes {
            assert_eq!(shape.apply(350.0), 350, "{shape:?}");
            assert_eq!(shape.apply(-350.0), -350, "{shape:?}");
        }
    }

    #[test]
    fn test_velocity_stays_in_logical_range() {
        let mut rng = Rng(0xBAD5EED);
        let mut p = KinematicsParams::default();
        // aggressive sensitivities to provoke overflow if clamping is missing
        p.sens_tx = 0.1;
        p.sens_ty = 0.1;
        p.sens_pos_tz = 0.1;
        p.sens_neg_tz = 0.1;
        p.sens_rx = 0.1;
        p.sens_ry = 0.1;
        p.sens_rz = 0.1;
        p.modifier = Modifier::PowerTangent { a: 1.15, b: 1.15 };

        for _ in 0..2000 {
            let mut centered = [0i16; 8];
            for ch in centered.iter_mut() {
                *ch = rng.sample();
            }
            let v = compute_velocity(&centered, &p);
            for ch in VelocityChannel::ALL {
                let val = v.get(ch);
                assert!((-350..=350).contains(&val), "{ch:?} = {val}");
            }
        }
    }

    #[test]
    fn test_single_channel_max_drives_one_axis() {
        let mut p = KinematicsParams::default();
        p.sens_tx = 1.0;
        // AY at +350 with everything else centered: full TransX, coupled RotZ
        let centered = centered_with(&[(AY, 350)]);
        let v = compute_velocity(&centered, &p);
        assert_eq!(v.tx, 350);
        assert_eq!(v.ty, 0);
        assert_eq!(v.tz, 0);
        assert_eq!(v.rx, 0);
        assert_eq!(v.ry, 0);
        // geometric coupling: AY also feeds RotZ (350 / 2.0)
        assert_eq!(v.rz, 175);
    }

    #[test]
    fn test_transx_is_ay_minus_cy() {
        let mut p = KinematicsParams::default();
        p.sens_tx = 2.0;
        // opposing tangential deflection of the front/back sticks
        let centered = centered_with(&[(AY, 100), (CY, -100)]);
        let v = compute_velocity(&centered, &p);
        assert_eq!(v.tx, 100);
        // the AY/CY contributions to RotZ cancel
        assert_eq!(v.rz, 0);
    }

    #[test]
    fn test_transz_push_pull_asymmetry() {
        let p = KinematicsParams::default();
        let pull = centered_with(&[(AX, 70), (BX, 70), (CX, 70), (DX, 70)]);
        let push = centered_with(&[(AX, -70), (BX, -70), (CX, -70), (DX, -70)]);
        let v_pull = compute_velocity(&pull, &p);
        let v_push = compute_velocity(&push, &p);
        // -280 / 7.0 = -40 (modifier is linear), +280 / 15.0 = 18.67 -> 19
        assert_eq!(v_pull.tz, -40);
        assert_eq!(v_push.tz, 19);
    }

    #[test]
    fn test_negative_z_gate_suppresses_light_pull() {
        let mut p = KinematicsParams::default();
        p.gate_neg_tz = 8.0;
        // light pull: -40 / 7.0 -> -6, inside the gate
        let light = centered_with(&[(AX, 10), (BX, 10), (CX, 10), (DX, 10)]);
        assert_eq!(compute_velocity(&light, &p).tz, 0);
        // firm pull: -80 / 7.0 -> -11, past the gate
        let firm = centered_with(&[(AX, 20), (BX, 20), (CX, 20), (DX, 20)]);
        assert_eq!(compute_velocity(&firm, &p).tz, -11);
        // the gate only guards the pull side: an equally light push passes
        let push = centered_with(&[(AX, -10), (BX, -10), (CX, -10), (DX, -10)]);
        assert_eq!(compute_velocity(&push, &p).tz, 3);
    }

    #[test]
    fn test_rotation_gate_forces_zero() {
        let mut p = KinematicsParams::default();
        p.gate_rz = 20;
        p.sens_rz = 1.0;
        let below = centered_with(&[(AY, 10), (CY, 9)]);
        let above = centered_with(&[(AY, 15), (CY, 15)]);
        assert_eq!(compute_velocity(&below, &p).rz, 0);
        assert_eq!(compute_velocity(&above, &p).rz, 30);
    }

    #[test]
    fn test_inversion_flags() {
        let mut p = KinematicsParams::default();
        p.sens_tx = 1.0;
        p.inv_tx = true;
        let centered = centered_with(&[(AY, 100), (CY, 100)]);
        // AY and CY cancel in TransX... use only AY
        let centered2 = centered_with(&[(AY, 100)]);
        assert_eq!(compute_velocity(&centered, &p).tx, 0);
        assert_eq!(compute_velocity(&centered2, &p).tx, -100);
    }

    #[test]
    fn test_swaps_apply_after_inversion() {
        let mut p = KinematicsParams::default();
        p.sens_tx = 1.0;
        p.swap_xy = true;
        let centered = centered_with(&[(AY, 100)]);
        let v = compute_velocity(&centered, &p);
        assert_eq!(v.tx, 0);
        assert_eq!(v.ty, 100);
    }

    #[test]
    fn test_exclusive_mode_invariant() {
        let mut rng = Rng(0xC0FFEE);
        let mut p = KinematicsParams::default();
        p.exclusive = true;
        for _ in 0..2000 {
            let mut centered = [0i16; 8];
            for ch in centered.iter_mut() {
                *ch = rng.sample();
            }
            let v = compute_velocity(&centered, &p);
            assert!(
                v.translation_is_zero() || v.rotation_is_zero(),
                "both groups non-zero: {v:?}"
            );
        }
    }

    #[test]
    fn test_exclusive_mode_keeps_dominant_group() {
        let mut v = Velocity {
            tx: 10,
            ty: 0,
            tz: 0,
            rx: 100,
            ry: 0,
            rz: 0,
        };
        exclusive_mode(&mut v);
        assert!(v.translation_is_zero());
        assert_eq!(v.rx, 100);

        let mut v = Velocity {
            tx: 100,
            ty: 0,
            tz: 0,
            rx: 10,
            ry: 0,
            rz: 0,
        };
        exclusive_mode(&mut v);
        assert!(v.rotation_is_zero());
        assert_eq!(v.tx, 100);
    }
}
