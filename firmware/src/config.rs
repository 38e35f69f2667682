//! Board configuration: pin assignments and default parameters.
//!
//! This is the one file to edit when adapting the firmware to a different
//! build. Everything here feeds [`Parameters::validate`] at startup, so a
//! bad combination refuses to start instead of misbehaving.
//!
//! # Hardware Configuration
//!
//! | Function        | GPIO      | Description                             |
//! |-----------------|-----------|-----------------------------------------|
//! | Mux select S0-S2| 2, 3, 4   | HC4051 analog multiplexer address       |
//! | Mux output      | 26 (ADC0) | Multiplexed joystick axes               |
//! | Keys 1-4        | 10-13     | Panel keys, active-low with pull-ups    |
//! | Zero key        | 15        | Re-zeroing request, active-low          |
//! | Encoder A/B     | 16, 17    | Quadrature wheel, active-low            |

use spacemouse_core::{EncoderMode, Parameters, VelocityChannel};

/// Number of panel keys wired to the board.
pub const NUM_KEYS: usize = 4;

/// HID button bit reported for each key, in key order.
pub const BUTTON_LIST: [u8; NUM_KEYS] = [0, 1, 2, 12];

/// Per-channel reading inversion (AX AY BX BY CX CY DX DY).
///
/// Set an entry when a joystick is mounted rotated so its raw reading grows
/// the wrong way.
pub const INVERT_CHANNELS: [bool; 8] = [false; 8];

/// Samples averaged for the startup zeroing.
pub const ZERO_SAMPLES: u32 = 500;

/// Microseconds for the mux output to settle after switching channels.
pub const MUX_SETTLE_US: u64 = 10;

/// Default parameters for this board.
///
/// The calibration bounds come from measuring this board's joysticks at
/// full deflection; re-measure when changing hardware.
#[must_use]
pub fn default_parameters() -> Parameters {
    let mut p = Parameters::default();
    // key 3 (HID bit 12) doubles as the rotation kill key
    p.keys.kill_rot = Some(3);
    // encoder wheel simulates the zoom axis
    p.encoder.mode = EncoderMode::Axis;
    p.encoder.axis = VelocityChannel::TransZ;
    p
}
