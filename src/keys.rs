//! Key processor: debounced edge detection, kill keys and the HID button
//! bitfield.

use crate::types::Velocity;

/// Number of buttons the HID report descriptor advertises.
pub const HID_MAX_BUTTONS: usize = 32;

/// Width of the key report payload in bytes.
pub const KEY_BYTES: usize = HID_MAX_BUTTONS / 8;

/// Key settings shared by all keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyParams {
    /// A released key is re-armed only after staying released this long.
    pub debounce_ms: u32,
    /// Key index that zeroes the rotation group while held.
    pub kill_rot: Option<u8>,
    /// Key index that zeroes the translation group while held.
    pub kill_trans: Option<u8>,
}

impl Default for KeyParams {
    fn default() -> Self {
        Self {
            debounce_ms: 200,
            kill_rot: None,
            kill_trans: None,
        }
    }
}

/// One evaluated key scan.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyScan<const N: usize> {
    /// True for exactly one iteration after a press (edge event).
    pub pressed: [bool; N],
    /// True while the key is held, debounce-arbitrated.
    pub held: [bool; N],
}

impl<const N: usize> KeyScan<N> {
    pub const IDLE: Self = Self {
        pressed: [false; N],
        held: [false; N],
    };
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum KeyPhase {
    /// Armed: the next press fires an edge.
    Released,
    /// Held; the edge already fired.
    Pressed,
    /// Physically released but not yet re-armed.
    Cooldown { since_ms: u32 },
}

/// Debounced edge detector for `N` keys.
///
/// A key fires its edge exactly once per physical press, no matter how long
/// it is held, and is re-armed only after it is released and stays released
/// for the debounce duration. Bounce during the cooldown is treated as the
/// same press.
pub struct KeyProcessor<const N: usize> {
    params: KeyParams,
    phase: [KeyPhase; N],
}

impl<const N: usize> KeyProcessor<N> {
    #[must_use]
    pub fn new(params: KeyParams) -> Self {
        Self {
            params,
            phase: [KeyPhase::Released; N],
        }
    }

    /// Evaluate one key scan. `raw[i]` is the logical pressed-state.
    pub fn evaluate(&mut self, now_ms: u32, raw: &[bool; N]) -> KeyScan<N> {
        let mut scan = KeyScan::IDLE;
        for i in 0..N {
            match self.phase[i] {
                KeyPhase::Released => {
                    if raw[i] {
                        scan.pressed[i] = true;
                        scan.held[i] = true;
                        self.phase[i] = KeyPhase::Pressed;
                    }
                }
                KeyPhase::Pressed => {
                    if raw[i] {
                        scan.held[i] = true;
                    } else {
                        self.phase[i] = KeyPhase::Cooldown { since_ms: now_ms };
                    }
                }
                KeyPhase::Cooldown { since_ms } => {
                    if raw[i] {
                        // bounce: same press, no new edge
                        scan.held[i] = true;
                        self.phase[i] = KeyPhase::Pressed;
                    } else if now_ms.wrapping_sub(since_ms) >= self.params.debounce_ms {
                        self.phase[i] = KeyPhase::Released;
                    }
                }
            }
        }
        scan
    }
}

/// Zero velocity groups for held kill keys.
pub fn apply_kill_keys<const N: usize>(
    velocity: &mut Velocity,
    held: &[bool; N],
    params: &KeyParams,
) {
    if let Some(i) = params.kill_rot {
        if held.get(i as usize).copied().unwrap_or(false) {
            velocity.zero_rotation();
        }
    }
    if let Some(i) = params.kill_trans {
        if held.get(i as usize).copied().unwrap_or(false) {
            velocity.zero_translation();
        }
    }
}

/// Multiplex held keys into the HID button bitfield.
///
/// `button_list[i]` is the bit number key `i` reports as; byte `bit / 8`,
/// bit `bit % 8`.
#[must_use]
pub fn button_bitfield<const N: usize>(held: &[bool; N], button_list: &[u8; N]) -> [u8; KEY_BYTES] {
    let mut data = [0u8; KEY_BYTES];
    for i in 0..N {
        if held[i] {
            let bit = button_list[i] as usize % HID_MAX_BUTTONS;
            data[bit / 8] |= 1 << (bit % 8);
        }
    }
    data
}
