//! Input traits: analog channels, digital keys, encoder position.

use core::future::Future;

use crate::types::Sample;

/// Async source of the eight raw analog channel values.
///
/// Implementations read the physical sensors (ADC, I2C Hall sensors, ...)
/// and apply any per-channel inversion configured for the board, so the
/// core always sees readings that grow in the documented direction.
///
/// # `no_std` Compatibility
///
/// All implementations must be `#![no_std]` compatible with no heap
/// allocation.
pub trait ChannelSource {
    /// Read the current value of all eight channels (0..=[`crate::types::ADC_MAX`]).
    fn read_channels(&mut self) -> impl Future<Output = Sample>;
}

/// Async source of the digital key states.
///
/// `true` means pressed. The physical wiring is typically active-low with
/// pull-ups; the implementation inverts, not the core.
pub trait KeySource<const N: usize> {
    /// Read the current pressed-state of all keys.
    fn read_keys(&mut self) -> impl Future<Output = [bool; N]>;
}

/// Source of a mechanical encoder position, in detents.
///
/// The core only ever looks at position deltas, so the absolute origin is
/// irrelevant.
pub trait EncoderSource {
    /// Current accumulated position.
    fn position(&mut self) -> i32;
}

/// Key source for builds without any keys.
pub struct NoKeys;

impl KeySource<0> for NoKeys {
    fn read_keys(&mut self) -> impl Future<Output = [bool; 0]> {
        core::future::ready([])
    }
}

/// Encoder source for builds without an encoder wheel.
pub struct NoEncoder;

impl EncoderSource for NoEncoder {
    fn position(&mut self) -> i32 {
        0
    }
}
