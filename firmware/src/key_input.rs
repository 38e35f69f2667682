//! Digital key source over pulled-up GPIOs.

use embassy_rp::gpio::Input;
use spacemouse_core::KeySource;

/// [`KeySource`] over `N` active-low inputs with internal pull-ups.
///
/// The core consumes logical pressed-state, so the inversion happens here.
pub struct GpioKeys<const N: usize> {
    pins: [Input<'static>; N],
}

impl<const N: usize> GpioKeys<N> {
    pub fn new(mut pins: [Input<'static>; N]) -> Self {
        for pin in &mut pins {
            pin.set_schmitt(true);
        }
        Self { pins }
    }
}

impl<const N: usize> KeySource<N> for GpioKeys<N> {
    fn read_keys(&mut self) -> impl core::future::Future<Output = [bool; N]> {
        core::future::ready(core::array::from_fn(|i| self.pins[i].is_low()))
    }
}
