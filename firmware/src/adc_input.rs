//! Analog channel source: eight joystick axes behind an HC4051 multiplexer.
//!
//! The RP2040 exposes only four ADC-capable pins, so the eight joystick
//! axes are routed through an 8:1 analog multiplexer on a single ADC input,
//! addressed by three GPIO select lines.

use defmt::warn;
use embassy_rp::adc::{Adc, Async, Channel};
use embassy_rp::gpio::Output;
use embassy_time::Timer;
use spacemouse_core::{ChannelSource, Sample, ADC_MAX};

use crate::config::MUX_SETTLE_US;

/// [`ChannelSource`] over the multiplexed ADC.
///
/// Readings are scaled from the RP2040's 12-bit ADC to the 10-bit range the
/// core expects, and optionally inverted per channel for rotated joysticks.
pub struct MuxAdcSource<'d> {
    adc: Adc<'d, Async>,
    mux_out: Channel<'d>,
    select: [Output<'d>; 3],
    invert: [bool; 8],
    last: Sample,
}

impl<'d> MuxAdcSource<'d> {
    pub fn new(
        adc: Adc<'d, Async>,
        mux_out: Channel<'d>,
        select: [Output<'d>; 3],
        invert: [bool; 8],
    ) -> Self {
        Self {
            adc,
            mux_out,
            select,
            invert,
            last: [ADC_MAX / 2 + 1; 8],
        }
    }

    fn address(&mut self, ch: usize) {
        for (bit, line) in self.select.iter_mut().enumerate() {
            if ch & (1 << bit) != 0 {
                line.set_high();
            } else {
                line.set_low();
            }
        }
    }
}

impl ChannelSource for MuxAdcSource<'_> {
    async fn read_channels(&mut self) -> Sample {
        for ch in 0..8 {
            self.address(ch);
            Timer::after_micros(MUX_SETTLE_US).await;
            match self.adc.read(&mut self.mux_out).await {
                Ok(raw12) => {
                    // 12-bit -> 10-bit
                    let mut v = (raw12 >> 2) as i16;
                    if self.invert[ch] {
                        v = ADC_MAX - v;
                    }
                    self.last[ch] = v;
                }
                Err(e) => {
                    // keep the previous reading, one glitch must not twitch the axis
                    warn!("ADC read failed on channel {}: {:?}", ch, e);
                }
            }
        }
        self.last
    }
}
