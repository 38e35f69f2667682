//! Calibration: blocking zero-point learning, deadzone filtering and the
//! drift compensator.

use crate::input::ChannelSource;
use crate::types::{Sample, ADC_MAX, SPACE_RANGE};

/// Per-channel min/max spread above which [`zero`] flags the channel as
/// noisy.
pub const NOISE_SPREAD_LIMIT: i16 = 10;

/// Band around the ADC midpoint in which an idle channel's center is
/// expected to land. A center outside this band usually means the axis was
/// touched (or is mechanically misadjusted) during zeroing.
pub const IDLE_BAND_LO: i16 = ADC_MAX / 2 - 128;
pub const IDLE_BAND_HI: i16 = ADC_MAX / 2 + 128;

/// Per-channel calibration bounds and the shared deadzone.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationParams {
    /// Most negative centered reading per channel, measured at full deflection.
    pub min_vals: [i16; 8],
    /// Most positive centered reading per channel.
    pub max_vals: [i16; 8],
    /// Centered readings with a magnitude below this are forced to zero.
    pub deadzone: i16,
}

impl Default for CalibrationParams {
    fn default() -> Self {
        Self {
            //          AX    AY    BX    BY    CX    CY    DX    DY
            min_vals: [-265, -260, -250, -230, -250, -260, -250, -230],
            max_vals: [265, 260, 250, 230, 250, 260, 250, 230],
            deadzone: 3,
        }
    }
}

/// Errors from the calibration routines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibrationError {
    /// `zero` was asked to average zero samples.
    NoSamples,
}

/// Result of a [`zero`] run: the learned center plus advisory warnings.
///
/// Warnings never block operation; they are surfaced so the operator can
/// investigate a noisy or touched axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ZeroReport {
    /// Per-channel mean over the sampling window: the new center.
    pub center: Sample,
    /// Channels whose min/max spread exceeded [`NOISE_SPREAD_LIMIT`].
    pub noisy: [bool; 8],
    /// Channels whose center fell outside the expected idle band.
    pub off_center: [bool; 8],
}

impl ZeroReport {
    /// True if any channel raised a warning.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        self.noisy.iter().chain(self.off_center.iter()).any(|&w| w)
    }
}

/// Learn the zero point by averaging `num_samples` raw samples per channel.
///
/// This deliberately blocks all other processing for the sampling duration:
/// zeroing is an explicit operator action and the device must be idle while
/// it runs.
pub async fn zero<S: ChannelSource>(
    source: &mut S,
    num_samples: u32,
) -> Result<ZeroReport, CalibrationError> {
    if num_samples == 0 {
        return Err(CalibrationError::NoSamples);
    }

    // i64: a full-scale reading over a multi-million-sample window must not
    // wrap the accumulator
    let mut sum = [0i64; 8];
    let mut lo = [i16::MAX; 8];
    let mut hi = [i16::MIN; 8];

    for _ in 0..num_samples {
        let raw = source.read_channels().await;
        for i in 0..8 {
            sum[i] += i64::from(raw[i]);
            lo[i] = lo[i].min(raw[i]);
            hi[i] = hi[i].max(raw[i]);
        }
    }

    let mut report = ZeroReport {
        center: [0; 8],
        noisy: [false; 8],
        off_center: [false; 8],
    };
    for i in 0..8 {
        report.center[i] = (sum[i] / i64::from(num_samples)) as i16;
        report.noisy[i] = hi[i] - lo[i] > NOISE_SPREAD_LIMIT;
        report.off_center[i] =
            report.center[i] < IDLE_BAND_LO || report.center[i] > IDLE_BAND_HI;
    }
    Ok(report)
}

/// Subtract the center, apply the deadzone and remap each channel onto
/// `±`[`SPACE_RANGE`].
///
/// Readings with a magnitude below the deadzone become exactly zero; the
/// rest are mapped piecewise linearly, `[min, -deadzone] -> [-350, 0]` and
/// `[deadzone, max] -> [0, 350]`. Readings beyond the calibrated min/max are
/// clamped instead of overflowing.
#[must_use]
pub fn center_and_filter(raw: &Sample, center: &Sample, params: &CalibrationParams) -> Sample {
    let mut out = [0i16; 8];
    for i in 0..8 {
        let c = raw[i] - center[i];
        out[i] = if c > -params.deadzone && c < params.deadzone {
            0
        } else if c < 0 {
            remap(c, params.min_vals[i], -params.deadzone, -SPACE_RANGE, 0)
        } else {
            remap(c, params.deadzone, params.max_vals[i], 0, SPACE_RANGE)
        };
    }
    out
}

/// Linear remap of `[in_lo, in_hi]` onto `[out_lo, out_hi]`, clamping the
/// input to its range first. `in_lo < in_hi` is guaranteed by parameter
/// validation.
fn remap(value: i16, in_lo: i16, in_hi: i16, out_lo: i16, out_hi: i16) -> i16 {
    let v = i32::from(value.clamp(in_lo, in_hi));
    let (in_lo, in_hi) = (i32::from(in_lo), i32::from(in_hi));
    let (out_lo, out_hi) = (i32::from(out_lo), i32::from(out_hi));
    (out_lo + (v - in_lo) * (out_hi - out_lo) / (in_hi - in_lo)) as i16
}

/// Drift compensation settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DriftParams {
    pub enabled: bool,
    /// Samples averaged for the new center once the wait has elapsed.
    pub num_points: u16,
    /// How long all channels must stay quiet before averaging starts.
    pub wait_ms: u32,
    /// Maximum raw min/max spread to still count as quiet.
    pub max_spread: i16,
    /// Maximum distance from the current center to still count as quiet.
    /// Drift beyond this is never compensated away.
    pub max_center_diff: i16,
}

impl Default for DriftParams {
    fn default() -> Self {
        Self {
            enabled: true,
            num_points: 50,
            wait_ms: 200,
            max_spread: 4,
            max_center_diff: 50,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DriftState {
    /// Collecting min/max bounds and waiting for the quiet dwell to elapse.
    Watching { since_ms: u32, lo: Sample, hi: Sample },
    /// Quiet long enough; accumulating the running mean.
    Averaging { sum: [i32; 8], count: u16 },
}

/// Non-blocking zero-point drift estimator.
///
/// While the raw readings stay within a small band of the center, this
/// accumulates a running mean and eventually nudges the center onto it,
/// recentering slow electrical or mechanical drift without operator
/// intervention. Any excursion outside the band restarts the observation.
pub struct DriftCompensator {
    params: DriftParams,
    state: DriftState,
}

impl DriftCompensator {
    #[must_use]
    pub fn new(params: DriftParams) -> Self {
        Self {
            params,
            state: DriftState::Watching {
                since_ms: 0,
                lo: [i16::MAX; 8],
                hi: [i16::MIN; 8],
            },
        }
    }

    /// Restart observation, e.g. after an explicit zeroing.
    pub fn reset(&mut self, now_ms: u32) {
        self.state = DriftState::Watching {
            since_ms: now_ms,
            lo: [i16::MAX; 8],
            hi: [i16::MIN; 8],
        };
    }

    fn quiet(&self, raw: &Sample, center: &Sample) -> bool {
        (0..8).all(|i| (raw[i] - center[i]).unsigned_abs() as i16 <= self.params.max_center_diff)
    }

    /// Feed one raw sample. Updates `center` in place and returns `true`
    /// when a recentering happened.
    pub fn update(&mut self, now_ms: u32, raw: &Sample, center: &mut Sample) -> bool {
        if !self.params.enabled {
            return false;
        }
        if !self.quiet(raw, center) {
            self.reset(now_ms);
            return false;
        }

        match &mut self.state {
            DriftState::Watching { since_ms, lo, hi } => {
                for i in 0..8 {
                    lo[i] = lo[i].min(raw[i]);
                    hi[i] = hi[i].max(raw[i]);
                }
                if (0..8).any(|i| hi[i] - lo[i] > self.params.max_spread) {
                    self.reset(now_ms);
                } else if now_ms.wrapping_sub(*since_ms) >= self.params.wait_ms {
                    self.state = DriftState::Averaging {
                        sum: [0; 8],
                        count: 0,
                    };
                }
                false
            }
            DriftState::Averaging { sum, count } => {
                for i in 0..8 {
                    sum[i] += i32::from(raw[i]);
                }
                *count += 1;
                if *count >= self.params.num_points.max(1) {
                    for i in 0..8 {
                        center[i] = (sum[i] / i32::from(*count)) as i16;
                    }
                    self.reset(now_ms);
                    true
                } else {
                    false
                }
            }
        }
    }
}
