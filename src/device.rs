//! SpaceMouse orchestrator: wires sensors, calibration, kinematics, keys
//! and the HID reporter into one control-loop tick.

use crate::calibration::{self, center_and_filter, CalibrationError, DriftCompensator, ZeroReport};
use crate::encoder::{EncoderMode, EncoderWheel};
use crate::input::{ChannelSource, EncoderSource, KeySource};
use crate::keys::{apply_kill_keys, button_bitfield, KeyProcessor};
use crate::kinematics::compute_velocity;
use crate::params::{ConfigError, Parameters};
use crate::report::{HidReporter, HidTransport};
use crate::types::{Sample, Velocity, ADC_MAX};

/// The complete device pipeline.
///
/// One [`tick`](Self::tick) per control-loop iteration: read the raw
/// channels, compensate drift, center and filter, compute the velocity,
/// scan the keys, merge the encoder wheel and run one HID reporter step.
/// Single-writer by construction: all mutable state lives here.
///
/// `N` is the number of physical keys; `N = 0` disables the key path
/// entirely (no key report is ever sent).
pub struct SpaceMouse<C, K, E, T, const N: usize> {
    channels: C,
    key_source: K,
    encoder_source: E,
    transport: T,
    params: Parameters,
    button_list: [u8; N],
    center: Sample,
    drift: DriftCompensator,
    key_proc: KeyProcessor<N>,
    wheel: EncoderWheel,
    reporter: HidReporter,
    last_velocity: Velocity,
}

impl<C, K, E, T, const N: usize> SpaceMouse<C, K, E, T, N>
where
    C: ChannelSource,
    K: KeySource<N>,
    E: EncoderSource,
    T: HidTransport,
{
    /// Build the pipeline. Fails fast on invalid parameters so a
    /// misconfigured device never starts producing silently-wrong output.
    pub fn new(
        channels: C,
        key_source: K,
        mut encoder_source: E,
        transport: T,
        params: Parameters,
        button_list: [u8; N],
    ) -> Result<Self, ConfigError> {
        params.validate(N)?;
        let wheel = EncoderWheel::new(encoder_source.position());
        Ok(Self {
            channels,
            key_source,
            encoder_source,
            transport,
            button_list,
            center: [ADC_MAX / 2 + 1; 8],
            drift: DriftCompensator::new(params.drift),
            key_proc: KeyProcessor::new(params.keys),
            wheel,
            reporter: HidReporter::new(params.jiggle),
            params,
            last_velocity: Velocity::ZERO,
        })
    }

    /// Learn a new zero point, blocking everything else for the sampling
    /// window. Only a device reset cancels it.
    pub async fn zero(
        &mut self,
        now_ms: u32,
        num_samples: u32,
    ) -> Result<ZeroReport, CalibrationError> {
        let report = calibration::zero(&mut self.channels, num_samples).await?;
        self.center = report.center;
        self.drift.reset(now_ms);
        Ok(report)
    }

    /// Run one control-loop iteration. Returns whether a HID report was
    /// transmitted this tick.
    pub async fn tick(&mut self, now_ms: u32) -> bool {
        let raw = self.channels.read_channels().await;
        self.drift.update(now_ms, &raw, &mut self.center);
        let centered = center_and_filter(&raw, &self.center, &self.params.calibration);
        let mut velocity = compute_velocity(&centered, &self.params.kinematics);

        let raw_keys = self.key_source.read_keys().await;
        let mut scan = self.key_proc.evaluate(now_ms, &raw_keys);

        match self.params.encoder.mode {
            EncoderMode::Off => {}
            EncoderMode::Axis => {
                let pos = self.encoder_source.position();
                self.wheel.apply_axis(pos, &self.params.encoder, &mut velocity);
            }
            EncoderMode::Keys => {
                let pos = self.encoder_source.position();
                let (a, b) = self.wheel.key_pulses(pos, &self.params.encoder);
                if let Some(held) = scan.held.get_mut(self.params.encoder.key_a as usize) {
                    *held |= a;
                }
                if let Some(held) = scan.held.get_mut(self.params.encoder.key_b as usize) {
                    *held |= b;
                }
            }
        }

        apply_kill_keys(&mut velocity, &scan.held, &self.params.keys);
        self.last_velocity = velocity;

        if N > 0 {
            let keys = button_bitfield(&scan.held, &self.button_list);
            self.reporter
                .pump(now_ms, &velocity, Some(&keys), &mut self.transport)
                .await
        } else {
            self.reporter
                .pump(now_ms, &velocity, None, &mut self.transport)
                .await
        }
    }

    /// Current parameters.
    #[must_use]
    pub fn params(&self) -> &Parameters {
        &self.params
    }

    /// Replace the parameters after re-validation (configuration path, not
    /// the steady-state loop).
    pub fn set_params(&mut self, params: Parameters) -> Result<(), ConfigError> {
        params.validate(N)?;
        self.drift = DriftCompensator::new(params.drift);
        self.key_proc = KeyProcessor::new(params.keys);
        self.reporter = HidReporter::new(params.jiggle);
        self.params = params;
        Ok(())
    }

    /// Learned center, for diagnostics.
    #[must_use]
    pub fn center(&self) -> &Sample {
        &self.center
    }

    /// Velocity of the last tick, for the debug/telemetry output.
    #[must_use]
    pub fn last_velocity(&self) -> &Velocity {
        &self.last_velocity
    }
}
