//! Platform-agnostic six-degree-of-freedom space mouse engine.
//!
//! This crate turns eight raw joystick ADC channels into USB HID
//! translation/rotation reports without any platform-specific
//! dependencies. It can be used both in embedded `no_std` firmware and on
//! host for testing.
//!
//! # Overview
//!
//! The crate is organized into several modules:
//!
//! - [`types`]: Core data structures ([`Sample`], [`Velocity`])
//! - [`input`]: Hardware-facing traits ([`ChannelSource`], [`KeySource`], [`EncoderSource`])
//! - [`calibration`]: Zero-point learning, deadzone filtering, drift compensation
//! - [`kinematics`]: Channel geometry and sensitivity shaping ([`compute_velocity`])
//! - [`keys`]: Debounced keys, kill keys and the HID button bitfield
//! - [`encoder`]: Encoder wheel simulation ([`EncoderWheel`])
//! - [`report`]: HID report state machine ([`HidReporter`], [`HidTransport`])
//! - [`params`]: Persistent parameter blob ([`Parameters`], [`BlobStore`])
//! - [`device`]: Orchestrates one control-loop tick ([`SpaceMouse`])
//!
//! # Pipeline
//!
//! Each control-loop iteration runs the same fixed stages:
//!
//! ```text
//! read -> drift-compensate -> center/filter -> kinematics -> keys/encoder -> report
//! ```
//!
//! All stages take an explicit `now_ms` millisecond clock, so the whole
//! pipeline is host-testable with a simulated clock.
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: Enable defmt formatting (for embedded logging)
//!
//! # No-std Support
//!
//! This crate is `#![no_std]` by default and uses no heap allocations,
//! making it suitable for embedded systems with limited resources.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

pub mod calibration;
pub mod device;
pub mod encoder;
pub mod input;
pub mod keys;
pub mod kinematics;
pub mod params;
pub mod report;
pub mod types;

#[cfg(test)]
mod testutil;

// Re-export main types at crate root
pub use calibration::{CalibrationError, CalibrationParams, DriftCompensator, DriftParams, ZeroReport};
pub use device::SpaceMouse;
pub use encoder::{EncoderMode, EncoderParams, EncoderWheel};
pub use input::{ChannelSource, EncoderSource, KeySource, NoEncoder, NoKeys};
pub use keys::{KeyParams, KeyProcessor, KeyScan, HID_MAX_BUTTONS, KEY_BYTES};
pub use kinematics::{compute_velocity, KinematicsParams, Modifier};
pub use params::{BlobStore, ConfigError, ParamError, Parameters, StoreError, BLOB_LEN};
pub use report::{
    HidReporter, HidTransport, ReportState, TransportError, REPORT_INTERVAL_MS, ZERO_REPORTS,
};
pub use types::{Sample, Velocity, VelocityChannel, ADC_MAX, SPACE_RANGE};
