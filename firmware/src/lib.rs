//! 6-DoF space mouse USB HID firmware for RP2040.
//!
//! Reads eight joystick axes through a multiplexed ADC, runs the
//! platform-agnostic space mouse engine and outputs USB HID motion reports.
//!
//! # Architecture
//!
//! The firmware uses the Embassy async runtime with three concurrent tasks:
//!
//! - **USB Task**: Manages the USB device stack
//! - **Zero Task**: Watches the zeroing key and signals re-zero requests
//! - **Control Loop**: Reads sensors and keys, runs one
//!   [`SpaceMouse::tick`] per iteration, sends HID reports
//!
//! The zero request crosses tasks via Embassy's
//! [`Signal`](embassy_sync::signal::Signal) with "latest value wins"
//! semantics; everything else lives in the single control loop.
//!
//! # Modules
//!
//! - [`adc_input`]: Multiplexed ADC channel source ([`MuxAdcSource`])
//! - [`key_input`]: Pulled-up GPIO key source ([`GpioKeys`])
//! - [`encoder_input`]: Polled quadrature wheel ([`QuadratureEncoder`])
//! - [`usb_hid`]: Report descriptor and HID transport ([`UsbHidTransport`])
//! - [`config`]: Board pinout and default parameters
//!
//! # Features
//!
//! - **`dev-panic`** (default): Use `panic-probe` for development (prints panic info via RTT)
//! - **`prod-panic`**: Use `panic-reset` for production (silent watchdog reset)

#![no_std]

// Re-export core types for convenience
pub use spacemouse_core::{
    ChannelSource, EncoderMode, EncoderSource, HidTransport, KeySource, Parameters, Sample,
    SpaceMouse, TransportError, Velocity, REPORT_INTERVAL_MS,
};

pub mod adc_input;
pub mod config;
pub mod encoder_input;
pub mod key_input;
pub mod usb_hid;

pub use adc_input::MuxAdcSource;
pub use encoder_input::QuadratureEncoder;
pub use key_input::GpioKeys;
pub use usb_hid::{configure_usb_hid, SpaceMouseRequestHandler, UsbHidTransport};
