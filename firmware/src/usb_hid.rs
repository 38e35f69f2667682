//! USB HID multi-axis controller output.

use embassy_usb::class::hid::{HidWriter, ReportId, RequestHandler, State};
use embassy_usb::control::OutResponse;
use embassy_usb::Builder;
use spacemouse_core::{HidTransport, TransportError};

/// Largest report on the wire: report ID byte + 6-byte axis payload.
pub const MAX_REPORT_LEN: usize = 7;

/// HID Report Descriptor for a 6-DoF multi-axis controller.
///
/// Three numbered reports:
/// - ID 1: translation X/Y/Z, three 16-bit values, logical range ±350
/// - ID 2: rotation Rx/Ry/Rz, same layout
/// - ID 3: 32 buttons, one bit each
///
/// Hosts with 3D-motion support (CAD packages in particular) recognize this
/// split-report layout.
pub const REPORT_DESCRIPTOR: &[u8] = &[
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x08, // Usage (Multi-axis Controller)
    0xA1, 0x01, // Collection (Application)
    //
    // --- Translation (report ID 1) ---
    0xA1, 0x00, //   Collection (Physical)
    0x85, 0x01, //     Report ID (1)
    0x09, 0x30, //     Usage (X)
    0x09, 0x31, //     Usage (Y)
    0x09, 0x32, //     Usage (Z)
    0x16, 0xA2, 0xFE, // Logical Minimum (-350)
    0x26, 0x5E, 0x01, // Logical Maximum (350)
    0x75, 0x10, //     Report Size (16)
    0x95, 0x03, //     Report Count (3)
    0x81, 0x02, //     Input (Data, Variable, Absolute)
    0xC0, //   End Collection
    //
    // --- Rotation (report ID 2) ---
    0xA1, 0x00, //   Collection (Physical)
    0x85, 0x02, //     Report ID (2)
    0x09, 0x33, //     Usage (Rx)
    0x09, 0x34, //     Usage (Ry)
    0x09, 0x35, //     Usage (Rz)
    0x16, 0xA2, 0xFE, // Logical Minimum (-350)
    0x26, 0x5E, 0x01, // Logical Maximum (350)
    0x75, 0x10, //     Report Size (16)
    0x95, 0x03, //     Report Count (3)
    0x81, 0x02, //     Input (Data, Variable, Absolute)
    0xC0, //   End Collection
    //
    // --- Buttons (report ID 3) ---
    0xA1, 0x02, //   Collection (Logical)
    0x85, 0x03, //     Report ID (3)
    0x05, 0x09, //     Usage Page (Button)
    0x19, 0x01, //     Usage Minimum (Button 1)
    0x29, 0x20, //     Usage Maximum (Button 32)
    0x15, 0x00, //     Logical Minimum (0)
    0x25, 0x01, //     Logical Maximum (1)
    0x75, 0x01, //     Report Size (1)
    0x95, 0x20, //     Report Count (32)
    0x81, 0x02, //     Input (Data, Variable, Absolute)
    0xC0, //   End Collection
    //
    0xC0, // End Collection
];

/// USB HID transport for the report state machine.
///
/// Wraps an embassy-usb HID writer; prepends the report ID byte the
/// descriptor's numbered reports require.
pub struct UsbHidTransport<'d> {
    writer: HidWriter<'d, embassy_rp::usb::Driver<'d, embassy_rp::peripherals::USB>, MAX_REPORT_LEN>,
}

impl<'d> UsbHidTransport<'d> {
    pub fn new(
        writer: HidWriter<
            'd,
            embassy_rp::usb::Driver<'d, embassy_rp::peripherals::USB>,
            MAX_REPORT_LEN,
        >,
    ) -> Self {
        Self { writer }
    }

    /// Wait until the device is ready (USB enumerated).
    pub async fn wait_ready(&mut self) {
        self.writer.ready().await;
    }
}

impl HidTransport for UsbHidTransport<'_> {
    async fn send_report(&mut self, report_id: u8, payload: &[u8]) -> Result<usize, TransportError> {
        let mut buf = [0u8; MAX_REPORT_LEN];
        let Some(data) = buf.get_mut(..payload.len() + 1) else {
            return Err(TransportError::Io);
        };
        data[0] = report_id;
        data[1..].copy_from_slice(payload);
        self.writer
            .write(data)
            .await
            .map_err(|_| TransportError::Io)?;
        Ok(payload.len())
    }
}

/// HID request handler (handles SET_REPORT, etc.).
///
/// Currently a no-op handler since we don't handle output reports.
pub struct SpaceMouseRequestHandler;

impl RequestHandler for SpaceMouseRequestHandler {
    fn get_report(&mut self, _id: ReportId, _buf: &mut [u8]) -> Option<usize> {
        None
    }

    fn set_report(&mut self, _id: ReportId, _data: &[u8]) -> OutResponse {
        OutResponse::Accepted
    }

    fn set_idle_ms(&mut self, _id: Option<ReportId>, _duration_ms: u32) {}

    fn get_idle_ms(&mut self, _id: Option<ReportId>) -> Option<u32> {
        None
    }
}

/// Configure the USB HID class in the USB builder.
///
/// Returns the HID writer for use by the application.
pub fn configure_usb_hid<'d>(
    builder: &mut Builder<'d, embassy_rp::usb::Driver<'d, embassy_rp::peripherals::USB>>,
    state: &'d mut State<'d>,
) -> HidWriter<'d, embassy_rp::usb::Driver<'d, embassy_rp::peripherals::USB>, MAX_REPORT_LEN> {
    let config = embassy_usb::class::hid::Config {
        report_descriptor: REPORT_DESCRIPTOR,
        request_handler: None,
        poll_ms: 1,
        max_packet_size: 8,
        hid_subclass: embassy_usb::class::hid::HidSubclass::No,
        hid_boot_protocol: embassy_usb::class::hid::HidBootProtocol::None,
    };

    embassy_usb::class::hid::HidWriter::new(builder, state, config)
}
