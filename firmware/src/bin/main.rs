#![no_std]
#![no_main]

use defmt::{error, info, unwrap, warn};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_rp::adc::{Adc, Channel as AdcChannel, Config as AdcConfig};
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::peripherals::USB;
use embassy_rp::usb::Driver;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Instant, Timer};
use embassy_usb::class::hid::State;
use embassy_usb::{Builder, Config as UsbConfig};
use spacemouse_rp2040::{
    config, configure_usb_hid, GpioKeys, MuxAdcSource, QuadratureEncoder, SpaceMouse,
    UsbHidTransport,
};
use static_cell::StaticCell;

#[cfg(feature = "dev-panic")]
use panic_probe as _;
#[cfg(feature = "prod-panic")]
use panic_reset as _;

bind_interrupts!(struct Irqs {
    ADC_IRQ_FIFO => embassy_rp::adc::InterruptHandler;
    USBCTRL_IRQ => embassy_rp::usb::InterruptHandler<USB>;
});

/// Signal for the zeroing key. Latest-value semantics: holding the key down
/// is one request, not a queue of them.
static ZERO_REQUEST: StaticCell<Signal<CriticalSectionRawMutex, ()>> = StaticCell::new();

/// USB device configuration buffers.
static CONFIG_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static BOS_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static MSOS_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static CONTROL_BUF: StaticCell<[u8; 64]> = StaticCell::new();

/// HID state.
static HID_STATE: StaticCell<State> = StaticCell::new();

/// How often the loop-rate diagnostics are logged.
const RATE_LOG_INTERVAL: Duration = Duration::from_secs(10);

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("SpaceMouse starting...");

    let p = embassy_rp::init(embassy_rp::config::Config::default());

    let zero_request = ZERO_REQUEST.init(Signal::new());

    // --- ADC / multiplexer setup ---
    let adc = Adc::new(p.ADC, Irqs, AdcConfig::default());
    let mux_out = AdcChannel::new_pin(p.PIN_26, Pull::None);
    let select = [
        Output::new(p.PIN_2, Level::Low),
        Output::new(p.PIN_3, Level::Low),
        Output::new(p.PIN_4, Level::Low),
    ];
    let channels = MuxAdcSource::new(adc, mux_out, select, config::INVERT_CHANNELS);

    // --- Keys and encoder ---
    let keys = GpioKeys::new([
        Input::new(p.PIN_10, Pull::Up),
        Input::new(p.PIN_11, Pull::Up),
        Input::new(p.PIN_12, Pull::Up),
        Input::new(p.PIN_13, Pull::Up),
    ]);
    let zero_key = Input::new(p.PIN_15, Pull::Up);
    let encoder = QuadratureEncoder::new(
        Input::new(p.PIN_16, Pull::Up),
        Input::new(p.PIN_17, Pull::Up),
    );

    // --- USB Setup ---
    let usb_driver = Driver::new(p.USB, Irqs);

    let mut usb_config = UsbConfig::new(0x1209, 0x0001); // pid.codes test VID/PID
    usb_config.manufacturer = Some("Rust SpaceMouse");
    usb_config.product = Some("DIY 6-DoF SpaceMouse");
    usb_config.serial_number = Some("001");
    usb_config.max_power = 100;
    usb_config.max_packet_size_0 = 64;

    let config_descriptor = CONFIG_DESCRIPTOR.init([0; 256]);
    let bos_descriptor = BOS_DESCRIPTOR.init([0; 256]);
    let msos_descriptor = MSOS_DESCRIPTOR.init([0; 256]);
    let control_buf = CONTROL_BUF.init([0; 64]);

    let mut builder = Builder::new(
        usb_driver,
        usb_config,
        config_descriptor,
        bos_descriptor,
        msos_descriptor,
        control_buf,
    );

    // Configure HID class
    let hid_state = HID_STATE.init(State::new());
    let hid_writer = configure_usb_hid(&mut builder, hid_state);

    // Build the USB device
    let usb_device = builder.build();

    let mut transport = UsbHidTransport::new(hid_writer);

    unwrap!(spawner.spawn(usb_task(usb_device)));
    unwrap!(spawner.spawn(zero_key_task(zero_key, zero_request)));

    transport.wait_ready().await;
    info!("USB HID ready");

    let mut mouse = unwrap!(SpaceMouse::new(
        channels,
        keys,
        encoder,
        transport,
        config::default_parameters(),
        config::BUTTON_LIST,
    ));

    // startup zeroing; the device must be untouched until this finishes
    zero(&mut mouse).await;

    let mut ticks: u32 = 0;
    let mut sent: u32 = 0;
    let mut last_rate_log = Instant::now();

    loop {
        if zero_request.try_take().is_some() {
            zero(&mut mouse).await;
        }

        let now_ms = Instant::now().as_millis() as u32;
        if mouse.tick(now_ms).await {
            sent += 1;
        }
        ticks += 1;

        let elapsed = last_rate_log.elapsed();
        if elapsed >= RATE_LOG_INTERVAL {
            let secs = elapsed.as_secs() as u32;
            info!(
                "loop rate: {} Hz, {} reports/s, last velocity: {}",
                ticks / secs,
                sent / secs,
                mouse.last_velocity(),
            );
            ticks = 0;
            sent = 0;
            last_rate_log = Instant::now();
        }

        // yield so the USB task is never starved
        Timer::after_micros(250).await;
    }
}

/// Re-zero the device and report per-channel warnings.
async fn zero<C, K, E, T, const N: usize>(mouse: &mut SpaceMouse<C, K, E, T, N>)
where
    C: spacemouse_rp2040::ChannelSource,
    K: spacemouse_rp2040::KeySource<N>,
    E: spacemouse_rp2040::EncoderSource,
    T: spacemouse_rp2040::HidTransport,
{
    info!("zeroing ({} samples), hands off...", config::ZERO_SAMPLES);
    let now_ms = Instant::now().as_millis() as u32;
    match mouse.zero(now_ms, config::ZERO_SAMPLES).await {
        Ok(report) => {
            info!("zeroed, center: {}", report.center);
            for ch in 0..8 {
                if report.noisy[ch] {
                    warn!("channel {} is noisy, check wiring", ch);
                }
                if report.off_center[ch] {
                    warn!("channel {} idles off-center, check joystick seating", ch);
                }
            }
        }
        Err(e) => error!("zeroing failed: {:?}", e),
    }
}

/// USB device task - runs the USB stack.
#[embassy_executor::task]
async fn usb_task(mut device: embassy_usb::UsbDevice<'static, Driver<'static, USB>>) {
    device.run().await;
}

/// Zero key task - debounces the zeroing key and signals requests.
#[embassy_executor::task]
async fn zero_key_task(
    mut key: Input<'static>,
    request: &'static Signal<CriticalSectionRawMutex, ()>,
) {
    loop {
        key.wait_for_falling_edge().await;
        request.signal(());
        // one request per physical press
        Timer::after_millis(200).await;
        key.wait_for_high().await;
    }
}
