//! HID report state machine: decides what to send and when.
//!
//! Reports are throttled to a fixed 8 ms cadence and gated on change, but
//! liveness is guaranteed: after motion stops, three explicit all-zero
//! translation and rotation reports are sent before the device goes silent,
//! so relative-mode HID consumers always observe the terminating zero.

use core::future::Future;

use crate::keys::KEY_BYTES;
use crate::types::Velocity;

/// Fixed minimum spacing between successive report sends.
pub const REPORT_INTERVAL_MS: u32 = 8;

/// Trailing all-zero reports sent per group after motion stops.
pub const ZERO_REPORTS: u8 = 3;

/// Report ID for the translation payload (x/y/z, 6 bytes).
pub const REPORT_ID_TRANSLATION: u8 = 1;
/// Report ID for the rotation payload (rx/ry/rz, 6 bytes).
pub const REPORT_ID_ROTATION: u8 = 2;
/// Report ID for the button bitfield ([`KEY_BYTES`] bytes).
pub const REPORT_ID_KEYS: u8 = 3;

/// Error type for HID transport writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError {
    /// USB/communication I/O error.
    Io,
    /// Device not ready (e.g., USB not enumerated).
    NotReady,
    /// Endpoint busy.
    Busy,
}

/// Async sink for raw HID reports.
///
/// The transport has already negotiated the report descriptor (layout,
/// logical ranges, report IDs) out of band; the core only hands it finished
/// payloads.
///
/// # `no_std` Compatibility
///
/// All implementations must be `#![no_std]` compatible with no heap
/// allocation.
pub trait HidTransport {
    /// Send one report. Returns the number of payload bytes written.
    fn send_report(
        &mut self,
        report_id: u8,
        payload: &[u8],
    ) -> impl Future<Output = Result<usize, TransportError>>;
}

/// States of the report state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReportState {
    Init,
    Start,
    SendTranslation,
    SendRotation,
    SendKeys,
}

/// The per-report state machine. All timing fields live here so tests can
/// drive it with a simulated clock.
pub struct HidReporter {
    state: ReportState,
    last_sent_ms: u32,
    trans_zeros: u8,
    rot_zeros: u8,
    /// Jiggle workaround for hosts that only deliver input events on
    /// byte-level change.
    jiggle_enabled: bool,
    jiggle_bit: bool,
    prev_keys: [u8; KEY_BYTES],
    interval_ms: u32,
}

impl HidReporter {
    #[must_use]
    pub fn new(jiggle_enabled: bool) -> Self {
        Self {
            state: ReportState::Init,
            last_sent_ms: 0,
            trans_zeros: 0,
            rot_zeros: 0,
            jiggle_enabled,
            jiggle_bit: false,
            prev_keys: [0; KEY_BYTES],
            interval_ms: REPORT_INTERVAL_MS,
        }
    }

    /// Current state, for diagnostics.
    #[must_use]
    pub fn state(&self) -> ReportState {
        self.state
    }

    fn due(&self, now_ms: u32) -> bool {
        // subtract-then-compare: safe across the ~49 day counter wrap
        now_ms.wrapping_sub(self.last_sent_ms) >= self.interval_ms
    }

    fn keys_changed(&self, keys: Option<&[u8; KEY_BYTES]>) -> bool {
        keys.is_some_and(|k| *k != self.prev_keys)
    }

    /// Run one state-machine step.
    ///
    /// Call once per control-loop tick with the current velocity and, when
    /// keys are configured, the current button bitfield. Returns whether a
    /// report was actually transmitted this tick. A failed transport write
    /// leaves the state, the zero counters and the send clock untouched, so
    /// the report is retried on the next tick.
    pub async fn pump<T: HidTransport>(
        &mut self,
        now_ms: u32,
        velocity: &Velocity,
        keys: Option<&[u8; KEY_BYTES]>,
        transport: &mut T,
    ) -> bool {
        match self.state {
            ReportState::Init => {
                self.last_sent_ms = now_ms;
                self.trans_zeros = 0;
                self.rot_zeros = 0;
                self.jiggle_bit = false;
                self.state = ReportState::Start;
                false
            }
            ReportState::Start => {
                // evaluated every tick, without waiting for the interval
                if self.trans_zeros < ZERO_REPORTS
                    || self.rot_zeros < ZERO_REPORTS
                    || !velocity.is_zero()
                {
                    self.state = ReportState::SendTranslation;
                } else if self.keys_changed(keys) {
                    // nothing moved: skip straight to the key report
                    self.state = ReportState::SendKeys;
                } else if self.due(now_ms) {
                    // idle: keep the send clock nearby so the next report is
                    // not preceded by a stale-interval backlog
                    self.last_sent_ms = now_ms.wrapping_sub(self.interval_ms);
                }
                false
            }
            ReportState::SendTranslation => {
                if !self.due(now_ms) {
                    return false;
                }
                let mut payload = velocity.translation_bytes();
                if self.jiggle_enabled {
                    jiggle_values(&mut payload, self.jiggle_bit);
                }
                if transport
                    .send_report(REPORT_ID_TRANSLATION, &payload)
                    .await
                    .is_err()
                {
                    return false;
                }
                // advance by exactly one interval, not to "now": avoids creep
                self.last_sent_ms = self.last_sent_ms.wrapping_add(self.interval_ms);
                if velocity.translation_is_zero() {
                    self.trans_zeros = self.trans_zeros.saturating_add(1);
                } else {
                    self.trans_zeros = 0;
                }
                self.state = ReportState::SendRotation;
                true
            }
            ReportState::SendRotation => {
                if !self.due(now_ms) {
                    return false;
                }
                let mut payload = velocity.rotation_bytes();
                if self.jiggle_enabled {
                    jiggle_values(&mut payload, self.jiggle_bit);
                }
                if transport
                    .send_report(REPORT_ID_ROTATION, &payload)
                    .await
                    .is_err()
                {
                    return false;
                }
                if self.jiggle_enabled {
                    // toggle only every second report pair
                    self.jiggle_bit = !self.jiggle_bit;
                }
                self.last_sent_ms = self.last_sent_ms.wrapping_add(self.interval_ms);
                if velocity.rotation_is_zero() {
                    self.rot_zeros = self.rot_zeros.saturating_add(1);
                } else {
                    self.rot_zeros = 0;
                }
                self.state = if self.keys_changed(keys) {
                    ReportState::SendKeys
                } else {
                    ReportState::Start
                };
                true
            }
            ReportState::SendKeys => {
                // unreachable without configured keys; recover instead of wedging
                let Some(keys) = keys else {
                    self.state = ReportState::Start;
                    return false;
                };
                if !self.due(now_ms) {
                    return false;
                }
                if transport.send_report(REPORT_ID_KEYS, keys).await.is_err() {
                    return false;
                }
                self.last_sent_ms = self.last_sent_ms.wrapping_add(self.interval_ms);
                self.prev_keys = *keys;
                self.state = ReportState::Start;
                true
            }
        }
    }
}

/// Toggle the least-significant bit of each non-zero 16-bit word's low byte.
///
/// With `set` alternating between calls, every report differs from the
/// previous one at byte level even when the true values are unchanged.
fn jiggle_values(payload: &mut [u8; 6], set: bool) {
    for i in (0..6).step_by(2) {
        if (payload[i] != 0 || payload[i + 1] != 0) && set {
            payload[i] |= 1;
        } else {
            payload[i] &= 0xFE;
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::testutil::block_on;
    use std::vec::Vec;

    /// Transport recording every report, optionally failing on demand.
    struct MockTransport {
        sent: Vec<(u8, Vec<u8>)>,
        fail: bool,
    }

    impl MockTransport {
        fn new() -> Self {
            Self {
                sent: Vec::new(),
                fail: false,
            }
        }
    }

    impl HidTransport for MockTransport {
        fn send_report(
            &mut self,
            report_id: u8,
            payload: &[u8],
        ) -> impl core::future::Future<Output = Result<usize, TransportError>> {
            let result = if self.fail {
                Err(TransportError::Io)
            } else {
                self.sent.push((report_id, payload.to_vec()));
                Ok(payload.len())
            };
            core::future::ready(result)
        }
    }

    fn moving() -> Velocity {
        Velocity {
            tx: 100,
            ty: 0,
            tz: -50,
            rx: 0,
            ry: 25,
            rz: 0,
        }
    }

    /// Drive the reporter for `ticks` iterations, advancing the clock by one
    /// interval per tick.
    fn run(
        reporter: &mut HidReporter,
        transport: &mut MockTransport,
        start_ms: u32,
        ticks: u32,
        velocity: &Velocity,
        keys: Option<&[u8; KEY_BYTES]>,
    ) -> u32 {
        let mut now = start_ms;
        for _ in 0..ticks {
            block_on(reporter.pump(now, velocity, keys, transport));
            now = now.wrapping_add(REPORT_INTERVAL_MS);
        }
        now
    }

    #[test]
    fn test_motion_produces_alternating_reports() {
        let mut reporter = HidReporter::new(false);
        let mut transport = MockTransport::new();
        let v = moving();

        run(&mut reporter, &mut transport, 0, 10, &v, None);

        assert!(transport.sent.len() >= 4);
        for pair in transport.sent.chunks(2) {
            assert_eq!(pair[0].0, REPORT_ID_TRANSLATION);
            assert_eq!(pair[0].1, v.translation_bytes());
            if let Some(rot) = pair.get(1) {
                assert_eq!(rot.0, REPORT_ID_ROTATION);
                assert_eq!(rot.1, v.rotation_bytes());
            }
        }
    }

    #[test]
    fn test_liveness_exactly_three_zero_pairs() {
        let mut reporter = HidReporter::new(false);
        let mut transport = MockTransport::new();

        // move, then stop
        let now = run(&mut reporter, &mut transport, 0, 8, &moving(), None);
        transport.sent.clear();
        run(&mut reporter, &mut transport, now, 40, &Velocity::ZERO, None);

        let zeros_trans = transport
            .sent
            .iter()
            .filter(|(id, p)| *id == REPORT_ID_TRANSLATION && p.iter().all(|&b| b == 0))
            .count();
        let zeros_rot = transport
            .sent
            .iter()
            .filter(|(id, p)| *id == REPORT_ID_ROTATION && p.iter().all(|&b| b == 0))
            .count();
        assert_eq!(zeros_trans, ZERO_REPORTS as usize);
        assert_eq!(zeros_rot, ZERO_REPORTS as usize);
        // and then silence
        assert_eq!(transport.sent.len(), 2 * ZERO_REPORTS as usize);
    }

    #[test]
    fn test_interval_gates_sends() {
        let mut reporter = HidReporter::new(false);
        let mut transport = MockTransport::new();
        let v = moving();

        // init + start
        assert!(!block_on(reporter.pump(0, &v, None, &mut transport)));
        assert!(!block_on(reporter.pump(0, &v, None, &mut transport)));
        // due immediately relative to init at t=0? no: only 8 ms later
        assert!(!block_on(reporter.pump(4, &v, None, &mut transport)));
        assert!(block_on(reporter.pump(8, &v, None, &mut transport)));
        assert_eq!(transport.sent.len(), 1);
        // rotation waits for the next interval
        assert!(!block_on(reporter.pump(12, &v, None, &mut transport)));
        assert!(block_on(reporter.pump(16, &v, None, &mut transport)));
        assert_eq!(transport.sent.len(), 2);
    }

    #[test]
    fn test_key_change_without_motion_sends_keys_directly() {
        let mut reporter = HidReporter::new(false);
        let mut transport = MockTransport::new();

        // drain the zero counters first
        let now = run(
            &mut reporter,
            &mut transport,
            0,
            20,
            &Velocity::ZERO,
            Some(&[0; KEY_BYTES]),
        );
        transport.sent.clear();

        let keys = [0b0000_0100, 0, 0, 0];
        run(
            &mut reporter,
            &mut transport,
            now,
            4,
            &Velocity::ZERO,
            Some(&keys),
        );
        assert_eq!(transport.sent.len(), 1);
        assert_eq!(transport.sent[0].0, REPORT_ID_KEYS);
        assert_eq!(transport.sent[0].1, keys);

        // same key state again: nothing more to send
        transport.sent.clear();
        run(
            &mut reporter,
            &mut transport,
            now + 32,
            10,
            &Velocity::ZERO,
            Some(&keys),
        );
        assert!(transport.sent.is_empty());
    }

    #[test]
    fn test_keys_sent_after_rotation_when_moving() {
        let mut reporter = HidReporter::new(false);
        let mut transport = MockTransport::new();
        let keys = [1u8, 0, 0, 0];

        run(&mut reporter, &mut transport, 0, 8, &moving(), Some(&keys));

        let ids: Vec<u8> = transport.sent.iter().map(|(id, _)| *id).collect();
        let key_pos = ids.iter().position(|&id| id == REPORT_ID_KEYS).unwrap();
        assert!(key_pos >= 2);
        assert_eq!(ids[key_pos - 1], REPORT_ID_ROTATION);
        // key state is latched: sent exactly once
        assert_eq!(ids.iter().filter(|&&id| id == REPORT_ID_KEYS).count(), 1);
    }

    #[test]
    fn test_transport_failure_retries_same_report() {
        let mut reporter = HidReporter::new(false);
        let mut transport = MockTransport::new();
        let v = moving();

        block_on(reporter.pump(0, &v, None, &mut transport)); // init
        block_on(reporter.pump(0, &v, None, &mut transport)); // start -> trans

        transport.fail = true;
        assert!(!block_on(reporter.pump(8, &v, None, &mut transport)));
        assert!(!block_on(reporter.pump(16, &v, None, &mut transport)));
        assert_eq!(reporter.state(), ReportState::SendTranslation);

        transport.fail = false;
        assert!(block_on(reporter.pump(24, &v, None, &mut transport)));
        assert_eq!(transport.sent.len(), 1);
        assert_eq!(transport.sent[0].0, REPORT_ID_TRANSLATION);
        // the send clock only advanced by one interval on the successful send
        assert_eq!(reporter.state(), ReportState::SendRotation);
    }

    #[test]
    fn test_idle_clock_catches_up() {
        let mut reporter = HidReporter::new(false);
        let mut transport = MockTransport::new();

        // drain zero counters, then idle for a long time
        let now = run(&mut reporter, &mut transport, 0, 20, &Velocity::ZERO, None);
        transport.sent.clear();
        let idle_end = now + 10_000;
        assert!(!block_on(reporter.pump(
            idle_end,
            &Velocity::ZERO,
            None,
            &mut transport
        )));

        // motion resumes: exactly one report per interval, no backlog burst
        let v = moving();
        assert!(!block_on(reporter.pump(idle_end, &v, None, &mut transport)));
        assert!(block_on(reporter.pump(idle_end + 1, &v, None, &mut transport)));
        assert!(!block_on(reporter.pump(idle_end + 2, &v, None, &mut transport)));
        assert_eq!(transport.sent.len(), 1);
    }

    #[test]
    fn test_clock_wraparound() {
        let mut reporter = HidReporter::new(false);
        let mut transport = MockTransport::new();
        let v = moving();

        let start = u32::MAX - 11;
        run(&mut reporter, &mut transport, start, 6, &v, None);
        assert!(transport.sent.len() >= 2);
    }

    #[test]
    fn test_jiggle_alternates_low_bits() {
        let mut reporter = HidReporter::new(true);
        let mut transport = MockTransport::new();
        let v = Velocity {
            tx: 100,
            ty: 0,
            tz: 0,
            rx: 0,
            ry: 0,
            rz: 40,
        };

        run(&mut reporter, &mut transport, 0, 16, &v, None);

        let trans: Vec<&Vec<u8>> = transport
            .sent
            .iter()
            .filter(|(id, _)| *id == REPORT_ID_TRANSLATION)
            .map(|(_, p)| p)
            .collect();
        assert!(trans.len() >= 4);
        // successive translation reports differ in the jiggled low byte
        for pair in trans.windows(2) {
            assert_ne!(pair[0], pair[1]);
            // only the LSB of the non-zero word moves
            assert_eq!(pair[0][0] & 0xFE, pair[1][0] & 0xFE);
        }
        // zero words are never jiggled
        for p in &trans {
            assert_eq!(p[2], 0);
            assert_eq!(p[4], 0);
        }
    }

    #[test]
    fn test_jiggle_helper() {
        let mut payload = [100u8, 0, 0, 0, 0x00, 0x01];
        jiggle_values(&mut payload, true);
        assert_eq!(payload, [101, 0, 0, 0, 0x01, 0x01]);
        jiggle_values(&mut payload, false);
        assert_eq!(payload, [100, 0, 0, 0, 0x00, 0x01]);
    }

    #[test]
    fn test_send_keys_without_keys_resets_to_start() {
        let mut reporter = HidReporter::new(false);
        reporter.state = ReportState::SendKeys;
        let mut transport = MockTransport::new();
        assert!(!block_on(reporter.pump(
            0,
            &Velocity::ZERO,
            None,
            &mut transport
        )));
        assert_eq!(reporter.state(), ReportState::Start);
        assert!(transport.sent.is_empty());
    }
}
