//! Runtime parameters: the full tunable set, startup validation and the
//! versioned persisted-blob encoding.
//!
//! The blob layout is `magic u32 | version u8 | payload | crc8`, all
//! little-endian, checksummed with CRC-8/SMBUS. Any mismatch (magic,
//! version, checksum, truncation) invalidates the stored blob and the
//! defaults are used instead.

use crc::{Crc, CRC_8_SMBUS};

use crate::calibration::{CalibrationParams, DriftParams};
use crate::encoder::{EncoderMode, EncoderParams};
use crate::keys::{KeyParams, HID_MAX_BUTTONS};
use crate::kinematics::{KinematicsParams, Modifier};
use crate::types::VelocityChannel;

/// Identifies a spacemouse parameter blob.
pub const MAGIC: u32 = 0x534D_4B52; // "SMKR"

/// Bumped whenever the payload layout changes.
pub const VERSION: u8 = 1;

/// Total encoded size: magic + version + payload + crc.
pub const BLOB_LEN: usize = 4 + 1 + PAYLOAD_LEN + 1;

const PAYLOAD_LEN: usize = 113;

const CRC8: Crc<u8> = Crc::<u8>::new(&CRC_8_SMBUS);

/// Configuration errors. All of these are fatal at startup: a device with
/// an invalid configuration must not initialize rather than produce
/// silently-wrong output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// A sensitivity divisor is zero or negative.
    SensitivityNotPositive,
    /// A gate threshold is negative.
    GateNegative,
    /// The deadzone is negative or not strictly inside a channel's min/max.
    DeadzoneTooWide,
    /// A channel's min is not negative or max not positive.
    BoundsInverted,
    /// A kill-key index is not below the number of keys.
    KillKeyOutOfRange,
    /// An encoder key index is not below the number of keys.
    EncoderKeyOutOfRange,
    /// An encoder button bit exceeds [`HID_MAX_BUTTONS`].
    ButtonBitOutOfRange,
    /// The tangent shape factor must stay below π/2.
    TangentFactorOutOfRange,
}

/// Errors decoding a parameter blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParamError {
    /// Blob shorter than [`BLOB_LEN`].
    Truncated,
    /// Magic number mismatch: not a parameter blob.
    BadMagic,
    /// Layout version mismatch.
    BadVersion,
    /// Checksum failure: corrupted blob.
    BadChecksum,
    /// Decoded values failed validation.
    Invalid,
    /// Destination buffer too small for encoding.
    BufferTooSmall,
}

/// Errors from the persistent blob store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StoreError {
    /// Underlying storage I/O failure.
    Io,
    /// Nothing stored yet.
    Empty,
}

/// Persistent storage of an opaque parameter blob (EEPROM, flash, file).
///
/// Only ever used from the configuration path, never from the steady-state
/// control loop.
pub trait BlobStore {
    /// Read the stored blob into `buf`, returning its length.
    fn load(&mut self, buf: &mut [u8]) -> Result<usize, StoreError>;
    /// Replace the stored blob.
    fn save(&mut self, data: &[u8]) -> Result<(), StoreError>;
}

/// Every tunable scalar of the device.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Parameters {
    pub calibration: CalibrationParams,
    pub kinematics: KinematicsParams,
    pub drift: DriftParams,
    pub keys: KeyParams,
    pub encoder: EncoderParams,
    /// Enable the jiggle workaround in the HID reporter.
    pub jiggle: bool,
}

impl Parameters {
    /// Validate against the number of configured keys. Run once at startup;
    /// a failure must prevent the device from initializing.
    pub fn validate(&self, num_keys: usize) -> Result<(), ConfigError> {
        self.validate_values()?;

        for kill in [self.keys.kill_rot, self.keys.kill_trans] {
            if let Some(i) = kill {
                if usize::from(i) >= num_keys {
                    return Err(ConfigError::KillKeyOutOfRange);
                }
            }
        }

        if self.encoder.mode == EncoderMode::Keys {
            let (a, b) = (self.encoder.key_a, self.encoder.key_b);
            if usize::from(a) >= num_keys || usize::from(b) >= num_keys {
                return Err(ConfigError::EncoderKeyOutOfRange);
            }
            if usize::from(a) >= HID_MAX_BUTTONS || usize::from(b) >= HID_MAX_BUTTONS {
                return Err(ConfigError::ButtonBitOutOfRange);
            }
        }
        Ok(())
    }

    /// Key-count-independent value checks, shared between [`validate`]
    /// (startup) and [`decode`](Self::decode) (persisted blobs).
    ///
    /// [`validate`]: Self::validate
    fn validate_values(&self) -> Result<(), ConfigError> {
        let k = &self.kinematics;
        for sens in [
            k.sens_tx,
            k.sens_ty,
            k.sens_pos_tz,
            k.sens_neg_tz,
            k.sens_rx,
            k.sens_ry,
            k.sens_rz,
        ] {
            if sens <= 0.0 {
                return Err(ConfigError::SensitivityNotPositive);
            }
        }
        if k.gate_rx < 0 || k.gate_ry < 0 || k.gate_rz < 0 || k.gate_neg_tz < 0.0 {
            return Err(ConfigError::GateNegative);
        }
        if let Modifier::PowerTangent { b, .. } = k.modifier {
            if !(b > 0.0 && b < core::f32::consts::FRAC_PI_2) {
                return Err(ConfigError::TangentFactorOutOfRange);
            }
        }

        let c = &self.calibration;
        if c.deadzone < 0 {
            return Err(ConfigError::DeadzoneTooWide);
        }
        for i in 0..8 {
            if c.min_vals[i] >= 0 || c.max_vals[i] <= 0 {
                return Err(ConfigError::BoundsInverted);
            }
            // strict: keeps the piecewise remap divisor non-zero
            if c.deadzone >= -c.min_vals[i] || c.deadzone >= c.max_vals[i] {
                return Err(ConfigError::DeadzoneTooWide);
            }
        }
        Ok(())
    }

    /// Encode into `buf`, returning the blob length.
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, ParamError> {
        if buf.len() < BLOB_LEN {
            return Err(ParamError::BufferTooSmall);
        }
        let mut w = Writer { buf, pos: 0 };
        w.put_u32(MAGIC);
        w.put_u8(VERSION);

        let c = &self.calibration;
        w.put_i16(c.deadzone);
        for v in c.min_vals {
            w.put_i16(v);
        }
        for v in c.max_vals {
            w.put_i16(v);
        }

        let k = &self.kinematics;
        w.put_f32(k.sens_tx);
        w.put_f32(k.sens_ty);
        w.put_f32(k.sens_pos_tz);
        w.put_f32(k.sens_neg_tz);
        w.put_f32(k.gate_neg_tz);
        w.put_f32(k.sens_rx);
        w.put_f32(k.sens_ry);
        w.put_f32(k.sens_rz);
        w.put_i16(k.gate_rx);
        w.put_i16(k.gate_ry);
        w.put_i16(k.gate_rz);
        let (mod_kind, mod_a, mod_b) = match k.modifier {
            Modifier::Linear => (0u8, 0.0, 0.0),
            Modifier::Power { a } => (1, a, 0.0),
            Modifier::PowerTangent { a, b } => (2, a, b),
        };
        w.put_u8(mod_kind);
        w.put_f32(mod_a);
        w.put_f32(mod_b);
        let mut flags = 0u16;
        for (bit, on) in [
            k.inv_tx,
            k.inv_ty,
            k.inv_tz,
            k.inv_rx,
            k.inv_ry,
            k.inv_rz,
            k.swap_xy,
            k.swap_yz,
            k.exclusive,
            self.jiggle,
            self.drift.enabled,
        ]
        .into_iter()
        .enumerate()
        {
            if on {
                flags |= 1 << bit;
            }
        }
        w.put_u16(flags);

        w.put_u16(self.drift.num_points);
        w.put_u32(self.drift.wait_ms);
        w.put_i16(self.drift.max_spread);
        w.put_i16(self.drift.max_center_diff);

        w.put_u32(self.keys.debounce_ms);
        w.put_u8(self.keys.kill_rot.map_or(0xFF, |i| i));
        w.put_u8(self.keys.kill_trans.map_or(0xFF, |i| i));

        let e = &self.encoder;
        w.put_u8(match e.mode {
            EncoderMode::Off => 0,
            EncoderMode::Axis => 1,
            EncoderMode::Keys => 2,
        });
        w.put_u8(e.axis.to_u8());
        w.put_u16(e.echoes);
        w.put_f32(e.axis_strength);
        w.put_i32(e.key_strength);
        w.put_u8(e.key_a);
        w.put_u8(e.key_b);

        debug_assert_eq!(w.pos, 4 + 1 + PAYLOAD_LEN);
        let crc = CRC8.checksum(&w.buf[5..w.pos]);
        w.put_u8(crc);
        Ok(BLOB_LEN)
    }

    /// Decode a blob, verifying magic, version and checksum.
    pub fn decode(buf: &[u8]) -> Result<Self, ParamError> {
        if buf.len() < BLOB_LEN {
            return Err(ParamError::Truncated);
        }
        let mut r = Reader { buf, pos: 0 };
        if r.get_u32() != MAGIC {
            return Err(ParamError::BadMagic);
        }
        if r.get_u8() != VERSION {
            return Err(ParamError::BadVersion);
        }
        if CRC8.checksum(&buf[5..5 + PAYLOAD_LEN]) != buf[5 + PAYLOAD_LEN] {
            return Err(ParamError::BadChecksum);
        }

        let mut p = Parameters::default();
        let c = &mut p.calibration;
        c.deadzone = r.get_i16();
        for v in c.min_vals.iter_mut() {
            *v = r.get_i16();
        }
        for v in c.max_vals.iter_mut() {
            *v = r.get_i16();
        }

        let k = &mut p.kinematics;
        k.sens_tx = r.get_f32();
        k.sens_ty = r.get_f32();
        k.sens_pos_tz = r.get_f32();
        k.sens_neg_tz = r.get_f32();
        k.gate_neg_tz = r.get_f32();
        k.sens_rx = r.get_f32();
        k.sens_ry = r.get_f32();
        k.sens_rz = r.get_f32();
        k.gate_rx = r.get_i16();
        k.gate_ry = r.get_i16();
        k.gate_rz = r.get_i16();
        let mod_kind = r.get_u8();
        let mod_a = r.get_f32();
        let mod_b = r.get_f32();
        k.modifier = match mod_kind {
            0 => Modifier::Linear,
            1 => Modifier::Power { a: mod_a },
            2 => Modifier::PowerTangent { a: mod_a, b: mod_b },
            _ => return Err(ParamError::Invalid),
        };
        let flags = r.get_u16();
        k.inv_tx = flags & (1 << 0) != 0;
        k.inv_ty = flags & (1 << 1) != 0;
        k.inv_tz = flags & (1 << 2) != 0;
        k.inv_rx = flags & (1 << 3) != 0;
        k.inv_ry = flags & (1 << 4) != 0;
        k.inv_rz = flags & (1 << 5) != 0;
        k.swap_xy = flags & (1 << 6) != 0;
        k.swap_yz = flags & (1 << 7) != 0;
        k.exclusive = flags & (1 << 8) != 0;
        p.jiggle = flags & (1 << 9) != 0;
        p.drift.enabled = flags & (1 << 10) != 0;

        p.drift.num_points = r.get_u16();
        p.drift.wait_ms = r.get_u32();
        p.drift.max_spread = r.get_i16();
        p.drift.max_center_diff = r.get_i16();

        p.keys.debounce_ms = r.get_u32();
        p.keys.kill_rot = match r.get_u8() {
            0xFF => None,
            i => Some(i),
        };
        p.keys.kill_trans = match r.get_u8() {
            0xFF => None,
            i => Some(i),
        };

        let e = &mut p.encoder;
        e.mode = match r.get_u8() {
            0 => EncoderMode::Off,
            1 => EncoderMode::Axis,
            2 => EncoderMode::Keys,
            _ => return Err(ParamError::Invalid),
        };
        e.axis = VelocityChannel::from_u8(r.get_u8()).ok_or(ParamError::Invalid)?;
        e.echoes = r.get_u16();
        e.axis_strength = r.get_f32();
        e.key_strength = r.get_i32();
        e.key_a = r.get_u8();
        e.key_b = r.get_u8();

        // a checksum-valid blob can still carry unusable values
        p.validate_values().map_err(|_| ParamError::Invalid)?;
        Ok(p)
    }
}

/// Load parameters from the store, falling back to defaults on any error:
/// a mismatched or corrupted blob never bricks the device.
pub fn load_or_default<S: BlobStore>(store: &mut S) -> Parameters {
    let mut buf = [0u8; BLOB_LEN];
    match store.load(&mut buf) {
        Ok(len) if len >= BLOB_LEN => Parameters::decode(&buf).unwrap_or_default(),
        _ => Parameters::default(),
    }
}

/// Encode and persist parameters.
pub fn save<S: BlobStore>(store: &mut S, params: &Parameters) -> Result<(), StoreError> {
    let mut buf = [0u8; BLOB_LEN];
    // BLOB_LEN buffer by construction; encode cannot fail
    let len = params.encode(&mut buf).map_err(|_| StoreError::Io)?;
    store.save(&buf[..len])
}

struct Writer<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl Writer<'_> {
    fn put(&mut self, bytes: &[u8]) {
        self.buf[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
    }

    fn put_u8(&mut self, v: u8) {
        self.put(&[v]);
    }

    fn put_u16(&mut self, v: u16) {
        self.put(&v.to_le_bytes());
    }

    fn put_i16(&mut self, v: i16) {
        self.put(&v.to_le_bytes());
    }

    fn put_u32(&mut self, v: u32) {
        self.put(&v.to_le_bytes());
    }

    fn put_i32(&mut self, v: i32) {
        self.put(&v.to_le_bytes());
    }

    fn put_f32(&mut self, v: f32) {
        self.put(&v.to_le_bytes());
    }
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl Reader<'_> {
    fn take<const L: usize>(&mut self) -> [u8; L] {
        let mut out = [0u8; L];
        out.copy_from_slice(&self.buf[self.pos..self.pos + L]);
        self.pos += L;
        out
    }

    fn get_u8(&mut self) -> u8 {
        self.take::<1>()[0]
    }

    fn get_u16(&mut self) -> u16 {
        u16::from_le_bytes(self.take())
    }

    fn get_i16(&mut self) -> i16 {
        i16::from_le_bytes(self.take())
    }

    fn get_u32(&mut self) -> u32 {
        u32::from_le_bytes(self.take())
    }

    fn get_i32(&mut self) -> i32 {
        i32::from_le_bytes(self.take())
    }

    fn get_f32(&mut self) -> f32 {
        f32::from_le_bytes(self.take())
    }
}
