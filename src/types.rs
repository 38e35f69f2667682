//! Core space mouse types: channel indices, logical ranges, [`Velocity`].

/// Maximum raw ADC reading (10-bit converter).
pub const ADC_MAX: i16 = 1023;

/// Logical HID range for every velocity channel: values live in
/// `-SPACE_RANGE..=SPACE_RANGE`, matching the report descriptor.
pub const SPACE_RANGE: i16 = 350;

/// One raw or centered sample of all eight sensor channels.
pub type Sample = [i16; 8];

/// Indices into a [`Sample`] for the four joysticks A..D, each with an
/// X (depth) and a Y (tangential) axis. A is the front joystick, B right,
/// C back, D left.
pub mod channel {
    pub const AX: usize = 0;
    pub const AY: usize = 1;
    pub const BX: usize = 2;
    pub const BY: usize = 3;
    pub const CX: usize = 4;
    pub const CY: usize = 5;
    pub const DX: usize = 6;
    pub const DY: usize = 7;
}

/// One of the six velocity channels of the space mouse.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum VelocityChannel {
    TransX,
    TransY,
    TransZ,
    RotX,
    RotY,
    RotZ,
}

impl VelocityChannel {
    /// All channels in report order.
    pub const ALL: [Self; 6] = [
        Self::TransX,
        Self::TransY,
        Self::TransZ,
        Self::RotX,
        Self::RotY,
        Self::RotZ,
    ];

    /// Stable wire encoding for the parameter blob.
    #[must_use]
    pub const fn to_u8(self) -> u8 {
        self as u8
    }

    /// Inverse of [`to_u8`](Self::to_u8).
    #[must_use]
    pub const fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::TransX),
            1 => Some(Self::TransY),
            2 => Some(Self::TransZ),
            3 => Some(Self::RotX),
            4 => Some(Self::RotY),
            5 => Some(Self::RotZ),
            _ => None,
        }
    }
}

/// Six signed velocity channels produced once per control-loop iteration.
///
/// Invariant: every value is within `±`[`SPACE_RANGE`] once it leaves the
/// kinematics engine.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Velocity {
    pub tx: i16,
    pub ty: i16,
    pub tz: i16,
    pub rx: i16,
    pub ry: i16,
    pub rz: i16,
}

impl Velocity {
    /// All channels at rest.
    pub const ZERO: Self = Self {
        tx: 0,
        ty: 0,
        tz: 0,
        rx: 0,
        ry: 0,
        rz: 0,
    };

    /// True if no channel carries motion.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.translation_is_zero() && self.rotation_is_zero()
    }

    /// True if all three translation channels are zero.
    #[must_use]
    pub const fn translation_is_zero(&self) -> bool {
        self.tx == 0 && self.ty == 0 && self.tz == 0
    }

    /// True if all three rotation channels are zero.
    #[must_use]
    pub const fn rotation_is_zero(&self) -> bool {
        self.rx == 0 && self.ry == 0 && self.rz == 0
    }

    /// Sum of absolute translation magnitudes.
    #[must_use]
    pub const fn translation_sum(&self) -> u32 {
        self.tx.unsigned_abs() as u32 + self.ty.unsigned_abs() as u32 + self.tz.unsigned_abs() as u32
    }

    /// Sum of absolute rotation magnitudes.
    #[must_use]
    pub const fn rotation_sum(&self) -> u32 {
        self.rx.unsigned_abs() as u32 + self.ry.unsigned_abs() as u32 + self.rz.unsigned_abs() as u32
    }

    /// Force the translation group to zero (kill key, exclusive mode).
    pub fn zero_translation(&mut self) {
        self.tx = 0;
        self.ty = 0;
        self.tz = 0;
    }

    /// Force the rotation group to zero (kill key, exclusive mode).
    pub fn zero_rotation(&mut self) {
        self.rx = 0;
        self.ry = 0;
        self.rz = 0;
    }

    /// Swap the X and Y axes of both groups.
    pub fn swap_xy(&mut self) {
        core::mem::swap(&mut self.tx, &mut self.ty);
        core::mem::swap(&mut self.rx, &mut self.ry);
    }

    /// Swap the Y and Z axes of both groups (zoom direction option).
    pub fn swap_yz(&mut self) {
        core::mem::swap(&mut self.ty, &mut self.tz);
        core::mem::swap(&mut self.ry, &mut self.rz);
    }

    /// Read a single channel.
    #[must_use]
    pub const fn get(&self, ch: VelocityChannel) -> i16 {
        match ch {
            VelocityChannel::TransX => self.tx,
            VelocityChannel::TransY => self.ty,
            VelocityChannel::TransZ => self.tz,
            VelocityChannel::RotX => self.rx,
            VelocityChannel::RotY => self.ry,
            VelocityChannel::RotZ => self.rz,
        }
    }

    /// Mutable access to a single channel.
    pub fn get_mut(&mut self, ch: VelocityChannel) -> &mut i16 {
        match ch {
            VelocityChannel::TransX => &mut self.tx,
            VelocityChannel::TransY => &mut self.ty,
            VelocityChannel::TransZ => &mut self.tz,
            VelocityChannel::RotX => &mut self.rx,
            VelocityChannel::RotY => &mut self.ry,
            VelocityChannel::RotZ => &mut self.rz,
        }
    }

    /// Translation payload for HID report ID 1: x/y/z as little-endian
    /// low/high byte pairs.
    #[must_use]
    pub fn translation_bytes(&self) -> [u8; 6] {
        let x = self.tx.to_le_bytes();
        let y = self.ty.to_le_bytes();
        let z = self.tz.to_le_bytes();
        [x[0], x[1], y[0], y[1], z[0], z[1]]
    }

    /// Rotation payload for HID report ID 2.
    #[must_use]
    pub fn rotation_bytes(&self) -> [u8; 6] {
        let rx = self.rx.to_le_bytes();
        let ry = self.ry.to_le_bytes();
        let rz = self.rz.to_le_bytes();
        [rx[0], rx[1], ry[0], ry[1], rz[0], rz[1]]
    }
}
