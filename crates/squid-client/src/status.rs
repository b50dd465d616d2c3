//! Decoding of version and status responses.

use std::fmt;

use squid_frame::{RESULT_BUSY, RESULT_SUCCESS};

/// Firmware version packed as one byte: major in the high nibble.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirmwareVersion {
    pub major: u8,
    pub minor: u8,
}

impl FirmwareVersion {
    pub fn from_byte(byte: u8) -> Self {
        Self {
            major: (byte >> 4) & 0x0F,
            minor: byte & 0x0F,
        }
    }

    /// `None` when the controller sent no version byte.
    pub fn from_payload(payload: &[u8]) -> Option<Self> {
        payload.first().copied().map(Self::from_byte)
    }
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Axis bit masks reported by the controller. Bit `n` is axis `n + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MotorStatus {
    /// Axes currently moving.
    pub active: u16,
    /// Axes that finished their last move.
    pub completed: u16,
    /// Raw driver STATUS pin levels.
    pub status_pins: u16,
}

impl MotorStatus {
    /// Newer firmware sends three little-endian `u16`s; older firmware
    /// sends one byte each for the active and completed masks.
    pub fn from_payload(payload: &[u8]) -> Self {
        if payload.len() >= 6 {
            return Self {
                active: u16::from_le_bytes([payload[0], payload[1]]),
                completed: u16::from_le_bytes([payload[2], payload[3]]),
                status_pins: u16::from_le_bytes([payload[4], payload[5]]),
            };
        }
        Self {
            active: payload.first().copied().unwrap_or(0).into(),
            completed: payload.get(1).copied().unwrap_or(0).into(),
            status_pins: 0,
        }
    }

    /// No axis is moving.
    pub fn is_idle(&self) -> bool {
        self.active == 0
    }

    pub fn is_active(&self, axis: u32) -> bool {
        axis_bit(axis).is_some_and(|bit| self.active & bit != 0)
    }

    pub fn is_completed(&self, axis: u32) -> bool {
        axis_bit(axis).is_some_and(|bit| self.completed & bit != 0)
    }

    pub fn active_axes(&self) -> Vec<u32> {
        axes_in(self.active)
    }

    pub fn completed_axes(&self) -> Vec<u32> {
        axes_in(self.completed)
    }
}

/// Stop and move responses carry a single result byte; zero means success.
pub(crate) fn result_ok(payload: &[u8]) -> bool {
    payload.first() == Some(&RESULT_SUCCESS)
}

/// The controller refused because axes are still moving.
pub(crate) fn result_busy(payload: &[u8]) -> bool {
    payload.first() == Some(&RESULT_BUSY)
}

fn axis_bit(axis: u32) -> Option<u16> {
    if (1..=16).contains(&axis) {
        Some(1 << (axis - 1))
    } else {
        None
    }
}

fn axes_in(mask: u16) -> Vec<u32> {
    (1..=16u32)
        .filter(|axis| mask & (1 << (axis - 1)) != 0)
        .collect()
}
