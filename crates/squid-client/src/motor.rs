use bytes::{Buf, BufMut};

/// Encoded size of one [`MotorCommand`].
pub const MOTOR_COMMAND_SIZE: usize = 16;

/// Move parameters for one axis.
///
/// Values go to the firmware as-is; it decides what is acceptable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MotorCommand {
    pub axis: u32,
    pub acceleration: u32,
    pub max_speed: u32,
    pub steps: u32,
}

impl MotorCommand {
    pub fn new(axis: u32, acceleration: u32, max_speed: u32, steps: u32) -> Self {
        Self {
            axis,
            acceleration,
            max_speed,
            steps,
        }
    }

    /// Four little-endian `u32`s: axis, acceleration, max speed, steps.
    pub fn encode(&self) -> [u8; MOTOR_COMMAND_SIZE] {
        let mut out = [0u8; MOTOR_COMMAND_SIZE];
        let mut dst = &mut out[..];
        dst.put_u32_le(self.axis);
        dst.put_u32_le(self.acceleration);
        dst.put_u32_le(self.max_speed);
        dst.put_u32_le(self.steps);
        out
    }

    /// Decode the first record in `src`. Returns `None` if it is too short.
    pub fn decode(mut src: &[u8]) -> Option<Self> {
        if src.len() < MOTOR_COMMAND_SIZE {
            return None;
        }
        Some(Self {
            axis: src.get_u32_le(),
            acceleration: src.get_u32_le(),
            max_speed: src.get_u32_le(),
            steps: src.get_u32_le(),
        })
    }

    /// Concatenate records into a move payload.
    pub fn encode_all(commands: &[MotorCommand]) -> Vec<u8> {
        let mut out = Vec::with_capacity(commands.len() * MOTOR_COMMAND_SIZE);
        for command in commands {
            out.extend_from_slice(&command.encode());
        }
        out
    }
}
