//! Protocol constants shared with the controller firmware.
//!
//! Request codes live in `0x01..=0x7F`, responses echo them with the high bit
//! set (moves share a single response code), and `0xFF` is reserved for
//! error reports.

use std::fmt;

/// Start-of-frame sentinel (STX).
pub const START: u8 = 0x02;

/// Smallest valid frame: START + length (2) + command + checksum.
pub const MIN_FRAME_SIZE: usize = 5;

/// Largest frame the firmware accepts, sentinel and checksum included.
pub const MAX_FRAME_SIZE: usize = 256;

/// START + length (2) + command.
pub const HEADER_SIZE: usize = 4;

/// Largest payload that fits in one frame.
pub const MAX_PAYLOAD: usize = MAX_FRAME_SIZE - MIN_FRAME_SIZE;

/// Number of axes the firmware drives. Informational only.
pub const MAX_AXES: usize = 10;

/// Result byte reported by stop and move responses on success.
pub const RESULT_SUCCESS: u8 = 0x00;

/// Result byte reported when the controller is still executing a move.
pub const RESULT_BUSY: u8 = 0x01;

/// Request codes sent by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    Version = 0x01,
    Status = 0x02,
    Stop = 0x03,
    SyncMove = 0x10,
    AsyncMove = 0x11,
}

impl Command {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x01 => Some(Command::Version),
            0x02 => Some(Command::Status),
            0x03 => Some(Command::Stop),
            0x10 => Some(Command::SyncMove),
            0x11 => Some(Command::AsyncMove),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Command::Version => "VERSION",
            Command::Status => "STATUS",
            Command::Stop => "STOP",
            Command::SyncMove => "SYNC_MOVE",
            Command::AsyncMove => "ASYNC_MOVE",
        }
    }
}

impl From<Command> for u8 {
    fn from(command: Command) -> Self {
        command.code()
    }
}

/// Response codes sent by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Response {
    Version = 0x81,
    Status = 0x82,
    Stop = 0x83,
    Move = 0x90,
    Error = 0xFF,
}

impl Response {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x81 => Some(Response::Version),
            0x82 => Some(Response::Status),
            0x83 => Some(Response::Stop),
            0x90 => Some(Response::Move),
            0xFF => Some(Response::Error),
            _ => None,
        }
    }

    /// The response code the firmware answers a request with on success.
    pub fn expected_for(command: Command) -> Self {
        match command {
            Command::Version => Response::Version,
            Command::Status => Response::Status,
            Command::Stop => Response::Stop,
            Command::SyncMove | Command::AsyncMove => Response::Move,
        }
    }
}

impl From<Response> for u8 {
    fn from(response: Response) -> Self {
        response.code()
    }
}

/// Error codes carried in the first payload byte of an `ERROR` response.
///
/// Codes the firmware may add later land in [`ErrorCode::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    InvalidCommand,
    InvalidPacketLength,
    ChecksumError,
    InvalidMotorCount,
    MotorParamError,
    EmergencyStop,
    Timeout,
    Unknown(u8),
}

impl ErrorCode {
    pub fn from_code(code: u8) -> Self {
        match code {
            0x01 => ErrorCode::InvalidCommand,
            0x02 => ErrorCode::InvalidPacketLength,
            0x03 => ErrorCode::ChecksumError,
            0x04 => ErrorCode::InvalidMotorCount,
            0x05 => ErrorCode::MotorParamError,
            0x0B => ErrorCode::EmergencyStop,
            0x0D => ErrorCode::Timeout,
            other => ErrorCode::Unknown(other),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            ErrorCode::InvalidCommand => 0x01,
            ErrorCode::InvalidPacketLength => 0x02,
            ErrorCode::ChecksumError => 0x03,
            ErrorCode::InvalidMotorCount => 0x04,
            ErrorCode::MotorParamError => 0x05,
            ErrorCode::EmergencyStop => 0x0B,
            ErrorCode::Timeout => 0x0D,
            ErrorCode::Unknown(code) => code,
        }
    }

    /// Human-readable description of the code.
    pub fn message(self) -> &'static str {
        match self {
            ErrorCode::InvalidCommand => "Invalid command",
            ErrorCode::InvalidPacketLength => "Invalid packet length",
            ErrorCode::ChecksumError => "XOR checksum error",
            ErrorCode::InvalidMotorCount => "Invalid motor count",
            ErrorCode::MotorParamError => "Motor parameter validation error",
            ErrorCode::EmergencyStop => "Emergency stop triggered",
            ErrorCode::Timeout => "Timeout",
            ErrorCode::Unknown(_) => "Unknown error",
        }
    }
}

impl From<u8> for ErrorCode {
    fn from(code: u8) -> Self {
        ErrorCode::from_code(code)
    }
}

impl From<ErrorCode> for u8 {
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X}", self.code())
    }
}

/// Returns a human-readable name for a request or response code.
pub fn code_name(code: u8) -> &'static str {
    if let Some(command) = Command::from_code(code) {
        return command.name();
    }
    match Response::from_code(code) {
        Some(Response::Version) => "VERSION_RESPONSE",
        Some(Response::Status) => "STATUS_RESPONSE",
        Some(Response::Stop) => "STOP_RESPONSE",
        Some(Response::Move) => "MOVE_RESPONSE",
        Some(Response::Error) => "ERROR",
        None => "UNKNOWN",
    }
}
