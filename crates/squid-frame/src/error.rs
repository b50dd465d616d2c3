/// Errors that can occur while encoding, decoding or reassembling frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Fewer bytes than the smallest possible frame.
    #[error("frame too short ({len} bytes, min {})", crate::MIN_FRAME_SIZE)]
    FrameTooShort { len: usize },

    /// The first byte is not the start sentinel.
    #[error("invalid start byte 0x{found:02X} (expected 0xAA)")]
    InvalidStart { found: u8 },

    /// The length field disagrees with the number of bytes in the frame.
    #[error("length mismatch (declared {declared}, actual {actual})")]
    LengthMismatch { declared: usize, actual: usize },

    /// The declared frame length exceeds the protocol maximum.
    #[error("frame too long ({declared} bytes, max {max})")]
    FrameTooLong { declared: usize, max: usize },

    /// The trailing XOR byte does not match the computed checksum.
    #[error(
        "checksum mismatch (computed 0x{expected:02X}, received 0x{actual:02X})"
    )]
    ChecksumMismatch { expected: u8, actual: u8 },

    /// A payload does not fit in a single frame.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// An I/O error surfaced through the async codec.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FrameError {
    /// True for data corruption that must be reported instead of resynchronized.
    pub fn is_checksum(&self) -> bool {
        matches!(self, FrameError::ChecksumMismatch { .. })
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
