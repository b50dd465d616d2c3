use std::path::PathBuf;
use std::time::Duration;

use squid_frame::FrameError;

/// Errors that can occur on the link to the controller.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// No link is attached.
    #[error("not connected")]
    NotConnected,

    /// No valid frame arrived within the allowed time.
    #[error("timeout waiting for response ({0:?})")]
    Timeout(Duration),

    /// A complete frame arrived with a bad checksum.
    #[error("checksum error: {0}")]
    ChecksumError(FrameError),

    /// A packet could not be framed for sending.
    #[error("frame error: {0}")]
    Frame(FrameError),

    /// The peer closed the link.
    #[error("link closed by peer")]
    Closed,

    /// Failed to open the named port.
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Port auto-detection found nothing usable.
    #[error("no serial port found")]
    NoPortFound,

    /// An I/O error occurred on the link.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<FrameError> for TransportError {
    fn from(err: FrameError) -> Self {
        if err.is_checksum() {
            TransportError::ChecksumError(err)
        } else {
            TransportError::Frame(err)
        }
    }
}

impl From<serialport::Error> for TransportError {
    fn from(err: serialport::Error) -> Self {
        TransportError::Io(err.into())
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
