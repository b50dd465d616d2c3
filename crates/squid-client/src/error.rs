use squid_frame::ErrorCode;
use squid_transport::TransportError;

/// Errors that can occur in client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Link, framing or timeout failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The controller rejected the request.
    #[error("protocol error {code}: {message}")]
    Protocol {
        code: ErrorCode,
        message: &'static str,
    },
}

impl ClientError {
    pub(crate) fn protocol(code: ErrorCode) -> Self {
        ClientError::Protocol {
            code,
            message: code.message(),
        }
    }

    /// The controller's error code, if the controller reported one.
    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            ClientError::Protocol { code, .. } => Some(*code),
            ClientError::Transport(_) => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ClientError::Transport(TransportError::Timeout(_)))
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
