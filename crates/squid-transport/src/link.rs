use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::PathBuf;
use std::time::Duration;

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::serial::{self, SerialConfig};

/// A byte link to the controller.
///
/// Reads must give up after the poll timeout with `TimedOut` or `WouldBlock`
/// so the transport can keep track of its overall deadline.
pub trait SerialLink: Read + Write + Send {
    /// Bound how long a single `read` may block.
    fn set_poll_timeout(&mut self, timeout: Duration) -> std::io::Result<()>;
}

impl SerialLink for dyn serialport::SerialPort {
    fn set_poll_timeout(&mut self, timeout: Duration) -> std::io::Result<()> {
        self.set_timeout(timeout).map_err(Into::into)
    }
}

impl<L: SerialLink + ?Sized> SerialLink for Box<L> {
    fn set_poll_timeout(&mut self, timeout: Duration) -> std::io::Result<()> {
        (**self).set_poll_timeout(timeout)
    }
}

impl SerialLink for TcpStream {
    fn set_poll_timeout(&mut self, timeout: Duration) -> std::io::Result<()> {
        self.set_read_timeout(Some(timeout))
    }
}

#[cfg(unix)]
impl SerialLink for std::os::unix::net::UnixStream {
    fn set_poll_timeout(&mut self, timeout: Duration) -> std::io::Result<()> {
        self.set_read_timeout(Some(timeout))
    }
}

/// Where the controller is reachable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// A local serial device such as `/dev/ttyUSB0` or `COM3`.
    Serial(PathBuf),
    /// A serial-over-TCP bridge, written `tcp://host:port`.
    Tcp(String),
}

impl Endpoint {
    pub fn parse(input: &str) -> Self {
        match input.strip_prefix("tcp://") {
            Some(addr) => Endpoint::Tcp(addr.to_string()),
            None => Endpoint::Serial(PathBuf::from(input)),
        }
    }

    /// Open the endpoint with reads bounded by `poll_interval`.
    pub fn open(
        &self,
        config: &SerialConfig,
        poll_interval: Duration,
    ) -> Result<Box<dyn SerialLink>> {
        match self {
            Endpoint::Serial(path) => {
                let port = serial::open(path, config, poll_interval)?;
                Ok(Box::new(port))
            }
            Endpoint::Tcp(addr) => {
                let stream = connect_tcp(addr, poll_interval)?;
                Ok(Box::new(stream))
            }
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Endpoint::Serial(path) => write!(f, "{}", path.display()),
            Endpoint::Tcp(addr) => write!(f, "tcp://{addr}"),
        }
    }
}

/// Connect to a serial-over-TCP bridge.
pub fn connect_tcp(addr: impl ToSocketAddrs, poll_interval: Duration) -> Result<TcpStream> {
    let mut stream = TcpStream::connect(addr)?;
    stream.set_nodelay(true)?;
    stream.set_poll_timeout(poll_interval)?;
    debug!(peer = ?stream.peer_addr().ok(), "connected to tcp bridge");
    Ok(stream)
}

pub(crate) fn open_error(
    path: impl Into<PathBuf>,
    source: impl Into<std::io::Error>,
) -> TransportError {
    TransportError::Open {
        path: path.into(),
        source: source.into(),
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;

    use super::*;

    #[test]
    fn parses_endpoints() {
        assert_eq!(
            Endpoint::parse("/dev/ttyUSB0"),
            Endpoint::Serial(PathBuf::from("/dev/ttyUSB0"))
        );
        assert_eq!(
            Endpoint::parse("tcp://10.0.0.7:4001"),
            Endpoint::Tcp("10.0.0.7:4001".to_string())
        );
        assert_eq!(Endpoint::parse("tcp://host:1").to_string(), "tcp://host:1");
    }

    #[test]
    fn tcp_link_applies_poll_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let stream = connect_tcp(addr, Duration::from_millis(20)).unwrap();
        let _server = listener.accept().unwrap();

        assert_eq!(
            stream.read_timeout().unwrap(),
            Some(Duration::from_millis(20))
        );
    }

    #[test]
    #[cfg(unix)]
    fn boxed_unix_stream_is_a_link() {
        let (left, _right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut link: Box<dyn SerialLink> = Box::new(left);
        link.set_poll_timeout(Duration::from_millis(5)).unwrap();

        let mut buf = [0u8; 4];
        let err = link.read(&mut buf).unwrap_err();
        assert!(matches!(
            err.kind(),
            std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
        ));
    }
}
