use std::io::ErrorKind;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use bytes::BytesMut;
use squid_frame::{encode_into, Packet, Reassembler, MAX_FRAME_SIZE, MAX_PAYLOAD};
use tracing::{debug, trace};

use crate::error::{Result, TransportError};
use crate::link::SerialLink;

/// Default upper bound for a single blocking read.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

const DEFAULT_READ_CHUNK: usize = 64;
const MIN_POLL: Duration = Duration::from_millis(1);

/// Configuration for the transport.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Longest a single read may block before the deadline is re-checked.
    pub poll_interval: Duration,
    /// Bytes requested per read.
    pub read_chunk: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            read_chunk: DEFAULT_READ_CHUNK,
        }
    }
}

/// An attached link and its framing state.
struct Connection<L> {
    link: L,
    reassembler: Reassembler,
    /// Bytes read but not yet fed to the reassembler.
    pending: BytesMut,
    out: BytesMut,
    poll: Option<Duration>,
}

impl<L: SerialLink> Connection<L> {
    fn new(link: L) -> Self {
        Self {
            link,
            reassembler: Reassembler::new(),
            pending: BytesMut::with_capacity(MAX_FRAME_SIZE),
            out: BytesMut::with_capacity(MAX_FRAME_SIZE),
            poll: None,
        }
    }

    fn write_packet(&mut self, packet: &Packet) -> Result<()> {
        if packet.payload.len() > MAX_PAYLOAD {
            return Err(TransportError::Frame(squid_frame::FrameError::PayloadTooLarge {
                size: packet.payload.len(),
                max: MAX_PAYLOAD,
            }));
        }

        self.out.clear();
        encode_into(packet.command, &packet.payload, &mut self.out);

        let mut offset = 0usize;
        while offset < self.out.len() {
            match self.link.write(&self.out[offset..]) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }

        loop {
            match self.link.flush() {
                Ok(()) => break,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }

        debug!(
            command = packet.command,
            payload_len = packet.payload.len(),
            "sent frame"
        );
        Ok(())
    }

    fn read_packet(&mut self, timeout: Duration, config: &TransportConfig) -> Result<Packet> {
        let started = Instant::now();
        self.reassembler.reset();

        if let Some(packet) = self.reassembler.feed(&mut self.pending)? {
            return Ok(self.received(packet, started));
        }

        let mut chunk = vec![0u8; config.read_chunk.max(1)];
        loop {
            let elapsed = started.elapsed();
            if elapsed >= timeout {
                debug!(?timeout, buffered = self.reassembler.buffered(), "receive timed out");
                return Err(TransportError::Timeout(timeout));
            }

            let poll = config.poll_interval.min(timeout - elapsed).max(MIN_POLL);
            self.apply_poll(poll)?;

            let read = match self.link.read(&mut chunk) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(n) => n,
                Err(err)
                    if matches!(
                        err.kind(),
                        ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                    ) =>
                {
                    continue;
                }
                Err(err) => return Err(TransportError::Io(err)),
            };

            trace!(read, "read from link");
            self.pending.extend_from_slice(&chunk[..read]);
            if let Some(packet) = self.reassembler.feed(&mut self.pending)? {
                return Ok(self.received(packet, started));
            }
        }
    }

    fn received(&self, packet: Packet, started: Instant) -> Packet {
        debug!(
            command = packet.command,
            payload_len = packet.payload.len(),
            elapsed = ?started.elapsed(),
            "received frame"
        );
        packet
    }

    fn apply_poll(&mut self, poll: Duration) -> Result<()> {
        if self.poll != Some(poll) {
            self.link.set_poll_timeout(poll)?;
            self.poll = Some(poll);
        }
        Ok(())
    }
}

/// Owns the link to the controller and serializes traffic on it.
///
/// All operations lock the connection, so callers on different threads
/// queue instead of interleaving their frames.
pub struct Transport<L> {
    conn: Mutex<Option<Connection<L>>>,
    config: TransportConfig,
}

impl<L: SerialLink> Transport<L> {
    /// Create a transport with no link attached.
    pub fn new(config: TransportConfig) -> Self {
        Self {
            conn: Mutex::new(None),
            config,
        }
    }

    /// Create a transport with `link` already attached.
    pub fn connected(link: L, config: TransportConfig) -> Self {
        let transport = Self::new(config);
        transport.connect(link);
        transport
    }

    /// Attach a link, releasing any previous one.
    pub fn connect(&self, link: L) {
        let mut conn = self.lock();
        if conn.replace(Connection::new(link)).is_some() {
            debug!("replaced existing link");
        } else {
            debug!("link attached");
        }
    }

    /// Detach and return the link. Does nothing when already disconnected.
    pub fn disconnect(&self) -> Option<L> {
        let link = self.lock().take().map(|conn| conn.link);
        if link.is_some() {
            debug!("link released");
        }
        link
    }

    pub fn is_connected(&self) -> bool {
        self.lock().is_some()
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Attach `link` for the duration of `f`.
    ///
    /// The link is released on every exit path, panics included.
    pub fn scoped<R>(&self, link: L, f: impl FnOnce(&Self) -> R) -> R {
        self.connect(link);
        let _guard = DisconnectGuard(self);
        f(self)
    }

    /// Frame and write a packet.
    pub fn send(&self, packet: &Packet) -> Result<()> {
        let mut conn = self.lock();
        let conn = conn.as_mut().ok_or(TransportError::NotConnected)?;
        conn.write_packet(packet)
    }

    /// Wait up to `timeout` for the next valid frame.
    pub fn receive(&self, timeout: Duration) -> Result<Packet> {
        let mut conn = self.lock();
        let conn = conn.as_mut().ok_or(TransportError::NotConnected)?;
        conn.read_packet(timeout, &self.config)
    }

    /// Send a request and wait for its response as one uninterrupted cycle.
    ///
    /// Bytes left over from earlier cycles are discarded before sending.
    pub fn exchange(&self, request: &Packet, timeout: Duration) -> Result<Packet> {
        let mut conn = self.lock();
        let conn = conn.as_mut().ok_or(TransportError::NotConnected)?;
        if !conn.pending.is_empty() {
            debug!(discarded = conn.pending.len(), "dropping stale bytes");
            conn.pending.clear();
        }
        conn.write_packet(request)?;
        conn.read_packet(timeout, &self.config)
    }

    fn lock(&self) -> MutexGuard<'_, Option<Connection<L>>> {
        self.conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<L: SerialLink> Default for Transport<L> {
    fn default() -> Self {
        Self::new(TransportConfig::default())
    }
}

impl<L> std::fmt::Debug for Transport<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let connected = self
            .conn
            .try_lock()
            .map(|conn| conn.is_some().to_string())
            .unwrap_or_else(|_| "busy".to_string());
        f.debug_struct("Transport")
            .field("connected", &connected)
            .field("config", &self.config)
            .finish()
    }
}

struct DisconnectGuard<'a, L: SerialLink>(&'a Transport<L>);

impl<L: SerialLink> Drop for DisconnectGuard<'_, L> {
    fn drop(&mut self) {
        self.0.disconnect();
    }
}
