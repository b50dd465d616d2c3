use std::time::Duration;

use bytes::Bytes;
use squid_frame::{code_name, Command, ErrorCode, Packet, Response};
use squid_transport::{Endpoint, SerialConfig, SerialLink, Transport, TransportConfig};
use tracing::{debug, warn};

use crate::error::{ClientError, Result};
use crate::motor::MotorCommand;
use crate::status::{result_busy, result_ok, FirmwareVersion, MotorStatus};

/// Configuration for a [`Client`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Timeout for version, status and stop requests.
    pub command_timeout: Duration,
    /// Timeout for move requests. A synchronous move only answers once the
    /// axes stop, so this must cover the whole move.
    pub move_timeout: Duration,
    pub transport: TransportConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            command_timeout: Duration::from_secs(5),
            move_timeout: Duration::from_secs(300),
            transport: TransportConfig::default(),
        }
    }
}

/// Typed operations against one controller.
#[derive(Debug)]
pub struct Client<L> {
    transport: Transport<L>,
    config: ClientConfig,
}

impl<L: SerialLink> Client<L> {
    /// Create a client with no link attached.
    pub fn new(config: ClientConfig) -> Self {
        Self {
            transport: Transport::new(config.transport.clone()),
            config,
        }
    }

    /// Create a client talking over `link`.
    pub fn connected(link: L, config: ClientConfig) -> Self {
        let client = Self::new(config);
        client.connect(link);
        client
    }

    pub fn connect(&self, link: L) {
        self.transport.connect(link);
    }

    pub fn disconnect(&self) -> Option<L> {
        self.transport.disconnect()
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Attach `link` for the duration of `f`, releasing it on every exit path.
    pub fn scoped<R>(&self, link: L, f: impl FnOnce(&Self) -> R) -> R {
        self.transport.scoped(link, |_| f(self))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &Transport<L> {
        &self.transport
    }

    /// Firmware version, or `None` if the controller sent an empty reply.
    pub fn version(&self) -> Result<Option<FirmwareVersion>> {
        self.version_with_timeout(self.config.command_timeout)
    }

    pub fn version_with_timeout(&self, timeout: Duration) -> Result<Option<FirmwareVersion>> {
        let response = self.request(Command::Version, &[], timeout)?;
        Ok(FirmwareVersion::from_payload(&response.payload))
    }

    /// Active, completed and status-pin masks.
    pub fn status(&self) -> Result<MotorStatus> {
        self.status_with_timeout(self.config.command_timeout)
    }

    pub fn status_with_timeout(&self, timeout: Duration) -> Result<MotorStatus> {
        let response = self.request(Command::Status, &[], timeout)?;
        Ok(MotorStatus::from_payload(&response.payload))
    }

    /// Halt all axes. Returns whether the controller reported success.
    pub fn stop(&self) -> Result<bool> {
        self.stop_with_timeout(self.config.command_timeout)
    }

    pub fn stop_with_timeout(&self, timeout: Duration) -> Result<bool> {
        let response = self.request(Command::Stop, &[], timeout)?;
        Ok(acknowledged(Command::Stop, &response))
    }

    /// Move the given axes and wait until the controller reports they finished.
    pub fn sync_move(&self, motors: &[MotorCommand]) -> Result<bool> {
        self.sync_move_with_timeout(motors, self.config.move_timeout)
    }

    pub fn sync_move_with_timeout(
        &self,
        motors: &[MotorCommand],
        timeout: Duration,
    ) -> Result<bool> {
        self.move_axes(Command::SyncMove, motors, timeout)
    }

    /// Start moving the given axes; completion shows up in [`Client::status`].
    pub fn async_move(&self, motors: &[MotorCommand]) -> Result<bool> {
        self.async_move_with_timeout(motors, self.config.move_timeout)
    }

    pub fn async_move_with_timeout(
        &self,
        motors: &[MotorCommand],
        timeout: Duration,
    ) -> Result<bool> {
        self.move_axes(Command::AsyncMove, motors, timeout)
    }

    /// Send one request and return the controller's reply.
    ///
    /// `ERROR` replies become [`ClientError::Protocol`]. Replies are not
    /// matched to requests: a reply that arrives after its request timed out
    /// stays on the link and is returned to the next request, with a warning
    /// if its response code does not fit.
    pub fn request(&self, command: Command, payload: &[u8], timeout: Duration) -> Result<Packet> {
        let request = Packet::new(command, Bytes::copy_from_slice(payload));
        let response = self.transport.exchange(&request, timeout)?;

        if response.command == Response::Error.code() {
            let code = ErrorCode::from(response.payload.first().copied().unwrap_or(0));
            warn!(
                command = command.name(),
                code = %code,
                message = code.message(),
                "controller rejected request"
            );
            return Err(ClientError::protocol(code));
        }

        let expected = Response::expected_for(command);
        if response.command != expected.code() {
            warn!(
                command = command.name(),
                expected = code_name(expected.code()),
                got = code_name(response.command),
                "unexpected response code"
            );
        }

        Ok(response)
    }

    fn move_axes(
        &self,
        command: Command,
        motors: &[MotorCommand],
        timeout: Duration,
    ) -> Result<bool> {
        debug!(command = command.name(), axes = motors.len(), ?timeout, "moving axes");
        let payload = MotorCommand::encode_all(motors);
        let response = self.request(command, &payload, timeout)?;
        Ok(acknowledged(command, &response))
    }
}

impl Client<Box<dyn SerialLink>> {
    /// Open `endpoint` and attach it.
    pub fn open(endpoint: &Endpoint, serial: &SerialConfig, config: ClientConfig) -> Result<Self> {
        let link = endpoint.open(serial, config.transport.poll_interval)?;
        Ok(Self::connected(link, config))
    }
}

/// Stop and move replies carry one result byte; anything but success is `false`.
fn acknowledged(command: Command, response: &Packet) -> bool {
    if result_busy(&response.payload) {
        warn!(command = command.name(), "controller busy");
    }
    result_ok(&response.payload)
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::io::{Read, Write};
    use std::time::Duration;

    use bytes::BytesMut;
    use squid_frame::{encode, Reassembler, RESULT_BUSY};

    use super::*;

    /// Answers each request with the next scripted reply, then with `reply`.
    struct CannedLink {
        reply: Vec<u8>,
        script: VecDeque<Vec<u8>>,
        outbox: BytesMut,
        requests: Vec<Packet>,
        reassembler: Reassembler,
    }

    impl CannedLink {
        fn new(reply: Vec<u8>) -> Self {
            Self::scripted(Vec::new(), reply)
        }

        fn scripted(script: Vec<Vec<u8>>, reply: Vec<u8>) -> Self {
            Self {
                reply,
                script: script.into(),
                outbox: BytesMut::new(),
                requests: Vec::new(),
                reassembler: Reassembler::new(),
            }
        }
    }

    impl Read for CannedLink {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.outbox.is_empty() {
                return Err(std::io::ErrorKind::TimedOut.into());
            }
            let n = self.outbox.len().min(buf.len());
            buf[..n].copy_from_slice(&self.outbox.split_to(n));
            Ok(n)
        }
    }

    impl Write for CannedLink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            for byte in buf {
                let parsed = self.reassembler.push(*byte);
                if let Some(packet) = parsed.map_err(std::io::Error::other)? {
                    self.requests.push(packet);
                    let next = self.script.pop_front();
                    let reply = next.unwrap_or_else(|| self.reply.clone());
                    self.outbox.extend_from_slice(&reply);
                }
            }
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl SerialLink for CannedLink {
        fn set_poll_timeout(&mut self, _timeout: Duration) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn client_with_reply(reply: Vec<u8>) -> Client<CannedLink> {
        Client::connected(CannedLink::new(reply), ClientConfig::default())
    }

    fn stop_reply(payload: &[u8]) -> bool {
        let client = client_with_reply(encode(0x83, payload).to_vec());
        client.stop().unwrap()
    }

    #[test]
    fn version_decodes_nibbles() {
        let client = client_with_reply(encode(0x81, &[0x12]).to_vec());
        let version = client.version().unwrap().unwrap();
        assert_eq!(version.to_string(), "1.2");

        let link = client.disconnect().unwrap();
        assert_eq!(link.requests, vec![Packet::bare(Command::Version)]);
    }

    #[test]
    fn empty_version_reply_is_none() {
        let client = client_with_reply(encode(0x81, &[]).to_vec());
        assert_eq!(client.version().unwrap(), None);
    }

    #[test]
    fn stop_checks_result_byte() {
        assert!(stop_reply(&[0x00]));
        assert!(!stop_reply(&[0x02]));
        assert!(!stop_reply(&[]));
    }

    #[test]
    fn busy_result_is_not_success() {
        assert!(!stop_reply(&[RESULT_BUSY]));

        let client = client_with_reply(encode(0x90, &[RESULT_BUSY]).to_vec());
        let motors = [MotorCommand::new(1, 500, 1000, 5000)];
        assert!(!client.sync_move(&motors).unwrap());
    }

    #[test]
    fn move_payload_is_concatenated_records() {
        let client = client_with_reply(encode(0x90, &[0x00]).to_vec());
        let motors = [
            MotorCommand::new(1, 500, 1000, 5000),
            MotorCommand::new(2, 1, 2, 3),
        ];
        assert!(client.async_move(&motors).unwrap());

        let link = client.disconnect().unwrap();
        assert_eq!(link.requests.len(), 1);
        assert_eq!(link.requests[0].command, Command::AsyncMove.code());
        assert_eq!(
            link.requests[0].payload.as_ref(),
            MotorCommand::encode_all(&motors).as_slice()
        );
    }

    #[test]
    fn error_reply_maps_to_protocol_error() {
        let client = client_with_reply(encode(0xFF, &[0x04]).to_vec());
        let motors = [MotorCommand::new(1, 1, 1, 1)];
        let err = client.sync_move(&motors).unwrap_err();

        assert_eq!(err.error_code(), Some(ErrorCode::InvalidMotorCount));
        match err {
            ClientError::Protocol { code, message } => {
                assert_eq!(code.code(), 0x04);
                assert_eq!(message, "Invalid motor count");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn error_reply_without_code_is_unknown() {
        let client = client_with_reply(encode(0xFF, &[]).to_vec());
        let err = client.status().unwrap_err();
        assert_eq!(err.error_code(), Some(ErrorCode::Unknown(0)));
        assert_eq!(err.to_string(), "protocol error 0x00: Unknown error");
    }

    #[test]
    fn unexpected_response_code_is_still_decoded() {
        let client = client_with_reply(encode(0x90, &[0x03, 0x00]).to_vec());
        let status = client.status().unwrap();
        assert_eq!(status.active, 3);
    }

    #[test]
    fn late_reply_answers_next_request() {
        let late = encode(0x81, &[0x10]).to_vec();
        let status = encode(0x82, &[0x01, 0x00]).to_vec();
        let link = CannedLink::scripted(vec![Vec::new(), late], status);
        let client = Client::connected(link, ClientConfig::default());

        let err = client
            .version_with_timeout(Duration::from_millis(20))
            .unwrap_err();
        assert!(err.is_timeout());

        // The version reply only shows up now and is decoded as status.
        let stale = client.status().unwrap();
        assert_eq!(stale.active, 0x10);

        let status = client.status().unwrap();
        assert_eq!(status.active, 0x01);
    }

    #[test]
    fn disconnected_client_reports_not_connected() {
        let client: Client<CannedLink> = Client::new(ClientConfig::default());
        let err = client.stop().unwrap_err();
        assert!(matches!(
            err,
            ClientError::Transport(squid_transport::TransportError::NotConnected)
        ));
    }

    #[test]
    fn scoped_client_releases_link() {
        let client: Client<CannedLink> = Client::new(ClientConfig::default());
        let link = CannedLink::new(encode(0x82, &[1, 0, 0, 0, 0, 0]).to_vec());
        let status = client.scoped(link, |c| c.status()).unwrap();
        assert_eq!(status.active_axes(), vec![1]);
        assert!(!client.is_connected());
    }
}
