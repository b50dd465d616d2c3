//! Serial port access through the `serialport` crate.
//!
//! The controller's USB bridge presents as an FTDI virtual COM port running
//! 8N1 at 115200 baud without flow control.

use std::path::Path;
use std::time::Duration;

use serialport::{SerialPort, SerialPortType};
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::link::open_error;

/// USB vendor id assigned to FTDI.
pub const FTDI_VENDOR_ID: u16 = 0x0403;

const PORT_NAME_PREFIXES: [&str; 3] = ["/dev/tty.usbserial-", "/dev/ttyUSB", "/dev/cu.usbserial-"];

/// Serial line settings.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Baud rate. Default: 115200.
    pub baud_rate: u32,
    pub data_bits: serialport::DataBits,
    pub parity: serialport::Parity,
    pub stop_bits: serialport::StopBits,
    pub flow_control: serialport::FlowControl,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            data_bits: serialport::DataBits::Eight,
            parity: serialport::Parity::None,
            stop_bits: serialport::StopBits::One,
            flow_control: serialport::FlowControl::None,
        }
    }
}

impl SerialConfig {
    pub fn with_baud_rate(baud_rate: u32) -> Self {
        Self {
            baud_rate,
            ..Self::default()
        }
    }
}

/// Open a serial port with reads bounded by `poll_interval`.
pub fn open(
    path: impl AsRef<Path>,
    config: &SerialConfig,
    poll_interval: Duration,
) -> Result<Box<dyn SerialPort>> {
    let path = path.as_ref();
    let name = path.to_string_lossy();

    let port = serialport::new(name.as_ref(), config.baud_rate)
        .data_bits(config.data_bits)
        .parity(config.parity)
        .stop_bits(config.stop_bits)
        .flow_control(config.flow_control)
        .timeout(poll_interval)
        .open()
        .map_err(|e| open_error(path, e))?;

    info!(port = %name, baud = config.baud_rate, "opened serial port");
    Ok(port)
}

/// A serial port as seen by discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    pub name: String,
    /// `usb`, `pci`, `bluetooth` or `unknown`.
    pub kind: &'static str,
    pub vid: Option<u16>,
    pub pid: Option<u16>,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
}

impl PortInfo {
    fn from_serialport(info: serialport::SerialPortInfo) -> Self {
        let mut port = PortInfo {
            name: info.port_name,
            kind: "unknown",
            vid: None,
            pid: None,
            manufacturer: None,
            product: None,
        };
        match info.port_type {
            SerialPortType::UsbPort(usb) => {
                port.kind = "usb";
                port.vid = Some(usb.vid);
                port.pid = Some(usb.pid);
                port.manufacturer = usb.manufacturer;
                port.product = usb.product;
            }
            SerialPortType::PciPort => port.kind = "pci",
            SerialPortType::BluetoothPort => port.kind = "bluetooth",
            SerialPortType::Unknown => {}
        }
        port
    }

    fn looks_like_ftdi(&self) -> bool {
        if self.vid == Some(FTDI_VENDOR_ID) {
            return true;
        }
        [&self.manufacturer, &self.product]
            .into_iter()
            .flatten()
            .any(|text| text.contains("FTDI") || text.contains("FT232"))
    }
}

/// List the serial ports known to the operating system.
pub fn available_ports() -> Result<Vec<PortInfo>> {
    let ports = serialport::available_ports()?;
    Ok(ports.into_iter().map(PortInfo::from_serialport).collect())
}

/// Find the port the controller is most likely attached to.
pub fn detect_port() -> Result<String> {
    let ports = available_ports()?;
    let picked = pick_port(&ports).ok_or(TransportError::NoPortFound)?;
    debug!(port = %picked, candidates = ports.len(), "auto-detected serial port");
    Ok(picked)
}

/// USB serial device names win over descriptor matches.
pub fn pick_port(ports: &[PortInfo]) -> Option<String> {
    for prefix in PORT_NAME_PREFIXES {
        if let Some(port) = ports.iter().find(|p| p.name.starts_with(prefix)) {
            return Some(port.name.clone());
        }
    }
    ports
        .iter()
        .find(|p| p.looks_like_ftdi())
        .map(|p| p.name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn port(name: &str) -> PortInfo {
        PortInfo {
            name: name.to_string(),
            kind: "unknown",
            vid: None,
            pid: None,
            manufacturer: None,
            product: None,
        }
    }

    #[test]
    fn default_config_is_8n1_115200() {
        let config = SerialConfig::default();
        assert_eq!(config.baud_rate, 115_200);
        assert_eq!(config.data_bits, serialport::DataBits::Eight);
        assert_eq!(config.parity, serialport::Parity::None);
        assert_eq!(config.stop_bits, serialport::StopBits::One);
        assert_eq!(SerialConfig::with_baud_rate(9600).baud_rate, 9600);
    }

    #[test]
    fn picks_usb_serial_by_name() {
        let ports = vec![
            port("/dev/ttyS0"),
            port("/dev/ttyUSB1"),
            port("/dev/ttyUSB0"),
        ];
        assert_eq!(pick_port(&ports).as_deref(), Some("/dev/ttyUSB1"));
    }

    #[test]
    fn name_prefix_order_is_respected() {
        let ports = vec![port("/dev/ttyUSB0"), port("/dev/tty.usbserial-A502")];
        assert_eq!(
            pick_port(&ports).as_deref(),
            Some("/dev/tty.usbserial-A502")
        );
    }

    #[test]
    fn falls_back_to_ftdi_descriptor() {
        let mut com = port("COM7");
        com.kind = "usb";
        com.product = Some("FT232R USB UART".to_string());
        let ports = vec![port("COM1"), com];
        assert_eq!(pick_port(&ports).as_deref(), Some("COM7"));

        let mut by_vid = port("COM9");
        by_vid.vid = Some(FTDI_VENDOR_ID);
        assert_eq!(pick_port(&[by_vid]).as_deref(), Some("COM9"));
    }

    #[test]
    fn nothing_to_pick() {
        assert_eq!(pick_port(&[port("/dev/ttyS0")]), None);
        assert_eq!(pick_port(&[]), None);
    }

    #[test]
    fn open_missing_port_reports_path() {
        let err = open(
            "/dev/squid-does-not-exist",
            &SerialConfig::default(),
            Duration::from_millis(10),
        )
        .unwrap_err();
        assert!(matches!(err, TransportError::Open { .. }));
    }
}
