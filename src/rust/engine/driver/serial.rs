//! Serial port transport (USB-serial or Bluetooth SPP link to the controller).
use std::io::{self, Write};
use std::time::Duration;

use serialport::{SerialPort, SerialPortType};

use super::TransportError;
use super::transport::Transport;

const WRITE_TIMEOUT: Duration = Duration::from_secs(1);

pub struct SerialTransport {
    path: String,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialTransport {
    pub fn open(path: &str, baud_rate: u32) -> Result<Self, TransportError> {
        let port = serialport::new(path, baud_rate)
            .timeout(WRITE_TIMEOUT)
            .open()
            .map_err(|e| TransportError::Open {
                port: path.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            path: path.to_string(),
            port: Some(port),
        })
    }
}

impl Transport for SerialTransport {
    fn describe(&self) -> String {
        self.path.clone()
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        let port = self
            .port
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "serial port closed"))?;
        port.write_all(line.as_bytes())?;
        port.flush()
    }

    fn close(&mut self) -> io::Result<()> {
        if let Some(mut port) = self.port.take() {
            port.flush()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortDescription {
    pub name: String,
    pub kind: String,
}

/// Enumerate the serial ports present on this machine.
pub fn available_ports() -> Result<Vec<PortDescription>, TransportError> {
    let ports =
        serialport::available_ports().map_err(|e| TransportError::Enumerate(e.to_string()))?;
    Ok(ports
        .into_iter()
        .map(|info| PortDescription {
            kind: describe_port_type(&info.port_type),
            name: info.port_name,
        })
        .collect())
}

fn describe_port_type(port_type: &SerialPortType) -> String {
    match port_type {
        SerialPortType::UsbPort(usb) => {
            let product = usb.product.clone().unwrap_or_else(|| "USB".to_string());
            format!("{} ({:04x}:{:04x})", product, usb.vid, usb.pid)
        }
        SerialPortType::BluetoothPort => "Bluetooth".to_string(),
        SerialPortType::PciPort => "PCI".to_string(),
        SerialPortType::Unknown => "unknown".to_string(),
    }
}
