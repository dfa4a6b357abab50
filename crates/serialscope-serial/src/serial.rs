use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, ReadBuf};
use tokio_serial::{SerialPort, SerialPortBuilderExt, SerialPortType, SerialStream};
use tracing::{debug, info};

use crate::transport::{Connection, Transport, TransportError};
use serialscope_types::{DataBits, FlowControl, Parity, PortInfo, SerialSettings, StopBits};

/// Transport backed by a native serial port
#[derive(Clone, Debug, Default)]
pub struct SerialTransport;

impl SerialTransport {
    pub fn new() -> Self {
        Self
    }
}

impl Transport for SerialTransport {
    type Conn = SerialConnection;

    async fn connect(
        &self,
        address: &str,
        settings: &SerialSettings,
    ) -> Result<SerialConnection, TransportError> {
        debug!(address, settings = %settings.summary(), "opening serial port");

        let stream = tokio_serial::new(address, settings.baud_rate)
            .data_bits(data_bits(settings.data_bits))
            .parity(parity(settings.parity))
            .stop_bits(stop_bits(settings.stop_bits))
            .flow_control(flow_control(settings.flow_control))
            .open_native_async()
            .map_err(|e| TransportError::Open {
                address: address.to_string(),
                message: e.to_string(),
            })?;

        info!(address, "serial port open");

        Ok(SerialConnection {
            stream,
            hardware_flow: settings.flow_control == FlowControl::Hardware,
        })
    }
}

/// An open serial port
pub struct SerialConnection {
    stream: SerialStream,
    hardware_flow: bool,
}

impl AsyncRead for SerialConnection {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_read(cx, buf)
    }
}

impl Connection for SerialConnection {
    fn release(&mut self) -> Result<(), TransportError> {
        if !self.hardware_flow {
            return Ok(());
        }
        self.stream
            .write_request_to_send(false)
            .and_then(|_| self.stream.write_data_terminal_ready(false))
            .map_err(|e| TransportError::ControlLines(e.to_string()))?;
        debug!("released RTS/DTR");
        Ok(())
    }
}

/// List serial devices present on the host
pub fn available_ports() -> Result<Vec<PortInfo>, TransportError> {
    let ports =
        tokio_serial::available_ports().map_err(|e| TransportError::Enumerate(e.to_string()))?;

    Ok(ports
        .into_iter()
        .map(|p| {
            let description = match p.port_type {
                SerialPortType::UsbPort(usb) => {
                    let product = usb.product.unwrap_or_else(|| "USB".to_string());
                    format!("{} ({:04x}:{:04x})", product, usb.vid, usb.pid)
                }
                SerialPortType::PciPort => "PCI".to_string(),
                SerialPortType::BluetoothPort => "Bluetooth".to_string(),
                SerialPortType::Unknown => "unknown".to_string(),
            };
            PortInfo::new(p.port_name, description)
        })
        .collect())
}

fn data_bits(bits: DataBits) -> tokio_serial::DataBits {
    match bits {
        DataBits::Five => tokio_serial::DataBits::Five,
        DataBits::Six => tokio_serial::DataBits::Six,
        DataBits::Seven => tokio_serial::DataBits::Seven,
        DataBits::Eight => tokio_serial::DataBits::Eight,
    }
}

fn parity(parity: Parity) -> tokio_serial::Parity {
    match parity {
        Parity::None => tokio_serial::Parity::None,
        Parity::Odd => tokio_serial::Parity::Odd,
        Parity::Even => tokio_serial::Parity::Even,
    }
}

fn stop_bits(bits: StopBits) -> tokio_serial::StopBits {
    match bits {
        StopBits::One => tokio_serial::StopBits::One,
        StopBits::Two => tokio_serial::StopBits::Two,
    }
}

fn flow_control(flow: FlowControl) -> tokio_serial::FlowControl {
    match flow {
        FlowControl::None => tokio_serial::FlowControl::None,
        FlowControl::Software => tokio_serial::FlowControl::Software,
        FlowControl::Hardware => tokio_serial::FlowControl::Hardware,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_missing_port_reports_address() {
        let transport = SerialTransport::new();
        let result = transport
            .connect("/dev/serialscope-does-not-exist", &SerialSettings::default())
            .await;
        match result {
            Err(TransportError::Open { address, .. }) => {
                assert_eq!(address, "/dev/serialscope-does-not-exist");
            }
            _ => panic!("expected open failure"),
        }
    }

    #[test]
    fn test_settings_mapping() {
        assert_eq!(data_bits(DataBits::Seven), tokio_serial::DataBits::Seven);
        assert_eq!(parity(Parity::Even), tokio_serial::Parity::Even);
        assert_eq!(
            flow_control(FlowControl::Hardware),
            tokio_serial::FlowControl::Hardware
        );
    }
}
