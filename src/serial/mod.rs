use std::{fmt::Display, io::Write, time::Duration};

use anyhow::{anyhow, Error};
use log::{debug, error, info};
use serialport::{DataBits, FlowControl, Parity, SerialPort, SerialPortType, StopBits};
use tokio::sync::mpsc;

use crate::command::CommandFrame;

pub const DEFAULT_BAUD: u32 = 115_200;

const WRITE_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Debug)]
pub enum SerialMessage {
    Frame(CommandFrame),
}

/// Anything a command frame can be handed to.
pub trait CommandSink {
    fn send(&mut self, frame: &CommandFrame) -> Result<(), Error>;
}

pub struct SerialController<W: Write = Box<dyn SerialPort>> {
    name: String,
    port: W,
}

impl SerialController {
    /// Open a port at 8 data bits, one stop bit, no parity and no flow control.
    pub fn open(name: &str, baud_rate: u32) -> Result<Self, Error> {
        let port = serialport::new(name, baud_rate)
            .data_bits(DataBits::Eight)
            .stop_bits(StopBits::One)
            .parity(Parity::None)
            .flow_control(FlowControl::None)
            .timeout(WRITE_TIMEOUT)
            .open()
            .map_err(|e| anyhow!("Failed to open serial port {}: {}", name, e))?;

        info!("Opened {} at {} baud", name, baud_rate);

        Ok(Self {
            name: name.to_string(),
            port,
        })
    }
}

impl<W: Write> SerialController<W> {
    /// Wrap an already open writer
    pub fn from_writer(name: impl Into<String>, port: W) -> Self {
        Self {
            name: name.into(),
            port,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn into_inner(self) -> W {
        self.port
    }

    pub fn send_data(&mut self, data: &[u8]) -> Result<(), Error> {
        self.port.write_all(data)?;
        self.port.flush()?;
        Ok(())
    }

    /// Write every frame received until all senders are gone
    pub async fn start(mut self, mut rx: mpsc::Receiver<SerialMessage>) -> Self {
        while let Some(message) = rx.recv().await {
            match message {
                SerialMessage::Frame(frame) => {
                    if let Err(e) = self.send(&frame) {
                        error!("Failed to send {} to {}: {}", frame, self.name, e);
                    }
                }
            }
        }

        self
    }
}

impl<W: Write> CommandSink for SerialController<W> {
    fn send(&mut self, frame: &CommandFrame) -> Result<(), Error> {
        debug!("Writing {} to {}", frame, self.name);
        self.send_data(frame.as_bytes())
    }
}

impl CommandSink for mpsc::Sender<SerialMessage> {
    fn send(&mut self, frame: &CommandFrame) -> Result<(), Error> {
        self.try_send(SerialMessage::Frame(*frame))
            .map_err(|e| anyhow!("Serial writer is not accepting frames: {}", e))
    }
}

/// A serial port found on this machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortDescription {
    pub name: String,
    pub kind: String,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
    pub serial_number: Option<String>,
    pub vendor_id: Option<u16>,
    pub product_id: Option<u16>,
}

impl From<serialport::SerialPortInfo> for PortDescription {
    fn from(info: serialport::SerialPortInfo) -> Self {
        let mut description = PortDescription {
            name: info.port_name,
            kind: String::new(),
            manufacturer: None,
            product: None,
            serial_number: None,
            vendor_id: None,
            product_id: None,
        };

        description.kind = match info.port_type {
            SerialPortType::UsbPort(usb) => {
                description.manufacturer = usb.manufacturer;
                description.product = usb.product;
                description.serial_number = usb.serial_number;
                description.vendor_id = Some(usb.vid);
                description.product_id = Some(usb.pid);
                "USB".to_string()
            }
            SerialPortType::PciPort => "PCI".to_string(),
            SerialPortType::BluetoothPort => "Bluetooth".to_string(),
            SerialPortType::Unknown => "Unknown".to_string(),
        };

        description
    }
}

impl Display for PortDescription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.kind)?;
        if let Some(product) = &self.product {
            write!(f, "\n  Description: {}", product)?;
        }
        if let Some(manufacturer) = &self.manufacturer {
            write!(f, "\n  Manufacturer: {}", manufacturer)?;
        }
        if let Some(serial_number) = &self.serial_number {
            write!(f, "\n  Serial number: {}", serial_number)?;
        }
        if let Some(vendor_id) = self.vendor_id {
            write!(f, "\n  Vendor Identifier: {:04x}", vendor_id)?;
        }
        if let Some(product_id) = self.product_id {
            write!(f, "\n  Product Identifier: {:04x}", product_id)?;
        }
        Ok(())
    }
}

pub fn available_ports() -> Result<Vec<PortDescription>, Error> {
    let ports = serialport::available_ports()?;
    Ok(ports.into_iter().map(PortDescription::from).collect())
}

#[cfg(test)]
mod tests {
    use std::{
        io,
        sync::{Arc, Mutex},
    };

    use common::Color;
    use serialport::{SerialPortInfo, UsbPortInfo};

    use super::*;
    use crate::command::encode;

    /// Writer that shares its buffer with the test and can be told to fail
    #[derive(Clone, Default)]
    struct SharedWriter {
        written: Arc<Mutex<Vec<u8>>>,
        flushes: Arc<Mutex<usize>>,
        fail: bool,
    }

    impl Write for SharedWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.fail {
                return Err(io::Error::new(io::ErrorKind::TimedOut, "write timed out"));
            }
            self.written.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            *self.flushes.lock().unwrap() += 1;
            Ok(())
        }
    }

    #[test]
    fn test_send_writes_and_flushes() -> Result<(), Error> {
        let writer = SharedWriter::default();
        let mut controller = SerialController::from_writer("test", writer.clone());

        controller.send(&encode(Color::new(255, 255, 255)))?;

        assert_eq!(b"Uffffff03".to_vec(), *writer.written.lock().unwrap());
        assert_eq!(1, *writer.flushes.lock().unwrap());
        Ok(())
    }

    #[test]
    fn test_send_reports_write_failure() {
        let writer = SharedWriter {
            fail: true,
            ..Default::default()
        };
        let mut controller = SerialController::from_writer("test", writer);

        assert!(controller.send(&encode(Color::new(0, 0, 0))).is_err());
    }

    #[tokio::test]
    async fn test_start_writes_queued_frames() -> Result<(), Error> {
        let writer = SharedWriter::default();
        let controller = SerialController::from_writer("test", writer.clone());
        let (mut tx, rx) = mpsc::channel(4);

        CommandSink::send(&mut tx, &encode(Color::new(0, 0, 0)))?;
        CommandSink::send(&mut tx, &encode(Color::new(255, 255, 255)))?;
        drop(tx);

        let controller = controller.start(rx).await;

        assert_eq!("test", controller.name());
        assert_eq!(b"U00000000Uffffff03".to_vec(), *writer.written.lock().unwrap());
        Ok(())
    }

    #[tokio::test]
    async fn test_start_survives_write_failures() {
        let writer = SharedWriter {
            fail: true,
            ..Default::default()
        };
        let controller = SerialController::from_writer("test", writer.clone());
        let (tx, rx) = mpsc::channel(4);

        tx.send(SerialMessage::Frame(encode(Color::new(1, 2, 3))))
            .await
            .unwrap();
        drop(tx);

        controller.start(rx).await;
        assert!(writer.written.lock().unwrap().is_empty());
    }

    #[test]
    fn test_full_channel_is_an_error() -> Result<(), Error> {
        let (mut tx, _rx) = mpsc::channel::<SerialMessage>(1);
        CommandSink::send(&mut tx, &encode(Color::new(0, 0, 0)))?;
        assert!(CommandSink::send(&mut tx, &encode(Color::new(0, 0, 0))).is_err());
        Ok(())
    }

    #[test]
    fn test_port_description_from_usb_info() {
        let description = PortDescription::from(SerialPortInfo {
            port_name: "/dev/ttyUSB0".to_string(),
            port_type: SerialPortType::UsbPort(UsbPortInfo {
                vid: 0x1a86,
                pid: 0x7523,
                serial_number: None,
                manufacturer: Some("QinHeng".to_string()),
                product: Some("USB Serial".to_string()),
            }),
        });

        assert_eq!("USB", description.kind);
        assert_eq!(Some(0x1a86), description.vendor_id);
        assert_eq!(
            "/dev/ttyUSB0 (USB)\n  Description: USB Serial\n  Manufacturer: QinHeng\n  Vendor Identifier: 1a86\n  Product Identifier: 7523",
            description.to_string()
        );
    }
}
