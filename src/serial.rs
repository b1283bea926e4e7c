//! Serial port byte channel and device discovery, built on the `serialport` crate.

use std::time::Duration;

use log::debug;
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};

/// Line speed of the device.
pub const BAUD_RATE: u32 = 9600;

/// Port name prefix of candidate devices on this platform.
#[cfg(target_os = "macos")]
pub const DEVICE_PREFIX: &str = "/dev/cu.";
#[cfg(all(unix, not(target_os = "macos")))]
pub const DEVICE_PREFIX: &str = "/dev/tty";
#[cfg(windows)]
pub const DEVICE_PREFIX: &str = "COM";

/// Settings for [`open`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialSettings {
    pub baud_rate: u32,
    /// How long a read may block. Reads and writes wait for a card swipe, so
    /// this should leave the user enough time.
    pub timeout: Duration,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            baud_rate: BAUD_RATE,
            timeout: Duration::from_secs(60),
        }
    }
}

/// Open the serial port `name` as a byte channel for the device.
///
/// The port is configured for 8 data bits, no parity, one stop bit and
/// XON/XOFF flow control. On Unix the port is opened for exclusive access.
pub fn open(name: &str, settings: &SerialSettings) -> serialport::Result<Box<dyn SerialPort>> {
    debug!("Opening {} at {} baud", name, settings.baud_rate);
    let port = serialport::new(name, settings.baud_rate)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::Software)
        .timeout(settings.timeout)
        .open()?;
    port.clear(serialport::ClearBuffer::All)?;
    Ok(port)
}

/// List the names of serial ports the device may be connected to, sorted.
///
/// An empty list means no candidate ports were found, while an error means
/// the ports could not be enumerated.
pub fn available_devices() -> serialport::Result<Vec<String>> {
    let ports = serialport::available_ports()?;
    Ok(candidate_names(ports.into_iter().map(|p| p.port_name)))
}

fn candidate_names(names: impl Iterator<Item = String>) -> Vec<String> {
    let mut names: Vec<String> = names.filter(|n| n.starts_with(DEVICE_PREFIX)).collect();
    names.sort();
    names.dedup();
    names
}
