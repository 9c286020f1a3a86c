//! Hardware serial transport built on tokio-serial.
//!
//! The data stream is a native async `SerialStream`. DCD queries go through a
//! cloned blocking `serialport` handle so the carrier monitor can poll the
//! status line while the bridge owns the stream.

use super::error::PortError;
use super::session::SerialSession;
use super::traits::{CarrierDetect, PortConfiguration};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio_serial::SerialPort;
use tracing::debug;

/// Open a modem line and wrap it in a [`SerialSession`].
///
/// # Example
/// ```no_run
/// use ringin::port::{open_modem, PortConfiguration};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let session = open_modem("/dev/ttyUSB0", &PortConfiguration::default())?;
/// # Ok(())
/// # }
/// ```
pub fn open_modem(port_name: &str, config: &PortConfiguration) -> Result<SerialSession, PortError> {
    let builder = tokio_serial::new(port_name, config.baud_rate)
        .data_bits(config.data_bits.into())
        .flow_control(tokio_serial::FlowControl::None)
        .parity(config.parity.into())
        .stop_bits(config.stop_bits.into());

    let stream = tokio_serial::SerialStream::open(&builder).map_err(|e| match e.kind {
        tokio_serial::ErrorKind::NoDevice => PortError::not_found(port_name),
        tokio_serial::ErrorKind::InvalidInput => PortError::config(e.to_string()),
        _ => PortError::Serial(e),
    })?;

    let status = stream.try_clone().map_err(PortError::Serial)?;
    debug!(port = port_name, baud = config.baud_rate, "serial line open");

    let carrier = Arc::new(StatusLine::new(port_name, status));
    Ok(SerialSession::new(port_name, stream, carrier))
}

/// DCD reader over a cloned handle to the same device.
pub struct StatusLine {
    name: String,
    port: Arc<Mutex<Box<dyn SerialPort>>>,
}

impl StatusLine {
    pub fn new(name: impl Into<String>, port: Box<dyn SerialPort>) -> Self {
        Self {
            name: name.into(),
            port: Arc::new(Mutex::new(port)),
        }
    }
}

#[async_trait]
impl CarrierDetect for StatusLine {
    async fn carrier_detect(&self) -> Result<bool, PortError> {
        let port = Arc::clone(&self.port);
        tokio::task::spawn_blocking(move || {
            let mut port = port.lock();
            port.read_carrier_detect().map_err(PortError::Serial)
        })
        .await
        .map_err(|e| PortError::Io(std::io::Error::other(e)))?
    }
}

impl std::fmt::Debug for StatusLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusLine").field("name", &self.name).finish()
    }
}
