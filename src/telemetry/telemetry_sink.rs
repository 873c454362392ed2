// This file is part of ts_chwp_controller.
//
// Developed for the Vera Rubin Observatory Systems.
// This product includes software developed by the LSST Project
// (https://www.lsst.org).
// See the COPYRIGHT file at the top-level directory of this distribution
// for details of code ownership.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use log::{debug, info, warn};
use serde_json::Value;
use std::io::{self, BufWriter, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::thread::sleep;
use std::time::Duration;

use crate::config::ConfigTelemetry;
use crate::constants::TERMINATOR;
use crate::error::{ChannelError, ControlError};

// Name used in the errors.
const SINK_NAME: &str = "telemetry";

// Timeout of the connection and the write in second.
const SINK_TIMEOUT: f64 = 2.0;

/// Destination of the telemetry records.
pub trait TelemetrySink {
    /// Publish a record.
    ///
    /// # Arguments
    /// * `record` - Record.
    fn publish(&mut self, record: &Value) -> Result<(), ControlError>;
}

/// Sink that writes one JSON line per record to the telemetry host over
/// TCP/IP. The connection is made on demand and dropped on the write error.
pub struct TcpTelemetrySink {
    _address: String,
    _writer: Option<BufWriter<TcpStream>>,
    _connection_attempts: u32,
    // Wait between two connection attempts.
    _retry_delay: Duration,
}

impl TcpTelemetrySink {
    pub fn new(config: &ConfigTelemetry) -> Self {
        Self {
            _address: format!("{}:{}", config.host, config.port),
            _writer: None,
            _connection_attempts: config.connection_attempts.max(1),
            _retry_delay: Duration::from_secs_f64(config.retry_delay.max(0.0)),
        }
    }

    pub fn is_connected(&self) -> bool {
        self._writer.is_some()
    }

    fn connect_once(&self) -> io::Result<TcpStream> {
        let timeout = Duration::from_secs_f64(SINK_TIMEOUT);
        let address = self._address.to_socket_addrs()?.next().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "no address is resolved")
        })?;

        let stream = TcpStream::connect_timeout(&address, timeout)?;
        stream.set_nodelay(true)?;
        stream.set_write_timeout(Some(timeout))?;

        Ok(stream)
    }

    fn connect(&mut self) -> Result<(), ChannelError> {
        let mut attempt = 0;
        loop {
            attempt += 1;

            match self.connect_once() {
                Ok(stream) => {
                    info!("Connected to the telemetry host {}.", self._address);
                    self._writer = Some(BufWriter::new(stream));

                    return Ok(());
                }
                Err(error) if attempt < self._connection_attempts => {
                    debug!(
                        "Failed to connect to the telemetry host {} ({attempt}): {error}",
                        self._address
                    );
                    sleep(self._retry_delay);
                }
                Err(error) => {
                    return Err(ChannelError::Connection {
                        channel: String::from(SINK_NAME),
                        source: error,
                    })
                }
            }
        }
    }
}

impl TelemetrySink for TcpTelemetrySink {
    fn publish(&mut self, record: &Value) -> Result<(), ControlError> {
        if self._writer.is_none() {
            self.connect()?;
        }

        let mut message = record.to_string().into_bytes();
        message.extend_from_slice(TERMINATOR);

        if let Some(writer) = self._writer.as_mut() {
            if let Err(error) = writer.write_all(&message).and_then(|_| writer.flush()) {
                warn!("Lost the telemetry host {}: {error}", self._address);
                self._writer = None;

                return Err(ChannelError::Connection {
                    channel: String::from(SINK_NAME),
                    source: error,
                }
                .into());
            }
        }

        Ok(())
    }
}
