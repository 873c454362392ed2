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

use log::{debug, info};
use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::config::ConfigChannel;
use crate::constants::TERMINATOR;
use crate::enums::TransportKind;
use crate::error::ChannelError;

/// One logical exchange with a device. The text is opaque to the channel.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    // No reply is expected.
    Write(String),
    // The reply is read up to the terminator.
    Query(String),
}

impl DeviceCommand {
    pub fn write(text: &str) -> Self {
        Self::Write(String::from(text))
    }

    pub fn query(text: &str) -> Self {
        Self::Query(String::from(text))
    }

    /// Text of the command without the terminator.
    pub fn text(&self) -> &str {
        match self {
            Self::Write(text) | Self::Query(text) => text,
        }
    }

    pub fn expects_reply(&self) -> bool {
        matches!(self, Self::Query(_))
    }
}

/// Transport to one physical device.
pub trait DeviceChannel: Send {
    /// Name of the channel used in the log and the errors.
    fn name(&self) -> &str;

    /// Open the transport.
    ///
    /// # Returns
    /// The connection error if the device can not be reached.
    fn open(&mut self) -> Result<(), ChannelError>;

    /// Execute one command.
    ///
    /// # Arguments
    /// * `command` - Command.
    ///
    /// # Returns
    /// Reply of the query or an empty string for the write.
    fn execute(&mut self, command: &DeviceCommand) -> Result<String, ChannelError>;

    /// Close the transport. Closing a closed channel does nothing.
    fn close(&mut self);
}

/// Create the channel of the physical device.
///
/// # Arguments
/// * `config` - Channel settings.
///
/// # Returns
/// Channel.
pub fn create_device_channel(config: &ConfigChannel) -> Box<dyn DeviceChannel> {
    let timeout = Duration::from_secs_f64(config.read_timeout);
    match config.transport {
        TransportKind::Tcp => Box::new(TcpChannel::new(
            config.id.as_ref(),
            &config.address,
            timeout,
            TERMINATOR,
        )),
        TransportKind::Serial => Box::new(SerialChannel::new(
            config.id.as_ref(),
            &config.address,
            config.baud_rate,
            timeout,
            TERMINATOR,
        )),
    }
}

/// Read the reply up to the terminator.
///
/// # Arguments
/// * `name` - Name of the channel.
/// * `reader` - Reader.
/// * `terminator` - Terminator of the reply.
///
/// # Returns
/// Reply without the terminator.
fn read_reply<R: Read + ?Sized>(
    name: &str,
    reader: &mut R,
    terminator: &[u8],
) -> Result<String, ChannelError> {
    let mut buffer = Vec::new();
    let mut byte = [0; 1];
    while !buffer.ends_with(terminator) {
        match reader.read(&mut byte) {
            Ok(0) => {
                return Err(ChannelError::Connection {
                    channel: String::from(name),
                    source: io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "device closed the connection",
                    ),
                });
            }
            Ok(_) => buffer.push(byte[0]),
            Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
            Err(error) => {
                return Err(ChannelError::Connection {
                    channel: String::from(name),
                    source: error,
                });
            }
        }
    }

    buffer.truncate(buffer.len() - terminator.len());
    let reply = String::from_utf8(buffer).map_err(|error| {
        ChannelError::protocol(
            name,
            &String::from_utf8_lossy(error.as_bytes()),
            "reply is not UTF-8",
        )
    })?;

    debug!("{name} receives: {reply}.");

    Ok(reply)
}

/// Write the command and read the reply if any.
///
/// # Arguments
/// * `name` - Name of the channel.
/// * `stream` - Stream.
/// * `command` - Command.
/// * `terminator` - Terminator.
///
/// # Returns
/// Reply.
fn exchange<S: Read + Write + ?Sized>(
    name: &str,
    stream: &mut S,
    command: &DeviceCommand,
    terminator: &[u8],
) -> Result<String, ChannelError> {
    let to_connection_error = |error: io::Error| ChannelError::Connection {
        channel: String::from(name),
        source: error,
    };

    debug!("{name} sends: {}.", command.text());

    let mut data = command.text().as_bytes().to_vec();
    data.extend_from_slice(terminator);
    stream.write_all(&data).map_err(to_connection_error)?;
    stream.flush().map_err(to_connection_error)?;

    if command.expects_reply() {
        read_reply(name, stream, terminator)
    } else {
        Ok(String::new())
    }
}

pub struct TcpChannel {
    _name: String,
    // "host:port".
    _address: String,
    _timeout: Duration,
    _terminator: Vec<u8>,
    _stream: Option<TcpStream>,
}

impl TcpChannel {
    /// Create a new TCP/IP channel.
    ///
    /// # Arguments
    /// * `name` - Name of the channel.
    /// * `address` - "host:port" of the device.
    /// * `timeout` - Timeout of the connection and the read.
    /// * `terminator` - Terminator of the message.
    ///
    /// # Returns
    /// A new channel. It is not connected until opened.
    pub fn new(name: &str, address: &str, timeout: Duration, terminator: &[u8]) -> Self {
        Self {
            _name: String::from(name),
            _address: String::from(address),
            _timeout: timeout,
            _terminator: terminator.to_vec(),
            _stream: None,
        }
    }

    /// Connect to the device.
    ///
    /// # Returns
    /// Stream.
    fn connect(&self) -> io::Result<TcpStream> {
        let address = self._address.to_socket_addrs()?.next().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("no address is resolved from {}", self._address),
            )
        })?;

        let stream = TcpStream::connect_timeout(&address, self._timeout)?;
        stream.set_read_timeout(Some(self._timeout))?;
        stream.set_write_timeout(Some(self._timeout))?;
        stream.set_nodelay(true)?;

        Ok(stream)
    }
}

impl DeviceChannel for TcpChannel {
    fn name(&self) -> &str {
        &self._name
    }

    fn open(&mut self) -> Result<(), ChannelError> {
        if self._stream.is_some() {
            return Ok(());
        }

        let stream = self.connect().map_err(|error| ChannelError::Connection {
            channel: self._name.clone(),
            source: error,
        })?;

        debug!("{} is connected to {}.", self._name, self._address);
        self._stream = Some(stream);

        Ok(())
    }

    fn execute(&mut self, command: &DeviceCommand) -> Result<String, ChannelError> {
        let stream = self
            ._stream
            .as_mut()
            .ok_or_else(|| ChannelError::NotOpen {
                channel: self._name.clone(),
            })?;

        exchange(&self._name, stream, command, &self._terminator)
    }

    fn close(&mut self) {
        if let Some(stream) = self._stream.take() {
            // Ignore the possible error.
            let _ = stream.shutdown(Shutdown::Both);
            debug!("{} is disconnected.", self._name);
        }
    }
}

pub struct SerialChannel {
    _name: String,
    // Device path such as "/dev/ttyUSB0".
    _path: String,
    _baud_rate: u32,
    _timeout: Duration,
    _terminator: Vec<u8>,
    _port: Option<Box<dyn serialport::SerialPort>>,
}

impl SerialChannel {
    /// Create a new serial channel.
    ///
    /// # Arguments
    /// * `name` - Name of the channel.
    /// * `path` - Device path.
    /// * `baud_rate` - Baud rate.
    /// * `timeout` - Read timeout.
    /// * `terminator` - Terminator of the message.
    ///
    /// # Returns
    /// A new channel. The port is not opened until opened.
    pub fn new(
        name: &str,
        path: &str,
        baud_rate: u32,
        timeout: Duration,
        terminator: &[u8],
    ) -> Self {
        Self {
            _name: String::from(name),
            _path: String::from(path),
            _baud_rate: baud_rate,
            _timeout: timeout,
            _terminator: terminator.to_vec(),
            _port: None,
        }
    }
}

impl DeviceChannel for SerialChannel {
    fn name(&self) -> &str {
        &self._name
    }

    fn open(&mut self) -> Result<(), ChannelError> {
        if self._port.is_some() {
            return Ok(());
        }

        let port = serialport::new(&self._path, self._baud_rate)
            .timeout(self._timeout)
            .open()
            .map_err(|error| ChannelError::Connection {
                channel: self._name.clone(),
                source: io::Error::from(error),
            })?;

        info!(
            "{} is opened on {} at {} baud.",
            self._name, self._path, self._baud_rate
        );
        self._port = Some(port);

        Ok(())
    }

    fn execute(&mut self, command: &DeviceCommand) -> Result<String, ChannelError> {
        let port = self._port.as_mut().ok_or_else(|| ChannelError::NotOpen {
            channel: self._name.clone(),
        })?;

        exchange(&self._name, port.as_mut(), command, &self._terminator)
    }

    fn close(&mut self) {
        // The port is closed when dropped.
        if self._port.take().is_some() {
            debug!("{} is closed.", self._name);
        }
    }
}
