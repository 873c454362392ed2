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

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors of a command exchange on a device channel.
#[derive(Error, Debug)]
pub enum ChannelError {
    /// The channel lock is held by another process and the caller-supplied
    /// attempt bound is exhausted.
    #[error("Channel {channel} is busy after {attempts} attempts")]
    Busy { channel: String, attempts: u32 },

    /// The transport can not be opened, read, or written.
    #[error("Connection error on channel {channel}: {source}")]
    Connection {
        channel: String,
        #[source]
        source: io::Error,
    },

    /// The device responded but the response is not understood.
    #[error("Protocol error on channel {channel}: {reason} (response: {response:?})")]
    Protocol {
        channel: String,
        response: String,
        reason: String,
    },

    /// The lock file can not be opened or locked for a reason other than the
    /// contention.
    #[error("Lock error on {path:?}: {source}")]
    Lock {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Command is executed before the transport is opened.
    #[error("Channel {channel} is not open")]
    NotOpen { channel: String },
}

impl ChannelError {
    /// Create a protocol error.
    ///
    /// # Arguments
    /// * `channel` - Channel name.
    /// * `response` - Response from the device.
    /// * `reason` - Why the response is not understood.
    ///
    /// # Returns
    /// Protocol error.
    pub fn protocol(channel: &str, response: &str, reason: &str) -> Self {
        Self::Protocol {
            channel: String::from(channel),
            response: String::from(response),
            reason: String::from(reason),
        }
    }

    /// Is the error recoverable by retrying the whole open-execute-close
    /// cycle or not.
    ///
    /// # Returns
    /// True if it is a connection error. Otherwise, false.
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }
}

/// Errors of the control operations of the rotation, gripper, safety
/// monitor, and helper processes.
#[derive(Error, Debug)]
pub enum ControlError {
    /// Caller-supplied value is out of the contract. No hardware access is
    /// attempted.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// A polling loop exceeded its deadline. The drive output was forced off.
    #[error("{operation} did not finish within {seconds:.1} s")]
    Timeout { operation: String, seconds: f64 },

    /// User interrupted a blocking loop. The drive output was forced off.
    #[error("{operation} is interrupted by the user")]
    UserCancelled { operation: String },

    /// A bounded stepping loop ran out of steps before it converged.
    #[error("{operation} did not finish within {steps} steps")]
    StepLimit { operation: String, steps: usize },

    #[error("Emergency monitor is already running")]
    MonitorRunning,

    #[error("Emergency monitor is already stopped")]
    MonitorStopped,

    #[error("Emergency shutdown is in progress")]
    ShutdownInProgress,

    /// Persisted record (safety status or gripper position) can not be read
    /// or written.
    #[error("Record error on {path:?}: {reason}")]
    Record { path: PathBuf, reason: String },

    /// Helper process can not be spawned or terminated.
    #[error("Process {name}: {reason}")]
    Process { name: String, reason: String },
}

impl ControlError {
    /// Create a record error.
    ///
    /// # Arguments
    /// * `path` - Path of the record.
    /// * `reason` - Reason of the error.
    ///
    /// # Returns
    /// Record error.
    pub fn record(path: &std::path::Path, reason: impl ToString) -> Self {
        Self::Record {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_error_display() {
        let error = ChannelError::Busy {
            channel: String::from("bias1"),
            attempts: 3,
        };
        let message = format!("{error}");
        assert!(message.contains("bias1"));
        assert!(message.contains("3"));

        let error = ChannelError::protocol("pid", "xyz", "not a number");
        let message = format!("{error}");
        assert!(message.contains("xyz"));
        assert!(message.contains("not a number"));
    }

    #[test]
    fn test_is_connection() {
        let error = ChannelError::Connection {
            channel: String::from("drive"),
            source: io::Error::new(io::ErrorKind::ConnectionRefused, "refused"),
        };
        assert!(error.is_connection());

        assert!(!ChannelError::protocol("drive", "", "empty").is_connection());
    }

    #[test]
    fn test_control_error_from_channel_error() {
        let error: ControlError = ChannelError::NotOpen {
            channel: String::from("gripper"),
        }
        .into();

        assert!(matches!(error, ControlError::Channel(_)));
        assert_eq!(format!("{error}"), "Channel gripper is not open");
    }
}
