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

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use strum::IntoEnumIterator;

use crate::constants::{
    DEFAULT_BATTERY_THRESHOLD, DEFAULT_FREQUENCY_TOLERANCE, DEFAULT_LOCK_BACKOFF,
    DEFAULT_MONITOR_PERIOD, DEFAULT_QUIESCENCE_TIME, DEFAULT_SETTLE_TIME, DEFAULT_SPIN_TIMEOUT,
    DEFAULT_STOP_FAILURE_WAIT, DEFAULT_STOP_FREQUENCY, DEFAULT_STOP_TIMEOUT, LOCK_FILE_PREFIX,
    LOCK_FILE_SUFFIX, MAX_DRIVE_VOLTAGE, MAX_ROTATION_FREQUENCY, NUM_ENCODER_BOARD,
};
use crate::enums::{ChannelId, TransportKind};
use crate::utility::{get_parameter, get_parameter_array, get_parameter_or};

#[derive(Clone, PartialEq, Debug)]
pub struct ConfigChannel {
    pub id: ChannelId,
    pub transport: TransportKind,
    // "host:port" for the TCP/IP or the device path for the serial port.
    pub address: String,
    pub baud_rate: u32,
    // Read timeout in second.
    pub read_timeout: f64,
    // Name of the lock file in the lock directory.
    pub lock_file: String,
}

#[derive(Clone, PartialEq, Debug)]
pub struct ConfigGateway {
    // Wait between two attempts to take a busy lock in second.
    pub lock_backoff: f64,
    // Bound of the attempts to take the lock. None means no bound.
    pub lock_attempts: Option<u32>,
    // Number of the open-execute-close cycles tried on the connection error.
    pub connection_attempts: u32,
}

#[derive(Clone, PartialEq, Debug)]
pub struct ConfigRotation {
    pub max_frequency: f64,
    pub max_voltage: f64,
    pub frequency_tolerance: f64,
    pub stop_frequency: f64,
    // Deadlines in second.
    pub stop_timeout: f64,
    pub spin_timeout: f64,
    // Time in second to wait after enabling the output.
    pub settle_time: f64,
    // Time in second between two frequency read-backs.
    pub poll_interval: f64,
    // PID gains (P, I, D).
    pub gain_tune: [f64; 3],
    pub gain_stop: [f64; 3],
}

#[derive(Clone, PartialEq, Debug)]
pub struct ConfigGripper {
    // Push increments and back-off in mm.
    pub warm_increment: f64,
    pub cold_increment: f64,
    pub cold_backoff: f64,
    pub max_squeeze_steps: usize,
    // Times in second.
    pub regrip_interval: f64,
    pub sleep_granularity: f64,
}

#[derive(Clone, PartialEq, Debug)]
pub struct ConfigSafety {
    // Battery capacity in percent.
    pub battery_threshold: f64,
    // Times in second.
    pub monitor_period: f64,
    pub reboot_wait: f64,
    pub stop_failure_wait: f64,
    pub quiescence_time: f64,
    pub stop_poll_interval: f64,
}

#[derive(Clone, PartialEq, Debug)]
pub struct ConfigTelemetry {
    pub host: String,
    pub port: u16,
    // Times in second.
    pub period: f64,
    pub retry_delay: f64,
    pub connection_attempts: u32,
    pub digit: i32,
}

#[derive(Clone, PartialEq, Debug)]
pub struct ConfigEncoderBoard {
    pub host: String,
    pub user: String,
}

#[derive(Clone, PartialEq, Debug)]
pub struct ConfigEncoder {
    // External programs. A relative path is resolved by the PATH.
    pub reboot_program: String,
    pub packet_collect_program: String,
    pub boards: Vec<ConfigEncoderBoard>,
}

#[derive(Clone, PartialEq, Debug)]
pub struct Config {
    // Configuration filename.
    pub filename: String,
    pub lock_dir: PathBuf,
    pub status_file: PathBuf,
    pub position_file: PathBuf,
    pub gateway: ConfigGateway,
    pub channels: HashMap<ChannelId, ConfigChannel>,
    pub rotation: ConfigRotation,
    pub gripper: ConfigGripper,
    pub safety: ConfigSafety,
    pub telemetry: ConfigTelemetry,
    pub encoder: ConfigEncoder,
}

impl Config {
    /// Create a new config object.
    ///
    /// # Arguments
    /// * `filepath` - The path to the parameters file.
    ///
    /// # Returns
    /// A new config object.
    ///
    /// # Panics
    /// If a required parameter is missing or can not be parsed.
    pub fn new(filepath: &Path) -> Self {
        let channels = ChannelId::iter()
            .map(|id| (id, Self::read_channel(filepath, id)))
            .collect();

        let lock_attempts: u32 = get_parameter_or(filepath, "gateway.lock_attempts", 0);

        Self {
            filename: String::from(
                filepath
                    .to_str()
                    .expect(&format!("Should be able to convert {:?} to a string", filepath)),
            ),

            lock_dir: PathBuf::from(get_parameter::<String>(filepath, "paths.lock_dir")),
            status_file: PathBuf::from(get_parameter::<String>(filepath, "paths.status_file")),
            position_file: PathBuf::from(get_parameter::<String>(
                filepath,
                "paths.position_file",
            )),

            gateway: ConfigGateway {
                lock_backoff: get_parameter_or(
                    filepath,
                    "gateway.lock_backoff",
                    DEFAULT_LOCK_BACKOFF,
                ),
                lock_attempts: if lock_attempts == 0 {
                    None
                } else {
                    Some(lock_attempts)
                },
                connection_attempts: get_parameter_or(filepath, "gateway.connection_attempts", 1),
            },

            channels: channels,

            rotation: ConfigRotation {
                max_frequency: get_parameter_or(
                    filepath,
                    "rotation.max_frequency",
                    MAX_ROTATION_FREQUENCY,
                ),
                max_voltage: get_parameter_or(filepath, "rotation.max_voltage", MAX_DRIVE_VOLTAGE),
                frequency_tolerance: get_parameter_or(
                    filepath,
                    "rotation.frequency_tolerance",
                    DEFAULT_FREQUENCY_TOLERANCE,
                ),
                stop_frequency: get_parameter_or(
                    filepath,
                    "rotation.stop_frequency",
                    DEFAULT_STOP_FREQUENCY,
                ),
                stop_timeout: get_parameter_or(
                    filepath,
                    "rotation.stop_timeout",
                    DEFAULT_STOP_TIMEOUT,
                ),
                spin_timeout: get_parameter_or(
                    filepath,
                    "rotation.spin_timeout",
                    DEFAULT_SPIN_TIMEOUT,
                ),
                settle_time: get_parameter_or(
                    filepath,
                    "rotation.settle_time",
                    DEFAULT_SETTLE_TIME,
                ),
                poll_interval: get_parameter_or(filepath, "rotation.poll_interval", 0.0),
                gain_tune: Self::read_gain(filepath, "rotation.gain_tune"),
                gain_stop: Self::read_gain(filepath, "rotation.gain_stop"),
            },

            gripper: ConfigGripper {
                warm_increment: get_parameter(filepath, "gripper.warm_increment"),
                cold_increment: get_parameter(filepath, "gripper.cold_increment"),
                cold_backoff: get_parameter(filepath, "gripper.cold_backoff"),
                max_squeeze_steps: get_parameter(filepath, "gripper.max_squeeze_steps"),
                regrip_interval: get_parameter(filepath, "gripper.regrip_interval"),
                sleep_granularity: get_parameter(filepath, "gripper.sleep_granularity"),
            },

            safety: ConfigSafety {
                battery_threshold: get_parameter_or(
                    filepath,
                    "safety.battery_threshold",
                    DEFAULT_BATTERY_THRESHOLD,
                ),
                monitor_period: get_parameter_or(
                    filepath,
                    "safety.monitor_period",
                    DEFAULT_MONITOR_PERIOD,
                ),
                reboot_wait: get_parameter(filepath, "safety.reboot_wait"),
                stop_failure_wait: get_parameter_or(
                    filepath,
                    "safety.stop_failure_wait",
                    DEFAULT_STOP_FAILURE_WAIT,
                ),
                quiescence_time: get_parameter_or(
                    filepath,
                    "safety.quiescence_time",
                    DEFAULT_QUIESCENCE_TIME,
                ),
                stop_poll_interval: get_parameter(filepath, "safety.stop_poll_interval"),
            },

            telemetry: ConfigTelemetry {
                host: get_parameter(filepath, "telemetry.host"),
                port: get_parameter(filepath, "telemetry.port"),
                period: get_parameter(filepath, "telemetry.period"),
                retry_delay: get_parameter(filepath, "telemetry.retry_delay"),
                connection_attempts: get_parameter(filepath, "telemetry.connection_attempts"),
                digit: get_parameter(filepath, "telemetry.digit"),
            },

            encoder: ConfigEncoder {
                reboot_program: get_parameter(filepath, "encoders.reboot_program"),
                packet_collect_program: get_parameter(
                    filepath,
                    "encoders.packet_collect_program",
                ),
                boards: (1..=NUM_ENCODER_BOARD)
                    .map(|idx| ConfigEncoderBoard {
                        host: get_parameter(filepath, &format!("encoders.board{idx}.host")),
                        user: get_parameter(filepath, &format!("encoders.board{idx}.user")),
                    })
                    .collect(),
            },
        }
    }

    /// Read the settings of a channel.
    ///
    /// # Arguments
    /// * `filepath` - The path to the parameters file.
    /// * `id` - Channel ID.
    ///
    /// # Returns
    /// Channel settings.
    fn read_channel(filepath: &Path, id: ChannelId) -> ConfigChannel {
        let name = id.as_ref();

        let transport: String = get_parameter(filepath, &format!("channels.{name}.transport"));

        ConfigChannel {
            id: id,
            transport: TransportKind::from_str(&transport)
                .expect(&format!("Unknown transport {transport} of the {name}")),
            address: get_parameter(filepath, &format!("channels.{name}.address")),
            baud_rate: get_parameter_or(filepath, &format!("channels.{name}.baud_rate"), 9600),
            read_timeout: get_parameter_or(filepath, &format!("channels.{name}.read_timeout"), 2.0),
            lock_file: get_parameter_or(
                filepath,
                &format!("channels.{name}.lock_file"),
                format!("{LOCK_FILE_PREFIX}{name}{LOCK_FILE_SUFFIX}"),
            ),
        }
    }

    /// Read the PID gains.
    ///
    /// # Arguments
    /// * `filepath` - The path to the parameters file.
    /// * `key` - Key of the gains.
    ///
    /// # Returns
    /// Gains of (P, I, D).
    ///
    /// # Panics
    /// If there are not three gains.
    fn read_gain(filepath: &Path, key: &str) -> [f64; 3] {
        let gain: Vec<f64> = get_parameter_array(filepath, key);
        assert_eq!(gain.len(), 3, "{key} should have three gains");

        [gain[0], gain[1], gain[2]]
    }

    /// Get the settings of a channel.
    ///
    /// # Arguments
    /// * `id` - Channel ID.
    ///
    /// # Returns
    /// Channel settings.
    pub fn channel(&self, id: ChannelId) -> &ConfigChannel {
        &self.channels[&id]
    }

    /// Get the path of the lock file of a channel.
    ///
    /// # Arguments
    /// * `id` - Channel ID.
    ///
    /// # Returns
    /// Path of the lock file.
    pub fn lock_path(&self, id: ChannelId) -> PathBuf {
        self.lock_dir.join(&self.channel(id).lock_file)
    }

    /// Put the lock files and the records into another directory. This lets
    /// the simulation and the tests run without touching the files of the
    /// real system.
    ///
    /// # Arguments
    /// * `directory` - Directory.
    pub fn redirect_paths(&mut self, directory: &Path) {
        self.lock_dir = directory.to_path_buf();

        for (path, default_name) in [
            (&mut self.status_file, "chwp_safety_status.json"),
            (&mut self.position_file, "chwp_gripper_positions.csv"),
        ] {
            let name = path
                .file_name()
                .map(|name| name.to_os_string())
                .unwrap_or_else(|| default_name.into());
            *path = directory.join(name);
        }
    }
}

/// Get the configuration used by the unit tests. All waits are shortened and
/// the files are put into the directory.
///
/// # Arguments
/// * `directory` - Directory of the lock files and the records.
///
/// # Returns
/// Configuration.
#[cfg(test)]
pub fn get_test_config(directory: &Path) -> Config {
    let mut config = Config::new(Path::new("config/parameters_chwp.yaml"));
    config.redirect_paths(directory);

    config.gateway.lock_backoff = 0.01;
    config.gateway.connection_attempts = 2;

    config.rotation.stop_timeout = 2.0;
    config.rotation.spin_timeout = 2.0;
    config.rotation.settle_time = 0.0;
    config.rotation.poll_interval = 0.0;

    config.gripper.regrip_interval = 0.02;
    config.gripper.sleep_granularity = 0.01;

    config.safety.monitor_period = 0.0;
    config.safety.reboot_wait = 0.0;
    config.safety.stop_failure_wait = 0.0;
    config.safety.quiescence_time = 0.0;
    config.safety.stop_poll_interval = 0.01;

    config.telemetry.period = 0.0;
    config.telemetry.retry_delay = 0.0;

    config
}
