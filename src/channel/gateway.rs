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

use log::{debug, warn};
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::sleep;
use std::time::Duration;

use crate::channel::channel_lock::{ChannelLock, ChannelLockGuard};
use crate::channel::device_channel::{create_device_channel, DeviceChannel, DeviceCommand};
use crate::config::{Config, ConfigGateway};
use crate::enums::ChannelId;
use crate::error::ChannelError;
use crate::mock::mock_channel::MockChannel;
use crate::mock::mock_plant::MockPlant;

/// Create the gateway of a channel.
///
/// # Arguments
/// * `config` - Configuration.
/// * `id` - Channel ID.
/// * `plant` - Mock plant in the simulation mode. Put None to use the
/// physical channel.
///
/// # Returns
/// Gateway.
pub fn create_gateway(
    config: &Config,
    id: ChannelId,
    plant: Option<&Arc<Mutex<MockPlant>>>,
) -> LockedCommandGateway {
    let channel: Box<dyn DeviceChannel> = match plant {
        Some(plant) => Box::new(MockChannel::new(id, plant)),
        None => create_device_channel(config.channel(id)),
    };

    LockedCommandGateway::new(&config.lock_path(id), channel, &config.gateway)
}

/// Serialize the access to one physical channel across the processes. Every
/// exchange takes the channel lock, opens the transport, runs the operation,
/// closes the transport, and releases the lock.
pub struct LockedCommandGateway {
    _lock: ChannelLock,
    _channel: Box<dyn DeviceChannel>,
    // Wait between two attempts to take a busy lock.
    _lock_backoff: Duration,
    // None means to retry forever.
    _lock_attempts: Option<u32>,
    _connection_attempts: u32,
    // Number of the busy locks seen so far.
    _busy_count: Arc<AtomicU32>,
}

impl LockedCommandGateway {
    /// Create a new gateway.
    ///
    /// # Arguments
    /// * `lock_path` - Path of the lock file of the channel.
    /// * `channel` - Channel.
    /// * `config` - Gateway settings.
    ///
    /// # Returns
    /// A new gateway.
    pub fn new(lock_path: &Path, channel: Box<dyn DeviceChannel>, config: &ConfigGateway) -> Self {
        Self {
            _lock: ChannelLock::new(lock_path),
            _channel: channel,
            _lock_backoff: Duration::from_secs_f64(config.lock_backoff.max(0.0)),
            _lock_attempts: config.lock_attempts,
            _connection_attempts: config.connection_attempts.max(1),
            _busy_count: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Name of the channel.
    pub fn name(&self) -> &str {
        self._channel.name()
    }

    /// Get the counter of the busy locks. This is useful to observe the
    /// contention from another thread.
    ///
    /// # Returns
    /// Counter.
    pub fn get_busy_count_reference(&self) -> Arc<AtomicU32> {
        self._busy_count.clone()
    }

    /// Execute one command on the channel.
    ///
    /// # Arguments
    /// * `command` - Command.
    ///
    /// # Returns
    /// Reply of the device.
    pub fn execute(&mut self, command: &DeviceCommand) -> Result<String, ChannelError> {
        self.with_channel(|channel| channel.execute(command))
    }

    /// Run an operation on the channel while holding the lock.
    ///
    /// The whole cycle is tried again when the transport fails to open with
    /// the connection error, up to the configured attempts. An error of the
    /// operation itself is returned as is, so a write is never sent twice.
    /// The lock is released on every exit path, after the transport is
    /// closed.
    ///
    /// # Arguments
    /// * `operation` - Operation on the opened channel.
    ///
    /// # Returns
    /// Result of the operation.
    pub fn with_channel<T, F>(&mut self, mut operation: F) -> Result<T, ChannelError>
    where
        F: FnMut(&mut dyn DeviceChannel) -> Result<T, ChannelError>,
    {
        let mut attempt = 1;
        loop {
            match self.run_cycle(&mut operation) {
                Ok(result) => return result,
                Err(error) if error.is_connection() && attempt < self._connection_attempts => {
                    warn!(
                        "{} (attempt {attempt}/{}). Trying again...",
                        error, self._connection_attempts
                    );
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }

    /// Run one lock-open-operate-close-unlock cycle.
    ///
    /// # Arguments
    /// * `operation` - Operation on the opened channel.
    ///
    /// # Returns
    /// Result of the operation, or the error to take the lock or to open the
    /// transport if the operation did not run.
    fn run_cycle<T, F>(
        &mut self,
        operation: &mut F,
    ) -> Result<Result<T, ChannelError>, ChannelError>
    where
        F: FnMut(&mut dyn DeviceChannel) -> Result<T, ChannelError>,
    {
        let _guard = self.acquire()?;

        let result = self
            ._channel
            .open()
            .map(|_| operation(self._channel.as_mut()));
        self._channel.close();

        result
    }

    /// Take the lock, waiting the back-off between the attempts.
    ///
    /// # Returns
    /// Guard of the lock.
    fn acquire(&self) -> Result<ChannelLockGuard, ChannelError> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            if let Some(guard) = self._lock.try_acquire()? {
                return Ok(guard);
            }

            self._busy_count.fetch_add(1, Ordering::Relaxed);

            if let Some(bound) = self._lock_attempts {
                if attempts >= bound {
                    return Err(ChannelError::Busy {
                        channel: String::from(self.name()),
                        attempts: attempts,
                    });
                }
            }

            debug!(
                "{} is busy. Trying again in {:?}.",
                self.name(),
                self._lock_backoff
            );
            sleep(self._lock_backoff);
        }
    }
}
