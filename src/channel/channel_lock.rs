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

use log::debug;
use nix::errno::Errno;
use nix::fcntl::{Flock, FlockArg};
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use crate::error::ChannelError;

/// Advisory lock of one physical channel, shared by all the processes on the
/// host through a lock file. The lock is exclusive and never blocks the
/// caller: a busy lock is reported and the caller decides when to retry.
pub struct ChannelLock {
    _path: PathBuf,
}

/// Holder of the channel lock. The lock is released when the guard is
/// dropped.
pub struct ChannelLockGuard {
    _lock: Flock<File>,
}

impl ChannelLock {
    /// Create a new channel lock.
    ///
    /// # Arguments
    /// * `path` - Path of the lock file. It is created if missing.
    ///
    /// # Returns
    /// A new channel lock.
    pub fn new(path: &Path) -> Self {
        Self {
            _path: path.to_path_buf(),
        }
    }

    /// Path of the lock file.
    pub fn path(&self) -> &Path {
        &self._path
    }

    /// Try to take the lock in the exclusive and non-blocking mode.
    ///
    /// # Returns
    /// Guard of the lock, None if another holder has the lock, or the lock
    /// error if the lock file can not be opened or locked.
    pub fn try_acquire(&self) -> Result<Option<ChannelLockGuard>, ChannelError> {
        // Each attempt opens its own file description. Two descriptions of the
        // same file contend even inside one process.
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self._path)
            .map_err(|error| ChannelError::Lock {
                path: self._path.clone(),
                source: error,
            })?;

        match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
            Ok(lock) => Ok(Some(ChannelLockGuard { _lock: lock })),
            Err((_, errno)) if errno == Errno::EWOULDBLOCK => {
                debug!("Lock {:?} is held by another holder.", self._path);
                Ok(None)
            }
            Err((_, errno)) => Err(ChannelError::Lock {
                path: self._path.clone(),
                source: io::Error::from(errno),
            }),
        }
    }
}
