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
use serde::{Deserialize, Serialize};
use std::fs::read_to_string;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::enums::SafetyState;
use crate::error::ControlError;

/// Status record shared by the safety monitor and the controlling processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyStatus {
    pub stopping: bool,
    pub off: bool,
}

impl SafetyStatus {
    pub const RUNNING: Self = Self {
        stopping: false,
        off: false,
    };
    pub const STOP_REQUESTED: Self = Self {
        stopping: true,
        off: false,
    };
    pub const STOPPED: Self = Self {
        stopping: true,
        off: true,
    };

    /// Get the state. A record that is not stopping is running whatever the
    /// off flag is.
    ///
    /// # Returns
    /// State.
    pub fn state(&self) -> SafetyState {
        match (self.stopping, self.off) {
            (false, _) => SafetyState::Running,
            (true, false) => SafetyState::StopRequested,
            (true, true) => SafetyState::Stopped,
        }
    }
}

/// Safety status record persisted as JSON at a well-known path. The whole
/// record is read and written on every access, and a write replaces the file
/// atomically.
pub struct SafetyStatusFile {
    _path: PathBuf,
}

impl SafetyStatusFile {
    pub fn new(path: &Path) -> Self {
        Self {
            _path: path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self._path
    }

    /// Read the record.
    ///
    /// # Returns
    /// Record, or None if there is no record yet.
    pub fn read(&self) -> Result<Option<SafetyStatus>, ControlError> {
        if !self._path.exists() {
            return Ok(None);
        }

        let content =
            read_to_string(&self._path).map_err(|error| ControlError::record(&self._path, error))?;

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|error| ControlError::record(&self._path, error))
    }

    /// Read the state. No record means no monitor has ever run, which is the
    /// same as stopped.
    ///
    /// # Returns
    /// State.
    pub fn state(&self) -> Result<SafetyState, ControlError> {
        Ok(self
            .read()?
            .map_or(SafetyState::Stopped, |status| status.state()))
    }

    /// Write the record. The content goes to a temporary file in the same
    /// directory first, which then replaces the record.
    ///
    /// # Arguments
    /// * `status` - Record.
    pub fn write(&self, status: &SafetyStatus) -> Result<(), ControlError> {
        let directory = match self._path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut file = NamedTempFile::new_in(directory)
            .map_err(|error| ControlError::record(&self._path, error))?;

        serde_json::to_writer(&mut file, status)
            .map_err(|error| ControlError::record(&self._path, error))?;
        file.flush()
            .and_then(|_| file.as_file().sync_all())
            .map_err(|error| ControlError::record(&self._path, error))?;

        file.persist(&self._path)
            .map_err(|error| ControlError::record(&self._path, error))?;

        debug!("Safety status record is {status:?}.");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs::{read_dir, write};
    use tempfile::tempdir;

    #[test]
    fn test_state() {
        assert_eq!(SafetyStatus::RUNNING.state(), SafetyState::Running);
        assert_eq!(
            SafetyStatus::STOP_REQUESTED.state(),
            SafetyState::StopRequested
        );
        assert_eq!(SafetyStatus::STOPPED.state(), SafetyState::Stopped);

        let status = SafetyStatus {
            stopping: false,
            off: true,
        };
        assert_eq!(status.state(), SafetyState::Running);
    }

    #[test]
    fn test_read_no_record() {
        let directory = tempdir().unwrap();
        let file = SafetyStatusFile::new(&directory.path().join("status.json"));

        assert_eq!(file.read().unwrap(), None);
        assert_eq!(file.state().unwrap(), SafetyState::Stopped);
    }

    #[test]
    fn test_write() {
        let directory = tempdir().unwrap();
        let file = SafetyStatusFile::new(&directory.path().join("status.json"));

        file.write(&SafetyStatus::RUNNING).unwrap();
        assert_eq!(file.read().unwrap(), Some(SafetyStatus::RUNNING));

        file.write(&SafetyStatus::STOP_REQUESTED).unwrap();
        assert_eq!(file.state().unwrap(), SafetyState::StopRequested);

        // No temporary file is left behind.
        assert_eq!(read_dir(directory.path()).unwrap().count(), 1);

        let content = std::fs::read_to_string(file.path()).unwrap();
        assert_eq!(content, r#"{"stopping":true,"off":false}"#);
    }

    #[test]
    fn test_read_corrupted() {
        let directory = tempdir().unwrap();
        let path = directory.path().join("status.json");
        write(&path, "{\"stopping\": tr").unwrap();

        assert!(matches!(
            SafetyStatusFile::new(&path).read(),
            Err(ControlError::Record { .. })
        ));
    }

    #[test]
    fn test_write_fail() {
        let directory = tempdir().unwrap();
        let file = SafetyStatusFile::new(&directory.path().join("no_dir").join("status.json"));

        assert!(file.write(&SafetyStatus::RUNNING).is_err());
    }
}
