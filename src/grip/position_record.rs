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

use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use crate::constants::NUM_GRIPPER_AXIS;
use crate::error::ControlError;

#[derive(Debug, Serialize, Deserialize)]
struct PositionRow {
    name: String,
    x: f64,
    y: f64,
    z: f64,
}

/// Durable log of the named gripper poses. Each capture appends one row and
/// a later row overrides an earlier one with the same name.
pub struct PositionRecord {
    _path: PathBuf,
}

impl PositionRecord {
    pub fn new(path: &Path) -> Self {
        Self {
            _path: path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self._path
    }

    /// Read the poses.
    ///
    /// # Returns
    /// Position of each pose by name. Empty if there is no record yet.
    pub fn read(&self) -> Result<BTreeMap<String, [f64; NUM_GRIPPER_AXIS]>, ControlError> {
        let mut poses = BTreeMap::new();
        if !self._path.exists() {
            return Ok(poses);
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(&self._path)
            .map_err(|error| ControlError::record(&self._path, error))?;

        for row in reader.deserialize::<PositionRow>() {
            let row = row.map_err(|error| ControlError::record(&self._path, error))?;
            poses.insert(row.name, [row.x, row.y, row.z]);
        }

        Ok(poses)
    }

    /// Get the position of a pose.
    ///
    /// # Arguments
    /// * `name` - Name of the pose.
    ///
    /// # Returns
    /// Position if recorded.
    pub fn get(&self, name: &str) -> Result<Option<[f64; NUM_GRIPPER_AXIS]>, ControlError> {
        Ok(self.read()?.get(name).copied())
    }

    /// Append a pose.
    ///
    /// # Arguments
    /// * `name` - Name of the pose.
    /// * `position` - Position of each axis in mm.
    pub fn append(
        &mut self,
        name: &str,
        position: &[f64; NUM_GRIPPER_AXIS],
    ) -> Result<(), ControlError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self._path)
            .map_err(|error| ControlError::record(&self._path, error))?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer
            .serialize(PositionRow {
                name: String::from(name),
                x: position[0],
                y: position[1],
                z: position[2],
            })
            .map_err(|error| ControlError::record(&self._path, error))?;
        writer
            .flush()
            .map_err(|error| ControlError::record(&self._path, error))?;

        info!("Gripper pose {name} is recorded: {position:?}.");

        Ok(())
    }
}
