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

use log::{error, info};

use crate::config::{ConfigEncoder, ConfigEncoderBoard};
use crate::constants::NUM_ENCODER_BOARD;
use crate::error::ControlError;
use crate::orchestrator::process_orchestrator::ProcessOrchestrator;
use crate::orchestrator::supervised_task::TaskSpec;

/// Encoder read-out boards. A board is selected by the 1-based index and the
/// index 0 selects all of them.
pub struct EncoderBoards {
    _config: ConfigEncoder,
}

impl EncoderBoards {
    pub fn new(config: &ConfigEncoder) -> Self {
        Self {
            _config: config.clone(),
        }
    }

    /// Get the name of the packet-collect task of a board.
    ///
    /// # Arguments
    /// * `index` - Index of the board (1-based).
    ///
    /// # Returns
    /// Name of the task.
    pub fn get_collector_name(index: usize) -> String {
        format!("bb_packet_collect_{index}")
    }

    fn select(&self, index: usize) -> Result<Vec<(usize, &ConfigEncoderBoard)>, ControlError> {
        if index > NUM_ENCODER_BOARD || index > self._config.boards.len() {
            return Err(ControlError::InvalidArgument(format!(
                "board index should be in [0, {NUM_ENCODER_BOARD}] instead of {index}"
            )));
        }

        Ok(self
            ._config
            .boards
            .iter()
            .enumerate()
            .map(|(idx, board)| (idx + 1, board))
            .filter(|(idx, _)| (index == 0) || (*idx == index))
            .collect())
    }

    fn get_login(board: &ConfigEncoderBoard) -> String {
        format!("{}@{}", board.user, board.host)
    }

    /// Reboot the boards. Every selected board is tried.
    ///
    /// # Arguments
    /// * `orchestrator` - Process orchestrator.
    /// * `index` - Index of the board.
    pub fn reboot(
        &self,
        orchestrator: &mut ProcessOrchestrator,
        index: usize,
    ) -> Result<(), ControlError> {
        let mut result = Ok(());
        for (idx, board) in self.select(index)? {
            let spec = TaskSpec::new(
                &format!("bb_reboot_{idx}"),
                &self._config.reboot_program,
                &[Self::get_login(board)],
            );

            match orchestrator.run(&spec) {
                Ok(()) => info!("Encoder board {idx} is rebooted."),
                Err(error) => {
                    error!("Failed to reboot the encoder board {idx}: {error}");
                    if result.is_ok() {
                        result = Err(error);
                    }
                }
            }
        }

        result
    }

    /// Start collecting the packets of the boards.
    ///
    /// # Arguments
    /// * `orchestrator` - Process orchestrator.
    /// * `index` - Index of the board.
    pub fn start_packet_collect(
        &self,
        orchestrator: &mut ProcessOrchestrator,
        index: usize,
    ) -> Result<(), ControlError> {
        for (idx, board) in self.select(index)? {
            orchestrator.start(&TaskSpec::new(
                &Self::get_collector_name(idx),
                &self._config.packet_collect_program,
                &[Self::get_login(board)],
            ))?;
        }

        Ok(())
    }

    /// Stop collecting the packets of the boards.
    ///
    /// # Arguments
    /// * `orchestrator` - Process orchestrator.
    /// * `index` - Index of the board.
    pub fn stop_packet_collect(
        &self,
        orchestrator: &mut ProcessOrchestrator,
        index: usize,
    ) -> Result<(), ControlError> {
        for (idx, _) in self.select(index)? {
            orchestrator.stop(&Self::get_collector_name(idx))?;
        }

        Ok(())
    }

    /// Get the names of all the packet-collect tasks.
    pub fn get_collector_names(&self) -> Vec<String> {
        (1..=self._config.boards.len())
            .map(Self::get_collector_name)
            .collect()
    }
}
