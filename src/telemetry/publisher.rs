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

use log::{debug, error, info};
use serde_json::{json, Value};
use std::sync::atomic::AtomicBool;

use crate::config::ConfigTelemetry;
use crate::error::ControlError;
use crate::telemetry::telemetry_sink::TelemetrySink;
use crate::telemetry::telemetry_source::TelemetrySource;
use crate::utility::{get_system_time, sleep_interruptible};

// Step of the wait between two samples in second.
const SAMPLE_GRANULARITY: f64 = 0.5;

/// Sample a device group periodically and publish the records.
pub struct Publisher {
    _source: Box<dyn TelemetrySource>,
    _sink: Box<dyn TelemetrySink>,
    // Index of the next record.
    _index: u64,
    _config: ConfigTelemetry,
}

impl Publisher {
    /// Create a new publisher.
    ///
    /// # Arguments
    /// * `source` - Telemetry source.
    /// * `sink` - Telemetry sink.
    /// * `config` - Telemetry settings.
    ///
    /// # Returns
    /// A new publisher.
    pub fn new(
        source: Box<dyn TelemetrySource>,
        sink: Box<dyn TelemetrySink>,
        config: &ConfigTelemetry,
    ) -> Self {
        Self {
            _source: source,
            _sink: sink,
            _index: 0,
            _config: config.clone(),
        }
    }

    pub fn index(&self) -> u64 {
        self._index
    }

    /// Sample and publish one record. The index advances only when the record
    /// is published.
    ///
    /// # Returns
    /// Published record.
    pub fn step(&mut self) -> Result<Value, ControlError> {
        let mut record = self._source.sample(self._config.digit)?;
        record.insert(String::from("index"), json!(self._index));
        record.insert(String::from("time"), json!(get_system_time()));

        let record = Value::Object(record);
        self._sink.publish(&record)?;

        self._index += 1;

        Ok(record)
    }

    /// Publish until stopped.
    ///
    /// # Arguments
    /// * `stop` - Set by the signal handler.
    pub fn run(&mut self, stop: &AtomicBool) {
        let device = self._source.device();
        info!("Publisher of the {} is running.", device.as_ref());

        loop {
            let wait = match self.step() {
                Ok(record) => {
                    debug!("Published: {record}");
                    self._config.period
                }
                Err(error) => {
                    error!("Failed to publish the {}: {error}", device.as_ref());
                    self._config.retry_delay
                }
            };

            if !sleep_interruptible(wait, SAMPLE_GRANULARITY, stop) {
                break;
            }
        }

        info!(
            "Publisher of the {} is stopped after {} records.",
            device.as_ref(),
            self._index
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::Map;
    use std::sync::atomic::Ordering;
    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;

    use crate::config::get_test_config;
    use crate::enums::{ChannelId, TelemetryDevice};
    use crate::mock::mock_plant::MockPlant;
    use crate::telemetry::telemetry_source::create_telemetry_source;

    /// Sink that keeps the records. It stops the publisher after enough
    /// records.
    struct FakeSink {
        records: Arc<Mutex<Vec<Value>>>,
        stop: Arc<AtomicBool>,
        limit: usize,
        fail_once: bool,
    }

    impl TelemetrySink for FakeSink {
        fn publish(&mut self, record: &Value) -> Result<(), ControlError> {
            if self.fail_once {
                self.fail_once = false;
                return Err(ControlError::InvalidArgument(String::from("fail")));
            }

            let mut records = self.records.lock().unwrap();
            records.push(record.clone());
            if records.len() >= self.limit {
                self.stop.store(true, Ordering::Relaxed);
            }

            Ok(())
        }
    }

    struct CountingSource {
        count: u32,
    }

    impl TelemetrySource for CountingSource {
        fn device(&self) -> TelemetryDevice {
            TelemetryDevice::Pid
        }

        fn sample(&mut self, digit: i32) -> Result<Map<String, Value>, ControlError> {
            self.count += 1;
            if self.count == 2 {
                return Err(ControlError::InvalidArgument(String::from("glitch")));
            }

            let mut record = Map::new();
            record.insert(String::from("value"), json!(self.round(1.23456, digit)));
            Ok(record)
        }
    }

    fn create_publisher(
        source: Box<dyn TelemetrySource>,
        limit: usize,
        fail_once: bool,
    ) -> (Publisher, Arc<Mutex<Vec<Value>>>, Arc<AtomicBool>) {
        let directory = tempdir().unwrap();
        let config = get_test_config(directory.path());

        let records = Arc::new(Mutex::new(Vec::new()));
        let stop = Arc::new(AtomicBool::new(false));
        let sink = FakeSink {
            records: records.clone(),
            stop: stop.clone(),
            limit: limit,
            fail_once: fail_once,
        };

        (
            Publisher::new(source, Box::new(sink), &config.telemetry),
            records,
            stop,
        )
    }

    #[test]
    fn test_step() {
        let (mut publisher, records, _) =
            create_publisher(Box::new(CountingSource { count: 0 }), 10, false);

        let record = publisher.step().unwrap();

        assert_eq!(record["index"], 0);
        assert_eq!(record["value"], 1.235);
        assert!(record["time"].as_f64().unwrap() > 0.0);
        assert_eq!(publisher.index(), 1);

        // Sample error does not advance the index.
        assert!(publisher.step().is_err());
        assert_eq!(publisher.index(), 1);

        publisher.step().unwrap();
        assert_eq!(records.lock().unwrap()[1]["index"], 1);
    }

    #[test]
    fn test_run() {
        let (mut publisher, records, stop) =
            create_publisher(Box::new(CountingSource { count: 0 }), 3, true);

        publisher.run(&stop);

        // The first sample fails to publish and the second one fails to
        // sample.
        let records = records.lock().unwrap();
        let indexes: Vec<u64> = records
            .iter()
            .map(|record| record["index"].as_u64().unwrap())
            .collect();
        assert_eq!(indexes, vec![0, 1, 2]);
        assert_eq!(publisher.index(), 3);
    }

    #[test]
    fn test_run_with_mock_plant() {
        let directory = tempdir().unwrap();
        let config = get_test_config(directory.path());
        let plant = Arc::new(Mutex::new(MockPlant::new()));

        let source = create_telemetry_source(TelemetryDevice::Ups, &config, Some(&plant));
        let (mut publisher, records, stop) = create_publisher(source, 2, false);

        publisher.run(&stop);

        assert_eq!(records.lock().unwrap()[1]["battery_capacity"], 100.0);
        assert_eq!(
            plant.lock().unwrap().get_commands(ChannelId::Ups).len(),
            2 * 7
        );
    }
}
