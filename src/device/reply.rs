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

use std::collections::BTreeMap;

use crate::error::ChannelError;

/// Parse a number.
///
/// # Arguments
/// * `channel` - Name of the channel.
/// * `reply` - Reply of the device.
///
/// # Returns
/// Finite number or the protocol error.
pub fn parse_float(channel: &str, reply: &str) -> Result<f64, ChannelError> {
    match reply.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(ChannelError::protocol(channel, reply, "not a number")),
    }
}

/// Parse a flag of "1" or "0".
///
/// # Arguments
/// * `channel` - Name of the channel.
/// * `reply` - Reply of the device.
///
/// # Returns
/// Flag or the protocol error.
pub fn parse_flag(channel: &str, reply: &str) -> Result<bool, ChannelError> {
    match reply.trim() {
        "1" => Ok(true),
        "0" => Ok(false),
        _ => Err(ChannelError::protocol(channel, reply, "not a flag")),
    }
}

/// Parse a pair of numbers separated by the comma.
///
/// # Arguments
/// * `channel` - Name of the channel.
/// * `reply` - Reply of the device.
///
/// # Returns
/// Pair or the protocol error.
pub fn parse_pair(channel: &str, reply: &str) -> Result<(f64, f64), ChannelError> {
    let items: Vec<&str> = reply.split(',').collect();
    if items.len() != 2 {
        return Err(ChannelError::protocol(channel, reply, "not a pair"));
    }

    Ok((parse_float(channel, items[0])?, parse_float(channel, items[1])?))
}

/// Parse the "key=value" items separated by the white space.
///
/// # Arguments
/// * `channel` - Name of the channel.
/// * `reply` - Reply of the device.
///
/// # Returns
/// Values by key or the protocol error.
pub fn parse_key_values(channel: &str, reply: &str) -> Result<BTreeMap<String, f64>, ChannelError> {
    let mut values = BTreeMap::new();
    for item in reply.split_whitespace() {
        let (key, value) = item
            .split_once('=')
            .ok_or_else(|| ChannelError::protocol(channel, reply, "not a key=value item"))?;
        values.insert(String::from(key), parse_float(channel, value)?);
    }

    if values.is_empty() {
        return Err(ChannelError::protocol(channel, reply, "empty status"));
    }

    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_float() {
        assert_eq!(parse_float("pid", " 1.25 ").unwrap(), 1.25);

        assert!(parse_float("pid", "ERR").is_err());
        assert!(parse_float("pid", "NaN").is_err());
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("drive", "1").unwrap());
        assert!(!parse_flag("drive", "0").unwrap());

        assert!(parse_flag("drive", "2").is_err());
    }

    #[test]
    fn test_parse_pair() {
        assert_eq!(parse_pair("drive", "24.0,3.0").unwrap(), (24.0, 3.0));

        assert!(parse_pair("drive", "24.0").is_err());
        assert!(parse_pair("drive", "24.0,x").is_err());
    }

    #[test]
    fn test_parse_key_values() {
        let values = parse_key_values("gripper", "pos1=1.50 alarm=0").unwrap();

        assert_eq!(values.len(), 2);
        assert_eq!(values["pos1"], 1.5);
        assert_eq!(values["alarm"], 0.0);

        assert!(parse_key_values("gripper", "").is_err());
        assert!(parse_key_values("gripper", "pos1").is_err());
    }
}
