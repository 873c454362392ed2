use std::str::FromStr;
use strum_macros::{AsRefStr, EnumIter, EnumString, FromRepr, VariantNames};

use crate::error::ControlError;

/// Command status.
#[derive(Debug, PartialEq, VariantNames, AsRefStr)]
pub enum CommandStatus {
    Success,
    Fail,
}

/// Physical channel to a controlled device. Each channel has its own lock.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, EnumIter, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ChannelId {
    // Drive power supply.
    Drive,
    // Bias power supplies.
    Bias1,
    Bias2,
    Gripper,
    Cyberswitch,
    Pid,
    Ups,
}

/// Kind of the transport to the device.
#[derive(Debug, PartialEq, Eq, Clone, Copy, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum TransportKind {
    Serial,
    Tcp,
}

/// Drive mode of the rotation.
#[derive(Debug, PartialEq, Eq, Clone, Copy, EnumString, AsRefStr)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum RotationMode {
    Pid,
    Voltage,
}

impl RotationMode {
    /// Parse the mode from the user input.
    ///
    /// # Arguments
    /// * `name` - Name of the mode.
    ///
    /// # Returns
    /// Mode or the invalid argument error.
    pub fn parse(name: &str) -> Result<Self, ControlError> {
        Self::from_str(name).map_err(|_| {
            ControlError::InvalidArgument(format!(
                "mode should be 'pid' or 'voltage' instead of '{name}'"
            ))
        })
    }
}

/// Direction of the rotation.
#[derive(FromRepr, Debug, PartialEq, Eq, Clone, Copy, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[repr(u8)]
pub enum RotationDirection {
    Forward = 0,
    Reverse = 1,
}

impl RotationDirection {
    /// Parse the direction from the user input.
    ///
    /// # Arguments
    /// * `name` - Name of the direction.
    ///
    /// # Returns
    /// Direction or the invalid argument error.
    pub fn parse(name: &str) -> Result<Self, ControlError> {
        Self::from_str(name).map_err(|_| {
            ControlError::InvalidArgument(format!(
                "direction should be 'forward' or 'reverse' instead of '{name}'"
            ))
        })
    }

    /// Get the opposite direction, which is used to brake the rotor.
    ///
    /// # Returns
    /// Opposite direction.
    pub fn opposite(&self) -> Self {
        match self {
            Self::Forward => Self::Reverse,
            Self::Reverse => Self::Forward,
        }
    }
}

/// State of the rotation controller.
#[derive(Debug, PartialEq, Eq, Clone, Copy, AsRefStr)]
pub enum RotationState {
    Idle,
    ModeSwitching,
    SpinningUp,
    AtSpeed,
    Stopping,
    Stopped,
    Fault,
}

/// Output status of a power supply or a switched port.
#[derive(Debug, PartialEq, Eq, Clone, Copy, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum PowerStatus {
    On,
    Off,
}

impl PowerStatus {
    /// Parse the power status from the user input.
    ///
    /// # Arguments
    /// * `name` - 'on' or 'off'.
    ///
    /// # Returns
    /// Power status or the invalid argument error.
    pub fn parse(name: &str) -> Result<Self, ControlError> {
        Self::from_str(name).map_err(|_| {
            ControlError::InvalidArgument(format!(
                "power status should be 'on' or 'off' instead of '{name}'"
            ))
        })
    }

    /// Is the status on or not.
    ///
    /// # Returns
    /// True if on. Otherwise, false.
    pub fn is_on(&self) -> bool {
        *self == Self::On
    }
}

/// State of the safety monitor, derived from the persisted status record.
#[derive(Debug, PartialEq, Eq, Clone, Copy, AsRefStr)]
pub enum SafetyState {
    Running,
    StopRequested,
    Stopped,
}

/// Device group served by a telemetry publisher process.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, EnumIter, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum TelemetryDevice {
    Ups,
    Cyberswitch,
    Gripper,
    Pid,
    Pmx,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_status() {
        assert_eq!(CommandStatus::Success.as_ref().to_lowercase(), "success");
        assert_eq!(CommandStatus::Fail.as_ref().to_lowercase(), "fail");
    }

    #[test]
    fn test_channel_id_name() {
        assert_eq!(ChannelId::Bias1.as_ref(), "bias1");
        assert_eq!(ChannelId::Cyberswitch.as_ref(), "cyberswitch");

        assert_eq!(ChannelId::from_str("drive").unwrap(), ChannelId::Drive);
        assert!(ChannelId::from_str("bias3").is_err());
    }

    #[test]
    fn test_rotation_direction_parse() {
        assert_eq!(
            RotationDirection::parse("forward").unwrap(),
            RotationDirection::Forward
        );
        assert_eq!(
            RotationDirection::parse("Reverse").unwrap(),
            RotationDirection::Reverse
        );

        assert!(matches!(
            RotationDirection::parse("sideways"),
            Err(ControlError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_rotation_direction_opposite() {
        assert_eq!(
            RotationDirection::Forward.opposite(),
            RotationDirection::Reverse
        );
        assert_eq!(
            RotationDirection::Reverse.opposite(),
            RotationDirection::Forward
        );

        assert_eq!(RotationDirection::Reverse as u8, 1);
        assert_eq!(
            RotationDirection::from_repr(0).unwrap(),
            RotationDirection::Forward
        );
    }

    #[test]
    fn test_power_status_parse() {
        assert!(PowerStatus::parse("ON").unwrap().is_on());
        assert!(!PowerStatus::parse("off").unwrap().is_on());

        assert!(PowerStatus::parse("1").is_err());
    }

    #[test]
    fn test_rotation_mode_name() {
        assert_eq!(RotationMode::Pid.as_ref(), "PID");
        assert_eq!(RotationMode::Voltage.as_ref(), "VOLTAGE");

        assert_eq!(RotationMode::parse("pid").unwrap(), RotationMode::Pid);
        assert!(RotationMode::parse("current").is_err());
    }
}
