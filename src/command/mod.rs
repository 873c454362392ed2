pub mod command_gripper;
pub mod command_rotation;
pub mod command_schema;
pub mod command_system;
