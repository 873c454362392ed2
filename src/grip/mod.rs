pub mod gripper_controller;
pub mod position_record;
