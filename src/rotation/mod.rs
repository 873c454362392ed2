pub mod rotation_controller;
