pub mod mock_channel;
pub mod mock_constants;
pub mod mock_plant;
pub mod mock_power_supply;
