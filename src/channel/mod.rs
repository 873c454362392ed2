pub mod channel_lock;
pub mod device_channel;
pub mod gateway;
