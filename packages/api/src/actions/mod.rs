pub mod connect;
pub mod default;
pub mod disconnect;
pub mod presence;
pub mod relay;
pub mod rooms;
