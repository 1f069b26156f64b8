pub mod kalshi;
pub mod messages;
pub mod traits;
