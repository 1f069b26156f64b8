pub mod engine;
pub mod exit;
pub mod gate;
pub mod history;
pub mod signal;
pub mod sizing;
pub mod tracker;
