pub mod money;
pub mod spark;
