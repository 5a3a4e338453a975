pub mod coordinates;
pub mod money;
