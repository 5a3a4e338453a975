pub mod order_store;
pub mod region_lookup;
