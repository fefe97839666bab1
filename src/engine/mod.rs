pub mod adapter;
pub mod memory;
