pub mod color;
pub mod store;
