pub mod tiers;
pub mod vertex;
