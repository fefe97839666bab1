pub mod bbox;
pub mod centroid;
pub mod traversal;
