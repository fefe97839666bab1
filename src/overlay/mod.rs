pub mod descriptor;
pub mod sync;
