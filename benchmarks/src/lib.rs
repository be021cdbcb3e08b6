pub mod data;
pub mod dataset;
pub mod exact;
pub mod memory;
