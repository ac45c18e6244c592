pub mod checkpoint;
pub mod context;
