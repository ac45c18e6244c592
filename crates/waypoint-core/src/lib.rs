pub mod config;
pub mod content;
pub mod error;
pub mod hosting;
pub mod model;
pub mod render;
pub mod session;
pub mod storage;
pub mod templates;

pub use error::{Error, Result};
