pub mod app;
pub mod cli;
pub mod error;
pub mod logging;
pub mod output;
pub mod platform;
pub mod reports;
pub mod rollup;
pub mod storage;

pub use error::{Error, Result};
