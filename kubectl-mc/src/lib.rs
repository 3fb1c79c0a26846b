pub mod cli;
pub mod client;
pub mod error;
pub mod get;
pub mod jsonpath;
pub mod logging;
pub mod object;
pub mod printers;

pub use error::{Error, Result};
