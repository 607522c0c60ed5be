pub mod app;
pub mod chat;
pub mod cli;
pub mod clipboard;
pub mod config;
pub mod error;
pub mod session;
pub mod storage;
pub mod utils;

pub use error::{ConfigSource, Error, Result};
