pub mod analyzers;
pub mod cli;
pub mod config;
pub mod curation;
pub mod error;
pub mod fetch;
pub mod models;
pub mod pipeline;
pub mod processors;
pub mod readers;
pub mod utils;
pub mod writers;

pub use error::{ProcessingError, Result};
