//! CLI command implementations
//!
//! Each command takes the loaded [`Config`](crate::config::Config) and
//! prints through [`Output`](crate::cli::Output). Async commands are driven
//! by the runtime created in `main`.

pub mod config;
pub mod reports;
pub mod research;
pub mod serve;
pub mod status;
