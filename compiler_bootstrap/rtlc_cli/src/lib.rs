//! Command-line driver for the RTL compiler (§6).
//!
//! The binary itself lives in `main.rs`; this library half holds the parts
//! an integration test can exercise without going through `std::process`:
//! the resolved run configuration and the three non-emission dump formats.

pub mod config;
pub mod dump;

pub use config::{CompileConfig, Mode, ProjectFile};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
