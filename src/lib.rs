// Library surface for the binary, headless/integration tests and reuse.
// Terminal rendering stays in the binary.
pub mod analysis;
pub mod app_dirs;
pub mod clock;
pub mod config;
pub mod error;
pub mod format;
pub mod persist;
pub mod ranking;
pub mod runner;
pub mod runtime;
pub mod session;
pub mod splits;
pub mod stats;
pub mod transfer;
pub mod util;

pub use error::{RaceError, Result};
