//! # evo-cli
//!
//! Session driver behind the `mot-evolve` binary.

pub mod options;
pub mod reporting;
pub mod session;

pub use options::Options;
pub use session::{open_study, run_session, SessionOptions, SessionSummary};
