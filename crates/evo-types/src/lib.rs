pub mod errors;
pub mod metrics;

pub use errors::*;
pub use metrics::*;
