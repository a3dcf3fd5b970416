//! # evo-tracking
//!
//! Tracker-facing side of the evolution tool: the registry of tracker
//! parameter spaces, YAML config files, the external evaluation run and the
//! parsing of its HOTA/MOTA/IDF1 report.

pub mod config;
pub mod device;
pub mod evaluator;
pub mod registry;
pub mod report;
pub mod runner;

pub use config::{default_config_path, read_config, write_best_config, write_config, TrackerConfigDocument};
pub use device::{format_devices, parse_devices, Device};
pub use evaluator::{evaluate_with_retry, CommandEvaluator, EvaluationOptions, Evaluator, TrialConfig};
pub use registry::{SectionSource, TrackerDefinition, TrackerRegistry};
pub use report::{parse_combined_metrics, ReportFormat, COMBINED_MARKER};
pub use runner::TrialRunner;
