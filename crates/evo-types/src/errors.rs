use thiserror::Error;

/// Main error type for the evolution tool
#[derive(Error, Debug)]
pub enum EvoError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    #[error("Evaluation error: {0}")]
    Evaluation(#[from] EvaluationError),

    #[error("Study error: {0}")]
    Study(#[from] StudyError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Configuration errors. All of them are fatal and surface before any trial runs.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unknown tracker type: {name} (known: {known})")]
    UnknownTracker { name: String, known: String },

    #[error("Tracker already registered: {name}")]
    DuplicateTracker { name: String },

    #[error("Invalid device specification: {spec}")]
    InvalidDevice { spec: String },

    #[error("Invalid parameter {parameter}: {message}")]
    InvalidParameter { parameter: String, message: String },

    #[error("Missing parameter {parameter} for tracker {tracker}")]
    MissingParameter { tracker: String, parameter: String },

    #[error("Malformed config document {path}: {message}")]
    Malformed { path: String, message: String },

    #[error("YAML error: {0}")]
    Yaml(String),
}

/// Errors raised while extracting metrics from an evaluation report
#[derive(Error, Debug, PartialEq)]
pub enum ReportError {
    #[error("Report does not contain the marker {marker:?}")]
    MarkerMissing { marker: String },

    #[error("No numeric value after marker occurrence {index}")]
    NoMetric { index: usize },

    #[error("Expected {expected} metrics in report, found {found}")]
    TooFewMetrics { expected: usize, found: usize },
}

/// Checkpoint persistence errors
#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("Checkpoint not found: {path} (rerun without --resume)")]
    NotFound { path: String },

    #[error("Unsupported checkpoint version {found} (supported: {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("Corrupt checkpoint {path}: {message}")]
    Corrupt { path: String, message: String },
}

/// Failures of the external evaluation run
#[derive(Error, Debug)]
pub enum EvaluationError {
    #[error("Failed to spawn evaluator {program}: {message}")]
    Spawn { program: String, message: String },

    #[error("Evaluator exited with {status}: {stderr}")]
    ExitStatus { status: String, stderr: String },

    #[error("Evaluator timeout: trial took longer than {timeout_seconds} seconds")]
    Timeout { timeout_seconds: u64 },

    #[error("Evaluation failed after {attempts} attempts: {message}")]
    RetriesExhausted { attempts: u32, message: String },
}

/// Study bookkeeping errors
#[derive(Error, Debug, PartialEq)]
pub enum StudyError {
    #[error("Study has no completed trials")]
    NoTrials,

    #[error("Trial {number} reported {found} values, expected {expected}")]
    WrongValueCount {
        number: usize,
        expected: usize,
        found: usize,
    },

    #[error("Trial {number} reported a non-finite value: {value}")]
    NonFiniteValue { number: usize, value: f64 },

    #[error("Proposal for trial {number} is stale, next trial is {expected}")]
    StaleProposal { number: usize, expected: usize },
}

/// Result type alias used across the workspace
pub type EvoResult<T> = Result<T, EvoError>;

impl EvoError {
    /// Whether a failed trial evaluation may be attempted again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EvoError::Evaluation(
                EvaluationError::Spawn { .. }
                    | EvaluationError::ExitStatus { .. }
                    | EvaluationError::Timeout { .. }
            )
        )
    }
}
