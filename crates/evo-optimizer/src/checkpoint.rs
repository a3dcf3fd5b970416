//! Versioned study checkpoints.
//!
//! A checkpoint is a JSON document `{ "version", "saved_at", "study" }`. The
//! version is checked before the study is decoded so an incompatible file is
//! reported as such instead of as a generic parse failure.

use chrono::{DateTime, Utc};
use evo_types::{CheckpointError, EvoResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::study::Study;

/// Current checkpoint schema version.
pub const CHECKPOINT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub study: Study,
}

#[derive(Deserialize)]
struct VersionProbe {
    version: u32,
}

/// `<dir>/<tracker>_study.json`
pub fn checkpoint_path(dir: &Path, tracker: &str) -> PathBuf {
    dir.join(format!("{tracker}_study.json"))
}

impl Checkpoint {
    pub fn new(study: Study) -> Self {
        Self {
            version: CHECKPOINT_VERSION,
            saved_at: Utc::now(),
            study,
        }
    }

    /// Overwrite `path` with this checkpoint. The document is written to a
    /// sibling temp file first and renamed into place.
    pub fn save(&self, path: &Path) -> EvoResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)?;
        info!(
            "Saved study checkpoint with {} trials to {}",
            self.study.n_trials(),
            path.display()
        );
        Ok(())
    }

    pub fn load(path: &Path) -> EvoResult<Self> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(CheckpointError::NotFound {
                    path: path.display().to_string(),
                }
                .into())
            }
            Err(e) => return Err(e.into()),
        };

        let corrupt = |e: serde_json::Error| CheckpointError::Corrupt {
            path: path.display().to_string(),
            message: e.to_string(),
        };

        let probe: VersionProbe = serde_json::from_str(&raw).map_err(corrupt)?;
        if probe.version != CHECKPOINT_VERSION {
            return Err(CheckpointError::UnsupportedVersion {
                found: probe.version,
                supported: CHECKPOINT_VERSION,
            }
            .into());
        }

        let checkpoint: Checkpoint = serde_json::from_str(&raw).map_err(corrupt)?;
        checkpoint
            .study
            .check_history()
            .map_err(|message| CheckpointError::Corrupt {
                path: path.display().to_string(),
                message,
            })?;
        info!(
            "Loaded study checkpoint with {} trials from {}",
            checkpoint.study.n_trials(),
            path.display()
        );
        Ok(checkpoint)
    }
}
