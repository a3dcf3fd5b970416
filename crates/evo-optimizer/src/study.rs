//! Study: the accumulated trial history of one search.

use chrono::{DateTime, Utc};
use evo_types::{Objective, StudyError, OBJECTIVE_COUNT};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::pareto::pareto_front;
use crate::search::SearchSpace;
use crate::trial::{ObjectiveDirection, SamplerSettings, Trial, TrialProposal};

/// Unique study identifier.
pub type StudyId = Uuid;

/// All completed trials of a search plus the sampler state needed to continue it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Study {
    pub id: StudyId,
    pub name: String,
    pub directions: Vec<ObjectiveDirection>,
    pub sampler: SamplerSettings,
    pub created_at: DateTime<Utc>,
    trials: Vec<Trial>,
}

impl Study {
    /// Fresh study maximizing HOTA, MOTA and IDF1.
    pub fn create(name: impl Into<String>, sampler: SamplerSettings) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            directions: vec![ObjectiveDirection::Maximize; OBJECTIVE_COUNT],
            sampler,
            created_at: Utc::now(),
            trials: Vec::new(),
        }
    }

    pub fn trials(&self) -> &[Trial] {
        &self.trials
    }

    pub fn n_trials(&self) -> usize {
        self.trials.len()
    }

    /// Propose the next trial. Its number is its position in the history, and
    /// its random stream is derived from the study seed and that number.
    pub fn ask(&self, space: &SearchSpace) -> TrialProposal {
        let number = self.trials.len();
        let mut rng = self.trial_rng(number);
        let params = self
            .sampler
            .build()
            .sample(space, &self.trials, &self.directions, &mut rng);
        debug!("Proposed trial {} with {} parameters", number, params.len());

        TrialProposal {
            number,
            params,
            started_at: Utc::now(),
        }
    }

    /// Record a scored proposal. Values must be one finite number per objective.
    /// The proposal must come from the latest `ask`.
    pub fn tell(&mut self, proposal: TrialProposal, values: Vec<f64>) -> Result<&Trial, StudyError> {
        if proposal.number != self.trials.len() {
            return Err(StudyError::StaleProposal {
                number: proposal.number,
                expected: self.trials.len(),
            });
        }
        if values.len() != self.directions.len() {
            return Err(StudyError::WrongValueCount {
                number: proposal.number,
                expected: self.directions.len(),
                found: values.len(),
            });
        }
        if let Some(value) = values.iter().find(|v| !v.is_finite()) {
            return Err(StudyError::NonFiniteValue {
                number: proposal.number,
                value: *value,
            });
        }

        self.trials.push(Trial {
            number: proposal.number,
            params: proposal.params,
            values,
            started_at: proposal.started_at,
            completed_at: Utc::now(),
        });
        Ok(&self.trials[self.trials.len() - 1])
    }

    /// Pareto-optimal trials, ordered by trial number.
    pub fn best_trials(&self) -> Vec<&Trial> {
        pareto_front(&self.trials, &self.directions)
    }

    /// The front trial with the highest value for `objective`. On ties the
    /// lowest trial number wins.
    pub fn best_for(&self, objective: Objective) -> Result<&Trial, StudyError> {
        let idx = objective.index();
        self.best_trials()
            .into_iter()
            .fold(None, |best: Option<&Trial>, t| match best {
                Some(b) if b.values[idx] >= t.values[idx] => Some(b),
                _ => Some(t),
            })
            .ok_or(StudyError::NoTrials)
    }

    /// Check what `tell` guarantees: one finite value per objective and trial
    /// numbers equal to history positions. Used on studies read from disk.
    pub(crate) fn check_history(&self) -> Result<(), String> {
        if self.directions.len() != OBJECTIVE_COUNT {
            return Err(format!(
                "study has {} objectives, expected {}",
                self.directions.len(),
                OBJECTIVE_COUNT
            ));
        }
        for (position, trial) in self.trials.iter().enumerate() {
            if trial.number != position {
                return Err(format!("trial at position {position} is numbered {}", trial.number));
            }
            if trial.values.len() != OBJECTIVE_COUNT {
                return Err(format!(
                    "trial {} has {} values, expected {}",
                    trial.number,
                    trial.values.len(),
                    OBJECTIVE_COUNT
                ));
            }
            if trial.values.iter().any(|v| !v.is_finite()) {
                return Err(format!("trial {} has a non-finite value", trial.number));
            }
        }
        Ok(())
    }

    fn trial_rng(&self, number: usize) -> StdRng {
        let mixed = self
            .sampler
            .seed
            ^ (number as u64).wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15);
        StdRng::seed_from_u64(mixed)
    }
}
