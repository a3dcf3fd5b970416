//! Trials and sampler settings.

use chrono::{DateTime, Utc};
use evo_types::{Objective, Scores};
use serde::{Deserialize, Serialize};

use crate::search::{NsgaIISampler, Params, RandomSampler, Sampler};

/// Whether we are maximizing or minimizing an objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectiveDirection {
    Maximize,
    Minimize,
}

impl Default for ObjectiveDirection {
    fn default() -> Self {
        Self::Maximize
    }
}

/// Which sampler a study proposes trials with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplerKind {
    Random,
    Nsga2,
}

/// Sampler configuration persisted with the study so a resumed run keeps
/// proposing from the same seeded stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplerSettings {
    pub kind: SamplerKind,
    pub seed: u64,
    pub population_size: usize,
    pub crossover_prob: f64,
    /// Per-parameter mutation probability; `None` means `1 / len(space)`.
    pub mutation_prob: Option<f64>,
}

impl SamplerSettings {
    pub fn new(seed: u64) -> Self {
        Self {
            kind: SamplerKind::Nsga2,
            seed,
            population_size: 50,
            crossover_prob: 0.9,
            mutation_prob: None,
        }
    }

    pub fn with_kind(mut self, kind: SamplerKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_population_size(mut self, n: usize) -> Self {
        self.population_size = n;
        self
    }

    pub fn build(&self) -> Box<dyn Sampler> {
        match self.kind {
            SamplerKind::Random => Box::new(RandomSampler),
            SamplerKind::Nsga2 => Box::new(NsgaIISampler::new(
                self.population_size,
                self.crossover_prob,
                self.mutation_prob,
            )),
        }
    }
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self::new(0)
    }
}

/// A parameter assignment handed out by `Study::ask`, not yet scored.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialProposal {
    pub number: usize,
    pub params: Params,
    pub started_at: DateTime<Utc>,
}

/// A completed trial: one parameter assignment and its objective values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trial {
    pub number: usize,
    pub params: Params,
    /// Objective values in study order (HOTA, MOTA, IDF1).
    pub values: Vec<f64>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl Trial {
    pub fn value(&self, objective: Objective) -> f64 {
        self.values[objective.index()]
    }

    pub fn scores(&self) -> Scores {
        Scores::new(
            self.value(Objective::Hota),
            self.value(Objective::Mota),
            self.value(Objective::Idf1),
        )
    }

    pub fn duration_seconds(&self) -> i64 {
        (self.completed_at - self.started_at).num_seconds()
    }
}
