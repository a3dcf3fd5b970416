//! Search space definitions and parameter samplers.

use evo_types::{ConfigError, EvoResult};
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::pareto::{crowding_distance, non_dominated_sort};
use crate::trial::{ObjectiveDirection, Trial};

/// One sampled assignment, keyed by parameter name.
pub type Params = BTreeMap<String, ParameterValue>;

/// A single parameter dimension in the search space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDef {
    /// Name as the tracker configuration spells it (e.g. "max_age").
    pub name: String,
    /// The kind of search range.
    pub kind: ParameterKind,
}

/// Describes how a parameter is sampled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParameterKind {
    /// Continuous uniform range [low, high].
    FloatRange { low: f64, high: f64 },
    /// Integer range [low, high] inclusive, restricted to `low + k * step`.
    IntRange { low: i64, high: i64, step: i64 },
    /// Categorical choices.
    Choice { values: Vec<ParameterValue> },
}

/// A concrete parameter value produced by a sampler.
///
/// Untagged so that config files and checkpoints hold plain scalars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl ParameterValue {
    /// Numeric view of the value, used for binning and plotting.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }
}

impl std::fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Str(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for ParameterValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for ParameterValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for ParameterValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for ParameterValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl ParameterDef {
    /// Draw one value according to this parameter's rule.
    pub fn sample(&self, rng: &mut StdRng) -> ParameterValue {
        match &self.kind {
            ParameterKind::FloatRange { low, high } => {
                ParameterValue::Float(rng.random_range(*low..=*high))
            }
            ParameterKind::IntRange { low, high, step } => {
                let steps = (high - low) / step;
                let k = rng.random_range(0..=steps);
                ParameterValue::Int(low + k * step)
            }
            ParameterKind::Choice { values } => {
                let idx = rng.random_range(0..values.len());
                values[idx].clone()
            }
        }
    }

    /// Whether `value` is a value this parameter could have produced.
    pub fn contains(&self, value: &ParameterValue) -> bool {
        match (&self.kind, value) {
            (ParameterKind::FloatRange { low, high }, ParameterValue::Float(v)) => {
                *v >= *low && *v <= *high
            }
            (ParameterKind::IntRange { low, high, step }, ParameterValue::Int(v)) => {
                *v >= *low && *v <= *high && (v - low) % step == 0
            }
            (ParameterKind::Choice { values }, v) => values.contains(v),
            _ => false,
        }
    }

    fn validate(&self) -> EvoResult<()> {
        let invalid = |message: &str| ConfigError::InvalidParameter {
            parameter: self.name.clone(),
            message: message.to_string(),
        };
        match &self.kind {
            ParameterKind::FloatRange { low, high } => {
                if !low.is_finite() || !high.is_finite() || low > high {
                    return Err(invalid("float range must be finite with low <= high").into());
                }
            }
            ParameterKind::IntRange { low, high, step } => {
                if *step <= 0 {
                    return Err(invalid("step must be positive").into());
                }
                if low > high {
                    return Err(invalid("int range must have low <= high").into());
                }
            }
            ParameterKind::Choice { values } => {
                if values.is_empty() {
                    return Err(invalid("choice needs at least one value").into());
                }
            }
        }
        Ok(())
    }
}

/// The full search space: an ordered list of parameter definitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSpace {
    pub parameters: Vec<ParameterDef>,
}

impl SearchSpace {
    pub fn new() -> Self {
        Self {
            parameters: Vec::new(),
        }
    }

    pub fn add_float(mut self, name: impl Into<String>, low: f64, high: f64) -> Self {
        self.parameters.push(ParameterDef {
            name: name.into(),
            kind: ParameterKind::FloatRange { low, high },
        });
        self
    }

    pub fn add_int(mut self, name: impl Into<String>, low: i64, high: i64, step: i64) -> Self {
        self.parameters.push(ParameterDef {
            name: name.into(),
            kind: ParameterKind::IntRange { low, high, step },
        });
        self
    }

    pub fn add_choice(mut self, name: impl Into<String>, values: Vec<ParameterValue>) -> Self {
        self.parameters.push(ParameterDef {
            name: name.into(),
            kind: ParameterKind::Choice { values },
        });
        self
    }

    pub fn get(&self, name: &str) -> Option<&ParameterDef> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Reject empty ranges, non-positive steps and duplicate names.
    pub fn validate(&self) -> EvoResult<()> {
        for (i, param) in self.parameters.iter().enumerate() {
            param.validate()?;
            if self.parameters[..i].iter().any(|p| p.name == param.name) {
                return Err(ConfigError::InvalidParameter {
                    parameter: param.name.clone(),
                    message: "declared twice".to_string(),
                }
                .into());
            }
        }
        Ok(())
    }

    /// Independent draw of every parameter.
    pub fn sample(&self, rng: &mut StdRng) -> Params {
        self.parameters
            .iter()
            .map(|p| (p.name.clone(), p.sample(rng)))
            .collect()
    }
}

impl Default for SearchSpace {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Samplers
// ---------------------------------------------------------------------------

/// Common trait for all samplers.
pub trait Sampler: Send + Sync {
    /// Propose the parameters of the next trial given the completed history.
    fn sample(
        &self,
        space: &SearchSpace,
        history: &[Trial],
        directions: &[ObjectiveDirection],
        rng: &mut StdRng,
    ) -> Params;

    /// Human-readable sampler name.
    fn name(&self) -> &str;
}

// ---- Random sampling ----

/// Independent random sampling across the search space.
#[derive(Debug, Clone, Default)]
pub struct RandomSampler;

impl Sampler for RandomSampler {
    fn sample(
        &self,
        space: &SearchSpace,
        _history: &[Trial],
        _directions: &[ObjectiveDirection],
        rng: &mut StdRng,
    ) -> Params {
        space.sample(rng)
    }

    fn name(&self) -> &str {
        "random"
    }
}

// ---- NSGA-II ----

/// Elitist multi-objective genetic sampler (NSGA-II).
///
/// The first `population_size` trials are drawn at random. After that each
/// proposal is a child of two parents picked by binary tournament from the
/// elite set: completed trials ranked by non-dominated front, then by crowding
/// distance. Children take each gene from either parent (uniform crossover)
/// and resample it with `mutation_prob`.
#[derive(Debug, Clone)]
pub struct NsgaIISampler {
    population_size: usize,
    crossover_prob: f64,
    mutation_prob: Option<f64>,
}

struct Ranked<'a> {
    trial: &'a Trial,
    rank: usize,
    crowding: f64,
}

impl NsgaIISampler {
    pub fn new(population_size: usize, crossover_prob: f64, mutation_prob: Option<f64>) -> Self {
        Self {
            population_size: population_size.max(2),
            crossover_prob,
            mutation_prob,
        }
    }

    fn elite<'a>(&self, history: &'a [Trial], directions: &[ObjectiveDirection]) -> Vec<Ranked<'a>> {
        let values: Vec<&[f64]> = history.iter().map(|t| t.values.as_slice()).collect();
        let fronts = non_dominated_sort(&values, directions);

        let mut elite = Vec::with_capacity(self.population_size);
        for (rank, front) in fronts.iter().enumerate() {
            let front_values: Vec<&[f64]> = front.iter().map(|&i| values[i]).collect();
            let distances = crowding_distance(&front_values);
            let mut members: Vec<Ranked<'a>> = front
                .iter()
                .zip(distances)
                .map(|(&i, crowding)| Ranked {
                    trial: &history[i],
                    rank,
                    crowding,
                })
                .collect();

            let room = self.population_size - elite.len();
            if members.len() > room {
                members.sort_by(|a, b| {
                    b.crowding
                        .partial_cmp(&a.crowding)
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
                members.truncate(room);
            }
            elite.extend(members);
            if elite.len() >= self.population_size {
                break;
            }
        }
        elite
    }

    fn tournament<'a, 'b>(elite: &'b [Ranked<'a>], rng: &mut StdRng) -> &'b Ranked<'a> {
        let a = &elite[rng.random_range(0..elite.len())];
        let b = &elite[rng.random_range(0..elite.len())];
        if a.rank != b.rank {
            return if a.rank < b.rank { a } else { b };
        }
        if b.crowding > a.crowding {
            b
        } else {
            a
        }
    }
}

impl Default for NsgaIISampler {
    fn default() -> Self {
        Self::new(50, 0.9, None)
    }
}

impl Sampler for NsgaIISampler {
    fn sample(
        &self,
        space: &SearchSpace,
        history: &[Trial],
        directions: &[ObjectiveDirection],
        rng: &mut StdRng,
    ) -> Params {
        if history.len() < self.population_size {
            return space.sample(rng);
        }

        let elite = self.elite(history, directions);
        let first = Self::tournament(&elite, rng).trial;
        let second = Self::tournament(&elite, rng).trial;

        let mutation_prob = self
            .mutation_prob
            .unwrap_or(1.0 / space.len().max(1) as f64);
        let crossover = rng.random_bool(self.crossover_prob.clamp(0.0, 1.0));

        let mut child = Params::new();
        for param in &space.parameters {
            let parent = if crossover && rng.random_bool(0.5) {
                second
            } else {
                first
            };
            let inherited = parent
                .params
                .get(&param.name)
                .filter(|v| param.contains(v))
                .cloned();

            let value = match inherited {
                Some(v) if !rng.random_bool(mutation_prob.clamp(0.0, 1.0)) => v,
                // Mutated, or the parent predates this parameter's range.
                _ => param.sample(rng),
            };
            child.insert(param.name.clone(), value);
        }
        child
    }

    fn name(&self) -> &str {
        "nsga2"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rand::SeedableRng;

    fn sample_space() -> SearchSpace {
        SearchSpace::new()
            .add_float("iou_thresh", 0.1, 0.4)
            .add_int("max_age", 10, 200, 10)
            .add_choice("ecc", vec![true.into(), false.into()])
    }

    fn trial(number: usize, params: Params, values: Vec<f64>) -> Trial {
        let now = Utc::now();
        Trial {
            number,
            params,
            values,
            started_at: now,
            completed_at: now,
        }
    }

    #[test]
    fn sampled_values_respect_ranges_and_steps() {
        let space = sample_space();
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..200 {
            let params = space.sample(&mut rng);
            assert_eq!(params.len(), 3);
            for def in &space.parameters {
                let value = &params[&def.name];
                assert!(def.contains(value), "{} out of range: {value}", def.name);
            }
            match params.get("max_age") {
                Some(ParameterValue::Int(v)) => assert_eq!((v - 10) % 10, 0),
                other => panic!("unexpected max_age value: {other:?}"),
            }
        }
    }

    #[test]
    fn int_range_hits_both_ends() {
        let space = SearchSpace::new().add_int("n_init", 1, 3, 1);
        let mut rng = StdRng::seed_from_u64(1);
        let drawn: Vec<ParameterValue> = (0..200).map(|_| space.sample(&mut rng)["n_init"].clone()).collect();
        assert!(drawn.contains(&ParameterValue::Int(1)));
        assert!(drawn.contains(&ParameterValue::Int(3)));
    }

    #[test]
    fn contains_rejects_off_step_and_wrong_type() {
        let def = ParameterDef {
            name: "track_buffer".into(),
            kind: ParameterKind::IntRange {
                low: 10,
                high: 60,
                step: 10,
            },
        };
        assert!(def.contains(&ParameterValue::Int(30)));
        assert!(!def.contains(&ParameterValue::Int(35)));
        assert!(!def.contains(&ParameterValue::Int(70)));
        assert!(!def.contains(&ParameterValue::Float(30.0)));
    }

    #[test]
    fn single_value_choice_is_constant() {
        let space = SearchSpace::new().add_choice("nn_budget", vec![ParameterValue::Int(100)]);
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..10 {
            assert_eq!(space.sample(&mut rng)["nn_budget"], ParameterValue::Int(100));
        }
    }

    #[test]
    fn validate_rejects_bad_definitions() {
        assert!(SearchSpace::new().add_int("x", 1, 5, 0).validate().is_err());
        assert!(SearchSpace::new().add_float("x", 0.5, 0.1).validate().is_err());
        assert!(SearchSpace::new().add_choice("x", vec![]).validate().is_err());
        assert!(SearchSpace::new()
            .add_float("x", 0.0, 1.0)
            .add_float("x", 0.0, 1.0)
            .validate()
            .is_err());
        assert!(sample_space().validate().is_ok());
    }

    #[test]
    fn nsga2_samples_randomly_during_first_generation() {
        let space = sample_space();
        let sampler = NsgaIISampler::new(4, 0.9, None);
        let mut rng = StdRng::seed_from_u64(11);
        let directions = vec![ObjectiveDirection::Maximize; 3];
        let params = sampler.sample(&space, &[], &directions, &mut rng);
        assert_eq!(params.len(), space.len());
    }

    #[test]
    fn nsga2_children_stay_in_space() {
        let space = sample_space();
        let sampler = NsgaIISampler::new(4, 0.9, Some(0.2));
        let directions = vec![ObjectiveDirection::Maximize; 3];
        let mut rng = StdRng::seed_from_u64(5);

        let history: Vec<Trial> = (0..8)
            .map(|i| {
                let params = space.sample(&mut rng);
                let x = i as f64;
                trial(i, params, vec![x, 10.0 - x, 50.0])
            })
            .collect();

        for _ in 0..50 {
            let child = sampler.sample(&space, &history, &directions, &mut rng);
            for def in &space.parameters {
                assert!(def.contains(&child[&def.name]));
            }
        }
    }

    #[test]
    fn nsga2_without_mutation_inherits_parent_genes() {
        let space = SearchSpace::new().add_float("inertia", 0.1, 0.4);
        let sampler = NsgaIISampler::new(2, 0.0, Some(0.0));
        let directions = vec![ObjectiveDirection::Maximize; 3];
        let mut rng = StdRng::seed_from_u64(9);

        let history = vec![
            trial(0, Params::from([("inertia".to_string(), ParameterValue::Float(0.15))]), vec![1.0, 1.0, 1.0]),
            trial(1, Params::from([("inertia".to_string(), ParameterValue::Float(0.35))]), vec![2.0, 2.0, 2.0]),
        ];

        for _ in 0..20 {
            let child = sampler.sample(&space, &history, &directions, &mut rng);
            let v = child["inertia"].clone();
            assert!(v == ParameterValue::Float(0.15) || v == ParameterValue::Float(0.35));
        }
    }
}
