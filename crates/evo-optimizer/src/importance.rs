//! Per-objective parameter importance.
//!
//! Importance of a parameter is its correlation ratio (eta squared): the share
//! of the objective's variance explained by grouping trials on that
//! parameter's value. Numeric ranges are bucketed into equal-width bins first.
//! Scores are normalized to sum to one across parameters.

use evo_types::Objective;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::search::{ParameterDef, ParameterKind, ParameterValue, SearchSpace};
use crate::trial::Trial;

const NUMERIC_BINS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamImportance {
    pub name: String,
    pub importance: f64,
}

fn group_key(def: &ParameterDef, value: &ParameterValue) -> String {
    let bounds = match &def.kind {
        ParameterKind::FloatRange { low, high } => Some((*low, *high)),
        ParameterKind::IntRange { low, high, .. } => Some((*low as f64, *high as f64)),
        ParameterKind::Choice { .. } => None,
    };
    match (bounds, value.as_f64()) {
        (Some((low, high)), Some(v)) if high > low => {
            let t = ((v - low) / (high - low)).clamp(0.0, 1.0);
            let bin = ((t * NUMERIC_BINS as f64) as usize).min(NUMERIC_BINS - 1);
            format!("bin{bin}")
        }
        _ => value.to_string(),
    }
}

fn eta_squared(def: &ParameterDef, trials: &[Trial], idx: usize) -> f64 {
    let samples: Vec<(String, f64)> = trials
        .iter()
        .filter_map(|t| t.params.get(&def.name).map(|v| (group_key(def, v), t.values[idx])))
        .collect();
    if samples.len() < 2 {
        return 0.0;
    }

    let mean = samples.iter().map(|(_, y)| y).sum::<f64>() / samples.len() as f64;
    let total: f64 = samples.iter().map(|(_, y)| (y - mean).powi(2)).sum();
    if total <= 0.0 {
        return 0.0;
    }

    let mut groups: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    for (key, y) in &samples {
        let entry = groups.entry(key.as_str()).or_insert((0.0, 0));
        entry.0 += y;
        entry.1 += 1;
    }
    let between: f64 = groups
        .values()
        .map(|(sum, n)| {
            let group_mean = sum / *n as f64;
            *n as f64 * (group_mean - mean).powi(2)
        })
        .sum();

    (between / total).clamp(0.0, 1.0)
}

/// Importance of every parameter in `space` for `objective`, most important first.
pub fn param_importances(space: &SearchSpace, trials: &[Trial], objective: Objective) -> Vec<ParamImportance> {
    let idx = objective.index();
    let raw: Vec<f64> = space
        .parameters
        .iter()
        .map(|def| eta_squared(def, trials, idx))
        .collect();
    let sum: f64 = raw.iter().sum();

    let mut importances: Vec<ParamImportance> = space
        .parameters
        .iter()
        .zip(raw)
        .map(|(def, r)| ParamImportance {
            name: def.name.clone(),
            importance: if sum > 0.0 { r / sum } else { 0.0 },
        })
        .collect();
    importances.sort_by(|a, b| {
        b.importance
            .partial_cmp(&a.importance)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    importances
}
