//! Tracker registry: which parameters each tracker exposes and how a sample
//! maps onto the tracker's own configuration section.

use evo_optimizer::{ParameterValue, Params, SearchSpace};
use evo_types::{ConfigError, EvoResult};
use std::collections::BTreeMap;

use crate::config::TrackerConfigDocument;

/// Where a configuration key takes its value from.
#[derive(Debug, Clone, PartialEq)]
pub enum SectionSource {
    /// Copy the sampled value of this parameter.
    Param(String),
    /// Always write this value.
    Fixed(ParameterValue),
}

/// Search space and config schema of one tracker type.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerDefinition {
    pub name: String,
    pub space: SearchSpace,
    /// Sampled parameter that doubles as the detector confidence threshold.
    pub threshold_param: Option<String>,
    section: Vec<(String, SectionSource)>,
}

impl TrackerDefinition {
    pub fn new(name: impl Into<String>, space: SearchSpace) -> Self {
        Self {
            name: name.into(),
            space,
            threshold_param: None,
            section: Vec::new(),
        }
    }

    /// Write the sampled value of `param` under `key`.
    pub fn key_from(mut self, key: impl Into<String>, param: impl Into<String>) -> Self {
        self.section.push((key.into(), SectionSource::Param(param.into())));
        self
    }

    /// Write the sampled value of `param` under the same name.
    pub fn key(self, param: &str) -> Self {
        self.key_from(param, param)
    }

    pub fn fixed(mut self, key: impl Into<String>, value: impl Into<ParameterValue>) -> Self {
        self.section.push((key.into(), SectionSource::Fixed(value.into())));
        self
    }

    pub fn threshold(mut self, param: impl Into<String>) -> Self {
        self.threshold_param = Some(param.into());
        self
    }

    /// The tracker's config section for one sample.
    pub fn build_section(&self, params: &Params) -> EvoResult<Params> {
        let mut section = Params::new();
        for (key, source) in &self.section {
            let value = match source {
                SectionSource::Param(name) => {
                    params
                        .get(name)
                        .cloned()
                        .ok_or_else(|| ConfigError::MissingParameter {
                            tracker: self.name.clone(),
                            parameter: name.clone(),
                        })?
                }
                SectionSource::Fixed(value) => value.clone(),
            };
            section.insert(key.clone(), value);
        }
        Ok(section)
    }

    /// Sampled parameters that no section key reads, such as StrongSORT's
    /// detector thresholds.
    pub fn unmapped_params(&self, params: &Params) -> Params {
        params
            .iter()
            .filter(|(name, _)| {
                !self
                    .section
                    .iter()
                    .any(|(_, source)| matches!(source, SectionSource::Param(p) if p == *name))
            })
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    /// Full config document (`{ <tracker>: <section> }`) for one sample.
    pub fn build_document(&self, params: &Params) -> EvoResult<TrackerConfigDocument> {
        let mut doc = TrackerConfigDocument::new();
        doc.insert(self.name.clone(), self.build_section(params)?);
        Ok(doc)
    }

    /// Detector confidence threshold for this sample, or `fallback` if the
    /// tracker does not sample one.
    pub fn detection_threshold(&self, params: &Params, fallback: f64) -> f64 {
        self.threshold_param
            .as_ref()
            .and_then(|p| params.get(p))
            .and_then(|v| v.as_f64())
            .unwrap_or(fallback)
    }

    fn validate(&self) -> EvoResult<()> {
        self.space.validate()?;
        for (key, source) in &self.section {
            if let SectionSource::Param(name) = source {
                if self.space.get(name).is_none() {
                    return Err(ConfigError::InvalidParameter {
                        parameter: key.clone(),
                        message: format!("refers to undeclared parameter {name}"),
                    }
                    .into());
                }
            }
        }
        if let Some(name) = &self.threshold_param {
            if self.space.get(name).is_none() {
                return Err(ConfigError::InvalidParameter {
                    parameter: name.clone(),
                    message: "threshold parameter is not declared".to_string(),
                }
                .into());
            }
        }
        Ok(())
    }
}

/// Registry of known tracker types.
#[derive(Debug, Clone, Default)]
pub struct TrackerRegistry {
    trackers: BTreeMap<String, TrackerDefinition>,
}

impl TrackerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with StrongSORT, ByteTrack and OC-SORT.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        for definition in [strongsort(), bytetrack(), ocsort()] {
            registry
                .register(definition)
                .expect("built-in tracker definitions are valid and distinct");
        }
        registry
    }

    pub fn register(&mut self, definition: TrackerDefinition) -> EvoResult<()> {
        definition.validate()?;
        if self.trackers.contains_key(&definition.name) {
            return Err(ConfigError::DuplicateTracker {
                name: definition.name,
            }
            .into());
        }
        self.trackers.insert(definition.name.clone(), definition);
        Ok(())
    }

    pub fn get(&self, name: &str) -> EvoResult<&TrackerDefinition> {
        self.trackers.get(name).ok_or_else(|| {
            ConfigError::UnknownTracker {
                name: name.to_string(),
                known: self.names().join(", "),
            }
            .into()
        })
    }

    pub fn names(&self) -> Vec<&str> {
        self.trackers.keys().map(String::as_str).collect()
    }
}

fn strongsort() -> TrackerDefinition {
    let space = SearchSpace::new()
        .add_float("conf_thres", 0.35, 0.55)
        .add_float("iou_thresh", 0.1, 0.4)
        .add_choice("ecc", vec![true.into(), false.into()])
        .add_float("ema_alpha", 0.7, 0.95)
        .add_float("max_dist", 0.1, 0.4)
        .add_float("max_iou_dist", 0.5, 0.9)
        .add_int("max_age", 10, 200, 10)
        .add_int("n_init", 1, 3, 1)
        .add_choice("mc_lambda", vec![0.995f64.into()])
        .add_choice("nn_budget", vec![100i64.into()])
        .add_choice("max_unmatched_preds", vec![0i64.into()]);

    TrackerDefinition::new("strongsort", space)
        .threshold("conf_thres")
        .key("ecc")
        .key("mc_lambda")
        .key("ema_alpha")
        .key("max_dist")
        .key("max_iou_dist")
        .key("max_unmatched_preds")
        .key("max_age")
        .key("n_init")
        .key("nn_budget")
}

fn bytetrack() -> TrackerDefinition {
    let space = SearchSpace::new()
        .add_float("track_thres", 0.35, 0.55)
        .add_int("track_buffer", 10, 60, 10)
        .add_float("match_thresh", 0.7, 0.9);

    TrackerDefinition::new("bytetrack", space)
        .threshold("track_thres")
        .key_from("track_thresh", "track_thres")
        .key("match_thresh")
        .key("track_buffer")
        .fixed("frame_rate", 30i64)
}

fn ocsort() -> TrackerDefinition {
    let space = SearchSpace::new()
        .add_float("det_thresh", 0.35, 0.55)
        .add_int("max_age", 10, 60, 10)
        .add_int("min_hits", 1, 5, 1)
        .add_float("iou_thresh", 0.1, 0.4)
        .add_int("delta_t", 1, 5, 1)
        .add_choice("asso_func", vec!["iou".into(), "giou".into()])
        .add_float("inertia", 0.1, 0.4)
        .add_choice("use_byte", vec![true.into(), false.into()]);

    TrackerDefinition::new("ocsort", space)
        .threshold("det_thresh")
        .key("det_thresh")
        .key("max_age")
        .key("min_hits")
        .key("iou_thresh")
        .key("delta_t")
        .key("asso_func")
        .key("inertia")
        .key("use_byte")
}
