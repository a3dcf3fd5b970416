//! # evo-optimizer
//!
//! Multi-objective parameter search for tracker evolution.
//!
//! Provides search space definitions, random and NSGA-II samplers, the study
//! (trial history with ask/tell), Pareto-front extraction, versioned
//! checkpoints, parameter importance and HTML plots.

mod checkpoint;
mod importance;
mod pareto;
mod search;
mod study;
mod trial;
mod visualization;

pub use checkpoint::{checkpoint_path, Checkpoint, CHECKPOINT_VERSION};
pub use importance::{param_importances, ParamImportance};
pub use pareto::{crowding_distance, dominates, non_dominated_sort, pareto_front};
pub use search::{
    NsgaIISampler, ParameterDef, ParameterKind, ParameterValue, Params, RandomSampler, Sampler,
    SearchSpace,
};
pub use study::{Study, StudyId};
pub use trial::{ObjectiveDirection, SamplerKind, SamplerSettings, Trial, TrialProposal};
pub use visualization::{pareto_front_html, param_importances_html, write_html};
