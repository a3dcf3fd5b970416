//! One evolution session: open or resume the study, run the batch,
//! checkpoint, report.

use evo_optimizer::{checkpoint_path, Checkpoint, SamplerSettings, Study, Trial};
use evo_tracking::{Evaluator, TrackerRegistry, TrialRunner};
use evo_types::EvoResult;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::reporting::{log_best_trials, save_plots, write_best_hota_config};

#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    pub tracker: String,
    pub config_path: PathBuf,
    pub n_trials: usize,
    pub resume: bool,
    pub checkpoint_dir: PathBuf,
    pub report_dir: PathBuf,
    /// Used only when a fresh study is created.
    pub sampler: SamplerSettings,
    pub fallback_conf_thres: f64,
    pub max_retries: u32,
}

/// What a finished session produced.
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub total_trials: usize,
    pub front_size: usize,
    pub best_hota: Option<Trial>,
    pub checkpoint: PathBuf,
    pub reports: Vec<PathBuf>,
}

/// Load the saved study for `tracker`, or start a fresh one.
pub fn open_study(resume: bool, checkpoint: &Path, tracker: &str, sampler: SamplerSettings) -> EvoResult<Study> {
    if resume {
        let study = Checkpoint::load(checkpoint)?.study;
        info!("Resuming study {} with {} trials", study.id, study.n_trials());
        Ok(study)
    } else {
        let study = Study::create(tracker, sampler);
        info!("Created study {} for {}", study.id, tracker);
        Ok(study)
    }
}

pub async fn run_session<E>(options: &SessionOptions, registry: &TrackerRegistry, evaluator: &E) -> EvoResult<SessionSummary>
where
    E: Evaluator + ?Sized,
{
    let definition = registry.get(&options.tracker)?;
    let checkpoint = checkpoint_path(&options.checkpoint_dir, &options.tracker);
    let mut study = open_study(
        options.resume,
        &checkpoint,
        &options.tracker,
        options.sampler.clone(),
    )?;

    TrialRunner::new(definition, evaluator, options.config_path.clone())
        .with_fallback_conf_thres(options.fallback_conf_thres)
        .with_max_retries(options.max_retries)
        .run_batch(&mut study, options.n_trials)
        .await?;

    Checkpoint::new(study.clone()).save(&checkpoint)?;

    let mut summary = SessionSummary {
        total_trials: study.n_trials(),
        front_size: study.best_trials().len(),
        best_hota: None,
        checkpoint,
        reports: Vec::new(),
    };
    if study.n_trials() == 0 {
        info!("Study has no trials; nothing to report");
        return Ok(summary);
    }

    summary.reports = save_plots(&study, definition, &options.report_dir)?;
    log_best_trials(&study)?;
    summary.best_hota = Some(write_best_hota_config(&study, definition, &options.config_path)?);
    Ok(summary)
}
