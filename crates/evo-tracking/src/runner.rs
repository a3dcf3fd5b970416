//! The objective: sample, write config, evaluate, score, record.

use evo_optimizer::{Study, Trial};
use evo_types::EvoResult;
use std::path::PathBuf;
use tracing::info;

use crate::config::write_config;
use crate::evaluator::{evaluate_with_retry, Evaluator, TrialConfig};
use crate::registry::TrackerDefinition;
use crate::report::ReportFormat;

/// Drives trials for one tracker, one at a time, through a shared config file.
pub struct TrialRunner<'a, E: Evaluator + ?Sized> {
    definition: &'a TrackerDefinition,
    evaluator: &'a E,
    config_path: PathBuf,
    fallback_conf_thres: f64,
    max_retries: u32,
    report_format: ReportFormat,
}

impl<'a, E: Evaluator + ?Sized> TrialRunner<'a, E> {
    pub fn new(definition: &'a TrackerDefinition, evaluator: &'a E, config_path: PathBuf) -> Self {
        Self {
            definition,
            evaluator,
            config_path,
            fallback_conf_thres: 0.45,
            max_retries: 0,
            report_format: ReportFormat::default(),
        }
    }

    /// Confidence threshold used when the tracker does not sample its own.
    pub fn with_fallback_conf_thres(mut self, conf_thres: f64) -> Self {
        self.fallback_conf_thres = conf_thres;
        self
    }

    pub fn with_max_retries(mut self, n: u32) -> Self {
        self.max_retries = n;
        self
    }

    pub fn with_report_format(mut self, format: ReportFormat) -> Self {
        self.report_format = format;
        self
    }

    /// Run one trial to completion and record it in `study`.
    pub async fn run_trial(&self, study: &mut Study) -> EvoResult<Trial> {
        let proposal = study.ask(&self.definition.space);
        let trial_config = TrialConfig {
            number: proposal.number,
            tracker: self.definition.name.clone(),
            params: proposal.params.clone(),
            conf_thres: self
                .definition
                .detection_threshold(&proposal.params, self.fallback_conf_thres),
            config_path: self.config_path.clone(),
        };

        write_config(
            &trial_config.config_path,
            &self.definition.build_document(&trial_config.params)?,
        )?;
        info!("Trial {} started", trial_config.number);

        let report = evaluate_with_retry(self.evaluator, &trial_config, self.max_retries).await?;
        let scores = self.report_format.parse(&report)?;
        let trial = study.tell(proposal, scores.to_values())?.clone();

        info!(
            "Trial {} finished in {}s: {}",
            trial.number,
            trial.duration_seconds(),
            scores
        );
        Ok(trial)
    }

    /// Run `n_trials` trials in sequence. The first failure aborts the batch;
    /// trials completed before it stay in `study`.
    pub async fn run_batch(&self, study: &mut Study, n_trials: usize) -> EvoResult<()> {
        info!(
            "Running {} trials for {} (study has {} trials)",
            n_trials,
            self.definition.name,
            study.n_trials()
        );
        for _ in 0..n_trials {
            self.run_trial(study).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::read_config;
    use crate::registry::TrackerRegistry;
    use async_trait::async_trait;
    use evo_optimizer::SamplerSettings;
    use evo_types::{EvoError, ReportError};
    use std::sync::Mutex;

    /// Scores each trial from its confidence threshold and records what it saw.
    struct Recording {
        seen: Mutex<Vec<TrialConfig>>,
    }

    #[async_trait]
    impl Evaluator for Recording {
        async fn evaluate(&self, trial: &TrialConfig) -> EvoResult<String> {
            // The config file must already hold this trial's section.
            let doc = read_config(&trial.config_path)?;
            assert!(doc.contains_key(&trial.tracker));
            self.seen.lock().unwrap().push(trial.clone());
            let hota = 100.0 * trial.conf_thres;
            Ok(format!(
                "COMBINED {hota}\nCOMBINED {}\nCOMBINED {}\nCOMBINED 0\n",
                hota / 2.0,
                hota / 3.0
            ))
        }
    }

    struct Garbled;

    #[async_trait]
    impl Evaluator for Garbled {
        async fn evaluate(&self, _trial: &TrialConfig) -> EvoResult<String> {
            Ok("no summary rows".into())
        }
    }

    #[tokio::test]
    async fn threshold_flows_from_sample_to_evaluator() {
        let dir = tempfile::tempdir().unwrap();
        let registry = TrackerRegistry::with_builtin();
        let definition = registry.get("ocsort").unwrap();
        let evaluator = Recording {
            seen: Mutex::new(Vec::new()),
        };
        let runner = TrialRunner::new(definition, &evaluator, dir.path().join("ocsort.yaml"));
        let mut study = Study::create("ocsort", SamplerSettings::new(8));

        runner.run_batch(&mut study, 3).await.unwrap();

        assert_eq!(study.n_trials(), 3);
        let seen = evaluator.seen.lock().unwrap();
        for (trial, config) in study.trials().iter().zip(seen.iter()) {
            assert_eq!(trial.params["det_thresh"].as_f64(), Some(config.conf_thres));
            assert!((trial.values[0] - 100.0 * config.conf_thres).abs() < 1e-9);
        }
    }

    #[tokio::test]
    async fn unparseable_report_aborts_without_recording() {
        let dir = tempfile::tempdir().unwrap();
        let registry = TrackerRegistry::with_builtin();
        let definition = registry.get("bytetrack").unwrap();
        let evaluator = Garbled;
        let runner = TrialRunner::new(definition, &evaluator, dir.path().join("bytetrack.yaml"));
        let mut study = Study::create("bytetrack", SamplerSettings::new(1));

        let err = runner.run_batch(&mut study, 2).await.unwrap_err();
        assert!(matches!(err, EvoError::Report(ReportError::MarkerMissing { .. })));
        assert_eq!(study.n_trials(), 0);
    }
}
