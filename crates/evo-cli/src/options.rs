//! Command-line options.

use clap::Parser;
use evo_optimizer::SamplerSettings;
use evo_tracking::{default_config_path, parse_devices, EvaluationOptions};
use evo_types::EvoResult;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::session::SessionOptions;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "mot-evolve",
    about = "Evolve tracker hyperparameters against HOTA, MOTA and IDF1 on a MOT benchmark"
)]
pub struct Options {
    /// Tracker to tune: strongsort, bytetrack or ocsort
    #[arg(long, default_value = "strongsort")]
    pub tracking_method: String,
    /// Config file the tracker reads [default: trackers/<method>/configs/<method>.yaml]
    #[arg(long, value_name = "PATH")]
    pub tracking_config: Option<PathBuf>,
    /// Benchmark to evaluate on: MOT16, MOT17, MOT20
    #[arg(long, default_value = "MOT17")]
    pub benchmark: String,
    #[arg(long, default_value = "train")]
    pub split: String,
    /// Number of trials to run in this session
    #[arg(long, default_value_t = 10)]
    pub n_trials: usize,
    /// Continue the study saved by a previous run for this tracker
    #[arg(long)]
    pub resume: bool,
    /// cuda device, i.e. 0 or 0,1,2,3 or cpu
    #[arg(long)]
    pub device: Option<String>,
    /// Evaluation subprocesses allowed per device
    #[arg(long, default_value_t = 2)]
    pub processes_per_device: usize,
    #[arg(long, default_value = "weights/crowdhuman_yolov5m.pt")]
    pub yolo_weights: PathBuf,
    #[arg(long, default_value = "weights/osnet_x1_0_dukemtmcreid.pt")]
    pub reid_weights: PathBuf,
    /// Inference size h,w
    #[arg(long, aliases = ["img", "img-size"], num_args = 1.., default_value = "1280")]
    pub imgsz: Vec<u32>,
    /// Save evaluation runs to project/name
    #[arg(long, default_value = "runs/evolve")]
    pub project: PathBuf,
    #[arg(long, default_value = "exp")]
    pub name: String,
    /// Existing project/name ok, do not increment
    #[arg(long)]
    pub exist_ok: bool,
    /// Evaluate existing tracker results instead of running the tracker
    #[arg(long)]
    pub eval_existing: Option<String>,
    /// Detector confidence threshold for trackers that do not sample one
    #[arg(long, default_value_t = 0.45)]
    pub conf_thres: f64,
    /// Program that runs tracking and evaluation
    #[arg(long, default_value = "python3")]
    pub evaluator: String,
    /// Leading argument for the evaluator program (repeatable)
    #[arg(long = "evaluator-arg", default_value = "val.py", allow_hyphen_values = true)]
    pub evaluator_args: Vec<String>,
    /// Kill a trial's evaluation after this many seconds
    #[arg(long, value_name = "SECS")]
    pub trial_timeout: Option<u64>,
    /// Extra attempts for an evaluation that fails to run
    #[arg(long, default_value_t = 0)]
    pub max_retries: u32,
    /// Seed of a fresh study (ignored on resume)
    #[arg(long, default_value_t = 0)]
    pub seed: u64,
    /// NSGA-II population size of a fresh study (ignored on resume)
    #[arg(long, default_value_t = 50)]
    pub population_size: usize,
    /// Where `<method>_study.json` is kept
    #[arg(long, default_value = ".")]
    pub checkpoint_dir: PathBuf,
    /// Where HTML plots are written
    #[arg(long, default_value = ".")]
    pub report_dir: PathBuf,
}

impl Options {
    pub fn tracking_config_path(&self) -> PathBuf {
        self.tracking_config
            .clone()
            .unwrap_or_else(|| default_config_path(Path::new("."), &self.tracking_method))
    }

    /// Settings for the evaluation collaborator. Fails on a malformed device list.
    pub fn evaluation_options(&self) -> EvoResult<EvaluationOptions> {
        Ok(EvaluationOptions {
            program: self.evaluator.clone(),
            program_args: self.evaluator_args.clone(),
            benchmark: self.benchmark.clone(),
            split: self.split.clone(),
            devices: parse_devices(self.device.as_deref().unwrap_or(""))?,
            processes_per_device: self.processes_per_device,
            yolo_weights: self.yolo_weights.clone(),
            reid_weights: self.reid_weights.clone(),
            imgsz: self.imgsz.clone(),
            project: self.project.clone(),
            name: self.name.clone(),
            exist_ok: self.exist_ok,
            eval_existing: self.eval_existing.clone(),
            timeout: self.trial_timeout.map(Duration::from_secs),
        })
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            tracker: self.tracking_method.clone(),
            config_path: self.tracking_config_path(),
            n_trials: self.n_trials,
            resume: self.resume,
            checkpoint_dir: self.checkpoint_dir.clone(),
            report_dir: self.report_dir.clone(),
            sampler: SamplerSettings::new(self.seed).with_population_size(self.population_size),
            fallback_conf_thres: self.conf_thres,
            max_retries: self.max_retries,
        }
    }
}
