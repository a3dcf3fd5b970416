//! Running the tracker-plus-evaluation collaborator for one trial.

use async_trait::async_trait;
use evo_optimizer::Params;
use evo_types::{EvaluationError, EvoResult};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::device::{format_devices, Device};

const STDERR_TAIL: usize = 2000;

/// Everything one trial run needs, fixed before the evaluator is called.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialConfig {
    pub number: usize,
    pub tracker: String,
    pub params: Params,
    /// Detector confidence threshold derived from the sample.
    pub conf_thres: f64,
    /// Config file the tracker reads for this trial.
    pub config_path: PathBuf,
}

/// Benchmark and runtime settings shared by every trial of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationOptions {
    /// Program that runs tracking and evaluation (e.g. `python3`).
    pub program: String,
    /// Leading arguments (e.g. the script path `val.py`).
    pub program_args: Vec<String>,
    pub benchmark: String,
    pub split: String,
    pub devices: Vec<Device>,
    pub processes_per_device: usize,
    pub yolo_weights: PathBuf,
    pub reid_weights: PathBuf,
    pub imgsz: Vec<u32>,
    pub project: PathBuf,
    pub name: String,
    pub exist_ok: bool,
    pub eval_existing: Option<String>,
    pub timeout: Option<Duration>,
}

impl Default for EvaluationOptions {
    fn default() -> Self {
        Self {
            program: "python3".to_string(),
            program_args: vec!["val.py".to_string()],
            benchmark: "MOT17".to_string(),
            split: "train".to_string(),
            devices: Vec::new(),
            processes_per_device: 2,
            yolo_weights: PathBuf::from("weights/crowdhuman_yolov5m.pt"),
            reid_weights: PathBuf::from("weights/osnet_x1_0_dukemtmcreid.pt"),
            imgsz: vec![1280],
            project: PathBuf::from("runs/evolve"),
            name: "exp".to_string(),
            exist_ok: false,
            eval_existing: None,
            timeout: None,
        }
    }
}

/// Runs a benchmark evaluation and returns its textual report.
#[async_trait]
pub trait Evaluator: Send + Sync {
    async fn evaluate(&self, trial: &TrialConfig) -> EvoResult<String>;
}

/// Evaluator backed by an external command; the report is its stdout.
#[derive(Debug, Clone)]
pub struct CommandEvaluator {
    options: EvaluationOptions,
}

impl CommandEvaluator {
    pub fn new(options: EvaluationOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &EvaluationOptions {
        &self.options
    }

    /// Arguments passed after the program name.
    pub fn command_args(&self, trial: &TrialConfig) -> Vec<String> {
        let o = &self.options;
        let mut args = o.program_args.clone();
        let mut flag = |name: &str, value: String| {
            args.push(format!("--{name}"));
            args.push(value);
        };
        flag("tracking-method", trial.tracker.clone());
        flag("tracking-config", trial.config_path.display().to_string());
        flag("benchmark", o.benchmark.clone());
        flag("split", o.split.clone());
        flag("conf-thres", trial.conf_thres.to_string());
        flag("device", format_devices(&o.devices));
        flag("processes-per-device", o.processes_per_device.to_string());
        flag("yolo-weights", o.yolo_weights.display().to_string());
        flag("reid-weights", o.reid_weights.display().to_string());
        flag("project", o.project.display().to_string());
        flag("name", o.name.clone());
        if let Some(existing) = &o.eval_existing {
            flag("eval-existing", existing.clone());
        }
        if !o.imgsz.is_empty() {
            args.push("--imgsz".to_string());
            args.extend(o.imgsz.iter().map(|s| s.to_string()));
        }
        if o.exist_ok {
            args.push("--exist-ok".to_string());
        }
        args
    }
}

fn tail(text: &str, max: usize) -> String {
    let count = text.chars().count();
    text.chars().skip(count.saturating_sub(max)).collect()
}

#[async_trait]
impl Evaluator for CommandEvaluator {
    async fn evaluate(&self, trial: &TrialConfig) -> EvoResult<String> {
        let args = self.command_args(trial);
        debug!("Running {} {}", self.options.program, args.join(" "));

        let child = Command::new(&self.options.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EvaluationError::Spawn {
                program: self.options.program.clone(),
                message: e.to_string(),
            })?;

        let waiting = child.wait_with_output();
        let output = match self.options.timeout {
            // Dropping the future on expiry drops the child, which kills it.
            Some(limit) => tokio::time::timeout(limit, waiting)
                .await
                .map_err(|_| EvaluationError::Timeout {
                    timeout_seconds: limit.as_secs(),
                })?,
            None => waiting.await,
        }?;

        if !output.status.success() {
            return Err(EvaluationError::ExitStatus {
                status: output.status.to_string(),
                stderr: tail(&String::from_utf8_lossy(&output.stderr), STDERR_TAIL),
            }
            .into());
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Evaluate `trial`, re-running failed evaluations up to `max_retries` extra
/// times. Only spawn failures, non-zero exits and timeouts are retried.
pub async fn evaluate_with_retry<E>(evaluator: &E, trial: &TrialConfig, max_retries: u32) -> EvoResult<String>
where
    E: Evaluator + ?Sized,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match evaluator.evaluate(trial).await {
            Ok(report) => return Ok(report),
            Err(e) if e.is_retryable() && attempt <= max_retries => {
                warn!(
                    "Trial {} evaluation failed (attempt {}/{}): {}",
                    trial.number,
                    attempt,
                    max_retries + 1,
                    e
                );
            }
            Err(e) if e.is_retryable() && max_retries > 0 => {
                return Err(EvaluationError::RetriesExhausted {
                    attempts: attempt,
                    message: e.to_string(),
                }
                .into())
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evo_types::EvoError;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn trial() -> TrialConfig {
        TrialConfig {
            number: 0,
            tracker: "bytetrack".into(),
            params: Params::new(),
            conf_thres: 0.42,
            config_path: PathBuf::from("trackers/bytetrack/configs/bytetrack.yaml"),
        }
    }

    fn shell(script: &str) -> EvaluationOptions {
        EvaluationOptions {
            program: "sh".into(),
            program_args: vec!["-c".into(), script.into(), "evaluator".into()],
            ..EvaluationOptions::default()
        }
    }

    #[test]
    fn command_args_carry_trial_and_options() {
        let options = EvaluationOptions {
            devices: vec![Device::Cuda(0), Device::Cuda(1)],
            exist_ok: true,
            imgsz: vec![1280, 720],
            ..EvaluationOptions::default()
        };
        let args = CommandEvaluator::new(options).command_args(&trial());
        let joined = args.join(" ");
        assert!(joined.starts_with("val.py --tracking-method bytetrack"));
        assert!(joined.contains("--tracking-config trackers/bytetrack/configs/bytetrack.yaml"));
        assert!(joined.contains("--conf-thres 0.42"));
        assert!(joined.contains("--device 0,1"));
        assert!(joined.contains("--processes-per-device 2"));
        assert!(joined.contains("--imgsz 1280 720"));
        assert!(joined.ends_with("--exist-ok"));
        assert!(!joined.contains("--eval-existing"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn captures_stdout_as_report() {
        let evaluator = CommandEvaluator::new(shell("echo 'COMBINED 55.2'"));
        let report = evaluator.evaluate(&trial()).await.unwrap();
        assert_eq!(report.trim(), "COMBINED 55.2");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_is_an_error() {
        let evaluator = CommandEvaluator::new(shell("echo broken >&2; exit 3"));
        let err = evaluator.evaluate(&trial()).await.unwrap_err();
        match err {
            EvoError::Evaluation(EvaluationError::ExitStatus { stderr, .. }) => {
                assert_eq!(stderr.trim(), "broken")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn slow_evaluation_times_out() {
        let options = EvaluationOptions {
            timeout: Some(Duration::from_millis(200)),
            ..shell("sleep 5")
        };
        let err = CommandEvaluator::new(options).evaluate(&trial()).await.unwrap_err();
        assert!(matches!(
            err,
            EvoError::Evaluation(EvaluationError::Timeout { .. })
        ));
    }

    #[tokio::test]
    async fn missing_program_fails_to_spawn() {
        let options = EvaluationOptions {
            program: "definitely-not-an-evaluator-binary".into(),
            ..EvaluationOptions::default()
        };
        let err = CommandEvaluator::new(options).evaluate(&trial()).await.unwrap_err();
        assert!(matches!(err, EvoError::Evaluation(EvaluationError::Spawn { .. })));
    }

    struct Flaky {
        failures: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl Evaluator for Flaky {
        async fn evaluate(&self, _trial: &TrialConfig) -> EvoResult<String> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(EvaluationError::ExitStatus {
                    status: "exit status: 1".into(),
                    stderr: String::new(),
                }
                .into())
            } else {
                Ok("report".into())
            }
        }
    }

    #[tokio::test]
    async fn retries_until_success() {
        let flaky = Flaky {
            failures: 2,
            calls: AtomicU32::new(0),
        };
        let report = evaluate_with_retry(&flaky, &trial(), 2).await.unwrap();
        assert_eq!(report, "report");
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let flaky = Flaky {
            failures: 5,
            calls: AtomicU32::new(0),
        };
        let err = evaluate_with_retry(&flaky, &trial(), 1).await.unwrap_err();
        assert!(matches!(
            err,
            EvoError::Evaluation(EvaluationError::RetriesExhausted { attempts: 2, .. })
        ));
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn no_retries_returns_original_error() {
        let flaky = Flaky {
            failures: 1,
            calls: AtomicU32::new(0),
        };
        let err = evaluate_with_retry(&flaky, &trial(), 0).await.unwrap_err();
        assert!(matches!(
            err,
            EvoError::Evaluation(EvaluationError::ExitStatus { .. })
        ));
    }
}
