//! Tracker configuration files.
//!
//! The tracker reads a YAML document keyed by tracker name whose value is a
//! flat mapping of parameter name to value. Every write replaces the file.

use evo_optimizer::{Params, Trial};
use evo_types::{ConfigError, EvoResult};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// `{ <tracker>: { <param>: <value> } }`
pub type TrackerConfigDocument = BTreeMap<String, Params>;

/// Default config location: `trackers/<tracker>/configs/<tracker>.yaml` under `root`.
pub fn default_config_path(root: &Path, tracker: &str) -> PathBuf {
    root.join("trackers")
        .join(tracker)
        .join("configs")
        .join(format!("{tracker}.yaml"))
}

fn to_yaml(doc: &TrackerConfigDocument) -> EvoResult<String> {
    serde_yaml::to_string(doc).map_err(|e| ConfigError::Yaml(e.to_string()).into())
}

fn write_file(path: &Path, contents: &str) -> EvoResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)?;
    Ok(())
}

/// Overwrite `path` with `doc`.
pub fn write_config(path: &Path, doc: &TrackerConfigDocument) -> EvoResult<()> {
    write_file(path, &to_yaml(doc)?)?;
    debug!("Wrote tracker config {}", path.display());
    Ok(())
}

pub fn read_config(path: &Path) -> EvoResult<TrackerConfigDocument> {
    let raw = fs::read_to_string(path)?;
    serde_yaml::from_str(&raw).map_err(|e| {
        ConfigError::Malformed {
            path: path.display().to_string(),
            message: e.to_string(),
        }
        .into()
    })
}

/// Overwrite `path` with the best trial's config `section`, preceded by a
/// comment header naming the trial, its HOTA, MOTA, IDF1 scores and any
/// `unmapped` parameters the section does not carry.
pub fn write_best_config(
    path: &Path,
    tracker: &str,
    trial: &Trial,
    section: Params,
    unmapped: &Params,
) -> EvoResult<()> {
    let mut doc = TrackerConfigDocument::new();
    doc.insert(tracker.to_string(), section);

    let values: Vec<String> = trial.values.iter().map(|v| format!("{v:?}")).collect();
    let mut header = format!(
        "# Trial number:      {}\n# HOTA, MOTA, IDF1:  [{}]\n",
        trial.number,
        values.join(", ")
    );
    if !unmapped.is_empty() {
        let pairs: Vec<String> = unmapped.iter().map(|(k, v)| format!("{k}: {v}")).collect();
        header.push_str(&format!("# Detector params:   {}\n", pairs.join(", ")));
    }
    write_file(path, &(header + &to_yaml(&doc)?))?;
    info!(
        "Wrote best HOTA parameters (trial {}) to {}",
        trial.number,
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use evo_optimizer::ParameterValue;

    fn section() -> Params {
        Params::from([
            ("asso_func".to_string(), ParameterValue::Str("giou".into())),
            ("delta_t".to_string(), ParameterValue::Int(3)),
            ("det_thresh".to_string(), ParameterValue::Float(0.4123456789012345)),
            ("inertia".to_string(), ParameterValue::Float(0.2)),
            ("use_byte".to_string(), ParameterValue::Bool(false)),
        ])
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = default_config_path(dir.path(), "ocsort");
        let mut doc = TrackerConfigDocument::new();
        doc.insert("ocsort".into(), section());

        write_config(&path, &doc).unwrap();
        assert_eq!(read_config(&path).unwrap(), doc);
    }

    #[test]
    fn write_replaces_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bytetrack.yaml");

        let mut first = TrackerConfigDocument::new();
        first.insert("stale".into(), section());
        write_config(&path, &first).unwrap();

        let mut second = TrackerConfigDocument::new();
        second.insert(
            "bytetrack".into(),
            Params::from([("frame_rate".to_string(), ParameterValue::Int(30))]),
        );
        write_config(&path, &second).unwrap();

        let back = read_config(&path).unwrap();
        assert_eq!(back, second);
        assert!(!back.contains_key("stale"));
    }

    #[test]
    fn best_config_has_provenance_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ocsort.yaml");
        let now = Utc::now();
        let trial = Trial {
            number: 7,
            params: section(),
            values: vec![55.2, 61.0, 58.7],
            started_at: now,
            completed_at: now,
        };

        write_best_config(&path, "ocsort", &trial, section(), &Params::new()).unwrap();
        let raw = fs::read_to_string(&path).unwrap();
        let mut lines = raw.lines();
        assert_eq!(lines.next(), Some("# Trial number:      7"));
        assert_eq!(lines.next(), Some("# HOTA, MOTA, IDF1:  [55.2, 61.0, 58.7]"));
        assert!(!raw.contains("# Detector params"));

        // The header is a YAML comment, so the file still parses.
        let doc = read_config(&path).unwrap();
        assert_eq!(doc["ocsort"], section());
    }

    #[test]
    fn best_config_header_lists_unmapped_params() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("strongsort.yaml");
        let now = Utc::now();
        let trial = Trial {
            number: 2,
            params: section(),
            values: vec![50.0, 60.0, 55.5],
            started_at: now,
            completed_at: now,
        };
        let unmapped = Params::from([
            ("conf_thres".to_string(), ParameterValue::Float(0.41)),
            ("iou_thresh".to_string(), ParameterValue::Float(0.25)),
        ]);

        write_best_config(&path, "strongsort", &trial, section(), &unmapped).unwrap();
        let raw = fs::read_to_string(&path).unwrap();
        assert_eq!(
            raw.lines().nth(2),
            Some("# Detector params:   conf_thres: 0.41, iou_thresh: 0.25")
        );
        assert_eq!(read_config(&path).unwrap()["strongsort"], section());
    }

    #[test]
    fn malformed_yaml_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        fs::write(&path, "ocsort: [unclosed").unwrap();
        assert!(matches!(
            read_config(&path).unwrap_err(),
            evo_types::EvoError::Config(ConfigError::Malformed { .. })
        ));
    }

    #[test]
    fn default_path_follows_tracker_layout() {
        assert_eq!(
            default_config_path(Path::new("."), "strongsort"),
            PathBuf::from("./trackers/strongsort/configs/strongsort.yaml")
        );
    }
}
