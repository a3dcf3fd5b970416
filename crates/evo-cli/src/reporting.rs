//! End-of-session reporting: best trials, plots and the best-HOTA config.

use evo_optimizer::{
    param_importances, param_importances_html, pareto_front_html, write_html, Study, Trial,
};
use evo_tracking::{write_best_config, TrackerDefinition};
use evo_types::{EvoResult, Objective};
use std::path::{Path, PathBuf};
use tracing::info;

/// Log the size of the Pareto front and the best front trial per objective.
pub fn log_best_trials(study: &Study) -> EvoResult<()> {
    info!("Number of trials on the Pareto front: {}", study.best_trials().len());
    for objective in Objective::ALL {
        let trial = study.best_for(objective)?;
        info!("Trial with highest {}:", objective);
        info!("\tnumber: {}", trial.number);
        info!("\tparams: {:?}", trial.params);
        info!("\tvalues: {:?}", trial.values);
    }
    Ok(())
}

/// Write the Pareto-front plot and, when the study holds more than one trial,
/// one parameter-importance plot per objective. Returns the written paths.
pub fn save_plots(study: &Study, definition: &TrackerDefinition, report_dir: &Path) -> EvoResult<Vec<PathBuf>> {
    let tracker = &definition.name;
    let mut written = Vec::new();

    let pareto = report_dir.join(format!("pareto_front_{tracker}.html"));
    write_html(&pareto, &pareto_front_html(study))?;
    written.push(pareto);

    // Importance needs at least two data points.
    if study.n_trials() > 1 {
        for objective in Objective::ALL {
            let importances = param_importances(&definition.space, study.trials(), objective);
            let path = report_dir.join(format!("{}_param_importances_{tracker}.html", objective.name()));
            write_html(&path, &param_importances_html(&importances, objective))?;
            written.push(path);
        }
    }
    Ok(written)
}

/// Overwrite the tracker config with the section of the front trial with the
/// highest HOTA. Sampled values outside the section go into the header.
pub fn write_best_hota_config(study: &Study, definition: &TrackerDefinition, config_path: &Path) -> EvoResult<Trial> {
    let best = study.best_for(Objective::Hota)?;
    let section = definition.build_section(&best.params)?;
    let unmapped = definition.unmapped_params(&best.params);
    write_best_config(config_path, &definition.name, best, section, &unmapped)?;
    Ok(best.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use evo_optimizer::SamplerSettings;
    use evo_tracking::{read_config, TrackerRegistry};
    use std::fs;

    #[test]
    fn best_strongsort_config_keeps_detector_thresholds() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("strongsort.yaml");
        let registry = TrackerRegistry::with_builtin();
        let definition = registry.get("strongsort").unwrap();

        let mut study = Study::create("strongsort", SamplerSettings::new(3));
        for values in [[40.0, 50.0, 45.0], [48.0, 47.0, 44.0], [30.0, 30.0, 30.0]] {
            let proposal = study.ask(&definition.space);
            study.tell(proposal, values.to_vec()).unwrap();
        }

        let best = write_best_hota_config(&study, definition, &path).unwrap();
        assert_eq!(best.number, 1);

        let raw = fs::read_to_string(&path).unwrap();
        let detector = raw
            .lines()
            .find(|l| l.starts_with("# Detector params:"))
            .unwrap();
        assert!(detector.contains(&format!("conf_thres: {}", best.params["conf_thres"])));
        assert!(detector.contains(&format!("iou_thresh: {}", best.params["iou_thresh"])));

        let section = &read_config(&path).unwrap()["strongsort"];
        assert_eq!(section, &definition.build_section(&best.params).unwrap());
    }
}
