//! Standalone HTML plots (plotly.js loaded from CDN, data embedded as JSON).

use evo_types::{EvoResult, Objective};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::importance::ParamImportance;
use crate::study::Study;
use crate::trial::Trial;

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.27.0.min.js";

fn hover_text(trial: &Trial) -> String {
    let params: Vec<String> = trial
        .params
        .iter()
        .map(|(k, v)| format!("{k}: {v}"))
        .collect();
    format!(
        "Trial {}<br>{}<br>{}",
        trial.number,
        trial.scores(),
        params.join("<br>")
    )
}

fn scatter_trace(name: &str, trials: &[&Trial], color: &str) -> Value {
    let axis = |o: Objective| trials.iter().map(|t| t.value(o)).collect::<Vec<f64>>();
    json!({
        "type": "scatter3d",
        "mode": "markers",
        "name": name,
        "x": axis(Objective::Hota),
        "y": axis(Objective::Mota),
        "z": axis(Objective::Idf1),
        "text": trials.iter().map(|t| hover_text(t)).collect::<Vec<String>>(),
        "hoverinfo": "text",
        "marker": { "size": 5, "color": color },
    })
}

fn render(title: &str, figure: &Value) -> String {
    // Keep embedded strings from closing the script element.
    let data = figure.to_string().replace("</", "<\\/");
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n\
         <script src=\"{PLOTLY_CDN}\"></script>\n</head>\n<body>\n\
         <div id=\"plot\" style=\"width:100%;height:95vh;\"></div>\n\
         <script>\nvar figure = {data};\nPlotly.newPlot(\"plot\", figure.data, figure.layout);\n</script>\n\
         </body>\n</html>\n"
    )
}

/// 3D scatter of every trial, with the Pareto front highlighted.
pub fn pareto_front_html(study: &Study) -> String {
    let front = study.best_trials();
    let front_numbers: Vec<usize> = front.iter().map(|t| t.number).collect();
    let dominated: Vec<&Trial> = study
        .trials()
        .iter()
        .filter(|t| !front_numbers.contains(&t.number))
        .collect();

    let figure = json!({
        "data": [
            scatter_trace("Trial", &dominated, "#cccccc"),
            scatter_trace("Best Trial", &front, "#1f77b4"),
        ],
        "layout": {
            "title": { "text": format!("Pareto-front Plot ({})", study.name) },
            "scene": {
                "xaxis": { "title": { "text": Objective::Hota.name() } },
                "yaxis": { "title": { "text": Objective::Mota.name() } },
                "zaxis": { "title": { "text": Objective::Idf1.name() } },
            },
        },
    });
    render(&format!("Pareto front - {}", study.name), &figure)
}

/// Horizontal bar chart of parameter importances for one objective.
pub fn param_importances_html(importances: &[ParamImportance], objective: Objective) -> String {
    // Plotly draws the first bar at the bottom; reverse so the top bar is the most important.
    let ordered: Vec<&ParamImportance> = importances.iter().rev().collect();
    let figure = json!({
        "data": [{
            "type": "bar",
            "orientation": "h",
            "x": ordered.iter().map(|i| i.importance).collect::<Vec<f64>>(),
            "y": ordered.iter().map(|i| i.name.as_str()).collect::<Vec<&str>>(),
            "text": ordered.iter().map(|i| format!("{:.2}", i.importance)).collect::<Vec<String>>(),
            "textposition": "outside",
        }],
        "layout": {
            "title": { "text": "Hyperparameter Importances" },
            "xaxis": { "title": { "text": format!("Importance for {}", objective.name()) } },
            "yaxis": { "title": { "text": "Hyperparameter" } },
        },
    });
    render(&format!("{} parameter importances", objective.name()), &figure)
}

pub fn write_html(path: &Path, html: &str) -> EvoResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, html)?;
    info!("Wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::SearchSpace;
    use crate::trial::SamplerSettings;

    fn study() -> Study {
        let space = SearchSpace::new().add_choice("asso_func", vec!["iou".into(), "</script>".into()]);
        let mut study = Study::create("ocsort", SamplerSettings::new(2));
        for v in [[50.0, 60.0, 55.0], [40.0, 30.0, 20.0]] {
            let proposal = study.ask(&space);
            study.tell(proposal, v.to_vec()).unwrap();
        }
        study
    }

    #[test]
    fn pareto_html_embeds_both_traces() {
        let html = pareto_front_html(&study());
        assert!(html.contains("scatter3d"));
        assert!(html.contains("Best Trial"));
        assert!(html.contains(PLOTLY_CDN));
        // Only the closing tag of the real script block survives.
        assert_eq!(html.matches("</script>").count(), 2);
    }

    #[test]
    fn importance_html_lists_parameters() {
        let importances = vec![
            ParamImportance { name: "max_age".into(), importance: 0.7 },
            ParamImportance { name: "n_init".into(), importance: 0.3 },
        ];
        let html = param_importances_html(&importances, Objective::Mota);
        assert!(html.contains("max_age"));
        assert!(html.contains("Importance for MOTA"));
    }

    #[test]
    fn write_html_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join("pareto_front_ocsort.html");
        write_html(&path, "<html></html>").unwrap();
        assert!(path.exists());
    }
}
