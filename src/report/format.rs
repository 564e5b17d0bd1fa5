//! Formatted terminal output.
//!
//! Keeping all column layouts here means the command handlers only decide
//! *what* to print.

use crate::domain::{Brand, FanModel, FitArtifact, FitResult};
use crate::fit::DegreeAdvice;
use crate::session::SampleRow;

pub fn format_brands(brands: &[Brand]) -> String {
    if brands.is_empty() {
        return "No brands. Add one with `fan brand add <NAME>`.\n".to_string();
    }
    let mut out = String::from("Brands:\n");
    for b in brands {
        out.push_str(&format!("- {}\n", b.name));
    }
    out
}

pub fn format_models(models: &[FanModel]) -> String {
    if models.is_empty() {
        return "No fan models. Add one with `fan model add`.\n".to_string();
    }

    let mut out = String::new();
    out.push_str(
        format!(
            "{:<24} {:<16} {:>7} {:>6} {:<18}",
            "model", "brand", "rpm", "angle", "drive"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(format!("{:-<24} {:-<16} {:-<7} {:-<6} {:-<18}", "", "", "", "", "").trim_end());
    out.push('\n');

    for m in models {
        out.push_str(
            format!(
                "{:<24} {:<16} {:>7} {:>6} {:<18}",
                truncate(&m.model_number, 24),
                truncate(&m.spec.brand, 16),
                m.spec.speed_rpm,
                format!("{}°", m.spec.blade_angle_deg),
                m.spec.drive_train.display_name(),
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

/// Specification plus stored-fit status of one model.
pub fn format_model_detail(model: &FanModel, n_samples: usize, fit: Option<&FitArtifact>) -> String {
    let mut out = String::new();
    out.push_str(&format!("=== {} ===\n", model.model_number));
    out.push_str(&format!("Group:       {}\n", model.spec.group));
    out.push_str(&format!("Brand:       {}\n", model.spec.brand));
    out.push_str(&format!("Speed:       {} rpm\n", model.spec.speed_rpm));
    out.push_str(&format!("Blade angle: {}°\n", model.spec.blade_angle_deg));
    out.push_str(&format!("Drive train: {}\n", model.spec.drive_train.display_name()));
    out.push_str(&format!("Samples:     {n_samples}\n"));
    match fit {
        Some(f) => {
            out.push_str(&format!(
                "Fit:         degree {} ({})\n",
                f.degree,
                f.fitted_at.format("%Y-%m-%d %H:%M UTC")
            ));
            out.push_str(&format!("Equation:    {}\n", f.equation));
        }
        None => out.push_str("Fit:         none\n"),
    }
    out
}

/// The editable table with row indices, marking incomplete rows.
pub fn format_rows(rows: &[SampleRow]) -> String {
    let mut out = String::new();
    out.push_str(format!("{:>4} {:>16} {:>14}", "#", "flow_rate", "pressure").trim_end());
    out.push('\n');
    out.push_str(format!("{:->4} {:->16} {:->14}", "", "", "").trim_end());
    out.push('\n');

    for (i, r) in rows.iter().enumerate() {
        let cell = |v: Option<f64>| v.map_or_else(|| "?".to_string(), |v| v.to_string());
        let note = if r.sample().is_none() { "  (incomplete, skipped)" } else { "" };
        out.push_str(&format!(
            "{i:>4} {:>16} {:>14}{note}\n",
            cell(r.flow_rate),
            cell(r.pressure)
        ));
    }
    out
}

pub fn format_fit_summary(model_number: &str, fit: &FitResult) -> String {
    let mut out = String::new();
    out.push_str(&format!("=== {model_number}: degree {} fit ===\n", fit.degree));
    out.push_str(&format!("Equation: {}\n", fit.equation()));
    out.push_str(&format!(
        "Points: n={} | flow=[{:.4}, {:.4}] m³/s\n",
        fit.quality.n, fit.flow_min, fit.flow_max
    ));
    out.push_str(&format!(
        "SSE={:.4} RMSE={:.4}Pa R²={:.6} BIC={:.3}\n",
        fit.quality.sse, fit.quality.rmse, fit.quality.r_squared, fit.quality.bic
    ));
    out.push_str(&format!("Coefficients: {}\n", fmt_vec(&fit.coefficients)));
    out
}

/// Per-degree diagnostics of the degree advisor; `*` marks the recommendation.
pub fn format_advice(advice: &DegreeAdvice) -> String {
    let mut out = String::from("Degree diagnostics:\n");
    for fit in &advice.fits {
        let chosen = if fit.degree == advice.best.degree { "*" } else { " " };
        out.push_str(&format!(
            "{chosen} degree {}  SSE={:.3} RMSE={:.3}Pa R²={:.6} BIC={:.3}\n",
            fit.degree, fit.quality.sse, fit.quality.rmse, fit.quality.r_squared, fit.quality.bic
        ));
    }
    for (degree, reason) in &advice.skipped {
        out.push_str(&format!("  (skipped degree {degree}) {reason}\n"));
    }
    out.push_str(&format!("Recommended degree: {}\n", advice.best.degree));
    out
}

fn fmt_vec(v: &[f64]) -> String {
    let parts: Vec<String> = v.iter().map(|x| format!("{x:.6}")).collect();
    format!("[{}]", parts.join(", "))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DriveTrain, FanId, FanSpec, Sample};
    use crate::fit::{advise_degree, fit};

    fn model() -> FanModel {
        FanModel {
            id: FanId(3),
            model_number: "AXF-1440rpm-25°".to_string(),
            spec: FanSpec {
                group: "AXF".to_string(),
                brand: "Breeze".to_string(),
                speed_rpm: 1440,
                blade_angle_deg: 25,
                drive_train: DriveTrain::DirectDrive,
            },
        }
    }

    #[test]
    fn model_table_has_one_line_per_model() {
        let txt = format_models(&[model()]);
        let lines: Vec<&str> = txt.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[2].starts_with("AXF-1440rpm-25°"));
        assert!(lines[2].ends_with("Direct Drive"));
        assert!(format_models(&[]).starts_with("No fan models"));
    }

    #[test]
    fn rows_mark_incomplete_entries() {
        let rows = vec![
            SampleRow::new(1.0, 100.0),
            SampleRow {
                flow_rate: Some(2.0),
                pressure: None,
            },
        ];
        let txt = format_rows(&rows);
        let lines: Vec<&str> = txt.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(!lines[2].contains("incomplete"));
        assert!(lines[3].contains('?'));
        assert!(lines[3].ends_with("(incomplete, skipped)"));
    }

    #[test]
    fn fit_summary_and_advice_show_equation_and_choice() {
        let samples: Vec<Sample> = (1..=6)
            .map(|i| {
                let x = i as f64 * 0.5;
                Sample::new(x, 300.0 - 40.0 * x * x)
            })
            .collect();
        let f = fit(&samples, 2).unwrap();
        let txt = format_fit_summary("AXF-1", &f);
        assert!(txt.contains("degree 2 fit"));
        assert!(txt.contains(&format!("Equation: {}", f.equation())));

        let advice = advise_degree(&samples).unwrap();
        let txt = format_advice(&advice);
        assert!(txt.contains("* degree 2"));
        assert!(txt.ends_with("Recommended degree: 2\n"));
    }

    #[test]
    fn truncate_marks_cut_text() {
        assert_eq!(truncate("abcdef", 4), "abc.");
        assert_eq!(truncate("abc", 4), "abc");
    }
}
