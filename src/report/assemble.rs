//! Report content for stored fan models.

use crate::domain::{FanModel, FitArtifact, Sample};
use crate::report::document::{Document, Revision, Section, TitlePage};

/// Everything the report needs about one fan model.
#[derive(Debug, Clone)]
pub struct ModelReport {
    pub model: FanModel,
    pub samples: Vec<Sample>,
    pub fit: Option<FitArtifact>,
}

/// Build a document with a summary section and one section per fan model.
pub fn fan_model_report(title_page: TitlePage, revisions: Vec<Revision>, entries: &[ModelReport]) -> Document {
    let mut sections = vec![summary(entries)];
    sections.extend(entries.iter().map(model_section));

    Document {
        title_page,
        revisions,
        sections,
    }
}

fn summary(entries: &[ModelReport]) -> Section {
    let rows = entries
        .iter()
        .map(|e| {
            vec![
                e.model.model_number.clone(),
                e.model.spec.brand.clone(),
                e.samples.len().to_string(),
                e.fit
                    .as_ref()
                    .map_or_else(|| "-".to_string(), |f| f.degree.to_string()),
            ]
        })
        .collect();

    let section = Section::new("Summary")
        .paragraph(format!(
            "This report covers {} fan model(s) and their measured performance curves.",
            entries.len()
        ))
        .table(&["Model", "Brand", "Samples", "Fit degree"], rows);

    let unfitted: Vec<String> = entries
        .iter()
        .filter(|e| e.fit.is_none())
        .map(|e| e.model.model_number.clone())
        .collect();
    if unfitted.is_empty() {
        section
    } else {
        section
            .paragraph("No curve has been fitted yet for:")
            .bullets(unfitted)
    }
}

fn model_section(entry: &ModelReport) -> Section {
    let m = &entry.model;
    let spec = Section::new("Specification").table(
        &["Field", "Value"],
        vec![
            vec!["Model number".to_string(), m.model_number.clone()],
            vec!["Model group".to_string(), m.spec.group.clone()],
            vec!["Brand".to_string(), m.spec.brand.clone()],
            vec!["Speed".to_string(), format!("{} rpm", m.spec.speed_rpm)],
            vec!["Blade angle".to_string(), format!("{}°", m.spec.blade_angle_deg)],
            vec!["Drive train".to_string(), m.spec.drive_train.display_name().to_string()],
        ],
    );

    let data = if entry.samples.is_empty() {
        Section::new("Performance Data").paragraph("No performance data recorded.")
    } else {
        Section::new("Performance Data").table(
            &["Flow Rate (m³/s)", "Pressure (Pa)"],
            entry
                .samples
                .iter()
                .map(|s| vec![s.flow_rate.to_string(), s.pressure.to_string()])
                .collect(),
        )
    };

    let curve = match &entry.fit {
        None => Section::new("Performance Curve").paragraph("No curve has been fitted yet."),
        Some(fit) => {
            let mut curve = Section::new("Performance Curve")
                .equation(
                    Some("Best-fit polynomial, pressure p against flow rate x:"),
                    format!("p(x) = {}", fit.equation),
                )
                .paragraph(format!(
                    "Degree {} least-squares fit, computed {}.",
                    fit.degree,
                    fit.fitted_at.format("%Y-%m-%d %H:%M UTC")
                ))
                .numbered(coefficient_lines(&fit.coefficients));
            if let Some(preview) = &fit.preview {
                curve = curve.image(format!("Pump Curve, {}", m.model_number), preview);
            }
            curve
        }
    };

    Section::new(m.model_number.clone())
        .subsection(spec)
        .subsection(data)
        .subsection(curve)
}

/// One line per coefficient, highest power first.
fn coefficient_lines(coefficients: &[f64]) -> Vec<String> {
    let degree = coefficients.len().saturating_sub(1);
    coefficients
        .iter()
        .enumerate()
        .map(|(i, c)| match degree - i {
            0 => format!("Constant term: {c}"),
            power => format!("Coefficient of x^{power}: {c}"),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DriveTrain, FanId, FanSpec, MediaType, PreviewImage};
    use crate::report::document::Block;
    use crate::report::{MarkdownRenderer, Renderer};
    use chrono::{TimeZone, Utc};

    fn entry(fit: bool) -> ModelReport {
        ModelReport {
            model: FanModel {
                id: FanId(1),
                model_number: "AXF-1440rpm-25°".to_string(),
                spec: FanSpec {
                    group: "AXF".to_string(),
                    brand: "Breeze".to_string(),
                    speed_rpm: 1440,
                    blade_angle_deg: 25,
                    drive_train: DriveTrain::DirectDrive,
                },
            },
            samples: vec![Sample::new(1.0, 100.0), Sample::new(2.5, 80.0)],
            fit: fit.then(|| FitArtifact {
                degree: 1,
                coefficients: vec![-13.33, 113.33],
                equation: "-13.33*x + 113.33".to_string(),
                preview: Some(PreviewImage {
                    media_type: MediaType::Svg,
                    bytes: b"<svg/>".to_vec(),
                }),
                fitted_at: Utc.with_ymd_and_hms(2026, 10, 17, 9, 30, 0).unwrap(),
            }),
        }
    }

    #[test]
    fn one_section_per_model_after_summary() {
        let doc = fan_model_report(TitlePage::default(), Vec::new(), &[entry(true), entry(false)]);
        assert_eq!(doc.sections.len(), 3);
        assert_eq!(doc.sections[0].heading, "Summary");
        assert_eq!(doc.sections[1].subsections.len(), 3);

        let curve = &doc.sections[1].subsections[2];
        assert!(curve.blocks.iter().any(|b| matches!(b, Block::Image { .. })));
        let unfitted = &doc.sections[2].subsections[2];
        assert_eq!(
            unfitted.blocks,
            vec![Block::Paragraph("No curve has been fitted yet.".to_string())]
        );
    }

    #[test]
    fn markdown_report_tabulates_samples_and_equation() {
        let title = TitlePage {
            title: "Fan Performance Data".to_string(),
            ..TitlePage::default()
        };
        let revisions = vec![Revision {
            rev: "0".to_string(),
            description: "Issued for review".to_string(),
            originator: "A".to_string(),
            reviewed: "B".to_string(),
            engineer: "C".to_string(),
            date: "2026-10-17".to_string(),
        }];
        let out = MarkdownRenderer.render(&fan_model_report(title, revisions, &[entry(true)]));

        assert!(out.body.contains("| 0 | Issued for review | A | B | C | 2026-10-17 |"));
        assert!(out.body.contains("| 1 | 100 |\n| 2.5 | 80 |"));
        assert!(out.body.contains("| Blade angle | 25° |"));
        assert!(out.body.contains("p(x) = -13.33*x + 113.33"));
        assert!(out.body.contains("2026-10-17 09:30 UTC"));
        assert_eq!(out.attachments.len(), 1);
        assert!(out.body.contains("1. Coefficient of x^1: -13.33\n2. Constant term: 113.33\n"));
    }

    #[test]
    fn summary_lists_models_without_a_fit() {
        let mut unfitted = entry(false);
        unfitted.model.model_number = "AXF-720rpm-10°".to_string();
        let doc = fan_model_report(TitlePage::default(), Vec::new(), &[entry(true), unfitted]);

        assert!(doc.sections[0].blocks.contains(&Block::Bullets {
            ordered: false,
            items: vec!["AXF-720rpm-10°".to_string()],
        }));

        let all_fitted = fan_model_report(TitlePage::default(), Vec::new(), &[entry(true)]);
        assert!(!all_fitted.sections[0]
            .blocks
            .iter()
            .any(|b| matches!(b, Block::Bullets { .. })));
    }
}
