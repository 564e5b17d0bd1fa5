//! Markdown rendering of a [`Document`].
//!
//! Output layout:
//!
//! - title block, then the revision table
//! - table of contents with section numbers
//! - numbered sections (`1`, `1.1`, ...) mapped to `##`, `###`, ...
//!
//! Images become attachments named `figure-{n}.{ext}` and are referenced by
//! file name, so the body and its attachments must be written side by side.

use crate::report::document::{Block, Document, Section, TitlePage};
use crate::report::{Attachment, RenderedDocument, Renderer};

#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownRenderer;

impl Renderer for MarkdownRenderer {
    fn render(&self, doc: &Document) -> RenderedDocument {
        let mut out = String::new();
        let mut attachments = Vec::new();

        title_block(&mut out, &doc.title_page);

        if !doc.revisions.is_empty() {
            out.push_str("## Revisions\n\n");
            let rows: Vec<Vec<String>> = doc
                .revisions
                .iter()
                .map(|r| {
                    vec![
                        r.rev.clone(),
                        r.description.clone(),
                        r.originator.clone(),
                        r.reviewed.clone(),
                        r.engineer.clone(),
                        r.date.clone(),
                    ]
                })
                .collect();
            table(
                &mut out,
                &["Rev.", "Description", "Originator", "Reviewed", "Engineer", "Date"].map(String::from),
                &rows,
            );
        }

        if !doc.sections.is_empty() {
            out.push_str("## Contents\n\n");
            for (i, s) in doc.sections.iter().enumerate() {
                toc_entry(&mut out, s, &[i + 1]);
            }
            out.push('\n');
        }

        for (i, s) in doc.sections.iter().enumerate() {
            section(&mut out, &mut attachments, s, &[i + 1]);
        }

        RenderedDocument {
            body: out,
            attachments,
        }
    }
}

fn title_block(out: &mut String, page: &TitlePage) {
    out.push_str(&format!("# {}\n\n", escape(&page.title)));

    let fields = [
        ("Project", &page.project_name),
        ("Project No.", &page.project_number),
        ("Document No.", &page.doc_number),
        ("Customer", &page.customer),
        ("Prepared by", &page.prepared_by),
        ("Revision", &page.revision),
    ];
    let mut any = false;
    for (label, value) in fields {
        if !value.trim().is_empty() {
            out.push_str(&format!("**{label}:** {}  \n", escape(value)));
            any = true;
        }
    }
    if any {
        out.push('\n');
    }
}

fn number(path: &[usize]) -> String {
    path.iter().map(|n| n.to_string()).collect::<Vec<_>>().join(".")
}

fn child(path: &[usize], n: usize) -> Vec<usize> {
    let mut out = path.to_vec();
    out.push(n);
    out
}

fn toc_entry(out: &mut String, s: &Section, path: &[usize]) {
    let indent = "  ".repeat(path.len() - 1);
    out.push_str(&format!("{indent}- {} {}\n", number(path), escape(&s.heading)));
    for (i, sub) in s.subsections.iter().enumerate() {
        toc_entry(out, sub, &child(path, i + 1));
    }
}

fn section(out: &mut String, attachments: &mut Vec<Attachment>, s: &Section, path: &[usize]) {
    // Markdown has six heading levels; `#` is the document title.
    let level = (path.len() + 1).min(6);
    out.push_str(&format!(
        "{} {} {}\n\n",
        "#".repeat(level),
        number(path),
        escape(&s.heading)
    ));

    for block in &s.blocks {
        match block {
            Block::Paragraph(text) => {
                out.push_str(&escape(text));
                out.push_str("\n\n");
            }
            Block::Table { header, rows } => table(out, header, rows),
            Block::Image {
                caption,
                media_type,
                bytes,
            } => {
                let n = attachments.len() + 1;
                let file_name = format!("figure-{n}.{}", media_type.extension());
                out.push_str(&format!(
                    "![{}]({file_name})\n\n*Figure {n}: {}*\n\n",
                    escape(caption),
                    escape(caption)
                ));
                attachments.push(Attachment {
                    file_name,
                    media_type: *media_type,
                    bytes: bytes.clone(),
                });
            }
            Block::Equation { comment, text } => {
                if let Some(c) = comment {
                    out.push_str(&escape(c));
                    out.push_str("\n\n");
                }
                out.push_str(&format!("```text\n{text}\n```\n\n"));
            }
            Block::Bullets { ordered, items } => {
                for (i, item) in items.iter().enumerate() {
                    if *ordered {
                        out.push_str(&format!("{}. {}\n", i + 1, escape(item)));
                    } else {
                        out.push_str(&format!("- {}\n", escape(item)));
                    }
                }
                out.push('\n');
            }
        }
    }

    for (i, sub) in s.subsections.iter().enumerate() {
        section(out, attachments, sub, &child(path, i + 1));
    }
}

fn table(out: &mut String, header: &[String], rows: &[Vec<String>]) {
    let cells = |row: &[String]| {
        let mut line = String::from("|");
        for i in 0..header.len() {
            let cell = row.get(i).map(String::as_str).unwrap_or("");
            line.push_str(&format!(" {} |", cell_text(cell)));
        }
        line.push('\n');
        line
    };

    out.push_str(&cells(header));
    out.push('|');
    for _ in header {
        out.push_str(" --- |");
    }
    out.push('\n');
    for row in rows {
        out.push_str(&cells(row.as_slice()));
    }
    out.push('\n');
}

fn cell_text(text: &str) -> String {
    escape(text).replace('|', "\\|").replace('\n', " ")
}

/// Neutralize characters that would start markup mid-text.
fn escape(text: &str) -> String {
    text.replace('*', "\\*").replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MediaType;
    use crate::report::document::Revision;

    fn doc() -> Document {
        Document {
            title_page: TitlePage {
                title: "Fan Performance Data".to_string(),
                project_name: "Car Park Ventilation".to_string(),
                doc_number: "DOC-001".to_string(),
                ..TitlePage::default()
            },
            revisions: vec![Revision {
                rev: "A".to_string(),
                description: "First issue".to_string(),
                originator: "JS".to_string(),
                reviewed: "MK".to_string(),
                engineer: "PL".to_string(),
                date: "2026-10-17".to_string(),
            }],
            sections: vec![
                Section::new("Scope")
                    .paragraph("Two fans.")
                    .bullets(vec!["a".to_string(), "b".to_string()]),
                Section::new("AXF-1440rpm-25°")
                    .table(
                        &["Flow Rate (m³/s)", "Pressure (Pa)"],
                        vec![vec!["1".to_string(), "100".to_string()]],
                    )
                    .subsection(
                        Section::new("Performance Curve")
                            .equation(Some("Fitted curve:"), "p(Q) = 2.00*x - 3.00")
                            .image(
                                "Pump Curve",
                                &crate::domain::PreviewImage {
                                    media_type: MediaType::Svg,
                                    bytes: b"<svg/>".to_vec(),
                                },
                            ),
                    ),
            ],
        }
    }

    #[test]
    fn renders_title_revisions_and_contents() {
        let out = MarkdownRenderer.render(&doc());
        let body = &out.body;

        assert!(body.starts_with("# Fan Performance Data\n"));
        assert!(body.contains("**Document No.:** DOC-001"));
        assert!(!body.contains("Customer"));
        assert!(body.contains("| Rev. | Description | Originator | Reviewed | Engineer | Date |"));
        assert!(body.contains("| A | First issue | JS | MK | PL | 2026-10-17 |"));
        assert!(body.contains("- 1 Scope\n- 2 AXF-1440rpm-25°\n  - 2.1 Performance Curve\n"));
        assert!(body.contains("## 1 Scope\n"));
        assert!(body.contains("### 2.1 Performance Curve\n"));
    }

    #[test]
    fn renders_tables_equations_and_images() {
        let out = MarkdownRenderer.render(&doc());
        let body = &out.body;

        assert!(body.contains("| Flow Rate (m³/s) | Pressure (Pa) |\n| --- | --- |\n| 1 | 100 |\n"));
        assert!(body.contains("```text\np(Q) = 2.00*x - 3.00\n```"));
        assert!(body.contains("![Pump Curve](figure-1.svg)"));
        assert!(body.contains("- a\n- b\n"));

        assert_eq!(out.attachments.len(), 1);
        assert_eq!(out.attachments[0].file_name, "figure-1.svg");
        assert_eq!(out.attachments[0].bytes, b"<svg/>".to_vec());
    }

    #[test]
    fn table_cells_escape_pipes_and_pad_short_rows() {
        let mut out = String::new();
        table(
            &mut out,
            &["a".to_string(), "b".to_string()],
            &[vec!["x|y".to_string()]],
        );
        assert_eq!(out, "| a | b |\n| --- | --- |\n| x\\|y |  |\n\n");
    }
}
