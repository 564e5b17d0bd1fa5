//! Reporting: section-tree documents, renderers and terminal formatting.
//!
//! Report content is assembled once as a [`Document`] and handed to a
//! [`Renderer`]. Swapping the output format never touches content assembly.

use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::MediaType;

pub mod assemble;
pub mod document;
pub mod format;
pub mod markdown;

pub use assemble::{ModelReport, fan_model_report};
pub use document::{Block, Document, Revision, Section, TitlePage};
pub use markdown::MarkdownRenderer;

/// Turns a document into text plus binary side files.
pub trait Renderer {
    fn render(&self, doc: &Document) -> RenderedDocument;
}

/// A binary file referenced from a rendered body (e.g. a figure).
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub file_name: String,
    pub media_type: MediaType,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedDocument {
    pub body: String,
    pub attachments: Vec<Attachment>,
}

impl RenderedDocument {
    /// Write the body to `path` and every attachment next to it.
    pub fn write_to(&self, path: &Path) -> std::io::Result<Vec<PathBuf>> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)?;
        }

        let mut written = vec![path.to_path_buf()];
        fs::write(path, &self.body)?;
        for a in &self.attachments {
            let target = dir.join(&a.file_name);
            fs::write(&target, &a.bytes)?;
            written.push(target);
        }
        Ok(written)
    }
}
