//! Renderer-agnostic report content.
//!
//! A [`Document`] is a title page, a revision history and a tree of
//! [`Section`]s. Sections hold [`Block`]s in display order and may nest.

use crate::domain::{MediaType, PreviewImage};

/// Cover information of a report.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TitlePage {
    pub title: String,
    pub project_name: String,
    pub project_number: String,
    pub doc_number: String,
    pub customer: String,
    pub prepared_by: String,
    pub revision: String,
}

/// One line of the revision table.
#[derive(Debug, Clone, PartialEq)]
pub struct Revision {
    pub rev: String,
    pub description: String,
    pub originator: String,
    pub reviewed: String,
    pub engineer: String,
    pub date: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Paragraph(String),
    Table {
        header: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    Image {
        caption: String,
        media_type: MediaType,
        bytes: Vec<u8>,
    },
    /// A displayed equation with an optional lead-in sentence.
    Equation {
        comment: Option<String>,
        text: String,
    },
    Bullets {
        ordered: bool,
        items: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub heading: String,
    pub blocks: Vec<Block>,
    pub subsections: Vec<Section>,
}

impl Section {
    pub fn new(heading: impl Into<String>) -> Self {
        Self {
            heading: heading.into(),
            blocks: Vec::new(),
            subsections: Vec::new(),
        }
    }

    pub fn paragraph(mut self, text: impl Into<String>) -> Self {
        self.blocks.push(Block::Paragraph(text.into()));
        self
    }

    pub fn table(mut self, header: &[&str], rows: Vec<Vec<String>>) -> Self {
        self.blocks.push(Block::Table {
            header: header.iter().map(|h| h.to_string()).collect(),
            rows,
        });
        self
    }

    pub fn image(mut self, caption: impl Into<String>, image: &PreviewImage) -> Self {
        self.blocks.push(Block::Image {
            caption: caption.into(),
            media_type: image.media_type,
            bytes: image.bytes.clone(),
        });
        self
    }

    pub fn equation(mut self, comment: Option<&str>, text: impl Into<String>) -> Self {
        self.blocks.push(Block::Equation {
            comment: comment.map(str::to_string),
            text: text.into(),
        });
        self
    }

    pub fn bullets(mut self, items: Vec<String>) -> Self {
        self.blocks.push(Block::Bullets {
            ordered: false,
            items,
        });
        self
    }

    pub fn numbered(mut self, items: Vec<String>) -> Self {
        self.blocks.push(Block::Bullets {
            ordered: true,
            items,
        });
        self
    }

    pub fn subsection(mut self, section: Section) -> Self {
        self.subsections.push(section);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub title_page: TitlePage,
    pub revisions: Vec<Revision>,
    pub sections: Vec<Section>,
}
