use std::fmt;

use super::{BodyElement, DocumentCodec};

/// Structural summary of a document file, for troubleshooting unreadable input.
#[derive(Debug, Clone, Default)]
pub struct DocumentReport {
    pub file_size: usize,
    /// Whether the bytes start with a ZIP local file header (`PK`)
    pub is_zip: bool,
    pub paragraphs: usize,
    pub empty_paragraphs: usize,
    pub tables: usize,
    pub sections: usize,
    pub styles: usize,
    pub text_frames: usize,
    pub problems: Vec<String>,
}

impl DocumentReport {
    pub fn is_healthy(&self) -> bool {
        self.problems.is_empty()
    }
}

/// Inspect `bytes` with `codec` and list anything that would hinder translation.
pub fn diagnose(codec: &dyn DocumentCodec, bytes: &[u8]) -> DocumentReport {
    let mut report = DocumentReport {
        file_size: bytes.len(),
        is_zip: bytes.starts_with(b"PK"),
        ..DocumentReport::default()
    };

    if codec.extension() == "docx" && !report.is_zip {
        report
            .problems
            .push("file is not a valid Office Open XML package".to_string());
        return report;
    }

    let document = match codec.decode(bytes) {
        Ok(document) => document,
        Err(e) => {
            report.problems.push(e.to_string());
            return report;
        }
    };

    report.sections = document.sections.len();
    report.styles = document.styles.ids.len();
    report.text_frames = document.text_frames.len();

    let mut paragraph_number = 0;
    for element in &document.body {
        match element {
            BodyElement::Paragraph(p) => {
                paragraph_number += 1;
                report.paragraphs += 1;
                if p.text.trim().is_empty() {
                    report.empty_paragraphs += 1;
                }
                if let Some(style) = &p.style
                    && !document.styles.contains(style)
                {
                    report.problems.push(format!(
                        "paragraph {paragraph_number}: style '{style}' is not declared"
                    ));
                }
            }
            BodyElement::Table(t) => {
                report.tables += 1;
                let shape = t.shape();
                if shape.windows(2).any(|w| w[0] != w[1]) {
                    report.problems.push(format!(
                        "table {}: rows have differing cell counts {shape:?}",
                        report.tables
                    ));
                }
            }
        }
    }

    report
}

impl fmt::Display for DocumentReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "File size:       {} bytes", self.file_size)?;
        writeln!(f, "ZIP container:   {}", if self.is_zip { "yes" } else { "no" })?;
        writeln!(
            f,
            "Paragraphs:      {} ({} empty)",
            self.paragraphs, self.empty_paragraphs
        )?;
        writeln!(f, "Tables:          {}", self.tables)?;
        writeln!(f, "Text frames:     {}", self.text_frames)?;
        writeln!(f, "Sections:        {}", self.sections)?;
        writeln!(f, "Styles:          {}", self.styles)?;
        if self.problems.is_empty() {
            write!(f, "No problems found")
        } else {
            writeln!(f, "Problems:")?;
            for problem in &self.problems {
                writeln!(f, "  - {problem}")?;
            }
            Ok(())
        }
    }
}
