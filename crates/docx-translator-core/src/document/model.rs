use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::{Error, Result};

/// In-memory view of a word-processing document.
///
/// Only what translation needs is modelled: text, paragraph style references,
/// table shape, text frames and per-section header/footer paragraphs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Paragraphs and tables in document order
    pub body: Vec<BodyElement>,
    /// Floating text frames (text boxes) in document order
    #[serde(default)]
    pub text_frames: Vec<TextFrame>,
    /// Sections in document order
    #[serde(default)]
    pub sections: Vec<Section>,
    /// Styles known to this document
    #[serde(default)]
    pub styles: StyleSheet,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BodyElement {
    Paragraph(Paragraph),
    Table(Table),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paragraph {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
}

impl Paragraph {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: None,
        }
    }

    pub fn styled(text: impl Into<String>, style: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: Some(style.into()),
        }
    }
}

/// A table; rows may have different cell counts (merged cells).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub rows: Vec<Vec<Cell>>,
}

/// A table cell. Multi-paragraph cells join their paragraphs with `\n`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
}

impl Cell {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: None,
        }
    }
}

impl Table {
    /// Empty table with the given number of cells per row.
    pub fn with_shape(shape: &[usize]) -> Self {
        Self {
            rows: shape.iter().map(|&n| vec![Cell::default(); n]).collect(),
        }
    }

    /// Cells per row.
    pub fn shape(&self) -> Vec<usize> {
        self.rows.iter().map(Vec::len).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextFrame {
    pub paragraphs: Vec<Paragraph>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Body position one past the section's last element
    #[serde(default)]
    pub end: usize,
    #[serde(default)]
    pub header: Vec<Paragraph>,
    #[serde(default)]
    pub footer: Vec<Paragraph>,
}

/// Which paragraph list of a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HeaderFooter {
    Header,
    Footer,
}

/// Style ids declared by a document, plus the raw style part for re-encoding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleSheet {
    #[serde(default)]
    pub ids: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

impl StyleSheet {
    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// New empty document sharing the style sheet of `source`.
    pub fn blank_like(source: &Self) -> Self {
        Self {
            styles: source.styles.clone(),
            ..Self::default()
        }
    }

    pub fn paragraph_count(&self) -> usize {
        self.body
            .iter()
            .filter(|e| matches!(e, BodyElement::Paragraph(_)))
            .count()
    }

    pub fn table_count(&self) -> usize {
        self.body
            .iter()
            .filter(|e| matches!(e, BodyElement::Table(_)))
            .count()
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.body.iter().filter_map(|e| match e {
            BodyElement::Table(t) => Some(t),
            BodyElement::Paragraph(_) => None,
        })
    }

    /// Resolve a style reference against this document's style sheet.
    pub fn resolve_style(&self, style: &str) -> Result<String> {
        if self.styles.contains(style) {
            Ok(style.to_string())
        } else {
            Err(Error::StyleNotFound(style.to_string()))
        }
    }

    /// Place `element` at body position `index`, padding with empty paragraphs
    /// if the body is shorter and replacing whatever occupies the slot.
    pub fn put_body(&mut self, index: usize, element: BodyElement) {
        while self.body.len() < index {
            self.body.push(BodyElement::Paragraph(Paragraph::default()));
        }
        if index == self.body.len() {
            self.body.push(element);
        } else {
            self.body[index] = element;
        }
    }

    /// The table at body position `index`, created with `shape` if the body
    /// does not reach that far yet.
    ///
    /// Fails when the slot holds a paragraph or a table of a different shape.
    pub fn ensure_table(&mut self, index: usize, shape: &[usize]) -> Result<&mut Table> {
        if index >= self.body.len() {
            self.put_body(index, BodyElement::Table(Table::with_shape(shape)));
        }
        match &mut self.body[index] {
            BodyElement::Table(table) => {
                let found = table.shape();
                if found == shape {
                    Ok(table)
                } else {
                    Err(Error::TableShape {
                        table: index,
                        expected: shape.to_vec(),
                        found,
                    })
                }
            }
            BodyElement::Paragraph(_) => Err(Error::TableShape {
                table: index,
                expected: shape.to_vec(),
                found: Vec::new(),
            }),
        }
    }

    /// Section `index`, created (with any missing predecessors) if absent.
    pub fn section_mut(&mut self, index: usize) -> &mut Section {
        while self.sections.len() <= index {
            self.sections.push(Section::default());
        }
        &mut self.sections[index]
    }

    /// Give this document the section layout of `source`: the same number of
    /// sections ending at the same body positions. Header and footer
    /// paragraphs already present are kept.
    pub fn align_sections(&mut self, source: &Self) {
        self.sections.truncate(source.sections.len());
        for (i, section) in source.sections.iter().enumerate() {
            self.section_mut(i).end = section.end;
        }
    }
}

impl Section {
    pub fn paragraphs_mut(&mut self, part: HeaderFooter) -> &mut Vec<Paragraph> {
        match part {
            HeaderFooter::Header => &mut self.header,
            HeaderFooter::Footer => &mut self.footer,
        }
    }

    pub fn paragraphs(&self, part: HeaderFooter) -> &[Paragraph] {
        match part {
            HeaderFooter::Header => &self.header,
            HeaderFooter::Footer => &self.footer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_body_pads_and_replaces() {
        let mut doc = Document::new();
        doc.put_body(2, BodyElement::Paragraph(Paragraph::new("c")));
        assert_eq!(doc.body.len(), 3);
        doc.put_body(0, BodyElement::Paragraph(Paragraph::new("a")));
        assert_eq!(doc.body.len(), 3);
        assert_eq!(doc.body[0], BodyElement::Paragraph(Paragraph::new("a")));
    }

    #[test]
    fn test_ensure_table_checks_shape() {
        let mut doc = Document::new();
        doc.ensure_table(0, &[2, 2]).unwrap().rows[1][1].text = "x".to_string();
        // Same shape: the existing table is returned untouched
        assert_eq!(doc.ensure_table(0, &[2, 2]).unwrap().rows[1][1].text, "x");
        assert!(matches!(
            doc.ensure_table(0, &[3]),
            Err(Error::TableShape { table: 0, .. })
        ));

        doc.put_body(1, BodyElement::Paragraph(Paragraph::new("placeholder")));
        assert!(matches!(
            doc.ensure_table(1, &[1]),
            Err(Error::TableShape { table: 1, .. })
        ));
        // Slots past the end are padded like paragraphs
        assert_eq!(doc.ensure_table(3, &[1]).unwrap().shape(), vec![1]);
        assert_eq!(doc.body.len(), 4);
    }

    #[test]
    fn test_align_sections_copies_boundaries() {
        let mut source = Document::new();
        source.sections.push(Section { end: 2, ..Section::default() });
        source.sections.push(Section { end: 5, ..Section::default() });
        source.sections.push(Section { end: 5, ..Section::default() });

        let mut output = Document::new();
        output.section_mut(1).header.push(Paragraph::new("kept"));
        output.align_sections(&source);

        let ends: Vec<usize> = output.sections.iter().map(|s| s.end).collect();
        assert_eq!(ends, vec![2, 5, 5]);
        assert_eq!(output.sections[1].header, vec![Paragraph::new("kept")]);

        output.align_sections(&Document::new());
        assert!(output.sections.is_empty());
    }

    #[test]
    fn test_resolve_style() {
        let mut doc = Document::new();
        doc.styles.ids.insert("Heading1".to_string());
        assert_eq!(doc.resolve_style("Heading1").unwrap(), "Heading1");
        assert!(matches!(doc.resolve_style("Fancy"), Err(Error::StyleNotFound(_))));
    }
}
