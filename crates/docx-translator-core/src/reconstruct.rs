//! Building the translated document.
//!
//! Every block is written to the output slot derived from its position, never
//! appended blindly, so applying the same block twice leaves the document
//! unchanged. Body elements keep their source index; text frames become
//! bracketed paragraphs after the body; header and footer paragraphs keep
//! their index within their section. Sections and their boundaries are taken
//! from the source up front, so sections without any text survive too.

use std::collections::BTreeSet;
use tracing::{debug, warn};

use crate::document::{BodyElement, Cell, Document, Paragraph, Table};
use crate::error::Result;
use crate::walker::{Block, Position};

/// Opening line of a text frame rendered into the body
pub fn frame_open_marker(frame: usize) -> String {
    format!("[Text box {}]", frame + 1)
}

/// Closing line of a text frame rendered into the body
pub fn frame_close_marker(frame: usize) -> String {
    format!("[/Text box {}]", frame + 1)
}

pub struct Reconstructor {
    output: Document,
    preserve_format: bool,
    /// Body positions of tables that could not be rebuilt
    broken_tables: BTreeSet<usize>,
}

impl Reconstructor {
    /// Start an empty output sharing the source's styles and sections.
    pub fn new(source: &Document, preserve_format: bool) -> Self {
        Self::resume(source, Document::blank_like(source), preserve_format)
    }

    /// Continue filling a previously checkpointed output of `source`.
    ///
    /// A snapshot only holds the body written so far, so section boundaries
    /// are restored from the source.
    pub fn resume(source: &Document, mut output: Document, preserve_format: bool) -> Self {
        output.align_sections(source);
        Self {
            output,
            preserve_format,
            broken_tables: BTreeSet::new(),
        }
    }

    pub const fn document(&self) -> &Document {
        &self.output
    }

    pub fn into_document(self) -> Document {
        self.output
    }

    /// Write `block` with its translation, or its original text when `translation` is `None`.
    ///
    /// Only a table whose output shape cannot match the source fails; the
    /// table is then replaced by a placeholder paragraph and its remaining
    /// cells are skipped.
    pub fn apply(&mut self, block: &Block, translation: Option<&str>) -> Result<()> {
        let text = if block.is_empty() {
            String::new()
        } else {
            translation.unwrap_or(&block.text).to_string()
        };
        let style = self.copy_style(block.style.as_deref());

        match &block.position {
            Position::Body { index } => {
                self.output
                    .put_body(*index, BodyElement::Paragraph(Paragraph { text, style }));
            }
            Position::Cell { table, row, column, shape } => {
                if self.broken_tables.contains(table) {
                    return Ok(());
                }
                match self.output.ensure_table(*table, shape) {
                    Ok(out) => out.rows[*row][*column] = Cell { text, style },
                    Err(e) => {
                        warn!("Table at position {} replaced by a placeholder: {}", table, e);
                        self.broken_tables.insert(*table);
                        self.output.put_body(
                            *table,
                            BodyElement::Paragraph(Paragraph::new(format!(
                                "[Table could not be reconstructed: {e}]"
                            ))),
                        );
                        return Err(e);
                    }
                }
            }
            Position::Frame { frame, paragraph, anchor, last } => {
                if *paragraph == 0 {
                    self.output.put_body(
                        *anchor,
                        BodyElement::Paragraph(Paragraph::new(frame_open_marker(*frame))),
                    );
                }
                let slot = anchor + 1 + paragraph;
                self.output
                    .put_body(slot, BodyElement::Paragraph(Paragraph { text, style }));
                if *last {
                    self.output.put_body(
                        slot + 1,
                        BodyElement::Paragraph(Paragraph::new(frame_close_marker(*frame))),
                    );
                }
            }
            Position::EmptyTable { table, shape } => {
                self.output
                    .put_body(*table, BodyElement::Table(Table::with_shape(shape)));
            }
            // Each source paragraph keeps its own slot rather than being
            // merged into the section's first paragraph; missing slots are
            // created empty.
            Position::HeaderFooter { section, part, paragraph } => {
                let paragraphs = self.output.section_mut(*section).paragraphs_mut(*part);
                while paragraphs.len() <= *paragraph {
                    paragraphs.push(Paragraph::default());
                }
                paragraphs[*paragraph] = Paragraph { text, style };
            }
        }
        Ok(())
    }

    fn copy_style(&self, style: Option<&str>) -> Option<String> {
        if !self.preserve_format {
            return None;
        }
        let style = style?;
        match self.output.resolve_style(style) {
            Ok(resolved) => Some(resolved),
            Err(e) => {
                debug!("Dropping style: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{HeaderFooter, Section, TextFrame};
    use crate::error::Error;
    use crate::walker::DocumentWalker;

    fn source() -> Document {
        let mut doc = Document::new();
        doc.styles.ids.insert("Title".to_string());
        doc.body.push(BodyElement::Paragraph(Paragraph::styled("title", "Title")));
        doc.body.push(BodyElement::Table(Table {
            rows: vec![vec![Cell::new("a"), Cell::new("")], vec![Cell::new("c"), Cell::new("d")]],
        }));
        doc.body.push(BodyElement::Paragraph(Paragraph::styled("odd", "Unknown")));
        doc.text_frames.push(TextFrame { paragraphs: vec![Paragraph::new("boxed")] });
        doc.sections.push(Section { end: 3, header: vec![Paragraph::new("head")], footer: Vec::new() });
        doc
    }

    fn rebuild(doc: &Document, preserve_format: bool) -> Document {
        let mut r = Reconstructor::new(doc, preserve_format);
        for block in DocumentWalker::new(doc) {
            let upper = block.text.to_uppercase();
            r.apply(&block, Some(&upper)).unwrap();
        }
        r.into_document()
    }

    #[test]
    fn test_structure_and_styles() {
        let out = rebuild(&source(), true);

        assert_eq!(out.body[0], BodyElement::Paragraph(Paragraph::styled("TITLE", "Title")));
        let BodyElement::Table(table) = &out.body[1] else {
            panic!("expected a table");
        };
        assert_eq!(table.shape(), vec![2, 2]);
        assert_eq!(table.rows[0][1].text, "");
        assert_eq!(table.rows[1][1].text, "D");
        // Unknown style is dropped, text kept
        assert_eq!(out.body[2], BodyElement::Paragraph(Paragraph::new("ODD")));

        let texts: Vec<String> = out.body[3..]
            .iter()
            .map(|e| match e {
                BodyElement::Paragraph(p) => p.text.clone(),
                BodyElement::Table(_) => String::new(),
            })
            .collect();
        assert_eq!(texts, vec!["[Text box 1]", "BOXED", "[/Text box 1]"]);
        assert_eq!(out.sections[0].paragraphs(HeaderFooter::Header)[0].text, "HEAD");
    }

    #[test]
    fn test_without_format_preservation() {
        let out = rebuild(&source(), false);
        assert_eq!(out.body[0], BodyElement::Paragraph(Paragraph::new("TITLE")));
    }

    #[test]
    fn test_missing_translation_keeps_original() {
        let doc = source();
        let mut r = Reconstructor::new(&doc, true);
        for block in DocumentWalker::new(&doc) {
            r.apply(&block, None).unwrap();
        }
        let out = r.into_document();
        let BodyElement::Table(table) = &out.body[1] else {
            panic!("expected a table");
        };
        assert_eq!(table.rows[1][0].text, "c");
    }

    #[test]
    fn test_reapplying_is_idempotent() {
        let doc = source();
        let blocks: Vec<Block> = DocumentWalker::new(&doc).collect();
        let mut r = Reconstructor::new(&doc, true);
        for (i, block) in blocks.iter().enumerate() {
            r.apply(block, Some("x")).unwrap();
            if i > 2 {
                r.apply(&blocks[i - 2], Some("x")).unwrap();
            }
        }
        let once = {
            let mut r = Reconstructor::new(&doc, true);
            for block in &blocks {
                r.apply(block, Some("x")).unwrap();
            }
            r.into_document()
        };
        assert_eq!(r.into_document(), once);
    }

    #[test]
    fn test_sections_come_from_the_source() {
        let mut doc = source();
        doc.sections[0].end = 1;
        doc.sections.push(Section { end: 3, ..Section::default() });

        let out = rebuild(&doc, true);
        assert_eq!(out.sections.len(), 2);
        assert_eq!(out.sections[0].end, 1);
        assert_eq!(out.sections[1], Section { end: 3, ..Section::default() });

        // A snapshot that lost its boundaries gets them back on resume
        let mut snapshot = out.clone();
        snapshot.sections.truncate(1);
        snapshot.sections[0].end = 0;
        let resumed = Reconstructor::resume(&doc, snapshot, true).into_document();
        assert_eq!(resumed, out);
    }

    #[test]
    fn test_cellless_table_is_rebuilt() {
        let mut doc = Document::new();
        doc.body.push(BodyElement::Table(Table { rows: vec![Vec::new()] }));
        doc.body.push(BodyElement::Paragraph(Paragraph::new("after")));

        let out = rebuild(&doc, true);
        assert_eq!(out.body[0], BodyElement::Table(Table { rows: vec![Vec::new()] }));
        assert_eq!(out.body[1], BodyElement::Paragraph(Paragraph::new("AFTER")));
    }

    #[test]
    fn test_shape_mismatch_leaves_placeholder() {
        let doc = source();
        let mut output = Document::blank_like(&doc);
        output.body.push(BodyElement::Paragraph(Paragraph::new("TITLE")));
        output.body.push(BodyElement::Table(Table::with_shape(&[1])));

        let mut r = Reconstructor::resume(&doc, output, true);
        let cells: Vec<Block> = DocumentWalker::resume_from(&doc, 1).take(4).collect();
        assert!(matches!(r.apply(&cells[0], Some("A")), Err(Error::TableShape { .. })));
        for cell in &cells[1..] {
            r.apply(cell, Some("X")).unwrap();
        }

        let BodyElement::Paragraph(p) = &r.document().body[1] else {
            panic!("expected a placeholder paragraph");
        };
        assert!(p.text.starts_with("[Table could not be reconstructed"));
    }
}
