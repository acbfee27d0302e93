//! Traversal of a source document into translatable blocks.
//!
//! The order is fixed: body content as it appears (paragraphs and table cells,
//! row-major, interleaved with paragraphs), then every text frame paragraph,
//! then per section its header paragraphs followed by its footer paragraphs.
//! The walk is a pure function of the document, so skipping `n` blocks always
//! lands on the same block; resumption relies on this.

use std::sync::Arc;

use crate::document::{BodyElement, Document, HeaderFooter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Paragraph,
    TableCell,
    TextFrame,
    HeaderParagraph,
    FooterParagraph,
}

/// Where a block goes in the output document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Position {
    /// Body paragraph at `index`
    Body { index: usize },
    /// Cell of the table at body position `table`; `shape` is cells per row
    Cell {
        table: usize,
        row: usize,
        column: usize,
        shape: Arc<[usize]>,
    },
    /// Table at body position `table` without a single cell; yields one
    /// empty block so the table is still rebuilt
    EmptyTable { table: usize, shape: Arc<[usize]> },
    /// Paragraph of a text frame. `anchor` is the output body position of the
    /// frame's opening marker; `last` marks the frame's final paragraph.
    Frame {
        frame: usize,
        paragraph: usize,
        anchor: usize,
        last: bool,
    },
    /// Header or footer paragraph of a section
    HeaderFooter {
        section: usize,
        part: HeaderFooter,
        paragraph: usize,
    },
}

/// One structural node of the source document, detached from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Index in traversal order
    pub seq: usize,
    pub kind: BlockKind,
    pub text: String,
    pub style: Option<String>,
    pub position: Position,
}

impl Block {
    /// Blocks without visible text produce no translation unit.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Token identifying a table cell inside a tagged payload.
    pub fn cell_tag(&self) -> Option<String> {
        match &self.position {
            Position::Cell { table, row, column, .. } => Some(format!("[[T{table}R{row}C{column}]]")),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Body { element: usize, row: usize, column: usize },
    Frames { frame: usize, paragraph: usize, anchor: usize },
    Sections { section: usize, part: HeaderFooter, paragraph: usize },
    Done,
}

/// Lazy iterator over the blocks of a document.
pub struct DocumentWalker<'a> {
    doc: &'a Document,
    phase: Phase,
    seq: usize,
    shape: Option<(usize, Arc<[usize]>)>,
}

impl<'a> DocumentWalker<'a> {
    pub const fn new(doc: &'a Document) -> Self {
        Self {
            doc,
            phase: Phase::Body { element: 0, row: 0, column: 0 },
            seq: 0,
            shape: None,
        }
    }

    /// Walker positioned after the first `cursor` blocks.
    pub fn resume_from(doc: &'a Document, cursor: usize) -> Self {
        let mut walker = Self::new(doc);
        walker.by_ref().take(cursor).for_each(drop);
        walker
    }

    /// Number of blocks a full walk yields.
    pub fn total_blocks(doc: &Document) -> usize {
        let body: usize = doc
            .body
            .iter()
            .map(|e| match e {
                BodyElement::Paragraph(_) => 1,
                BodyElement::Table(t) => t.rows.iter().map(Vec::len).sum::<usize>().max(1),
            })
            .sum();
        let frames: usize = doc.text_frames.iter().map(|f| f.paragraphs.len()).sum();
        let sections: usize = doc
            .sections
            .iter()
            .map(|s| s.header.len() + s.footer.len())
            .sum();
        body + frames + sections
    }

    /// Number of blocks yielded so far.
    pub const fn position(&self) -> usize {
        self.seq
    }

    fn emit(
        &mut self,
        kind: BlockKind,
        text: &str,
        style: Option<&String>,
        position: Position,
    ) -> Block {
        let block = Block {
            seq: self.seq,
            kind,
            text: text.to_string(),
            style: style.cloned(),
            position,
        };
        self.seq += 1;
        block
    }

    fn table_shape(&mut self, element: usize) -> Arc<[usize]> {
        if let Some((cached, shape)) = &self.shape
            && *cached == element
        {
            return Arc::clone(shape);
        }
        let shape: Arc<[usize]> = match self.doc.body.get(element) {
            Some(BodyElement::Table(t)) => t.shape().into(),
            _ => Arc::from(Vec::new()),
        };
        self.shape = Some((element, Arc::clone(&shape)));
        shape
    }
}

impl Iterator for DocumentWalker<'_> {
    type Item = Block;

    fn next(&mut self) -> Option<Block> {
        let doc = self.doc;
        loop {
            match self.phase {
                Phase::Body { element, row, column } => {
                    let Some(body_element) = doc.body.get(element) else {
                        self.phase = Phase::Frames {
                            frame: 0,
                            paragraph: 0,
                            anchor: doc.body.len(),
                        };
                        continue;
                    };
                    match body_element {
                        BodyElement::Paragraph(p) => {
                            self.phase = Phase::Body { element: element + 1, row: 0, column: 0 };
                            return Some(self.emit(
                                BlockKind::Paragraph,
                                &p.text,
                                p.style.as_ref(),
                                Position::Body { index: element },
                            ));
                        }
                        BodyElement::Table(t) if t.rows.iter().all(Vec::is_empty) => {
                            self.phase = Phase::Body { element: element + 1, row: 0, column: 0 };
                            let shape = self.table_shape(element);
                            return Some(self.emit(
                                BlockKind::TableCell,
                                "",
                                None,
                                Position::EmptyTable { table: element, shape },
                            ));
                        }
                        BodyElement::Table(t) => {
                            let Some(cells) = t.rows.get(row) else {
                                self.phase = Phase::Body { element: element + 1, row: 0, column: 0 };
                                continue;
                            };
                            let Some(cell) = cells.get(column) else {
                                self.phase = Phase::Body { element, row: row + 1, column: 0 };
                                continue;
                            };
                            self.phase = Phase::Body { element, row, column: column + 1 };
                            let shape = self.table_shape(element);
                            return Some(self.emit(
                                BlockKind::TableCell,
                                &cell.text,
                                cell.style.as_ref(),
                                Position::Cell { table: element, row, column, shape },
                            ));
                        }
                    }
                }
                Phase::Frames { frame, paragraph, anchor } => {
                    let Some(text_frame) = doc.text_frames.get(frame) else {
                        self.phase = Phase::Sections {
                            section: 0,
                            part: HeaderFooter::Header,
                            paragraph: 0,
                        };
                        continue;
                    };
                    let count = text_frame.paragraphs.len();
                    let Some(p) = text_frame.paragraphs.get(paragraph) else {
                        // Opening marker, paragraphs, closing marker
                        let used = if count == 0 { 0 } else { count + 2 };
                        self.phase = Phase::Frames {
                            frame: frame + 1,
                            paragraph: 0,
                            anchor: anchor + used,
                        };
                        continue;
                    };
                    self.phase = Phase::Frames { frame, paragraph: paragraph + 1, anchor };
                    return Some(self.emit(
                        BlockKind::TextFrame,
                        &p.text,
                        p.style.as_ref(),
                        Position::Frame {
                            frame,
                            paragraph,
                            anchor,
                            last: paragraph + 1 == count,
                        },
                    ));
                }
                Phase::Sections { section, part, paragraph } => {
                    let Some(s) = doc.sections.get(section) else {
                        self.phase = Phase::Done;
                        continue;
                    };
                    let Some(p) = s.paragraphs(part).get(paragraph) else {
                        self.phase = match part {
                            HeaderFooter::Header => Phase::Sections {
                                section,
                                part: HeaderFooter::Footer,
                                paragraph: 0,
                            },
                            HeaderFooter::Footer => Phase::Sections {
                                section: section + 1,
                                part: HeaderFooter::Header,
                                paragraph: 0,
                            },
                        };
                        continue;
                    };
                    self.phase = Phase::Sections { section, part, paragraph: paragraph + 1 };
                    let kind = match part {
                        HeaderFooter::Header => BlockKind::HeaderParagraph,
                        HeaderFooter::Footer => BlockKind::FooterParagraph,
                    };
                    return Some(self.emit(
                        kind,
                        &p.text,
                        p.style.as_ref(),
                        Position::HeaderFooter { section, part, paragraph },
                    ));
                }
                Phase::Done => return None,
            }
        }
    }
}
