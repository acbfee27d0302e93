//! Grouping of translation units into request-sized batches.
//!
//! Short fragments are collected until the batch holds `max_chars`
//! characters; a fragment of at least `long_fragment_chars` flushes the batch
//! immediately. Blocks without text ride along in whatever batch is open so
//! that every block is applied in traversal order.

use crate::config::BatchConfig;
use crate::walker::{Block, Position};

/// How a batch is encoded for the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BatchKind {
    /// Paragraph-like fragments, joined with a split marker
    Prose,
    /// Cells of the table at this body position, each tagged with its own token
    Table(usize),
}

impl BatchKind {
    pub const fn of(block: &Block) -> Self {
        match block.position {
            Position::Cell { table, .. } => Self::Table(table),
            _ => Self::Prose,
        }
    }
}

/// Blocks translated by one request, in traversal order.
#[derive(Debug, Clone, Default)]
pub struct Batch {
    kind: Option<BatchKind>,
    blocks: Vec<Block>,
    chars: usize,
}

impl Batch {
    /// All blocks, including empty passengers.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn into_blocks(self) -> Vec<Block> {
        self.blocks
    }

    /// The blocks that carry text to translate.
    pub fn units(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter().filter(|b| !b.is_empty())
    }

    pub fn unit_count(&self) -> usize {
        self.units().count()
    }

    /// Kind of the units; `None` when the batch holds only empty blocks.
    pub const fn kind(&self) -> Option<BatchKind> {
        self.kind
    }

    /// Characters of translatable text.
    pub const fn chars(&self) -> usize {
        self.chars
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }
}

/// Accumulates units into the open batch and decides when to flush.
#[derive(Debug)]
pub struct Batcher {
    config: BatchConfig,
    open: Batch,
}

impl Batcher {
    pub fn new(config: BatchConfig) -> Self {
        Self {
            config,
            open: Batch::default(),
        }
    }

    /// Whether `unit` can join the open batch without mixing encodings.
    pub fn accepts(&self, unit: &Block) -> bool {
        self.open
            .kind
            .is_none_or(|kind| kind == BatchKind::of(unit))
    }

    /// Append `unit`; returns whether the open batch reached the size limit.
    pub fn add(&mut self, unit: Block) -> bool {
        self.append(unit);
        self.open.chars >= self.config.max_chars
    }

    /// Append `unit`; a long unit flushes regardless of the running total.
    pub fn force_flush_if_long(&mut self, unit: Block) -> bool {
        let long = unit.char_len() >= self.config.long_fragment_chars;
        self.add(unit) || long
    }

    /// Append any block, dispatching on its length. Returns whether to flush.
    pub fn push(&mut self, block: Block) -> bool {
        if block.is_empty() {
            self.open.blocks.push(block);
            false
        } else if block.char_len() >= self.config.long_fragment_chars {
            self.force_flush_if_long(block)
        } else {
            self.add(block)
        }
    }

    /// Close the open batch and start a new one.
    pub fn flush(&mut self) -> Batch {
        std::mem::take(&mut self.open)
    }

    /// Remaining partial batch at end of stream, if any.
    pub fn drain(&mut self) -> Option<Batch> {
        if self.open.is_empty() {
            None
        } else {
            Some(self.flush())
        }
    }

    pub const fn open(&self) -> &Batch {
        &self.open
    }

    fn append(&mut self, unit: Block) {
        if !unit.is_empty() {
            self.open.kind = Some(BatchKind::of(&unit));
            self.open.chars += unit.char_len();
        }
        self.open.blocks.push(unit);
    }
}
