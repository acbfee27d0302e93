//! Packing several fragments into one request and unpacking the reply.
//!
//! Prose batches are joined with a separator line and decoded by position;
//! a reply with the wrong number of segments is rejected as a whole. Table
//! batches prefix every fragment with its cell token and are decoded by
//! token, so reordering in the reply is harmless and a missing token only
//! affects its own cell.

use std::collections::{HashMap, HashSet};

use crate::batch::BatchKind;
use crate::error::{Error, Result};
use crate::walker::Block;

/// Separator line between prose segments.
pub const SPLIT_MARKER: &str = "<<<SPLIT>>>";

/// How the payload text is laid out, so the prompt can explain it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadFormat {
    /// A single fragment
    Plain,
    /// `segments` fragments separated by [`SPLIT_MARKER`] lines
    Split { segments: usize },
    /// `fragments` fragments, each starting with its `[[...]]` token
    Tagged { fragments: usize },
}

/// Text sent to the endpoint in one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub text: String,
    pub format: PayloadFormat,
}

impl Payload {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            format: PayloadFormat::Plain,
        }
    }
}

/// Token -> translated text, decoded from one tagged reply.
pub type TranslationResultMap = HashMap<String, String>;

/// A batch's units encoded as one payload, remembering how to decode the reply.
#[derive(Debug, Clone)]
pub struct EncodedBatch {
    pub payload: Payload,
    /// Per-unit tokens for tagged payloads; empty for positional ones
    tags: Vec<String>,
    units: usize,
}

impl EncodedBatch {
    /// Encode `units` (non-empty blocks, in batch order) for `kind`.
    pub fn encode(kind: BatchKind, units: &[&Block]) -> Self {
        match kind {
            BatchKind::Table(_) => {
                // Table batches hold cells only, and every cell has a tag
                let tagged: Vec<(String, &str)> = units
                    .iter()
                    .filter_map(|b| Some((b.cell_tag()?, b.text.as_str())))
                    .collect();
                let text = encode_tagged(&tagged);
                Self {
                    payload: Payload {
                        text,
                        format: PayloadFormat::Tagged { fragments: units.len() },
                    },
                    tags: tagged.into_iter().map(|(tag, _)| tag).collect(),
                    units: units.len(),
                }
            }
            BatchKind::Prose => {
                let texts: Vec<&str> = units.iter().map(|b| b.text.as_str()).collect();
                Self {
                    payload: encode_split(&texts),
                    tags: Vec::new(),
                    units: units.len(),
                }
            }
        }
    }

    /// One entry per unit; `None` where the reply holds no usable translation.
    pub fn decode(&self, response: &str) -> Result<Vec<Option<String>>> {
        if self.tags.is_empty() {
            let segments = decode_split(response, self.units)?;
            Ok(segments.into_iter().map(non_blank).collect())
        } else {
            let mut map = decode_tagged(response, &self.tags);
            Ok(self
                .tags
                .iter()
                .map(|tag| map.remove(tag).and_then(non_blank))
                .collect())
        }
    }
}

fn non_blank(text: String) -> Option<String> {
    if text.trim().is_empty() { None } else { Some(text) }
}

/// Join fragments with separator lines; a single fragment is sent as is.
pub fn encode_split(fragments: &[&str]) -> Payload {
    if fragments.len() == 1 {
        return Payload::plain(fragments[0]);
    }
    Payload {
        text: fragments.join(&format!("\n{SPLIT_MARKER}\n")),
        format: PayloadFormat::Split {
            segments: fragments.len(),
        },
    }
}

/// Split a reply on separator lines and check the segment count.
///
/// A trailing empty segment (a separator echoed after the last fragment) is
/// tolerated; any other count mismatch is an error so that no segment is
/// assigned to the wrong fragment.
pub fn decode_split(response: &str, expected: usize) -> Result<Vec<String>> {
    if expected <= 1 {
        return Ok(vec![response.trim().to_string()]);
    }

    let mut segments = Vec::with_capacity(expected);
    let mut current: Vec<&str> = Vec::new();
    for line in response.lines() {
        if line.trim() == SPLIT_MARKER {
            segments.push(current.join("\n").trim().to_string());
            current.clear();
        } else {
            current.push(line);
        }
    }
    segments.push(current.join("\n").trim().to_string());

    if segments.len() == expected + 1 && segments.last().is_some_and(String::is_empty) {
        segments.pop();
    }

    if segments.len() == expected {
        Ok(segments)
    } else {
        Err(Error::SegmentCount {
            expected,
            found: segments.len(),
        })
    }
}

/// One line per fragment, each starting with its token.
pub fn encode_tagged(fragments: &[(String, &str)]) -> String {
    fragments
        .iter()
        .map(|(tag, text)| format!("{tag} {text}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Scan a reply line by line; a line starting with a known token opens that
/// fragment, following lines continue it until the next known token.
pub fn decode_tagged(response: &str, tags: &[String]) -> TranslationResultMap {
    let known: HashSet<&str> = tags.iter().map(String::as_str).collect();
    let mut map = TranslationResultMap::new();
    let mut current: Option<(&str, Vec<&str>)> = None;

    for line in response.lines() {
        if let Some((tag, rest)) = leading_tag(line, &known) {
            if let Some((done, lines)) = current.take() {
                insert_first(&mut map, done, &lines);
            }
            current = Some((tag, vec![rest.trim_start()]));
        } else if let Some((_, lines)) = current.as_mut() {
            lines.push(line);
        }
    }
    if let Some((done, lines)) = current {
        insert_first(&mut map, done, &lines);
    }

    map
}

fn leading_tag<'a>(line: &'a str, known: &HashSet<&str>) -> Option<(&'a str, &'a str)> {
    let trimmed = line.trim_start();
    if !trimmed.starts_with("[[") {
        return None;
    }
    let end = trimmed.find("]]")? + 2;
    let tag = &trimmed[..end];
    known.contains(tag).then(|| (tag, &trimmed[end..]))
}

fn insert_first(map: &mut TranslationResultMap, tag: &str, lines: &[&str]) {
    let text = lines.join("\n").trim().to_string();
    // A token repeated by the model keeps its first non-empty translation
    let keep = map.get(tag).is_none_or(String::is_empty);
    if keep {
        map.insert(tag.to_string(), text);
    }
}
