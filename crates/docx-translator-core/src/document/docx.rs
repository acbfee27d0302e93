//! Office Open XML (`.docx`) reading and writing.
//!
//! Reading understands the parts translation cares about: body paragraphs and
//! top-level tables from `word/document.xml`, text box content
//! (`w:txbxContent`), style ids from `word/styles.xml`, and the default
//! header/footer of every section through the document relationships.
//!
//! Writing produces a minimal package that this reader maps back to the same
//! [`Document`].

use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use std::collections::{BTreeSet, HashMap};
use std::io::{Cursor, Read, Write};
use tracing::{debug, warn};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::model::{BodyElement, Cell, Document, Paragraph, Section, StyleSheet, Table, TextFrame};
use super::DocumentCodec;
use crate::error::{Error, Result};

const DOCUMENT_PART: &str = "word/document.xml";
const DOCUMENT_RELS_PART: &str = "word/_rels/document.xml.rels";
const STYLES_PART: &str = "word/styles.xml";

const NS_W: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_V: &str = "urn:schemas-microsoft-com:vml";

const REL_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
const REL_STYLES: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
const REL_HEADER: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/header";
const REL_FOOTER: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/footer";

const CT_DOCUMENT: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml";
const CT_STYLES: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml";
const CT_HEADER: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.header+xml";
const CT_FOOTER: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.footer+xml";

const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

/// `.docx` codec backed by `zip` and `quick-xml`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocxCodec;

impl DocumentCodec for DocxCodec {
    fn decode(&self, bytes: &[u8]) -> Result<Document> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;

        let document_xml = read_part(&mut archive, DOCUMENT_PART)?.ok_or_else(|| {
            Error::DocumentRead {
                part: DOCUMENT_PART.to_string(),
                reason: "part is missing".to_string(),
            }
        })?;
        let parsed = PartParser::parse(&document_xml)?;

        let relationships = match read_part(&mut archive, DOCUMENT_RELS_PART)? {
            Some(xml) => parse_relationships(&xml)?,
            None => HashMap::new(),
        };

        let styles = match read_part(&mut archive, STYLES_PART)? {
            Some(raw) => StyleSheet {
                ids: parse_style_ids(&raw)?,
                raw: Some(raw),
            },
            None => StyleSheet::default(),
        };

        let mut sections = Vec::with_capacity(parsed.sections.len());
        for refs in &parsed.sections {
            sections.push(Section {
                end: refs.end,
                header: read_header_footer(&mut archive, &relationships, refs.header.as_deref())?,
                footer: read_header_footer(&mut archive, &relationships, refs.footer.as_deref())?,
            });
        }

        debug!(
            "Decoded docx: {} body elements, {} text frames, {} sections, {} styles",
            parsed.body.len(),
            parsed.frames.len(),
            sections.len(),
            styles.ids.len()
        );

        Ok(Document {
            body: parsed.body,
            text_frames: parsed.frames,
            sections,
            styles,
        })
    }

    fn encode(&self, document: &Document) -> Result<Vec<u8>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        let mut relationships: Vec<(String, &str, String)> = Vec::new();
        let mut overrides: Vec<(String, &str)> = vec![("/word/document.xml".to_string(), CT_DOCUMENT)];

        if let Some(raw) = &document.styles.raw {
            write_part(&mut zip, options, STYLES_PART, raw)?;
            relationships.push(("rIdStyles".to_string(), REL_STYLES, "styles.xml".to_string()));
            overrides.push(("/word/styles.xml".to_string(), CT_STYLES));
        }

        let mut section_refs = Vec::with_capacity(document.sections.len());
        for (i, section) in document.sections.iter().enumerate() {
            let mut refs = SectionRefs::default();
            if !section.header.is_empty() {
                let name = format!("header{}.xml", i + 1);
                let id = format!("rIdHeader{}", i + 1);
                let xml = paragraphs_part("w:hdr", &section.header);
                write_part(&mut zip, options, &format!("word/{name}"), &xml)?;
                overrides.push((format!("/word/{name}"), CT_HEADER));
                relationships.push((id.clone(), REL_HEADER, name));
                refs.header = Some(id);
            }
            if !section.footer.is_empty() {
                let name = format!("footer{}.xml", i + 1);
                let id = format!("rIdFooter{}", i + 1);
                let xml = paragraphs_part("w:ftr", &section.footer);
                write_part(&mut zip, options, &format!("word/{name}"), &xml)?;
                overrides.push((format!("/word/{name}"), CT_FOOTER));
                relationships.push((id.clone(), REL_FOOTER, name));
                refs.footer = Some(id);
            }
            section_refs.push(refs);
        }

        write_part(&mut zip, options, DOCUMENT_PART, &document_part(document, &section_refs))?;
        write_part(&mut zip, options, DOCUMENT_RELS_PART, &relationships_part(&relationships))?;
        write_part(
            &mut zip,
            options,
            "_rels/.rels",
            &relationships_part(&[(
                "rId1".to_string(),
                REL_OFFICE_DOCUMENT,
                "word/document.xml".to_string(),
            )]),
        )?;
        write_part(&mut zip, options, "[Content_Types].xml", &content_types_part(&overrides))?;

        let cursor = zip
            .finish()
            .map_err(|e| Error::DocumentWrite(format!("Failed to finish archive: {e}")))?;
        Ok(cursor.into_inner())
    }

    fn extension(&self) -> &'static str {
        "docx"
    }
}

// =============================================================================
// Reading
// =============================================================================

fn read_part(archive: &mut ZipArchive<Cursor<&[u8]>>, name: &str) -> Result<Option<String>> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => {
            return Err(Error::DocumentRead {
                part: name.to_string(),
                reason: e.to_string(),
            });
        }
    };

    let mut content = String::new();
    file.read_to_string(&mut content).map_err(|e| Error::DocumentRead {
        part: name.to_string(),
        reason: e.to_string(),
    })?;
    Ok(Some(content))
}

fn read_header_footer(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
    relationships: &HashMap<String, String>,
    id: Option<&str>,
) -> Result<Vec<Paragraph>> {
    let Some(id) = id else {
        return Ok(Vec::new());
    };
    let Some(part) = relationships.get(id) else {
        warn!("Section references unknown relationship {}", id);
        return Ok(Vec::new());
    };
    let Some(xml) = read_part(archive, part)? else {
        warn!("Header/footer part {} is missing", part);
        return Ok(Vec::new());
    };

    // Tables inside headers are flattened to one paragraph per cell
    let parsed = PartParser::parse(&xml)?;
    let mut paragraphs = Vec::new();
    for element in parsed.body {
        match element {
            BodyElement::Paragraph(p) => paragraphs.push(p),
            BodyElement::Table(t) => paragraphs.extend(
                t.rows
                    .into_iter()
                    .flatten()
                    .map(|c| Paragraph { text: c.text, style: c.style }),
            ),
        }
    }
    Ok(paragraphs)
}

fn attr(e: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>> {
    for a in e.attributes() {
        let a = a.map_err(|err| Error::DocumentOpen(format!("malformed attribute: {err}")))?;
        if a.key.as_ref() == key {
            let value = a
                .unescape_value()
                .map_err(|err| Error::DocumentOpen(format!("malformed attribute value: {err}")))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Relationship id -> package part name (e.g. `rId7` -> `word/header1.xml`).
fn parse_relationships(xml: &str) -> Result<HashMap<String, String>> {
    let mut reader = Reader::from_str(xml);
    let mut map = HashMap::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"Relationship" => {
                if let (Some(id), Some(target)) = (attr(&e, b"Id")?, attr(&e, b"Target")?) {
                    let part = target
                        .strip_prefix('/')
                        .map_or_else(|| format!("word/{target}"), str::to_string);
                    map.insert(id, part);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(map)
}

fn parse_style_ids(xml: &str) -> Result<BTreeSet<String>> {
    let mut reader = Reader::from_str(xml);
    let mut ids = BTreeSet::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"w:style" => {
                if let Some(id) = attr(&e, b"w:styleId")? {
                    ids.insert(id);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(ids)
}

/// Default header/footer relationship ids of one `w:sectPr`, and the body
/// position where its section ends.
#[derive(Debug, Default)]
struct SectionRefs {
    end: usize,
    header: Option<String>,
    footer: Option<String>,
}

#[derive(Debug, Default)]
struct ParaBuilder {
    text: String,
    style: Option<String>,
    in_frame: bool,
    in_table: bool,
    run_depth: usize,
    has_runs: bool,
    has_sect: bool,
    has_frame: bool,
}

#[derive(Debug, Default)]
struct ParsedPart {
    body: Vec<BodyElement>,
    frames: Vec<TextFrame>,
    sections: Vec<SectionRefs>,
}

/// Event-driven walk over one WordprocessingML part.
#[derive(Debug, Default)]
struct PartParser {
    out: ParsedPart,
    paragraphs: Vec<ParaBuilder>,
    frames: Vec<Vec<Paragraph>>,
    table: Option<Vec<Vec<Cell>>>,
    table_depth: usize,
    cell_has_paragraph: bool,
    section: Option<SectionRefs>,
    in_text: bool,
}

impl PartParser {
    fn parse(xml: &str) -> Result<ParsedPart> {
        let mut reader = Reader::from_str(xml);
        let mut parser = Self::default();

        loop {
            match reader.read_event()? {
                Event::Start(e) => match e.name().as_ref() {
                    // VML duplicates of drawings, field codes and deleted revisions
                    b"mc:Fallback" | b"w:instrText" | b"w:delText" => {
                        reader.read_to_end(e.name())?;
                    }
                    _ => parser.open(&e)?,
                },
                Event::Empty(e) => {
                    parser.open(&e)?;
                    parser.close(e.name().as_ref());
                }
                Event::End(e) => parser.close(e.name().as_ref()),
                Event::Text(t) if parser.in_text => {
                    let text = t
                        .unescape()
                        .map_err(|err| Error::DocumentOpen(format!("malformed text: {err}")))?;
                    parser.push_text(&text);
                }
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(parser.out)
    }

    fn in_run(&self) -> bool {
        self.paragraphs.last().is_some_and(|p| p.run_depth > 0)
    }

    fn push_text(&mut self, text: &str) {
        if let Some(p) = self.paragraphs.last_mut() {
            p.text.push_str(text);
        }
    }

    fn open(&mut self, e: &BytesStart<'_>) -> Result<()> {
        match e.name().as_ref() {
            b"w:p" => self.paragraphs.push(ParaBuilder {
                in_frame: !self.frames.is_empty(),
                in_table: self.table_depth > 0,
                ..ParaBuilder::default()
            }),
            b"w:r" => {
                if let Some(p) = self.paragraphs.last_mut() {
                    p.run_depth += 1;
                    p.has_runs = true;
                }
            }
            b"w:t" => self.in_text = true,
            b"w:tab" if self.in_run() => self.push_text("\t"),
            b"w:br" if self.in_run() => {
                if attr(e, b"w:type")?.as_deref() != Some("page") {
                    self.push_text("\n");
                }
            }
            b"w:cr" if self.in_run() => self.push_text("\n"),
            b"w:pStyle" => {
                let style = attr(e, b"w:val")?;
                if let Some(p) = self.paragraphs.last_mut() {
                    p.style = style;
                }
            }
            b"w:tbl" if self.frames.is_empty() => {
                self.table_depth += 1;
                if self.table_depth == 1 {
                    self.table = Some(Vec::new());
                }
            }
            b"w:tr" if self.frames.is_empty() && self.table_depth == 1 => {
                if let Some(rows) = self.table.as_mut() {
                    rows.push(Vec::new());
                }
            }
            b"w:tc" if self.frames.is_empty() && self.table_depth == 1 => {
                if let Some(row) = self.table.as_mut().and_then(|rows| rows.last_mut()) {
                    row.push(Cell::default());
                }
                self.cell_has_paragraph = false;
            }
            b"w:txbxContent" => {
                if let Some(p) = self.paragraphs.last_mut() {
                    p.has_frame = true;
                }
                self.frames.push(Vec::new());
            }
            b"w:sectPr" if self.frames.is_empty() => {
                if let Some(p) = self.paragraphs.last_mut() {
                    p.has_sect = true;
                }
                self.section = Some(SectionRefs::default());
            }
            name @ (b"w:headerReference" | b"w:footerReference") => {
                let is_header = name == b"w:headerReference";
                let kind = attr(e, b"w:type")?.unwrap_or_else(|| "default".to_string());
                let id = attr(e, b"r:id")?;
                if let (Some(section), Some(id)) = (self.section.as_mut(), id) {
                    let slot = if is_header {
                        &mut section.header
                    } else {
                        &mut section.footer
                    };
                    if kind == "default" || slot.is_none() {
                        *slot = Some(id);
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn close(&mut self, name: &[u8]) {
        match name {
            b"w:p" => {
                if let Some(p) = self.paragraphs.pop() {
                    self.finish_paragraph(p);
                }
            }
            b"w:r" => {
                if let Some(p) = self.paragraphs.last_mut() {
                    p.run_depth = p.run_depth.saturating_sub(1);
                }
            }
            b"w:t" => self.in_text = false,
            b"w:tbl" if self.frames.is_empty() && self.table_depth > 0 => {
                self.table_depth -= 1;
                if self.table_depth == 0
                    && let Some(rows) = self.table.take()
                {
                    self.out.body.push(BodyElement::Table(Table { rows }));
                }
            }
            b"w:txbxContent" => {
                if let Some(paragraphs) = self.frames.pop() {
                    match self.frames.last_mut() {
                        Some(outer) => outer.extend(paragraphs),
                        None => self.out.frames.push(TextFrame { paragraphs }),
                    }
                }
            }
            b"w:sectPr" => {
                if let Some(mut section) = self.section.take() {
                    section.end = self.out.body.len();
                    self.out.sections.push(section);
                }
            }
            _ => {}
        }
    }

    fn finish_paragraph(&mut self, builder: ParaBuilder) {
        let paragraph = Paragraph {
            text: builder.text,
            style: builder.style,
        };

        if builder.in_frame {
            if let Some(frame) = self.frames.last_mut() {
                frame.push(paragraph);
            }
        } else if builder.in_table && self.table_depth > 0 {
            self.append_to_cell(paragraph);
        } else if paragraph.text.is_empty() && (builder.has_frame || (builder.has_sect && !builder.has_runs)) {
            // Pure anchors: a section break or a text box holder with no own text
        } else {
            self.out.body.push(BodyElement::Paragraph(paragraph));
            // A break carried by a paragraph with text ends after that paragraph
            if builder.has_sect
                && let Some(section) = self.out.sections.last_mut()
            {
                section.end = self.out.body.len();
            }
        }
    }

    fn append_to_cell(&mut self, paragraph: Paragraph) {
        let cell = self
            .table
            .as_mut()
            .and_then(|rows| rows.last_mut())
            .and_then(|row| row.last_mut());
        if let Some(cell) = cell {
            if self.cell_has_paragraph {
                cell.text.push('\n');
            } else {
                cell.style = paragraph.style;
            }
            cell.text.push_str(&paragraph.text);
            self.cell_has_paragraph = true;
        }
    }
}

// =============================================================================
// Writing
// =============================================================================

fn write_part(
    zip: &mut ZipWriter<Cursor<Vec<u8>>>,
    options: FileOptions,
    name: &str,
    content: &str,
) -> Result<()> {
    zip.start_file(name, options)
        .map_err(|e| Error::DocumentWrite(format!("Failed to add {name}: {e}")))?;
    zip.write_all(content.as_bytes())?;
    Ok(())
}

fn push_paragraph(out: &mut String, paragraph: &Paragraph) {
    out.push_str("<w:p>");
    if let Some(style) = &paragraph.style {
        out.push_str(&format!(r#"<w:pPr><w:pStyle w:val="{}"/></w:pPr>"#, escape(style.as_str())));
    }
    if !paragraph.text.is_empty() {
        out.push_str("<w:r>");
        for (i, line) in paragraph.text.split('\n').enumerate() {
            if i > 0 {
                out.push_str("<w:br/>");
            }
            for (j, chunk) in line.split('\t').enumerate() {
                if j > 0 {
                    out.push_str("<w:tab/>");
                }
                if !chunk.is_empty() {
                    out.push_str(&format!(r#"<w:t xml:space="preserve">{}</w:t>"#, escape(chunk)));
                }
            }
        }
        out.push_str("</w:r>");
    }
    out.push_str("</w:p>");
}

fn push_table(out: &mut String, table: &Table) {
    let columns = table.rows.iter().map(Vec::len).max().unwrap_or(0);
    out.push_str(r#"<w:tbl><w:tblPr><w:tblW w:w="0" w:type="auto"/></w:tblPr><w:tblGrid>"#);
    for _ in 0..columns {
        out.push_str("<w:gridCol/>");
    }
    out.push_str("</w:tblGrid>");
    for row in &table.rows {
        out.push_str("<w:tr>");
        for cell in row {
            out.push_str(r#"<w:tc><w:tcPr><w:tcW w:w="0" w:type="auto"/></w:tcPr>"#);
            for (i, line) in cell.text.split('\n').enumerate() {
                let style = if i == 0 { cell.style.clone() } else { None };
                push_paragraph(out, &Paragraph { text: line.to_string(), style });
            }
            out.push_str("</w:tc>");
        }
        out.push_str("</w:tr>");
    }
    out.push_str("</w:tbl>");
}

fn push_text_frame(out: &mut String, frame: &TextFrame) {
    out.push_str(r#"<w:p><w:r><w:pict><v:shape style="width:400pt;height:120pt"><v:textbox><w:txbxContent>"#);
    if frame.paragraphs.is_empty() {
        out.push_str("<w:p/>");
    }
    for paragraph in &frame.paragraphs {
        push_paragraph(out, paragraph);
    }
    out.push_str("</w:txbxContent></v:textbox></v:shape></w:pict></w:r></w:p>");
}

fn push_section_properties(out: &mut String, refs: &SectionRefs) {
    out.push_str("<w:sectPr>");
    if let Some(id) = &refs.header {
        out.push_str(&format!(r#"<w:headerReference w:type="default" r:id="{id}"/>"#));
    }
    if let Some(id) = &refs.footer {
        out.push_str(&format!(r#"<w:footerReference w:type="default" r:id="{id}"/>"#));
    }
    out.push_str("</w:sectPr>");
}

fn push_section_break(out: &mut String, refs: &SectionRefs) {
    out.push_str("<w:p><w:pPr>");
    push_section_properties(out, refs);
    out.push_str("</w:pPr></w:p>");
}

fn document_part(document: &Document, sections: &[SectionRefs]) -> String {
    let mut out = String::with_capacity(4096);
    out.push_str(XML_DECL);
    out.push_str(&format!(
        r#"<w:document xmlns:w="{NS_W}" xmlns:r="{NS_R}" xmlns:v="{NS_V}"><w:body>"#
    ));

    // Every section but the last ends with a section-break paragraph placed
    // right after its final body element
    let (last, earlier) = sections.split_last().map_or((None, &[][..]), |(l, e)| (Some(l), e));
    let mut breaks = earlier.iter().zip(&document.sections).peekable();

    for (index, element) in document.body.iter().enumerate() {
        while let Some((refs, _)) = breaks.next_if(|(_, section)| section.end <= index) {
            push_section_break(&mut out, refs);
        }
        match element {
            BodyElement::Paragraph(p) => push_paragraph(&mut out, p),
            BodyElement::Table(t) => push_table(&mut out, t),
        }
    }
    for (refs, _) in breaks {
        push_section_break(&mut out, refs);
    }
    for frame in &document.text_frames {
        push_text_frame(&mut out, frame);
    }
    if let Some(last) = last {
        push_section_properties(&mut out, last);
    }

    out.push_str("</w:body></w:document>");
    out
}

fn paragraphs_part(root: &str, paragraphs: &[Paragraph]) -> String {
    let mut out = String::with_capacity(1024);
    out.push_str(XML_DECL);
    out.push_str(&format!(r#"<{root} xmlns:w="{NS_W}" xmlns:r="{NS_R}">"#));
    for paragraph in paragraphs {
        push_paragraph(&mut out, paragraph);
    }
    out.push_str(&format!("</{root}>"));
    out
}

fn relationships_part(relationships: &[(String, &str, String)]) -> String {
    let mut out = String::with_capacity(512);
    out.push_str(XML_DECL);
    out.push_str(
        r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    for (id, kind, target) in relationships {
        out.push_str(&format!(
            r#"<Relationship Id="{id}" Type="{kind}" Target="{}"/>"#,
            escape(target.as_str())
        ));
    }
    out.push_str("</Relationships>");
    out
}

fn content_types_part(overrides: &[(String, &str)]) -> String {
    let mut out = String::with_capacity(1024);
    out.push_str(XML_DECL);
    out.push_str(r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#);
    out.push_str(r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#);
    out.push_str(r#"<Default Extension="xml" ContentType="application/xml"/>"#);
    for (part, content_type) in overrides {
        out.push_str(&format!(r#"<Override PartName="{part}" ContentType="{content_type}"/>"#));
    }
    out.push_str("</Types>");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn package(document_xml: &str, extra: &[(&str, &str)]) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default().compression_method(CompressionMethod::Stored);
        zip.start_file(DOCUMENT_PART, options).unwrap();
        zip.write_all(document_xml.as_bytes()).unwrap();
        for (name, content) in extra {
            zip.start_file(*name, options).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    fn wrap_body(body: &str) -> String {
        format!(
            r#"<?xml version="1.0"?><w:document xmlns:w="{NS_W}" xmlns:r="{NS_R}" xmlns:mc="mc"><w:body>{body}</w:body></w:document>"#
        )
    }

    fn sample() -> Document {
        let mut doc = Document::new();
        doc.styles.ids.insert("Heading1".to_string());
        doc.styles.raw = Some(format!(
            r#"<w:styles xmlns:w="{NS_W}"><w:style w:type="paragraph" w:styleId="Heading1"/></w:styles>"#
        ));
        doc.body.push(BodyElement::Paragraph(Paragraph::styled("Title & <intro>", "Heading1")));
        doc.body.push(BodyElement::Paragraph(Paragraph::default()));
        doc.body.push(BodyElement::Table(Table {
            rows: vec![
                vec![Cell::new("a"), Cell::new("line one\nline two")],
                vec![Cell::new(""), Cell::new("d\te")],
            ],
        }));
        doc.body.push(BodyElement::Paragraph(Paragraph::new("after table")));
        doc.text_frames.push(TextFrame {
            paragraphs: vec![Paragraph::new("boxed"), Paragraph::new("boxed 2")],
        });
        doc.sections.push(Section {
            end: 2,
            header: vec![Paragraph::new("first header")],
            footer: Vec::new(),
        });
        doc.sections.push(Section {
            end: 4,
            header: vec![Paragraph::new("second header")],
            footer: vec![Paragraph::new("page footer")],
        });
        doc
    }

    #[test]
    fn test_encoded_document_reads_back_identically() {
        let doc = sample();
        let bytes = DocxCodec.encode(&doc).unwrap();
        assert!(bytes.starts_with(b"PK"));
        let decoded = DocxCodec.decode(&bytes).unwrap();
        assert_eq!(decoded, doc);
    }

    #[test]
    fn test_interleaved_body_order_and_styles() {
        let xml = wrap_body(
            r#"<w:p><w:pPr><w:pStyle w:val="Title"/><w:tabs><w:tab w:val="left" w:pos="720"/></w:tabs></w:pPr><w:r><w:t>One</w:t></w:r><w:r><w:tab/><w:t xml:space="preserve"> two</w:t></w:r></w:p>
               <w:tbl><w:tr><w:tc><w:p><w:r><w:t>c1</w:t></w:r></w:p></w:tc><w:tc><w:p/></w:tc></w:tr></w:tbl>
               <w:p><w:r><w:t>Three</w:t><w:br/><w:t>more</w:t></w:r></w:p>"#,
        );
        let doc = DocxCodec.decode(&package(&xml, &[])).unwrap();

        assert_eq!(doc.body.len(), 3);
        assert_eq!(doc.body[0], BodyElement::Paragraph(Paragraph::styled("One\t two", "Title")));
        assert_eq!(
            doc.body[1],
            BodyElement::Table(Table { rows: vec![vec![Cell::new("c1"), Cell::new("")]] })
        );
        assert_eq!(doc.body[2], BodyElement::Paragraph(Paragraph::new("Three\nmore")));
    }

    #[test]
    fn test_text_box_collected_once_and_fallback_skipped() {
        let xml = wrap_body(
            r#"<w:p><w:r><w:t>Anchor text</w:t></w:r><w:r><mc:AlternateContent>
                 <mc:Choice><w:drawing><w:txbxContent><w:p><w:r><w:t>In the box</w:t></w:r></w:p></w:txbxContent></w:drawing></mc:Choice>
                 <mc:Fallback><w:pict><w:txbxContent><w:p><w:r><w:t>In the box</w:t></w:r></w:p></w:txbxContent></w:pict></mc:Fallback>
               </mc:AlternateContent></w:r></w:p>"#,
        );
        let doc = DocxCodec.decode(&package(&xml, &[])).unwrap();

        assert_eq!(doc.body, vec![BodyElement::Paragraph(Paragraph::new("Anchor text"))]);
        assert_eq!(doc.text_frames.len(), 1);
        assert_eq!(doc.text_frames[0].paragraphs, vec![Paragraph::new("In the box")]);
    }

    #[test]
    fn test_headers_resolved_through_relationships() {
        let xml = wrap_body(
            r#"<w:p><w:r><w:t>Body</w:t></w:r></w:p>
               <w:sectPr><w:headerReference w:type="first" r:id="rId9"/><w:headerReference w:type="default" r:id="rId8"/><w:footerReference w:type="default" r:id="rId10"/></w:sectPr>"#,
        );
        let rels = r#"<Relationships><Relationship Id="rId8" Type="h" Target="header2.xml"/><Relationship Id="rId9" Type="h" Target="header1.xml"/><Relationship Id="rId10" Type="f" Target="/word/footer1.xml"/></Relationships>"#;
        let header = format!(r#"<w:hdr xmlns:w="{NS_W}"><w:p><w:r><w:t>Default header</w:t></w:r></w:p></w:hdr>"#);
        let footer = format!(r#"<w:ftr xmlns:w="{NS_W}"><w:p><w:r><w:t>Footer</w:t></w:r></w:p></w:ftr>"#);
        let bytes = package(
            &xml,
            &[
                (DOCUMENT_RELS_PART, rels),
                ("word/header2.xml", &header),
                ("word/footer1.xml", &footer),
            ],
        );

        let doc = DocxCodec.decode(&bytes).unwrap();
        assert_eq!(doc.sections.len(), 1);
        assert_eq!(doc.sections[0].header, vec![Paragraph::new("Default header")]);
        assert_eq!(doc.sections[0].footer, vec![Paragraph::new("Footer")]);
    }

    #[test]
    fn test_section_ends_follow_breaks() {
        let xml = wrap_body(
            r#"<w:p><w:r><w:t>page one</w:t></w:r></w:p>
               <w:p><w:pPr><w:sectPr/></w:pPr></w:p>
               <w:p><w:pPr><w:sectPr/></w:pPr><w:r><w:t>page two</w:t></w:r></w:p>
               <w:p><w:r><w:t>page three</w:t></w:r></w:p>
               <w:sectPr/>"#,
        );
        let doc = DocxCodec.decode(&package(&xml, &[])).unwrap();

        assert_eq!(doc.body.len(), 3);
        let ends: Vec<usize> = doc.sections.iter().map(|s| s.end).collect();
        assert_eq!(ends, vec![1, 2, 3]);
    }

    #[test]
    fn test_section_breaks_written_between_their_sections() {
        let mut doc = Document::new();
        doc.body.push(BodyElement::Paragraph(Paragraph::new("PAGE ONE")));
        doc.body.push(BodyElement::Paragraph(Paragraph::new("PAGE TWO")));
        doc.sections.push(Section { end: 1, header: vec![Paragraph::new("HEAD ONE")], footer: Vec::new() });
        doc.sections.push(Section { end: 2, header: vec![Paragraph::new("HEAD TWO")], footer: Vec::new() });

        let refs = vec![
            SectionRefs { end: 1, header: Some("rIdHeader1".to_string()), footer: None },
            SectionRefs { end: 2, header: Some("rIdHeader2".to_string()), footer: None },
        ];
        let xml = document_part(&doc, &refs);
        let one = xml.find("PAGE ONE").unwrap();
        let first_break = xml.find("rIdHeader1").unwrap();
        let two = xml.find("PAGE TWO").unwrap();
        let final_break = xml.find("rIdHeader2").unwrap();
        assert!(one < first_break && first_break < two && two < final_break);

        let decoded = DocxCodec.decode(&DocxCodec.encode(&doc).unwrap()).unwrap();
        assert_eq!(decoded, doc);
    }

    #[test]
    fn test_missing_document_part_is_an_error() {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("other.xml", FileOptions::default()).unwrap();
        let bytes = zip.finish().unwrap().into_inner();
        assert!(matches!(DocxCodec.decode(&bytes), Err(Error::DocumentRead { .. })));
    }

    #[test]
    fn test_not_a_zip() {
        assert!(DocxCodec.decode(b"plain text").is_err());
    }
}
