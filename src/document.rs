//! Document handle: one open package plus its typed model.
//!
//! The handle owns the package part map, the body block container, and the
//! style registry. Saving re-serializes only the parts the model understands
//! (`word/document.xml`, `word/styles.xml`); everything else round-trips as
//! the bytes it was loaded with. A handle is never shared; concurrent access
//! goes through [`DocumentRegistry`], one handle per path.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use tracing::{info, warn};

use crate::body::{body_to_xml, parse_body, Body};
use crate::error::{DocxError, Result};
use crate::notes::extract_notes;
use crate::package::Package;
use crate::paragraph::{parse_paragraph, Alignment, FontProps, Paragraph, Run, TextFormat};
use crate::section::{HeaderFooterKind, Section};
use crate::styles::StyleRegistry;
use crate::table::{BorderStyle, Table};
use crate::xml::{XmlElement, RELATIONSHIPS_NS, WORDML_NS};

const DOCUMENT_PART: &str = "word/document.xml";
const STYLES_PART: &str = "word/styles.xml";
const CORE_PART: &str = "docProps/core.xml";
const DOCUMENT_RELS_PART: &str = "word/_rels/document.xml.rels";

const CP_NS: &str = "http://schemas.openxmlformats.org/package/2006/metadata/core-properties";
const DC_NS: &str = "http://purl.org/dc/elements/1.1/";
const DCTERMS_NS: &str = "http://purl.org/dc/terms/";
const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Outcome of appending a paragraph. A style name that did not resolve is
/// reported here; the paragraph is still appended with the default style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendedParagraph {
    pub index: usize,
    pub style_fallback: Option<String>,
}

#[derive(Debug)]
pub struct Document {
    package: Package,
    pub body: Body,
    pub styles: StyleRegistry,
    path: Option<PathBuf>,
    /// Root attributes of the loaded `w:document` (namespace declarations).
    document_attrs: Vec<(String, String)>,
}

impl Document {
    pub fn open(path: &Path) -> Result<Self> {
        let package = Package::open(path)?;
        let mut doc = Document::from_package(package)?;
        doc.path = Some(path.to_path_buf());
        Ok(doc)
    }

    /// New in-memory document from a minimal package skeleton, with the
    /// heading styles materialized up front.
    pub fn create() -> Result<Self> {
        let package = Package::empty()?;
        let mut doc = Document::from_package(package)?;
        doc.styles.ensure_heading_styles();
        Ok(doc)
    }

    fn from_package(package: Package) -> Result<Self> {
        let document = package
            .xml(DOCUMENT_PART)?
            .ok_or_else(|| DocxError::NotFound(format!("package part '{DOCUMENT_PART}'")))?;
        let body_el = document.find("w:body").ok_or_else(|| {
            DocxError::StructuralCorruption("document part has no w:body".to_string())
        })?;
        let body = parse_body(body_el);
        let styles = match package.xml(STYLES_PART)? {
            Some(root) => StyleRegistry::parse(&root),
            None => StyleRegistry::default(),
        };
        Ok(Document {
            package,
            body,
            styles,
            path: None,
            document_attrs: document.attrs.clone(),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    // ── Persistence ──────────────────────────────────────────

    pub fn save(&mut self) -> Result<()> {
        let path = self.path.clone().ok_or_else(|| {
            DocxError::InvalidArgument(
                "document was created in memory; save_to requires an explicit path".to_string(),
            )
        })?;
        self.save_to(&path)
    }

    /// Serialize the modeled parts back into the package and write the whole
    /// package to `path`. The tree is validated first; a validation failure
    /// aborts before anything touches the disk.
    pub fn save_to(&mut self, path: &Path) -> Result<()> {
        self.validate()?;
        let document = self.document_xml();
        self.package
            .set_part(DOCUMENT_PART, document.to_part_xml().into_bytes());
        self.package
            .set_part(STYLES_PART, self.styles.to_xml().to_part_xml().into_bytes());
        self.package.save(path)?;
        self.path = Some(path.to_path_buf());
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if let Some(id) = self.styles.duplicate_id() {
            return Err(DocxError::StructuralCorruption(format!(
                "duplicate style id '{id}' in style registry"
            )));
        }
        Ok(())
    }

    fn document_xml(&self) -> XmlElement {
        let mut root = XmlElement::new("w:document");
        if self.document_attrs.is_empty() {
            root.set_attr("xmlns:w", WORDML_NS);
            root.set_attr("xmlns:r", RELATIONSHIPS_NS);
        } else {
            root.attrs = self.document_attrs.clone();
        }
        root.push_element(body_to_xml(&self.body));
        root
    }

    // ── Paragraph operations ─────────────────────────────────

    pub fn paragraph_text(&self, index: usize) -> Result<String> {
        self.body.paragraph_text(index)
    }

    /// Append a paragraph. An unresolved style name falls back to the default
    /// style and is reported in the result instead of failing the append.
    pub fn append_paragraph(
        &mut self,
        text: &str,
        style: Option<&str>,
        alignment: Option<Alignment>,
    ) -> AppendedParagraph {
        let mut style_fallback = None;
        let style_id = style.and_then(|name| match self.styles.by_name(name) {
            Some(s) => Some(s.style_id.clone()),
            None => {
                warn!("Style '{}' not found, paragraph added with default style", name);
                style_fallback = Some(name.to_string());
                None
            }
        });
        let mut para = Paragraph::new(text);
        para.style = style_id;
        para.alignment = alignment;
        let index = self.body.push_paragraph(para);
        info!("Appended paragraph at index {}", index);
        AppendedParagraph {
            index,
            style_fallback,
        }
    }

    /// Append a heading paragraph. Levels outside 1-9 are clamped; the
    /// heading styles are materialized on demand so the style reference
    /// always resolves.
    pub fn add_heading(&mut self, text: &str, level: u8, alignment: Option<Alignment>) -> usize {
        let level = level.clamp(1, 9);
        self.styles.ensure_heading_styles();
        let style_id = self
            .styles
            .by_name(&format!("Heading {level}"))
            .map(|s| s.style_id.clone());
        let mut para = Paragraph::new(text);
        para.style = style_id;
        para.alignment = alignment;
        info!("Added heading '{}' (level {})", text, level);
        self.body.push_paragraph(para)
    }

    /// Append an empty paragraph whose single run renders a page break.
    pub fn add_page_break(&mut self) -> usize {
        let mut para = Paragraph::default();
        para.runs.push(Run {
            page_break: true,
            ..Run::default()
        });
        self.body.push_paragraph(para)
    }

    pub fn format_range(
        &mut self,
        index: usize,
        start: usize,
        end: usize,
        format: &TextFormat,
    ) -> Result<String> {
        self.body.format_range(index, start, end, format)
    }

    pub fn find_text(&self, needle: &str, partial: bool) -> Vec<usize> {
        self.body.find_text(needle, partial)
    }

    pub fn replace_all(&mut self, old: &str, new: &str) -> Result<usize> {
        self.body.replace_all(old, new)
    }

    pub fn delete_paragraph(&mut self, index: usize) -> Result<()> {
        self.body.delete_paragraph(index)
    }

    pub fn set_alignment(&mut self, index: usize, alignment: &str) -> Result<()> {
        let alignment = Alignment::parse(alignment)?;
        self.body.set_alignment(index, alignment)
    }

    // ── Table operations ─────────────────────────────────────

    /// Append a `rows` × `cols` table, filled row-major from `data` up to the
    /// grid bounds. Uses the `Table Grid` style when the registry has it,
    /// otherwise the table is left borderless.
    pub fn add_table(&mut self, rows: usize, cols: usize, data: Option<&[Vec<String>]>) -> usize {
        let mut table = Table::new(rows, cols);
        table.style = self.styles.by_name("Table Grid").map(|s| s.style_id.clone());
        if let Some(data) = data {
            for (i, row) in data.iter().take(rows).enumerate() {
                for (j, text) in row.iter().take(cols).enumerate() {
                    if let Some(cell) = table.cell_mut(i, j) {
                        cell.set_text(text);
                    }
                }
            }
        }
        info!("Added {}x{} table", rows, cols);
        self.body.push_table(table)
    }

    pub fn table(&self, index: usize) -> Result<&Table> {
        let count = self.body.table_count();
        self.body
            .tables()
            .nth(index)
            .ok_or_else(|| table_error(index, count))
    }

    pub fn table_details(&self, index: usize) -> Result<Value> {
        self.table(index).map(|t| t.details(index, &self.styles))
    }

    /// Format the table at `index`: optional header-row bolding, borders on
    /// all four edges of every cell, per-cell shading fills.
    ///
    /// Header bolding touches existing runs only; a cell with no runs is left
    /// unchanged. Shading entries beyond the grid are ignored and colors that
    /// cannot be encoded are skipped, never failing the operation.
    pub fn format_table(
        &mut self,
        index: usize,
        header_row: bool,
        border_style: Option<&str>,
        shading: Option<&[Vec<String>]>,
    ) -> Result<()> {
        let count = self.body.table_count();
        let Some(table) = self.body.tables_mut().nth(index) else {
            return Err(table_error(index, count));
        };

        if header_row {
            table.bold_header_row();
        }
        if let Some(style) = border_style {
            table.apply_borders(BorderStyle::parse(style));
        }
        if let Some(fills) = shading {
            table.apply_shading(fills);
        }

        info!("Formatted table at index {}", index);
        Ok(())
    }

    // ── Sections, headers, footers ───────────────────────────

    fn section_fragments(&self) -> Vec<&XmlElement> {
        let mut fragments: Vec<&XmlElement> = self
            .body
            .paragraphs()
            .filter_map(|p| p.section_break.as_ref())
            .collect();
        if let Some(sect_pr) = &self.body.section {
            fragments.push(sect_pr);
        }
        fragments
    }

    pub fn section_count(&self) -> usize {
        self.section_fragments().len()
    }

    pub fn section(&self, index: usize) -> Result<Section<'_>> {
        let fragments = self.section_fragments();
        let count = fragments.len();
        fragments
            .into_iter()
            .nth(index)
            .map(|sect_pr| Section { sect_pr })
            .ok_or_else(|| {
                DocxError::NotFound(format!(
                    "section {index} (document has {count} sections)"
                ))
            })
    }

    pub fn section_geometry(&self, index: usize) -> Result<Value> {
        self.section(index).map(|s| s.geometry(index))
    }

    /// Header or footer content for one section. A section carrying no
    /// reference of the requested kind inherits from the previous section and
    /// reports only `linked_to_previous`.
    pub fn header_or_footer(&self, section_index: usize, kind: HeaderFooterKind) -> Result<Value> {
        let section = self.section(section_index)?;
        match section.reference(kind) {
            None => Ok(json!({ "linked_to_previous": true })),
            Some(rel_id) => self.header_footer_content(rel_id, kind),
        }
    }

    fn header_footer_content(&self, rel_id: &str, kind: HeaderFooterKind) -> Result<Value> {
        let target = self.relationship_target(rel_id)?.ok_or_else(|| {
            DocxError::PartialFeatureUnavailable(format!(
                "no relationship '{rel_id}' for {} content",
                kind.label()
            ))
        })?;
        // Rel targets are relative to word/; an absolute target names the
        // part from the package root.
        let part = match target.strip_prefix('/') {
            Some(stripped) => stripped.to_string(),
            None => format!("word/{target}"),
        };
        let root = self.package.xml(&part)?.ok_or_else(|| {
            DocxError::PartialFeatureUnavailable(format!(
                "{} part '{part}' is missing from the package",
                kind.label()
            ))
        })?;

        let paragraphs: Vec<Paragraph> = root.find_all("w:p").map(parse_paragraph).collect();
        let text = paragraphs
            .iter()
            .map(|p| p.text())
            .collect::<Vec<_>>()
            .join("\n");
        let formatted_runs: Vec<Value> = paragraphs
            .iter()
            .flat_map(|p| &p.runs)
            .filter(|run| !run.text.trim().is_empty())
            .map(|run| {
                json!({
                    "text": run.text,
                    "bold": run.props.bold,
                    "italic": run.props.italic,
                    "underline": run.props.underline,
                })
            })
            .collect();
        Ok(json!({
            "linked_to_previous": false,
            "text": text,
            "formatted_runs": formatted_runs,
        }))
    }

    fn relationship_target(&self, id: &str) -> Result<Option<String>> {
        let Some(root) = self.package.xml(DOCUMENT_RELS_PART)? else {
            return Ok(None);
        };
        let target = root
            .find_all("Relationship")
            .find(|rel| rel.attr("Id") == Some(id))
            .and_then(|rel| rel.attr("Target"))
            .map(str::to_string);
        Ok(target)
    }

    fn headers_and_footers(&self) -> Value {
        let mut headers = Vec::new();
        let mut footers = Vec::new();
        for (i, sect_pr) in self.section_fragments().iter().enumerate() {
            let section = Section { sect_pr };
            headers.push(json!({
                "section_index": i,
                "header": self.header_footer_value(&section, HeaderFooterKind::Header),
            }));
            footers.push(json!({
                "section_index": i,
                "footer": self.header_footer_value(&section, HeaderFooterKind::Footer),
            }));
        }
        json!({ "headers": headers, "footers": footers })
    }

    fn header_footer_value(&self, section: &Section<'_>, kind: HeaderFooterKind) -> Value {
        match section.reference(kind) {
            None => json!({ "linked_to_previous": true }),
            Some(rel_id) => self
                .header_footer_content(rel_id, kind)
                .unwrap_or_else(|err| {
                    json!({ "linked_to_previous": false, "error": err.to_string() })
                }),
        }
    }

    // ── Notes ────────────────────────────────────────────────

    pub fn extract_notes(&self) -> Value {
        extract_notes(&self.package)
    }

    // ── Styles ───────────────────────────────────────────────

    pub fn list_styles(&self) -> Value {
        self.styles.list()
    }

    // ── Whole-document reads ─────────────────────────────────

    /// All document text: body paragraphs first, then table cell paragraphs.
    /// The formatted variant wraps paragraphs and runs in markup tags
    /// describing style, alignment, and character formatting.
    pub fn extract_text(&self, formatted: bool) -> String {
        if !formatted {
            let mut lines: Vec<String> = self.body.paragraphs().map(|p| p.text()).collect();
            for table in self.body.tables() {
                for row in &table.rows {
                    for cell in row {
                        for para in &cell.paragraphs {
                            lines.push(para.text());
                        }
                    }
                }
            }
            return lines.join("\n");
        }

        let mut out = String::new();
        for para in self.body.paragraphs() {
            let style = self.styles.display_name(para.style.as_deref());
            let align = alignment_label(para.alignment);
            out.push_str(&format!("[PARAGRAPH style=\"{style}\" align=\"{align}\"]\n"));
            for run in &para.runs {
                let tags = run_format_tags(&run.props);
                if tags.is_empty() {
                    out.push_str(&run.text);
                } else {
                    out.push_str(&format!("[{tags}]{}[/]", run.text));
                }
            }
            out.push_str("\n[/PARAGRAPH]\n");
        }
        for table in self.body.tables() {
            out.push_str(&format!(
                "[TABLE rows={} cols={}]\n",
                table.row_count(),
                table.col_count()
            ));
            for row in &table.rows {
                out.push_str("[ROW]\n");
                for cell in row {
                    out.push_str("[CELL]");
                    for para in &cell.paragraphs {
                        for run in &para.runs {
                            if run.props.bold == Some(true) {
                                out.push_str(&format!("[bold]{}[/bold]", run.text));
                            } else if run.props.italic == Some(true) {
                                out.push_str(&format!("[italic]{}[/italic]", run.text));
                            } else {
                                out.push_str(&run.text);
                            }
                        }
                        out.push('\n');
                    }
                    out.push_str("[/CELL]\n");
                }
                out.push_str("[/ROW]\n");
            }
            out.push_str("[/TABLE]\n");
        }
        out
    }

    /// Structural outline: per-paragraph previews with formatting, plus table
    /// summaries (a 3×3 text preview, or the full detailed snapshot).
    pub fn structure(&self, detailed_tables: bool) -> Value {
        let mut paragraphs = Vec::new();
        for (i, para) in self.body.paragraphs().enumerate() {
            let mut info = json!({
                "index": i,
                "text": preview(&para.text(), 100),
                "style": self.styles.display_name(para.style.as_deref()),
                "alignment": alignment_label(para.alignment),
                "format": {
                    "indent_left": para.format.left_indent,
                    "indent_right": para.format.right_indent,
                    "indent_first_line": para.format.first_line_indent,
                    "space_before": para.format.space_before,
                    "space_after": para.format.space_after,
                    "line_spacing": para.format.line_spacing,
                },
            });
            if !para.runs.is_empty() {
                let runs: Vec<Value> = para
                    .runs
                    .iter()
                    .map(|run| {
                        json!({
                            "text": preview(&run.text, 50),
                            "bold": run.props.bold,
                            "italic": run.props.italic,
                            "underline": run.props.underline,
                            "font_size": run.props.size,
                            "font_name": run.props.name,
                            "highlight_color": run.props.highlight,
                            "color": run.props.color,
                        })
                    })
                    .collect();
                info["runs"] = Value::Array(runs);
            }
            paragraphs.push(info);
        }

        let mut tables = Vec::new();
        for (i, table) in self.body.tables().enumerate() {
            if detailed_tables {
                tables.push(table.details(i, &self.styles));
            } else {
                let mut rows = Vec::new();
                for row_idx in 0..table.row_count().min(3) {
                    let mut row_data = Vec::new();
                    for col_idx in 0..table.col_count().min(3) {
                        match table.cell(row_idx, col_idx) {
                            Some(cell) => row_data.push(json!(preview(&cell.text(), 20))),
                            None => row_data.push(json!("N/A")),
                        }
                    }
                    rows.push(Value::Array(row_data));
                }
                tables.push(json!({
                    "index": i,
                    "rows": table.row_count(),
                    "columns": table.col_count(),
                    "preview": rows,
                }));
            }
        }

        json!({ "paragraphs": paragraphs, "tables": tables })
    }

    /// Document summary: core properties, counts, and per-section geometry,
    /// with optional header/footer and notes blocks.
    pub fn document_info(&self, include_headers_footers: bool, include_notes: bool) -> Value {
        let mut info = self.core_properties();
        let word_count: usize = self
            .body
            .paragraphs()
            .map(|p| p.text().split_whitespace().count())
            .sum();
        info["page_count"] = json!(self.section_count());
        info["word_count"] = json!(word_count);
        info["paragraph_count"] = json!(self.body.paragraph_count());
        info["table_count"] = json!(self.body.table_count());
        let sections: Vec<Value> = self
            .section_fragments()
            .iter()
            .enumerate()
            .map(|(i, sect_pr)| Section { sect_pr }.geometry(i))
            .collect();
        info["sections"] = json!(sections);
        if include_headers_footers {
            info["headers_and_footers"] = self.headers_and_footers();
        }
        if include_notes {
            info["notes"] = self.extract_notes();
        }
        info
    }

    // ── Core properties ──────────────────────────────────────

    pub fn core_properties(&self) -> Value {
        let root = self.package.xml(CORE_PART).ok().flatten();
        let text = |name: &str| {
            root.as_ref()
                .and_then(|r| r.find(name))
                .map(|e| e.own_text())
                .unwrap_or_default()
        };
        let revision = text("cp:revision").parse::<i64>().unwrap_or(0);
        json!({
            "title": text("dc:title"),
            "author": text("dc:creator"),
            "subject": text("dc:subject"),
            "keywords": text("cp:keywords"),
            "created": text("dcterms:created"),
            "modified": text("dcterms:modified"),
            "last_modified_by": text("cp:lastModifiedBy"),
            "revision": revision,
        })
    }

    /// Update core properties in place. The part is rewritten immediately so
    /// the change survives a save regardless of which parts the model
    /// re-serializes.
    pub fn set_properties(
        &mut self,
        title: Option<&str>,
        subject: Option<&str>,
        author: Option<&str>,
    ) -> Result<()> {
        let mut root = match self.package.xml(CORE_PART)? {
            Some(root) => root,
            None => empty_core_properties(),
        };
        if let Some(title) = title {
            root.set_child_text("dc:title", title);
        }
        if let Some(subject) = subject {
            root.set_child_text("dc:subject", subject);
        }
        if let Some(author) = author {
            root.set_child_text("dc:creator", author);
        }
        self.package
            .set_part(CORE_PART, root.to_part_xml().into_bytes());
        info!("Updated core properties");
        Ok(())
    }
}

fn empty_core_properties() -> XmlElement {
    let mut root = XmlElement::new("cp:coreProperties");
    root.set_attr("xmlns:cp", CP_NS);
    root.set_attr("xmlns:dc", DC_NS);
    root.set_attr("xmlns:dcterms", DCTERMS_NS);
    root.set_attr("xmlns:xsi", XSI_NS);
    root
}

fn table_error(index: usize, count: usize) -> DocxError {
    DocxError::NotFound(format!(
        "table index {index} (document has {count} tables, 0-{})",
        count.saturating_sub(1)
    ))
}

fn alignment_label(alignment: Option<Alignment>) -> String {
    alignment
        .map(|a| a.as_str().to_ascii_uppercase())
        .unwrap_or_else(|| "LEFT".to_string())
}

fn run_format_tags(props: &FontProps) -> String {
    let mut parts = Vec::new();
    if props.bold == Some(true) {
        parts.push("bold".to_string());
    }
    if props.italic == Some(true) {
        parts.push("italic".to_string());
    }
    if props.underline == Some(true) {
        parts.push("underline".to_string());
    }
    if let Some(size) = props.size {
        parts.push(format!("size={size}pt"));
    }
    if let Some(name) = &props.name {
        parts.push(format!("font={name}"));
    }
    if let Some(color) = &props.color {
        parts.push(format!("color={color}"));
    }
    parts.join(" ")
}

fn preview(text: &str, limit: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() > limit {
        let mut out: String = chars[..limit].iter().collect();
        out.push_str("...");
        out
    } else {
        text.to_string()
    }
}

/// Explicit open-document registry: one handle per path, owned here.
/// Opening an already-registered path returns the live handle instead of
/// re-reading the file, so in-memory edits are never silently discarded.
#[derive(Debug, Default)]
pub struct DocumentRegistry {
    documents: HashMap<PathBuf, Document>,
}

impl DocumentRegistry {
    pub fn new() -> Self {
        DocumentRegistry::default()
    }

    pub fn open(&mut self, path: &Path) -> Result<&mut Document> {
        match self.documents.entry(path.to_path_buf()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let doc = Document::open(path)?;
                Ok(entry.insert(doc))
            }
        }
    }

    /// Register an existing handle (typically a created document) under a
    /// path, replacing any handle already open for it.
    pub fn insert(&mut self, path: &Path, document: Document) -> &mut Document {
        match self.documents.entry(path.to_path_buf()) {
            Entry::Occupied(mut entry) => {
                entry.insert(document);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(document),
        }
    }

    pub fn get(&self, path: &Path) -> Option<&Document> {
        self.documents.get(path)
    }

    pub fn get_mut(&mut self, path: &Path) -> Option<&mut Document> {
        self.documents.get_mut(path)
    }

    /// Drop the handle for `path`. Unsaved changes are discarded.
    pub fn close(&mut self, path: &Path) -> bool {
        self.documents.remove(path).is_some()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
