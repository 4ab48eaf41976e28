//! Paragraphs, runs, and their formatting types.
//!
//! A paragraph owns an ordered run sequence; concatenating the run texts in
//! order always equals the paragraph text. Range formatting preserves that
//! invariant by rebuilding the run sequence around the target span.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{DocxError, Result};
use crate::xml::XmlElement;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    Center,
    Right,
    Justify,
}

impl Alignment {
    /// Parse a caller-supplied alignment name. The set is closed; anything
    /// else is an `InvalidArgument`.
    pub fn parse(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "left" => Ok(Alignment::Left),
            "center" => Ok(Alignment::Center),
            "right" => Ok(Alignment::Right),
            "justify" => Ok(Alignment::Justify),
            other => Err(DocxError::InvalidArgument(format!(
                "unsupported alignment '{other}' (supported: left, center, right, justify)"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
            Alignment::Justify => "justify",
        }
    }

    /// `w:jc` attribute value.
    pub(crate) fn jc_val(&self) -> &'static str {
        match self {
            Alignment::Justify => "both",
            other => other.as_str(),
        }
    }

    pub(crate) fn from_jc(val: &str) -> Option<Self> {
        match val {
            "left" | "start" => Some(Alignment::Left),
            "center" => Some(Alignment::Center),
            "right" | "end" => Some(Alignment::Right),
            "both" | "justify" | "distribute" => Some(Alignment::Justify),
            _ => None,
        }
    }
}

/// Closed color-name set shared by run formatting and style creation.
/// Unknown names are not an error; call sites leave the attribute unset.
pub fn named_color(name: &str) -> Option<&'static str> {
    match name.to_ascii_lowercase().as_str() {
        "red" => Some("FF0000"),
        "blue" => Some("0000FF"),
        "green" => Some("008000"),
        "yellow" => Some("FFFF00"),
        "black" => Some("000000"),
        "white" => Some("FFFFFF"),
        _ => None,
    }
}

/// Resolve a caller-supplied fill color to a `RRGGBB` value: a known color
/// name or a literal six-digit hex triple. `None` means not encodable.
pub(crate) fn encode_fill(value: &str) -> Option<String> {
    if let Some(rgb) = named_color(value) {
        return Some(rgb.to_string());
    }
    let hex = value.strip_prefix('#').unwrap_or(value);
    if hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Some(hex.to_ascii_uppercase());
    }
    None
}

/// Indents and spacing in twips; line spacing as a multiple of single.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParagraphFormat {
    pub left_indent: Option<i64>,
    pub right_indent: Option<i64>,
    pub first_line_indent: Option<i64>,
    pub space_before: Option<i64>,
    pub space_after: Option<i64>,
    pub line_spacing: Option<f32>,
}

impl ParagraphFormat {
    pub fn is_empty(&self) -> bool {
        *self == ParagraphFormat::default()
    }
}

/// Direct character formatting. `None` on the tri-state flags means
/// "inherit from the style chain".
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FontProps {
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
    pub name: Option<String>,
    /// Size in points.
    pub size: Option<f32>,
    /// `RRGGBB`.
    pub color: Option<String>,
    pub highlight: Option<String>,
}

impl FontProps {
    pub fn is_empty(&self) -> bool {
        *self == FontProps::default()
    }
}

/// Formatting attributes accepted by range formatting and style creation.
/// Colors are names from the closed set; unrecognized names are ignored
/// rather than failing the whole operation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TextFormat {
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
    pub color: Option<String>,
    pub font_size: Option<f32>,
    pub font_name: Option<String>,
}

impl TextFormat {
    pub(crate) fn to_font_props(&self) -> FontProps {
        let color = self.color.as_deref().and_then(|name| {
            let rgb = named_color(name);
            if rgb.is_none() {
                warn!("Unrecognized color name '{}', leaving color unset", name);
            }
            rgb.map(str::to_string)
        });
        FontProps {
            bold: self.bold,
            italic: self.italic,
            underline: self.underline,
            name: self.font_name.clone(),
            size: self.font_size,
            color,
            highlight: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Run {
    pub text: String,
    pub props: FontProps,
    /// Renders a page break before the run text.
    pub page_break: bool,
}

impl Run {
    pub fn new(text: impl Into<String>) -> Self {
        Run {
            text: text.into(),
            ..Run::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Paragraph {
    /// Style id reference (`w:pStyle`), resolved against the style registry.
    pub style: Option<String>,
    pub alignment: Option<Alignment>,
    pub format: ParagraphFormat,
    pub runs: Vec<Run>,
    /// Trailing section properties (a section break). Preserved verbatim.
    pub section_break: Option<XmlElement>,
}

impl Paragraph {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        Paragraph {
            runs: if text.is_empty() { Vec::new() } else { vec![Run::new(text)] },
            ..Paragraph::default()
        }
    }

    /// Full paragraph text: the in-order concatenation of run texts.
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }

    /// Replace the run sequence with up to three runs so that only the
    /// character range `[start, end)` carries `format`. Offsets are in
    /// characters. Concatenated text is unchanged.
    pub fn format_range(&mut self, start: usize, end: usize, format: &TextFormat) -> Result<String> {
        let chars: Vec<char> = self.text().chars().collect();
        if start >= end || end > chars.len() {
            return Err(DocxError::InvalidRange(format!(
                "positions {start}..{end} out of bounds for paragraph of {} characters",
                chars.len()
            )));
        }
        let before: String = chars[..start].iter().collect();
        let target: String = chars[start..end].iter().collect();
        let after: String = chars[end..].iter().collect();

        self.runs.clear();
        if !before.is_empty() {
            self.runs.push(Run::new(before));
        }
        self.runs.push(Run {
            text: target.clone(),
            props: format.to_font_props(),
            page_break: false,
        });
        if !after.is_empty() {
            self.runs.push(Run::new(after));
        }
        Ok(target)
    }
}

// ── Markup binding ───────────────────────────────────────────

fn on_off(el: Option<&XmlElement>) -> Option<bool> {
    let el = el?;
    match el.attr("w:val") {
        Some("0") | Some("false") | Some("none") => Some(false),
        _ => Some(true),
    }
}

fn int_attr(el: Option<&XmlElement>, names: &[&str]) -> Option<i64> {
    let el = el?;
    names
        .iter()
        .find_map(|n| el.attr(n))
        .and_then(|v| v.parse().ok())
}

/// Alignment and paragraph-format block of a `w:pPr` (shared with style
/// definitions, which use the same container).
pub(crate) fn parse_p_pr_format(p_pr: &XmlElement) -> (Option<Alignment>, ParagraphFormat) {
    let alignment = p_pr
        .find("w:jc")
        .and_then(|jc| jc.attr("w:val"))
        .and_then(Alignment::from_jc);
    let mut format = ParagraphFormat::default();
    let ind = p_pr.find("w:ind");
    format.left_indent = int_attr(ind, &["w:left", "w:start"]);
    format.right_indent = int_attr(ind, &["w:right", "w:end"]);
    format.first_line_indent = int_attr(ind, &["w:firstLine"]);
    let spacing = p_pr.find("w:spacing");
    format.space_before = int_attr(spacing, &["w:before"]);
    format.space_after = int_attr(spacing, &["w:after"]);
    format.line_spacing = spacing.and_then(|s| {
        // Only the auto rule maps onto a plain multiple.
        match s.attr("w:lineRule") {
            Some("auto") | None => s
                .attr("w:line")
                .and_then(|v| v.parse::<f32>().ok())
                .map(|v| v / 240.0),
            _ => None,
        }
    });
    (alignment, format)
}

/// Character formatting of a `w:rPr` (shared with style definitions).
pub(crate) fn parse_run_props(r_pr: &XmlElement) -> FontProps {
    FontProps {
        bold: on_off(r_pr.find("w:b")),
        italic: on_off(r_pr.find("w:i")),
        underline: r_pr.find("w:u").map(|u| u.attr("w:val") != Some("none")),
        name: r_pr
            .find("w:rFonts")
            .and_then(|f| f.attr("w:ascii"))
            .map(str::to_string),
        size: r_pr
            .find("w:sz")
            .and_then(|s| s.attr("w:val"))
            .and_then(|v| v.parse::<f32>().ok())
            .map(|half_points| half_points / 2.0),
        color: r_pr
            .find("w:color")
            .and_then(|c| c.attr("w:val"))
            .filter(|v| *v != "auto")
            .map(str::to_string),
        highlight: r_pr
            .find("w:highlight")
            .and_then(|h| h.attr("w:val"))
            .map(str::to_string),
    }
}

pub(crate) fn parse_paragraph(el: &XmlElement) -> Paragraph {
    let mut para = Paragraph::default();
    if let Some(p_pr) = el.find("w:pPr") {
        para.style = p_pr
            .find("w:pStyle")
            .and_then(|s| s.attr("w:val"))
            .map(str::to_string);
        let (alignment, format) = parse_p_pr_format(p_pr);
        para.alignment = alignment;
        para.format = format;
        para.section_break = p_pr.find("w:sectPr").cloned();
    }
    for child in el.child_elements() {
        if child.name == "w:r" {
            para.runs.push(parse_run(child));
        }
    }
    para
}

fn parse_run(el: &XmlElement) -> Run {
    let mut run = Run::default();
    if let Some(r_pr) = el.find("w:rPr") {
        run.props = parse_run_props(r_pr);
    }
    for child in el.child_elements() {
        match child.name.as_str() {
            "w:t" => run.text.push_str(&child.own_text()),
            "w:br" if child.attr("w:type") == Some("page") => run.page_break = true,
            "w:tab" => run.text.push('\t'),
            _ => {}
        }
    }
    run
}

pub(crate) fn font_props_to_rpr(props: &FontProps) -> Option<XmlElement> {
    if props.is_empty() {
        return None;
    }
    let mut r_pr = XmlElement::new("w:rPr");
    if let Some(name) = &props.name {
        let mut fonts = XmlElement::new("w:rFonts");
        fonts.set_attr("w:ascii", name.clone());
        fonts.set_attr("w:hAnsi", name.clone());
        r_pr.push_element(fonts);
    }
    if let Some(bold) = props.bold {
        let mut b = XmlElement::new("w:b");
        if !bold {
            b.set_attr("w:val", "0");
        }
        r_pr.push_element(b);
    }
    if let Some(italic) = props.italic {
        let mut i = XmlElement::new("w:i");
        if !italic {
            i.set_attr("w:val", "0");
        }
        r_pr.push_element(i);
    }
    if let Some(underline) = props.underline {
        let mut u = XmlElement::new("w:u");
        u.set_attr("w:val", if underline { "single" } else { "none" });
        r_pr.push_element(u);
    }
    if let Some(color) = &props.color {
        let mut c = XmlElement::new("w:color");
        c.set_attr("w:val", color.clone());
        r_pr.push_element(c);
    }
    if let Some(size) = props.size {
        let mut sz = XmlElement::new("w:sz");
        sz.set_attr("w:val", ((size * 2.0).round() as i64).to_string());
        r_pr.push_element(sz);
    }
    if let Some(highlight) = &props.highlight {
        let mut h = XmlElement::new("w:highlight");
        h.set_attr("w:val", highlight.clone());
        r_pr.push_element(h);
    }
    Some(r_pr)
}

pub(crate) fn format_to_ppr_children(format: &ParagraphFormat, p_pr: &mut XmlElement) {
    if format.space_before.is_some() || format.space_after.is_some() || format.line_spacing.is_some()
    {
        let mut spacing = XmlElement::new("w:spacing");
        if let Some(before) = format.space_before {
            spacing.set_attr("w:before", before.to_string());
        }
        if let Some(after) = format.space_after {
            spacing.set_attr("w:after", after.to_string());
        }
        if let Some(line) = format.line_spacing {
            spacing.set_attr("w:line", ((line * 240.0).round() as i64).to_string());
            spacing.set_attr("w:lineRule", "auto");
        }
        p_pr.push_element(spacing);
    }
    if format.left_indent.is_some()
        || format.right_indent.is_some()
        || format.first_line_indent.is_some()
    {
        let mut ind = XmlElement::new("w:ind");
        if let Some(left) = format.left_indent {
            ind.set_attr("w:left", left.to_string());
        }
        if let Some(right) = format.right_indent {
            ind.set_attr("w:right", right.to_string());
        }
        if let Some(first) = format.first_line_indent {
            ind.set_attr("w:firstLine", first.to_string());
        }
        p_pr.push_element(ind);
    }
}

fn run_to_xml(run: &Run) -> XmlElement {
    let mut el = XmlElement::new("w:r");
    if let Some(r_pr) = font_props_to_rpr(&run.props) {
        el.push_element(r_pr);
    }
    if run.page_break {
        let mut br = XmlElement::new("w:br");
        br.set_attr("w:type", "page");
        el.push_element(br);
    }
    // Tab characters came in as w:tab elements and go back out the same way.
    for (i, segment) in run.text.split('\t').enumerate() {
        if i > 0 {
            el.push_element(XmlElement::new("w:tab"));
        }
        if !segment.is_empty() {
            let mut t = XmlElement::new("w:t");
            if segment != segment.trim() {
                t.set_attr("xml:space", "preserve");
            }
            t.push_text(segment);
            el.push_element(t);
        }
    }
    el
}

pub(crate) fn paragraph_to_xml(para: &Paragraph) -> XmlElement {
    let mut el = XmlElement::new("w:p");
    let mut p_pr = XmlElement::new("w:pPr");
    if let Some(style) = &para.style {
        let mut p_style = XmlElement::new("w:pStyle");
        p_style.set_attr("w:val", style.clone());
        p_pr.push_element(p_style);
    }
    format_to_ppr_children(&para.format, &mut p_pr);
    if let Some(alignment) = para.alignment {
        let mut jc = XmlElement::new("w:jc");
        jc.set_attr("w:val", alignment.jc_val());
        p_pr.push_element(jc);
    }
    if let Some(sect_pr) = &para.section_break {
        p_pr.push_element(sect_pr.clone());
    }
    if !p_pr.children.is_empty() {
        el.push_element(p_pr);
    }
    for run in &para.runs {
        el.push_element(run_to_xml(run));
    }
    el
}
