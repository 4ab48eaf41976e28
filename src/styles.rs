//! Style registry: typed style definitions with inheritance chains.
//!
//! Styles are keyed by display name (unique) and referenced from paragraphs
//! by style id. Creation is idempotent: requesting an existing name returns
//! the existing style untouched, whatever attributes were asked for.

use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

use crate::paragraph::{
    font_props_to_rpr, format_to_ppr_children, parse_p_pr_format, parse_run_props, Alignment,
    FontProps, ParagraphFormat, TextFormat,
};
use crate::xml::{XmlElement, WORDML_NS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StyleKind {
    Paragraph,
    Character,
    Table,
    Numbering,
    Other,
}

impl StyleKind {
    fn from_type_attr(value: Option<&str>) -> Self {
        match value {
            Some("paragraph") => StyleKind::Paragraph,
            Some("character") => StyleKind::Character,
            Some("table") => StyleKind::Table,
            Some("numbering") => StyleKind::Numbering,
            _ => StyleKind::Other,
        }
    }

    fn type_attr(&self) -> Option<&'static str> {
        match self {
            StyleKind::Paragraph => Some("paragraph"),
            StyleKind::Character => Some("character"),
            StyleKind::Table => Some("table"),
            StyleKind::Numbering => Some("numbering"),
            StyleKind::Other => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StyleKind::Paragraph => "paragraph",
            StyleKind::Character => "character",
            StyleKind::Table => "table",
            StyleKind::Numbering => "numbering",
            StyleKind::Other => "other",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Style {
    pub style_id: String,
    /// Display name, the unique registry key.
    pub name: String,
    pub kind: StyleKind,
    /// Base style id, when the style inherits.
    pub base: Option<String>,
    pub font: FontProps,
    pub alignment: Option<Alignment>,
    pub format: ParagraphFormat,
    /// Parse diagnostics for a malformed definition. The style is still
    /// listed; the error travels with it instead of aborting enumeration.
    pub error: Option<String>,
    /// Unrecognized definition children, preserved for round-trip.
    extras: Vec<XmlElement>,
}

impl Style {
    fn new(style_id: impl Into<String>, name: impl Into<String>, kind: StyleKind) -> Self {
        Style {
            style_id: style_id.into(),
            name: name.into(),
            kind,
            base: None,
            font: FontProps::default(),
            alignment: None,
            format: ParagraphFormat::default(),
            error: None,
            extras: Vec::new(),
        }
    }
}

#[derive(Debug, Default)]
pub struct StyleRegistry {
    pub styles: Vec<Style>,
    /// Root attributes of the loaded styles part (namespace declarations).
    root_attrs: Vec<(String, String)>,
    /// Non-style children of `w:styles` (docDefaults, latentStyles), in order.
    passthrough: Vec<XmlElement>,
}

impl StyleRegistry {
    pub fn by_id(&self, id: &str) -> Option<&Style> {
        self.styles.iter().find(|s| s.style_id == id)
    }

    /// Resolve a style by display name, falling back to a case-insensitive
    /// match on name or id.
    pub fn by_name(&self, name: &str) -> Option<&Style> {
        self.styles.iter().find(|s| s.name == name).or_else(|| {
            self.styles
                .iter()
                .find(|s| s.name.eq_ignore_ascii_case(name) || s.style_id.eq_ignore_ascii_case(name))
        })
    }

    /// Display name for a paragraph/table style reference; ids that no longer
    /// resolve are shown as-is, absent references as the default body style.
    pub fn display_name(&self, id: Option<&str>) -> String {
        match id {
            Some(id) => self
                .by_id(id)
                .map(|s| s.name.clone())
                .unwrap_or_else(|| id.to_string()),
            None => "Normal".to_string(),
        }
    }

    fn unique_id(&self, name: &str) -> String {
        let base: String = name.chars().filter(|c| !c.is_whitespace()).collect();
        let base = if base.is_empty() { "Style".to_string() } else { base };
        if self.by_id(&base).is_none() {
            return base;
        }
        let mut n = 1;
        loop {
            let candidate = format!("{base}{n}");
            if self.by_id(&candidate).is_none() {
                return candidate;
            }
            n += 1;
        }
    }

    /// Create a named style, or return the existing one unchanged. Callers
    /// that need different attributes must use a different name.
    ///
    /// A base name that does not resolve falls back to the default body
    /// style; color names outside the closed set are left unset.
    pub fn create_style(
        &mut self,
        name: &str,
        kind: StyleKind,
        base: Option<&str>,
        font: Option<&TextFormat>,
        alignment: Option<Alignment>,
        line_spacing: Option<f32>,
    ) -> &Style {
        if let Some(pos) = self.styles.iter().position(|s| s.name == name) {
            return &self.styles[pos];
        }
        let mut style = Style::new(self.unique_id(name), name, kind);
        if let Some(base_name) = base {
            style.base = self
                .by_name(base_name)
                .or_else(|| self.by_name("Normal"))
                .map(|s| s.style_id.clone());
        }
        if let Some(font) = font {
            style.font = font.to_font_props();
        }
        style.alignment = alignment;
        style.format.line_spacing = line_spacing;
        info!("Created style '{}' ({})", name, kind.as_str());
        self.styles.push(style);
        &self.styles[self.styles.len() - 1]
    }

    /// Materialize `Heading 1`..`Heading 9` paragraph styles so heading
    /// insertion never fails for lack of a style. Idempotent; an existing
    /// style of the same name is never touched.
    pub fn ensure_heading_styles(&mut self) {
        for level in 1..=9u8 {
            let name = format!("Heading {level}");
            if self.by_name(&name).is_some() {
                continue;
            }
            let size = match level {
                1 => 16.0,
                2 => 14.0,
                _ => 12.0,
            };
            let mut style = Style::new(self.unique_id(&name), name, StyleKind::Paragraph);
            style.base = self.by_name("Normal").map(|s| s.style_id.clone());
            style.font.bold = Some(true);
            style.font.size = Some(size);
            self.styles.push(style);
        }
    }

    /// Enumerate every style, partitioned by kind. A malformed style is
    /// listed under `other_styles` with its error description; one bad
    /// definition never aborts the enumeration.
    pub fn list(&self) -> Value {
        let mut paragraph = Vec::new();
        let mut character = Vec::new();
        let mut table = Vec::new();
        let mut numbering = Vec::new();
        let mut other = Vec::new();
        for style in &self.styles {
            if let Some(error) = &style.error {
                other.push(json!({ "name": style.name, "error": error }));
                continue;
            }
            let mut info = json!({
                "name": style.name,
                "style_id": style.style_id,
                "type": style.kind.as_str(),
            });
            // Numbering styles carry no usable base reference.
            info["base_style"] = if style.kind == StyleKind::Numbering {
                Value::Null
            } else {
                style
                    .base
                    .as_deref()
                    .and_then(|id| self.by_id(id))
                    .map(|base| json!(base.name))
                    .unwrap_or(Value::Null)
            };
            if !style.font.is_empty() {
                info["font"] = serde_json::to_value(&style.font).unwrap_or(Value::Null);
            }
            if !style.format.is_empty() || style.alignment.is_some() {
                let mut para = serde_json::Map::new();
                para.insert(
                    "alignment".to_string(),
                    json!(style.alignment.map(|a| a.as_str()).unwrap_or("left")),
                );
                if !style.format.is_empty() {
                    if let Value::Object(fields) =
                        serde_json::to_value(&style.format).unwrap_or(Value::Null)
                    {
                        para.extend(fields);
                    }
                }
                info["paragraph_format"] = Value::Object(para);
            }
            match style.kind {
                StyleKind::Paragraph => paragraph.push(info),
                StyleKind::Character => character.push(info),
                StyleKind::Table => table.push(info),
                StyleKind::Numbering => numbering.push(info),
                StyleKind::Other => other.push(info),
            }
        }
        json!({
            "paragraph_styles": paragraph,
            "character_styles": character,
            "table_styles": table,
            "numbering_styles": numbering,
            "other_styles": other,
        })
    }

    // ── Markup binding ───────────────────────────────────────

    pub(crate) fn parse(el: &XmlElement) -> Self {
        let mut registry = StyleRegistry {
            root_attrs: el.attrs.clone(),
            ..StyleRegistry::default()
        };
        for child in el.child_elements() {
            if child.name == "w:style" {
                registry.styles.push(parse_style(child));
            } else {
                registry.passthrough.push(child.clone());
            }
        }
        registry
    }

    pub(crate) fn to_xml(&self) -> XmlElement {
        let mut root = XmlElement::new("w:styles");
        if self.root_attrs.is_empty() {
            root.set_attr("xmlns:w", WORDML_NS);
        } else {
            root.attrs = self.root_attrs.clone();
        }
        for el in &self.passthrough {
            root.push_element(el.clone());
        }
        for style in &self.styles {
            root.push_element(style_to_xml(style));
        }
        root
    }

    pub(crate) fn duplicate_id(&self) -> Option<&str> {
        for (i, style) in self.styles.iter().enumerate() {
            if self.styles[..i].iter().any(|s| s.style_id == style.style_id) {
                return Some(&style.style_id);
            }
        }
        None
    }
}

fn parse_style(el: &XmlElement) -> Style {
    let kind = StyleKind::from_type_attr(el.attr("w:type"));
    let style_id = el.attr("w:styleId").map(str::to_string);
    let name = el
        .find("w:name")
        .and_then(|n| n.attr("w:val"))
        .map(str::to_string);

    let mut error = None;
    if style_id.is_none() {
        error = Some("style definition has no w:styleId".to_string());
    } else if name.is_none() {
        error = Some("style definition has no w:name".to_string());
    }
    let style_id = style_id.unwrap_or_default();
    let name = name.unwrap_or_else(|| style_id.clone());

    let mut style = Style::new(style_id, name, kind);
    style.error = error;
    style.base = el
        .find("w:basedOn")
        .and_then(|b| b.attr("w:val"))
        .map(str::to_string);

    for child in el.child_elements() {
        match child.name.as_str() {
            "w:name" | "w:basedOn" => {}
            "w:rPr" => style.font = parse_run_props(child),
            "w:pPr" => {
                let (alignment, format) = parse_p_pr_format(child);
                style.alignment = alignment;
                style.format = format;
            }
            _ => style.extras.push(child.clone()),
        }
    }
    style
}

fn style_to_xml(style: &Style) -> XmlElement {
    let mut el = XmlElement::new("w:style");
    if let Some(type_attr) = style.kind.type_attr() {
        el.set_attr("w:type", type_attr);
    }
    el.set_attr("w:styleId", style.style_id.clone());
    let mut name = XmlElement::new("w:name");
    name.set_attr("w:val", style.name.clone());
    el.push_element(name);
    if let Some(base) = &style.base {
        let mut based_on = XmlElement::new("w:basedOn");
        based_on.set_attr("w:val", base.clone());
        el.push_element(based_on);
    }
    for extra in &style.extras {
        el.push_element(extra.clone());
    }
    let mut p_pr = XmlElement::new("w:pPr");
    format_to_ppr_children(&style.format, &mut p_pr);
    if let Some(alignment) = style.alignment {
        let mut jc = XmlElement::new("w:jc");
        jc.set_attr("w:val", alignment.jc_val());
        p_pr.push_element(jc);
    }
    if !p_pr.children.is_empty() {
        el.push_element(p_pr);
    }
    if let Some(r_pr) = font_props_to_rpr(&style.font) {
        el.push_element(r_pr);
    }
    el
}
