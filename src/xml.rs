//! Raw markup mutator: a generic, qualified-name element tree.
//!
//! Every part of the package is markup; the typed model (paragraphs, tables,
//! styles) is built on top of this tree and drops back down to it wherever
//! WordprocessingML has no typed property path (cell borders, shading,
//! section properties, core document properties). Parsing goes through
//! `roxmltree`; serialization is our own escaping writer so mutated trees can
//! be written back verbatim.

use crate::error::Result;

pub const WORDML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
pub const RELATIONSHIPS_NS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// The four cell edges a border descriptor can target, in markup order.
pub const CELL_EDGES: [&str; 4] = ["top", "left", "bottom", "right"];

#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

/// One element in a markup tree. Names keep their namespace prefix
/// (`w:tcBorders`, `dc:title`), which is how WordprocessingML fragments are
/// addressed throughout the crate.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlElement {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        XmlElement {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, replacing any existing value for the same name.
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|(k, _)| k == name) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((name.to_string(), value)),
        }
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|c| match c {
            XmlNode::Element(e) => Some(e),
            XmlNode::Text(_) => None,
        })
    }

    pub fn find(&self, name: &str) -> Option<&XmlElement> {
        self.child_elements().find(|e| e.name == name)
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut XmlElement> {
        self.children.iter_mut().find_map(|c| match c {
            XmlNode::Element(e) if e.name == name => Some(e),
            _ => None,
        })
    }

    pub fn find_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.child_elements().filter(move |e| e.name == name)
    }

    /// Locate the first child with `name`, creating and appending it when absent.
    pub fn get_or_add(&mut self, name: &str) -> &mut XmlElement {
        let pos = self
            .children
            .iter()
            .position(|c| matches!(c, XmlNode::Element(e) if e.name == name));
        let pos = match pos {
            Some(p) => p,
            None => {
                self.children.push(XmlNode::Element(XmlElement::new(name)));
                self.children.len() - 1
            }
        };
        match &mut self.children[pos] {
            XmlNode::Element(e) => e,
            XmlNode::Text(_) => unreachable!(),
        }
    }

    pub fn push_element(&mut self, child: XmlElement) {
        self.children.push(XmlNode::Element(child));
    }

    pub fn push_text(&mut self, text: impl Into<String>) {
        self.children.push(XmlNode::Text(text.into()));
    }

    pub fn remove_all(&mut self, name: &str) {
        self.children
            .retain(|c| !matches!(c, XmlNode::Element(e) if e.name == name));
    }

    /// Immediate text content of this element.
    pub fn own_text(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            if let XmlNode::Text(t) = child {
                out.push_str(t);
            }
        }
        out
    }

    /// Replace the text content of the first child named `name`, creating the
    /// child when absent.
    pub fn set_child_text(&mut self, name: &str, text: &str) {
        let child = self.get_or_add(name);
        child.children.retain(|c| matches!(c, XmlNode::Element(_)));
        child.push_text(text);
    }

    /// Concatenate the immediate text of every descendant named `tag`.
    pub fn gather_text(&self, tag: &str, out: &mut String) {
        for child in self.child_elements() {
            if child.name == tag {
                out.push_str(&child.own_text());
            } else {
                child.gather_text(tag, out);
            }
        }
    }

    pub fn write_into(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (name, value) in &self.attrs {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            escape_into(out, value, true);
            out.push('"');
        }
        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for child in &self.children {
            match child {
                XmlNode::Element(e) => e.write_into(out),
                XmlNode::Text(t) => escape_into(out, t, false),
            }
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }

    /// Serialize as a standalone package part, declaration included.
    pub fn to_part_xml(&self) -> String {
        let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\r\n");
        self.write_into(&mut out);
        out
    }
}

fn escape_into(out: &mut String, value: &str, attr: bool) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attr => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}

/// Parse one package part into an element tree. Namespace declarations in
/// scope at the root are re-attached as `xmlns` attributes so the returned
/// tree is self-contained and can be serialized back without the source text.
pub fn parse_part(xml: &str) -> Result<XmlElement> {
    let doc = roxmltree::Document::parse(xml)?;
    let root = doc.root_element();
    let mut el = element_from_node(root);
    for ns in root.namespaces() {
        let attr = match ns.name() {
            Some(prefix) => format!("xmlns:{prefix}"),
            None => "xmlns".to_string(),
        };
        if el.attr(&attr).is_none() {
            el.attrs.insert(0, (attr, ns.uri().to_string()));
        }
    }
    Ok(el)
}

fn qualify(node: &roxmltree::Node, namespace: Option<&str>, local: &str) -> String {
    match namespace {
        Some(XML_NS) => format!("xml:{local}"),
        Some(uri) => match node.lookup_prefix(uri) {
            Some(prefix) if !prefix.is_empty() => format!("{prefix}:{local}"),
            _ => local.to_string(),
        },
        None => local.to_string(),
    }
}

fn element_from_node(node: roxmltree::Node) -> XmlElement {
    let mut el = XmlElement::new(qualify(&node, node.tag_name().namespace(), node.tag_name().name()));
    for attr in node.attributes() {
        let name = qualify(&node, attr.namespace(), attr.name());
        el.attrs.push((name, attr.value().to_string()));
    }
    let has_child_elements = node.children().any(|c| c.is_element());
    for child in node.children() {
        if child.is_element() {
            el.push_element(element_from_node(child));
        } else if child.is_text() {
            if let Some(text) = child.text() {
                // Inter-element whitespace is formatting noise; leaf text
                // (w:t content) is payload and kept verbatim.
                if !has_child_elements || !text.trim().is_empty() {
                    el.push_text(text);
                }
            }
        }
    }
    el
}

// ── Cell property fragments ──────────────────────────────────

/// Build or replace a border descriptor for each requested edge of a cell's
/// `w:tcPr` container. Idempotent per edge: re-invoking replaces the previous
/// descriptor instead of duplicating it.
pub fn set_cell_border(tc_pr: &mut XmlElement, edges: &[&str], val: &str, size: u32, color: &str) {
    let borders = tc_pr.get_or_add("w:tcBorders");
    for edge in edges {
        let name = format!("w:{edge}");
        borders.remove_all(&name);
        let mut border = XmlElement::new(name);
        border.set_attr("w:val", val);
        border.set_attr("w:sz", size.to_string());
        border.set_attr("w:space", "0");
        border.set_attr("w:color", color);
        borders.push_element(border);
    }
}

/// Append a shading fill descriptor to a cell's `w:tcPr` container.
///
/// Prior fragments are not deduplicated: repeated calls accumulate, and
/// consumers that read the first matching descriptor keep seeing the original
/// fill. Preserved as-is; callers relying on the accumulation should not.
pub fn set_cell_shading(tc_pr: &mut XmlElement, fill: &str) {
    let mut shd = XmlElement::new("w:shd");
    shd.set_attr("w:val", "clear");
    shd.set_attr("w:color", "auto");
    shd.set_attr("w:fill", fill);
    tc_pr.push_element(shd);
}

/// First shading fill present in a `w:tcPr` container, if any.
pub fn cell_shading(tc_pr: &XmlElement) -> Option<&str> {
    tc_pr.find("w:shd").and_then(|shd| shd.attr("w:fill"))
}
