//! Table model: a fixed row × column grid of cells.
//!
//! Each cell is its own block container (paragraphs and runs) plus a raw
//! `w:tcPr` property container, which is where border and shading fragments
//! live. The typed model has no path to them, so the raw markup mutator in
//! [`crate::xml`] operates on it directly. Unknown `w:tcPr` children
//! round-trip untouched.

use serde_json::{json, Value};
use tracing::warn;

use crate::paragraph::{encode_fill, parse_paragraph, paragraph_to_xml, Alignment, Paragraph};
use crate::styles::StyleRegistry;
use crate::xml::{self, XmlElement};

#[derive(Debug, Clone)]
pub struct Cell {
    pub paragraphs: Vec<Paragraph>,
    /// Raw `w:tcPr` property container.
    pub props: XmlElement,
}

impl Default for Cell {
    fn default() -> Self {
        Cell {
            // A cell always holds at least one block.
            paragraphs: vec![Paragraph::default()],
            props: XmlElement::new("w:tcPr"),
        }
    }
}

impl Cell {
    pub fn text(&self) -> String {
        self.paragraphs
            .iter()
            .map(|p| p.text())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn set_text(&mut self, text: &str) {
        self.paragraphs = vec![Paragraph::new(text)];
    }
}

#[derive(Debug, Clone)]
pub struct Table {
    /// Table style id reference.
    pub style: Option<String>,
    pub alignment: Option<Alignment>,
    pub rows: Vec<Vec<Cell>>,
    cols: usize,
}

impl Table {
    /// Allocate a `rows` × `cols` grid of empty cells. Cardinality is fixed
    /// for the table's lifetime.
    pub fn new(rows: usize, cols: usize) -> Self {
        Table {
            style: None,
            alignment: None,
            rows: (0..rows)
                .map(|_| (0..cols).map(|_| Cell::default()).collect())
                .collect(),
            cols,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn col_count(&self) -> usize {
        self.cols
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    pub fn cell_mut(&mut self, row: usize, col: usize) -> Option<&mut Cell> {
        self.rows.get_mut(row).and_then(|r| r.get_mut(col))
    }

    /// Bold every run in the first row. Cells without runs are left alone;
    /// no runs are created.
    pub fn bold_header_row(&mut self) {
        if let Some(first_row) = self.rows.first_mut() {
            for cell in first_row {
                for para in &mut cell.paragraphs {
                    for run in &mut para.runs {
                        run.props.bold = Some(true);
                    }
                }
            }
        }
    }

    /// Apply one border style to all four edges of every cell, black,
    /// replacing any previous descriptors.
    pub fn apply_borders(&mut self, style: BorderStyle) {
        for row in &mut self.rows {
            for cell in row {
                xml::set_cell_border(
                    &mut cell.props,
                    &xml::CELL_EDGES,
                    style.val(),
                    style.weight(),
                    "000000",
                );
            }
        }
    }

    /// Inject shading fills row-major. Entries beyond the grid are ignored
    /// and colors that cannot be encoded are skipped.
    pub fn apply_shading(&mut self, fills: &[Vec<String>]) {
        for (i, row_colors) in fills.iter().enumerate() {
            if i >= self.row_count() {
                break;
            }
            for (j, color) in row_colors.iter().enumerate() {
                let Some(cell) = self.cell_mut(i, j) else {
                    break;
                };
                if let Some(fill) = encode_fill(color) {
                    xml::set_cell_shading(&mut cell.props, &fill);
                }
            }
        }
    }

    /// Full read-only snapshot for diagnostics: per-cell text, borders,
    /// shading, and per-paragraph/per-run formatting.
    pub fn details(&self, index: usize, styles: &StyleRegistry) -> Value {
        let mut cell_rows = Vec::new();
        for (i, row) in self.rows.iter().enumerate() {
            let mut row_cells = Vec::new();
            for (j, cell) in row.iter().enumerate() {
                row_cells.push(cell_details(cell, i, j, styles));
            }
            cell_rows.push(Value::Array(row_cells));
        }
        json!({
            "index": index,
            "rows": self.row_count(),
            "columns": self.col_count(),
            "style": self.style.as_deref().map(|id| styles.display_name(Some(id))).unwrap_or_else(|| "None".to_string()),
            "alignment": self.alignment.map(|a| a.as_str()).unwrap_or("left"),
            "cells": cell_rows,
        })
    }
}

fn cell_details(cell: &Cell, row: usize, col: usize, styles: &StyleRegistry) -> Value {
    let mut info = json!({
        "row": row,
        "column": col,
        "text": cell.text(),
    });
    if let Some(borders) = cell.props.find("w:tcBorders") {
        let mut edges = serde_json::Map::new();
        for edge in xml::CELL_EDGES {
            if let Some(border) = borders.find(&format!("w:{edge}")) {
                edges.insert(
                    edge.to_string(),
                    json!({
                        "val": border.attr("w:val"),
                        "color": border.attr("w:color"),
                        "size": border.attr("w:sz"),
                    }),
                );
            }
        }
        if !edges.is_empty() {
            info["borders"] = Value::Object(edges);
        }
    }
    if let Some(fill) = xml::cell_shading(&cell.props) {
        info["shading"] = json!(fill);
    }
    let mut paragraphs = Vec::new();
    for para in &cell.paragraphs {
        let runs: Vec<Value> = para
            .runs
            .iter()
            .map(|run| {
                let mut run_info = json!({
                    "text": run.text,
                    "bold": run.props.bold,
                    "italic": run.props.italic,
                    "underline": run.props.underline,
                });
                if let Some(size) = run.props.size {
                    run_info["font_size"] = json!(size);
                }
                run_info
            })
            .collect();
        paragraphs.push(json!({
            "text": para.text(),
            "style": styles.display_name(para.style.as_deref()),
            "alignment": para.alignment.map(|a| a.as_str()).unwrap_or("left"),
            "runs": runs,
        }));
    }
    info["paragraphs"] = Value::Array(paragraphs);
    info
}

/// Closed border-style set for table formatting. Unknown values fall back to
/// `Single`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorderStyle {
    None,
    Single,
    Double,
    Thick,
}

impl BorderStyle {
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "none" => BorderStyle::None,
            "single" => BorderStyle::Single,
            "double" => BorderStyle::Double,
            "thick" => BorderStyle::Thick,
            other => {
                warn!("Unknown border style '{}', falling back to single", other);
                BorderStyle::Single
            }
        }
    }

    /// `w:val` border descriptor value.
    pub fn val(&self) -> &'static str {
        match self {
            BorderStyle::None => "nil",
            BorderStyle::Single => "single",
            BorderStyle::Double => "double",
            BorderStyle::Thick => "thick",
        }
    }

    /// Markup weight (`w:sz`, eighths of a point).
    pub fn weight(&self) -> u32 {
        match self {
            BorderStyle::Thick => 12,
            _ => 4,
        }
    }
}

// ── Markup binding ───────────────────────────────────────────

pub(crate) fn parse_table(el: &XmlElement) -> Table {
    let mut table = Table::new(0, 0);
    if let Some(tbl_pr) = el.find("w:tblPr") {
        table.style = tbl_pr
            .find("w:tblStyle")
            .and_then(|s| s.attr("w:val"))
            .map(str::to_string);
        table.alignment = tbl_pr
            .find("w:jc")
            .and_then(|jc| jc.attr("w:val"))
            .and_then(Alignment::from_jc);
    }
    let grid_cols = el
        .find("w:tblGrid")
        .map(|grid| grid.find_all("w:gridCol").count())
        .unwrap_or(0);
    for tr in el.find_all("w:tr") {
        let mut row = Vec::new();
        for tc in tr.find_all("w:tc") {
            let mut cell = Cell {
                paragraphs: Vec::new(),
                props: tc
                    .find("w:tcPr")
                    .cloned()
                    .unwrap_or_else(|| XmlElement::new("w:tcPr")),
            };
            for child in tc.child_elements() {
                if child.name == "w:p" {
                    cell.paragraphs.push(parse_paragraph(child));
                }
            }
            if cell.paragraphs.is_empty() {
                cell.paragraphs.push(Paragraph::default());
            }
            row.push(cell);
        }
        table.rows.push(row);
    }
    table.cols = grid_cols.max(table.rows.iter().map(Vec::len).max().unwrap_or(0));
    table
}

pub(crate) fn table_to_xml(table: &Table) -> XmlElement {
    let mut el = XmlElement::new("w:tbl");

    let mut tbl_pr = XmlElement::new("w:tblPr");
    if let Some(style) = &table.style {
        let mut tbl_style = XmlElement::new("w:tblStyle");
        tbl_style.set_attr("w:val", style.clone());
        tbl_pr.push_element(tbl_style);
    }
    let mut tbl_w = XmlElement::new("w:tblW");
    tbl_w.set_attr("w:w", "0");
    tbl_w.set_attr("w:type", "auto");
    tbl_pr.push_element(tbl_w);
    if let Some(alignment) = table.alignment {
        let mut jc = XmlElement::new("w:jc");
        jc.set_attr("w:val", alignment.jc_val());
        tbl_pr.push_element(jc);
    }
    el.push_element(tbl_pr);

    let mut grid = XmlElement::new("w:tblGrid");
    for _ in 0..table.cols {
        grid.push_element(XmlElement::new("w:gridCol"));
    }
    el.push_element(grid);

    for row in &table.rows {
        let mut tr = XmlElement::new("w:tr");
        for cell in row {
            let mut tc = XmlElement::new("w:tc");
            if !cell.props.children.is_empty() || !cell.props.attrs.is_empty() {
                tc.push_element(cell.props.clone());
            }
            if cell.paragraphs.is_empty() {
                tc.push_element(XmlElement::new("w:p"));
            }
            for para in &cell.paragraphs {
                tc.push_element(paragraph_to_xml(para));
            }
            tr.push_element(tc);
        }
        el.push_element(tr);
    }
    el
}
