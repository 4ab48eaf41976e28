//! Block container: the ordered paragraph/table sequence of a document body.
//!
//! Paragraph indices address top-level paragraphs only (table cell content
//! has its own containers) and are ephemeral across deletions: removing a
//! paragraph shifts every subsequent index down by one.

use tracing::info;

use crate::error::{DocxError, Result};
use crate::paragraph::{parse_paragraph, paragraph_to_xml, Alignment, Paragraph, TextFormat};
use crate::table::{parse_table, table_to_xml, Table};
use crate::xml::XmlElement;

#[derive(Debug)]
pub enum Block {
    Paragraph(Paragraph),
    Table(Table),
}

#[derive(Debug, Default)]
pub struct Body {
    pub blocks: Vec<Block>,
    /// Trailing body-level `w:sectPr`, preserved verbatim.
    pub section: Option<XmlElement>,
}

impl Body {
    pub fn paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Paragraph(p) => Some(p),
            Block::Table(_) => None,
        })
    }

    pub fn paragraphs_mut(&mut self) -> impl Iterator<Item = &mut Paragraph> {
        self.blocks.iter_mut().filter_map(|b| match b {
            Block::Paragraph(p) => Some(p),
            Block::Table(_) => None,
        })
    }

    pub fn paragraph_count(&self) -> usize {
        self.paragraphs().count()
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Table(t) => Some(t),
            Block::Paragraph(_) => None,
        })
    }

    pub fn tables_mut(&mut self) -> impl Iterator<Item = &mut Table> {
        self.blocks.iter_mut().filter_map(|b| match b {
            Block::Table(t) => Some(t),
            Block::Paragraph(_) => None,
        })
    }

    pub fn table_count(&self) -> usize {
        self.tables().count()
    }

    pub fn paragraph(&self, index: usize) -> Result<&Paragraph> {
        let count = self.paragraph_count();
        self.paragraphs()
            .nth(index)
            .ok_or_else(|| index_error(index, count))
    }

    pub fn paragraph_mut(&mut self, index: usize) -> Result<&mut Paragraph> {
        let count = self.paragraph_count();
        self.paragraphs_mut()
            .nth(index)
            .ok_or_else(|| index_error(index, count))
    }

    pub fn paragraph_text(&self, index: usize) -> Result<String> {
        self.paragraph(index).map(|p| p.text())
    }

    pub fn push_paragraph(&mut self, paragraph: Paragraph) -> usize {
        self.blocks.push(Block::Paragraph(paragraph));
        self.paragraph_count() - 1
    }

    pub fn push_table(&mut self, table: Table) -> usize {
        self.blocks.push(Block::Table(table));
        self.table_count() - 1
    }

    /// Split the paragraph at `index` so that only `[start, end)` carries
    /// `format`. Offsets are in characters.
    pub fn format_range(
        &mut self,
        index: usize,
        start: usize,
        end: usize,
        format: &TextFormat,
    ) -> Result<String> {
        self.paragraph_mut(index)?.format_range(start, end, format)
    }

    /// Indices of paragraphs matching `needle`, in paragraph order.
    /// Partial mode matches substrings; exact mode matches the whole text.
    pub fn find_text(&self, needle: &str, partial: bool) -> Vec<usize> {
        self.paragraphs()
            .enumerate()
            .filter(|(_, p)| {
                let text = p.text();
                if partial {
                    text.contains(needle)
                } else {
                    text == needle
                }
            })
            .map(|(i, _)| i)
            .collect()
    }

    /// Rewrite every run containing `old`, in body paragraphs and
    /// transitively in every table cell. The count is the number of runs
    /// rewritten, not textual occurrences; an occurrence split across run
    /// boundaries is not replaced. Known limitation, kept as observable
    /// behavior.
    pub fn replace_all(&mut self, old: &str, new: &str) -> Result<usize> {
        if old.is_empty() {
            return Err(DocxError::InvalidArgument(
                "search text must not be empty".to_string(),
            ));
        }
        let mut count = 0;
        for block in &mut self.blocks {
            match block {
                Block::Paragraph(para) => count += replace_in_paragraph(para, old, new),
                Block::Table(table) => {
                    for row in &mut table.rows {
                        for cell in row {
                            for para in &mut cell.paragraphs {
                                count += replace_in_paragraph(para, old, new);
                            }
                        }
                    }
                }
            }
        }
        Ok(count)
    }

    /// Detach the paragraph at `index` from the body. Every subsequent
    /// paragraph index shifts down by one.
    pub fn delete_paragraph(&mut self, index: usize) -> Result<()> {
        let position = self
            .blocks
            .iter()
            .enumerate()
            .filter(|(_, b)| matches!(b, Block::Paragraph(_)))
            .map(|(i, _)| i)
            .nth(index)
            .ok_or_else(|| index_error(index, self.paragraph_count()))?;
        self.blocks.remove(position);
        info!("Deleted paragraph at index {}", index);
        Ok(())
    }

    pub fn set_alignment(&mut self, index: usize, alignment: Alignment) -> Result<()> {
        self.paragraph_mut(index)?.alignment = Some(alignment);
        Ok(())
    }
}

fn index_error(index: usize, count: usize) -> DocxError {
    DocxError::InvalidRange(format!(
        "paragraph index {index} out of bounds; document has {count} paragraphs (0-{})",
        count.saturating_sub(1)
    ))
}

fn replace_in_paragraph(para: &mut Paragraph, old: &str, new: &str) -> usize {
    let mut count = 0;
    for run in &mut para.runs {
        if run.text.contains(old) {
            run.text = run.text.replace(old, new);
            count += 1;
        }
    }
    count
}

// ── Markup binding ───────────────────────────────────────────

pub(crate) fn parse_body(el: &XmlElement) -> Body {
    let mut body = Body::default();
    for child in el.child_elements() {
        match child.name.as_str() {
            "w:p" => body.blocks.push(Block::Paragraph(parse_paragraph(child))),
            "w:tbl" => body.blocks.push(Block::Table(parse_table(child))),
            "w:sectPr" => body.section = Some(child.clone()),
            // Bookmarks, structured tags and the like are outside the
            // modeled subset.
            _ => {}
        }
    }
    body
}

pub(crate) fn body_to_xml(body: &Body) -> XmlElement {
    let mut el = XmlElement::new("w:body");
    for block in &body.blocks {
        match block {
            Block::Paragraph(p) => el.push_element(paragraph_to_xml(p)),
            Block::Table(t) => el.push_element(table_to_xml(t)),
        }
    }
    if let Some(sect_pr) = &body.section {
        el.push_element(sect_pr.clone());
    }
    el
}
