//! Structural document model for WordprocessingML (`.docx`) packages.
//!
//! A [`Document`] is one open package: the ZIP part map, a typed body of
//! paragraphs and tables, and the style registry. Mutations are in-place
//! tree edits; [`Document::save_to`] re-serializes the modeled parts and
//! carries every other part through byte-for-byte.
//!
//! ```no_run
//! use docx_model::{Document, DocumentRegistry};
//!
//! # fn main() -> docx_model::Result<()> {
//! let mut registry = DocumentRegistry::new();
//! let doc = registry.open("report.docx".as_ref())?;
//! doc.add_heading("Findings", 1, None);
//! doc.append_paragraph("The quick brown fox.", None, None);
//! doc.save()?;
//! # Ok(())
//! # }
//! ```

pub mod body;
pub mod document;
pub mod error;
pub mod notes;
pub mod package;
pub mod paragraph;
pub mod section;
pub mod styles;
pub mod table;
pub mod xml;

pub use body::{Block, Body};
pub use document::{AppendedParagraph, Document, DocumentRegistry};
pub use error::{DocxError, Result};
pub use notes::{Note, NoteKind};
pub use package::Package;
pub use paragraph::{Alignment, FontProps, Paragraph, ParagraphFormat, Run, TextFormat};
pub use section::{HeaderFooterKind, Margins, Orientation, Section};
pub use styles::{Style, StyleKind, StyleRegistry};
pub use table::{BorderStyle, Cell, Table};
