//! Read-only footnote/endnote extraction.
//!
//! Notes live in their own package parts, independent of the main body tree.
//! A missing part is a normal outcome (empty list); a malformed part is
//! reported as a scoped error field without failing extraction of the other
//! kind.

use serde::Serialize;
use serde_json::{json, Value};

use crate::error::Result;
use crate::package::Package;

/// Reserved separator/continuation note identifiers, excluded from extraction.
const RESERVED_NOTE_IDS: [&str; 2] = ["-1", "0"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteKind {
    Footnote,
    Endnote,
}

impl NoteKind {
    pub(crate) fn part_name(&self) -> &'static str {
        match self {
            NoteKind::Footnote => "word/footnotes.xml",
            NoteKind::Endnote => "word/endnotes.xml",
        }
    }

    fn element_name(&self) -> &'static str {
        match self {
            NoteKind::Footnote => "w:footnote",
            NoteKind::Endnote => "w:endnote",
        }
    }

    fn plural(&self) -> &'static str {
        match self {
            NoteKind::Footnote => "footnotes",
            NoteKind::Endnote => "endnotes",
        }
    }

    fn error_key(&self) -> &'static str {
        match self {
            NoteKind::Footnote => "footnote_error",
            NoteKind::Endnote => "endnote_error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Note {
    pub id: String,
    pub text: String,
}

/// Walk both notes parts. Each note is keyed by identifier with its text
/// runs concatenated.
pub(crate) fn extract_notes(package: &Package) -> Value {
    let mut result = json!({ "footnotes": [], "endnotes": [] });
    for kind in [NoteKind::Footnote, NoteKind::Endnote] {
        match collect(package, kind) {
            Ok(notes) => result[kind.plural()] = json!(notes),
            Err(err) => result[kind.error_key()] = json!(err.to_string()),
        }
    }
    result
}

fn collect(package: &Package, kind: NoteKind) -> Result<Vec<Note>> {
    let Some(root) = package.xml(kind.part_name())? else {
        return Ok(Vec::new());
    };
    let mut notes = Vec::new();
    for note_el in root.find_all(kind.element_name()) {
        let Some(id) = note_el.attr("w:id") else {
            continue;
        };
        if RESERVED_NOTE_IDS.contains(&id) {
            continue;
        }
        let mut text = String::new();
        note_el.gather_text("w:t", &mut text);
        notes.push(Note {
            id: id.to_string(),
            text,
        });
    }
    Ok(notes)
}
