use std::fs::File;
use std::io::{Cursor, Read, Write};
use std::path::Path;

use anyhow::Result;
use docx_model::{
    Alignment, Document, DocumentRegistry, DocxError, HeaderFooterKind, Package, StyleKind,
    StyleRegistry, TextFormat,
};
use pretty_assertions::assert_eq;
use rstest::*;
use serde_json::json;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

#[fixture]
fn doc() -> Document {
    Document::create().unwrap()
}

fn bold() -> TextFormat {
    TextFormat {
        bold: Some(true),
        ..TextFormat::default()
    }
}

/// Rewrite the archive at `path` with `name` replaced (or added).
fn put_part(path: &Path, name: &str, bytes: &[u8]) {
    let data = std::fs::read(path).unwrap();
    let mut archive = ZipArchive::new(Cursor::new(data)).unwrap();
    let mut writer = ZipWriter::new(File::create(path).unwrap());
    let options = SimpleFileOptions::default();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).unwrap();
        let entry_name = entry.name().to_string();
        if entry_name == name {
            continue;
        }
        let mut buf = Vec::new();
        entry.read_to_end(&mut buf).unwrap();
        writer.start_file(entry_name, options).unwrap();
        writer.write_all(&buf).unwrap();
    }
    writer.start_file(name, options).unwrap();
    writer.write_all(bytes).unwrap();
    writer.finish().unwrap();
}

#[rstest]
fn test_create_document_has_heading_styles(doc: Document) {
    for level in 1..=9 {
        let name = format!("Heading {level}");
        assert!(
            doc.styles.by_name(&name).is_some(),
            "missing style {name}"
        );
    }
}

#[rstest]
fn test_append_paragraph_and_read_back(mut doc: Document) {
    let before = doc.body.paragraph_count();
    let appended = doc.append_paragraph("Test paragraph", None, None);
    assert_eq!(doc.body.paragraph_count(), before + 1);
    assert_eq!(appended.style_fallback, None);
    assert_eq!(doc.paragraph_text(appended.index).unwrap(), "Test paragraph");
}

#[rstest]
fn test_append_paragraph_unknown_style_falls_back(mut doc: Document) {
    let appended = doc.append_paragraph("text", Some("NoSuchStyle"), None);
    assert_eq!(appended.style_fallback, Some("NoSuchStyle".to_string()));
    assert_eq!(doc.body.paragraph(appended.index).unwrap().style, None);

    let styled = doc.append_paragraph("text", Some("Heading 1"), None);
    assert_eq!(styled.style_fallback, None);
    assert!(doc.body.paragraph(styled.index).unwrap().style.is_some());
}

#[rstest]
fn test_format_range_splits_runs(mut doc: Document) {
    let index = doc.append_paragraph("The quick brown fox", None, None).index;

    let formatted = doc.format_range(index, 4, 9, &bold()).unwrap();
    assert_eq!(formatted, "quick");

    let para = doc.body.paragraph(index).unwrap();
    assert_eq!(para.runs.len(), 3);
    assert_eq!(para.runs[0].text, "The ");
    assert_eq!(para.runs[1].text, "quick");
    assert_eq!(para.runs[1].props.bold, Some(true));
    assert_eq!(para.runs[2].text, " brown fox");
    assert_eq!(para.text(), "The quick brown fox");
}

#[rstest]
fn test_format_range_rejects_bad_offsets(mut doc: Document) {
    let index = doc.append_paragraph("short", None, None).index;

    let err = doc.format_range(index, 3, 3, &bold()).unwrap_err();
    assert!(matches!(err, DocxError::InvalidRange(_)));

    let err = doc.format_range(index, 0, 99, &bold()).unwrap_err();
    assert!(matches!(err, DocxError::InvalidRange(_)));

    let err = doc.format_range(999, 0, 1, &bold()).unwrap_err();
    assert!(matches!(err, DocxError::InvalidRange(_)));
}

#[rstest]
fn test_format_range_color_names(mut doc: Document) {
    let index = doc.append_paragraph("colored text", None, None).index;
    let red = TextFormat {
        color: Some("red".to_string()),
        ..TextFormat::default()
    };
    doc.format_range(index, 0, 7, &red).unwrap();
    assert_eq!(
        doc.body.paragraph(index).unwrap().runs[0].props.color,
        Some("FF0000".to_string())
    );

    // A name outside the closed set is dropped, not an error.
    let unknown = TextFormat {
        color: Some("chartreuse".to_string()),
        ..TextFormat::default()
    };
    doc.format_range(index, 0, 7, &unknown).unwrap();
    assert_eq!(doc.body.paragraph(index).unwrap().runs[0].props.color, None);
}

#[rstest]
fn test_find_text_partial_and_exact(mut doc: Document) {
    let a = doc.append_paragraph("Alpha", None, None).index;
    let b = doc.append_paragraph("contains Alpha inside", None, None).index;

    assert_eq!(doc.find_text("Alpha", false), vec![a]);
    assert_eq!(doc.find_text("Alpha", true), vec![a, b]);
    assert_eq!(doc.find_text("missing", true), Vec::<usize>::new());
}

#[rstest]
fn test_replace_all_counts_rewritten_runs(mut doc: Document) {
    // Two occurrences in one run still count as one rewritten run.
    doc.append_paragraph("cat and cat", None, None);
    doc.append_paragraph("a cat", None, None);
    doc.append_paragraph("no match", None, None);

    let count = doc.replace_all("cat", "dog").unwrap();
    assert_eq!(count, 2);
    assert_eq!(doc.find_text("dog and dog", false).len(), 1);
    assert_eq!(doc.find_text("cat", true), Vec::<usize>::new());
}

#[rstest]
fn test_replace_all_reaches_table_cells(mut doc: Document) {
    let data = vec![vec!["cat here".to_string(), "plain".to_string()]];
    let table = doc.add_table(1, 2, Some(&data));

    let count = doc.replace_all("cat", "dog").unwrap();
    assert_eq!(count, 1);
    let cell = doc.table(table).unwrap().cell(0, 0).unwrap();
    assert_eq!(cell.text(), "dog here");
}

#[rstest]
fn test_replace_all_rejects_empty_search(mut doc: Document) {
    let err = doc.replace_all("", "x").unwrap_err();
    assert!(matches!(err, DocxError::InvalidArgument(_)));
}

#[rstest]
fn test_delete_paragraph_shifts_indices(mut doc: Document) {
    doc.append_paragraph("a", None, None);
    let b = doc.append_paragraph("b", None, None).index;
    doc.append_paragraph("c", None, None);
    let before = doc.body.paragraph_count();

    doc.delete_paragraph(b).unwrap();
    assert_eq!(doc.body.paragraph_count(), before - 1);
    assert_eq!(doc.paragraph_text(b).unwrap(), "c");

    let err = doc.delete_paragraph(doc.body.paragraph_count()).unwrap_err();
    assert!(matches!(err, DocxError::InvalidRange(_)));
}

#[rstest]
fn test_set_alignment(mut doc: Document) {
    let index = doc.append_paragraph("centered", None, None).index;
    doc.set_alignment(index, "center").unwrap();
    assert_eq!(
        doc.body.paragraph(index).unwrap().alignment,
        Some(Alignment::Center)
    );

    let err = doc.set_alignment(index, "diagonal").unwrap_err();
    assert!(matches!(err, DocxError::InvalidArgument(_)));
}

#[rstest]
fn test_add_heading_applies_heading_style(mut doc: Document) {
    let index = doc.add_heading("Overview", 3, Some(Alignment::Center));
    let para = doc.body.paragraph(index).unwrap();
    assert_eq!(
        doc.styles.display_name(para.style.as_deref()),
        "Heading 3"
    );
    assert_eq!(para.alignment, Some(Alignment::Center));

    // Out-of-range levels are clamped.
    let clamped = doc.add_heading("Deep", 12, None);
    let para = doc.body.paragraph(clamped).unwrap();
    assert_eq!(doc.styles.display_name(para.style.as_deref()), "Heading 9");
}

#[rstest]
fn test_add_page_break(mut doc: Document) {
    let index = doc.add_page_break();
    let para = doc.body.paragraph(index).unwrap();
    assert_eq!(para.runs.len(), 1);
    assert!(para.runs[0].page_break);
    assert_eq!(para.text(), "");
}

#[rstest]
fn test_add_table_ragged_data_fills_up_to_bounds(mut doc: Document) {
    let data = vec![
        vec!["a".to_string(), "b".to_string()],
        vec!["c".to_string()],
    ];
    let index = doc.add_table(2, 2, Some(&data));

    let table = doc.table(index).unwrap();
    assert_eq!(table.row_count(), 2);
    assert_eq!(table.col_count(), 2);
    assert_eq!(table.cell(0, 0).unwrap().text(), "a");
    assert_eq!(table.cell(0, 1).unwrap().text(), "b");
    assert_eq!(table.cell(1, 0).unwrap().text(), "c");
    assert_eq!(table.cell(1, 1).unwrap().text(), "");
}

#[rstest]
fn test_add_table_data_beyond_bounds_is_ignored(mut doc: Document) {
    let data = vec![
        vec!["a".to_string(), "b".to_string(), "extra".to_string()],
        vec!["c".to_string()],
        vec!["dropped".to_string()],
    ];
    let index = doc.add_table(2, 2, Some(&data));
    let table = doc.table(index).unwrap();
    assert_eq!(table.row_count(), 2);
    assert_eq!(table.col_count(), 2);
    assert_eq!(doc.find_text("extra", true), Vec::<usize>::new());
}

#[rstest]
fn test_format_table_borders_and_header(mut doc: Document) {
    let data = vec![vec!["h1".to_string(), "h2".to_string()]];
    let index = doc.add_table(1, 2, Some(&data));

    doc.format_table(index, true, Some("double"), None).unwrap();
    let cell = doc.table(index).unwrap().cell(0, 0).unwrap();
    assert_eq!(cell.paragraphs[0].runs[0].props.bold, Some(true));
    let borders = cell.props.find("w:tcBorders").unwrap();
    for edge in ["w:top", "w:left", "w:bottom", "w:right"] {
        let border = borders.find(edge).unwrap();
        assert_eq!(border.attr("w:val"), Some("double"));
        assert_eq!(border.attr("w:sz"), Some("4"));
        assert_eq!(border.attr("w:color"), Some("000000"));
    }

    // Re-applying replaces the descriptors instead of stacking them.
    doc.format_table(index, false, Some("thick"), None).unwrap();
    let cell = doc.table(index).unwrap().cell(0, 0).unwrap();
    let borders = cell.props.find("w:tcBorders").unwrap();
    assert_eq!(borders.find_all("w:top").count(), 1);
    assert_eq!(borders.find("w:top").unwrap().attr("w:sz"), Some("12"));
}

#[rstest]
fn test_format_table_unknown_border_falls_back_to_single(mut doc: Document) {
    let index = doc.add_table(1, 1, None);
    doc.format_table(index, false, Some("wavy"), None).unwrap();
    let cell = doc.table(index).unwrap().cell(0, 0).unwrap();
    let top = cell.props.find("w:tcBorders").unwrap().find("w:top").unwrap();
    assert_eq!(top.attr("w:val"), Some("single"));
}

#[rstest]
fn test_format_table_shading_accumulates(mut doc: Document) {
    let index = doc.add_table(1, 1, None);
    let first = vec![vec!["red".to_string()]];
    let second = vec![vec!["0000FF".to_string()]];
    doc.format_table(index, false, None, Some(&first)).unwrap();
    doc.format_table(index, false, None, Some(&second)).unwrap();

    let cell = doc.table(index).unwrap().cell(0, 0).unwrap();
    assert_eq!(cell.props.find_all("w:shd").count(), 2);
    // Readers take the first fragment, so the original fill wins.
    let details = doc.table_details(index).unwrap();
    assert_eq!(details["cells"][0][0]["shading"], json!("FF0000"));
}

#[rstest]
fn test_format_table_shading_skips_bad_entries(mut doc: Document) {
    let index = doc.add_table(1, 1, None);
    let shading = vec![
        vec!["notacolor".to_string(), "FF0000".to_string()],
        vec!["00FF00".to_string()],
    ];
    doc.format_table(index, false, None, Some(&shading)).unwrap();
    let cell = doc.table(index).unwrap().cell(0, 0).unwrap();
    assert_eq!(cell.props.find_all("w:shd").count(), 0);
}

#[rstest]
fn test_format_table_invalid_index(mut doc: Document) {
    let err = doc.format_table(99, false, Some("single"), None).unwrap_err();
    assert!(matches!(err, DocxError::NotFound(_)));
    let err = doc.table_details(99).unwrap_err();
    assert!(matches!(err, DocxError::NotFound(_)));
}

#[rstest]
fn test_table_details_shape(mut doc: Document) {
    let data = vec![
        vec!["a".to_string(), "b".to_string()],
        vec!["c".to_string(), "d".to_string()],
    ];
    let index = doc.add_table(2, 2, Some(&data));
    let details = doc.table_details(index).unwrap();

    assert_eq!(details["index"], json!(index));
    assert_eq!(details["rows"], json!(2));
    assert_eq!(details["columns"], json!(2));
    assert_eq!(details["cells"][1][0]["text"], json!("c"));
    assert_eq!(details["cells"][1][0]["row"], json!(1));
    assert_eq!(details["cells"][1][0]["paragraphs"][0]["text"], json!("c"));
}

#[test]
fn test_create_style_is_idempotent() {
    let mut doc = Document::create().unwrap();
    let before = doc.styles.styles.len();

    let id = doc
        .styles
        .create_style("Fancy", StyleKind::Paragraph, None, Some(&bold()), None, None)
        .style_id
        .clone();
    let again = doc.styles.create_style(
        "Fancy",
        StyleKind::Paragraph,
        None,
        None,
        Some(Alignment::Center),
        Some(2.0),
    );
    // Same style back, new attributes ignored.
    assert_eq!(again.style_id, id);
    assert_eq!(again.font.bold, Some(true));
    assert_eq!(again.alignment, None);
    assert_eq!(doc.styles.styles.len(), before + 1);
}

#[test]
fn test_ensure_heading_styles_ramp() {
    let mut registry = StyleRegistry::default();
    registry.ensure_heading_styles();

    let h1 = registry.by_name("Heading 1").unwrap();
    assert_eq!(h1.style_id, "Heading1");
    assert_eq!(h1.font.bold, Some(true));
    assert_eq!(h1.font.size, Some(16.0));
    assert_eq!(registry.by_name("Heading 2").unwrap().font.size, Some(14.0));
    assert_eq!(registry.by_name("Heading 3").unwrap().font.size, Some(12.0));
    assert_eq!(registry.by_name("Heading 9").unwrap().font.size, Some(12.0));

    let count = registry.styles.len();
    registry.ensure_heading_styles();
    assert_eq!(registry.styles.len(), count);
}

#[test]
fn test_ensure_heading_styles_avoids_taken_ids() {
    let mut registry = StyleRegistry::default();
    // A pre-existing style already occupies the id the synthesis would pick.
    registry.create_style("Heading1", StyleKind::Paragraph, None, None, None, None);
    registry.ensure_heading_styles();

    let h1 = registry.by_name("Heading 1").unwrap();
    assert_ne!(h1.style_id, "Heading1");

    let mut ids: Vec<_> = registry.styles.iter().map(|s| s.style_id.clone()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), registry.styles.len());
}

#[test]
fn test_list_styles_partitions_by_kind() {
    let mut registry = StyleRegistry::default();
    registry.create_style("Body", StyleKind::Paragraph, None, None, None, None);
    registry.create_style("Emphasis", StyleKind::Character, None, None, None, None);
    registry.create_style("List Ref", StyleKind::Numbering, Some("Body"), None, None, None);

    let listed = registry.list();
    assert_eq!(listed["paragraph_styles"][0]["name"], json!("Body"));
    assert_eq!(listed["character_styles"][0]["name"], json!("Emphasis"));
    // Numbering styles never report a base style.
    assert_eq!(listed["numbering_styles"][0]["base_style"], json!(null));
    assert_eq!(listed["table_styles"], json!([]));
}

#[test]
fn test_list_styles_reports_malformed_definitions() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken_style.docx");

    let mut doc = Document::create().unwrap();
    doc.append_paragraph("body", None, None);
    doc.save_to(&path).unwrap();

    // A definition without w:styleId is listed with its error, not dropped.
    put_part(
        &path,
        "word/styles.xml",
        br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:style w:type="paragraph" w:styleId="Normal"><w:name w:val="Normal"/></w:style>
  <w:style w:type="paragraph"><w:name w:val="Broken"/></w:style>
</w:styles>"#,
    );

    let doc = Document::open(&path).unwrap();
    let listed = doc.list_styles();
    let other = listed["other_styles"].as_array().unwrap();
    let broken = other
        .iter()
        .find(|s| s["name"] == json!("Broken"))
        .unwrap();
    assert!(broken["error"].as_str().unwrap().contains("w:styleId"));
    // The well-formed sibling still lists normally.
    assert_eq!(listed["paragraph_styles"][0]["name"], json!("Normal"));
}

#[rstest]
fn test_extract_text_plain_and_formatted(mut doc: Document) {
    let index = doc.append_paragraph("Hello world", None, None).index;
    doc.format_range(index, 0, 5, &bold()).unwrap();
    let data = vec![vec!["cell one".to_string()]];
    doc.add_table(1, 1, Some(&data));

    let plain = doc.extract_text(false);
    assert!(plain.contains("Hello world"));
    assert!(plain.contains("cell one"));

    let formatted = doc.extract_text(true);
    assert!(formatted.contains("[PARAGRAPH style="));
    assert!(formatted.contains("[bold]Hello[/]"));
    assert!(formatted.contains("[TABLE rows=1 cols=1]"));
    assert!(formatted.contains("[CELL]"));
}

#[rstest]
fn test_structure_previews(mut doc: Document) {
    let long_text = "x".repeat(150);
    let index = doc.append_paragraph(&long_text, None, None).index;

    let structure = doc.structure(false);
    let entry = structure["paragraphs"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["index"] == json!(index))
        .unwrap();
    let preview = entry["text"].as_str().unwrap();
    assert_eq!(preview.len(), 103);
    assert!(preview.ends_with("..."));
    assert_eq!(entry["alignment"], json!("LEFT"));

    let data = vec![vec!["abc".to_string(), "def".to_string()]];
    doc.add_table(1, 2, Some(&data));
    let structure = doc.structure(false);
    let table = &structure["tables"].as_array().unwrap()[0];
    assert_eq!(table["preview"][0][0], json!("abc"));

    let detailed = doc.structure(true);
    assert!(detailed["tables"][0]["cells"].is_array());
}

#[rstest]
fn test_document_info_counts(mut doc: Document) {
    let paragraphs_before = doc.body.paragraph_count();
    doc.append_paragraph("The quick brown fox", None, None);
    doc.append_paragraph("Hello world", None, None);
    doc.set_properties(Some("Report"), Some("Testing"), Some("Jordan"))
        .unwrap();

    let info = doc.document_info(false, false);
    assert_eq!(info["title"], json!("Report"));
    assert_eq!(info["subject"], json!("Testing"));
    assert_eq!(info["author"], json!("Jordan"));
    assert_eq!(
        info["paragraph_count"],
        json!(paragraphs_before + 2)
    );
    assert_eq!(info["word_count"], json!(6));
    assert_eq!(info["table_count"], json!(0));
    assert!(info["sections"].is_array());
    assert!(info.get("headers_and_footers").is_none());

    let with_notes = doc.document_info(false, true);
    assert_eq!(with_notes["notes"]["footnotes"], json!([]));
}

#[rstest]
fn test_section_geometry_defaults(doc: Document) {
    assert!(doc.section_count() >= 1);
    let geometry = doc.section_geometry(0).unwrap();
    assert_eq!(geometry["orientation"], json!("portrait"));
    assert_eq!(geometry["index"], json!(0));

    let err = doc.section_geometry(99).unwrap_err();
    assert!(matches!(err, DocxError::NotFound(_)));
}

#[rstest]
fn test_header_without_reference_is_linked(doc: Document) {
    let header = doc.header_or_footer(0, HeaderFooterKind::Header).unwrap();
    assert_eq!(header, json!({ "linked_to_previous": true }));
    let footer = doc.header_or_footer(0, HeaderFooterKind::Footer).unwrap();
    assert_eq!(footer["linked_to_previous"], json!(true));
}

#[test]
fn test_header_content_resolved_through_relationships() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("header.docx");

    let mut doc = Document::create().unwrap();
    doc.append_paragraph("body", None, None);
    let sect_pr = doc
        .body
        .section
        .get_or_insert_with(|| docx_model::xml::XmlElement::new("w:sectPr"));
    let mut reference = docx_model::xml::XmlElement::new("w:headerReference");
    reference.set_attr("w:type", "default");
    reference.set_attr("r:id", "rId100");
    sect_pr.push_element(reference);
    doc.save_to(&path).unwrap();

    put_part(
        &path,
        "word/header1.xml",
        br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:hdr xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:p><w:r><w:rPr><w:b/></w:rPr><w:t>Confidential</w:t></w:r></w:p>
</w:hdr>"#,
    );
    put_part(
        &path,
        "word/_rels/document.xml.rels",
        br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId100" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/header" Target="header1.xml"/>
</Relationships>"#,
    );

    let doc = Document::open(&path).unwrap();
    let last_section = doc.section_count() - 1;
    let header = doc
        .header_or_footer(last_section, HeaderFooterKind::Header)
        .unwrap();
    assert_eq!(header["linked_to_previous"], json!(false));
    assert_eq!(header["text"], json!("Confidential"));
    assert_eq!(header["formatted_runs"][0]["bold"], json!(true));

    // Footer of the same section has no reference of its own.
    let footer = doc
        .header_or_footer(last_section, HeaderFooterKind::Footer)
        .unwrap();
    assert_eq!(footer["linked_to_previous"], json!(true));
}

#[test]
fn test_extract_notes_from_parts() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("notes.docx");

    let mut doc = Document::create().unwrap();
    doc.append_paragraph("body", None, None);
    doc.save_to(&path).unwrap();

    put_part(
        &path,
        "word/footnotes.xml",
        br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:footnotes xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:footnote w:id="-1"><w:p><w:r><w:t>separator</w:t></w:r></w:p></w:footnote>
  <w:footnote w:id="0"><w:p><w:r><w:t>continuation</w:t></w:r></w:p></w:footnote>
  <w:footnote w:id="1"><w:p><w:r><w:t>First footnote.</w:t></w:r></w:p></w:footnote>
  <w:footnote w:id="2"><w:p><w:r><w:t>Second </w:t></w:r><w:r><w:t>footnote.</w:t></w:r></w:p></w:footnote>
</w:footnotes>"#,
    );

    let doc = Document::open(&path).unwrap();
    let notes = doc.extract_notes();
    let footnotes = notes["footnotes"].as_array().unwrap();
    assert_eq!(footnotes.len(), 2);
    assert_eq!(footnotes[0]["id"], json!("1"));
    assert_eq!(footnotes[0]["text"], json!("First footnote."));
    assert_eq!(footnotes[1]["text"], json!("Second footnote."));
    // Endnotes part is absent, which is a normal empty result.
    assert_eq!(notes["endnotes"], json!([]));
}

#[test]
fn test_malformed_footnotes_part_reports_scoped_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad_notes.docx");

    let mut doc = Document::create().unwrap();
    doc.append_paragraph("body", None, None);
    doc.save_to(&path).unwrap();
    put_part(&path, "word/footnotes.xml", b"this is not markup <w:");

    let doc = Document::open(&path).unwrap();
    let notes = doc.extract_notes();
    // The error stays scoped to the broken kind; endnotes extract normally.
    assert!(notes["footnote_error"].as_str().is_some());
    assert_eq!(notes["endnotes"], json!([]));
    assert!(notes.get("endnote_error").is_none());
}

#[rstest]
fn test_extract_notes_empty_document(doc: Document) {
    let notes = doc.extract_notes();
    assert_eq!(notes["footnotes"], json!([]));
    assert_eq!(notes["endnotes"], json!([]));
    assert!(notes.get("footnote_error").is_none());
}

#[test]
fn test_save_and_reload_round_trip() -> Result<()> {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("round_trip.docx");

    let mut doc = Document::create()?;
    let heading = doc.add_heading("Findings", 1, None);
    let para = doc.append_paragraph("The quick brown fox", None, None).index;
    let format = TextFormat {
        bold: Some(true),
        color: Some("red".to_string()),
        ..TextFormat::default()
    };
    doc.format_range(para, 4, 9, &format)?;
    let data = vec![
        vec!["a".to_string(), "b".to_string()],
        vec!["c".to_string()],
    ];
    let table = doc.add_table(2, 2, Some(&data));
    doc.format_table(table, false, Some("double"), None)?;
    doc.set_properties(Some("Round"), None, Some("Tester"))?;
    let sections_before = doc.section_count();
    doc.save_to(&path)?;

    let reopened = Document::open(&path)?;
    assert_eq!(reopened.paragraph_text(heading)?, "Findings");
    let heading_para = reopened.body.paragraph(heading).unwrap();
    assert_eq!(
        reopened.styles.display_name(heading_para.style.as_deref()),
        "Heading 1"
    );

    let middle = &reopened.body.paragraph(para).unwrap().runs[1];
    assert_eq!(middle.text, "quick");
    assert_eq!(middle.props.bold, Some(true));
    assert_eq!(middle.props.color, Some("FF0000".to_string()));

    let details = reopened.table_details(table)?;
    assert_eq!(details["cells"][0][0]["text"], json!("a"));
    assert_eq!(details["cells"][1][1]["text"], json!(""));
    assert_eq!(
        details["cells"][0][0]["borders"]["top"]["val"],
        json!("double")
    );

    let props = reopened.core_properties();
    assert_eq!(props["title"], json!("Round"));
    assert_eq!(props["author"], json!("Tester"));

    assert_eq!(reopened.section_count(), sections_before);
    Ok(())
}

#[test]
fn test_tab_characters_round_trip_as_tab_elements() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tabs.docx");

    let mut doc = Document::create().unwrap();
    let index = doc.append_paragraph("left\tright", None, None).index;
    doc.save_to(&path).unwrap();

    let package = Package::open(&path).unwrap();
    let document_xml =
        String::from_utf8(package.part("word/document.xml").unwrap().to_vec()).unwrap();
    assert!(document_xml.contains("<w:tab/>"));
    assert!(!document_xml.contains("left\tright"));

    let reopened = Document::open(&path).unwrap();
    assert_eq!(reopened.paragraph_text(index).unwrap(), "left\tright");
}

#[test]
fn test_save_requires_a_path_for_created_documents() {
    let mut doc = Document::create().unwrap();
    let err = doc.save().unwrap_err();
    assert!(matches!(err, DocxError::InvalidArgument(_)));

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("adopted.docx");
    doc.save_to(&path).unwrap();
    assert_eq!(doc.path(), Some(path.as_path()));
    // After the first explicit save the handle has a backing path.
    doc.save().unwrap();
}

#[test]
fn test_registry_lifecycle() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("registered.docx");
    let mut doc = Document::create().unwrap();
    doc.append_paragraph("seed", None, None);
    doc.save_to(&path).unwrap();

    let mut registry = DocumentRegistry::new();
    assert!(registry.is_empty());

    let handle = registry.open(&path).unwrap();
    let index = handle.append_paragraph("unsaved edit", None, None).index;

    // Re-opening the same path returns the live handle, edits intact.
    let again = registry.open(&path).unwrap();
    assert_eq!(again.paragraph_text(index).unwrap(), "unsaved edit");
    assert_eq!(registry.len(), 1);

    assert!(registry.close(&path));
    assert!(!registry.close(&path));
    assert!(registry.get(&path).is_none());

    // A fresh open reads from disk; the unsaved edit is gone.
    let reread = registry.open(&path).unwrap();
    assert!(reread.paragraph_text(index).is_err());
}

#[test]
fn test_registry_open_missing_file() {
    let mut registry = DocumentRegistry::new();
    let result = registry.open(Path::new("/nonexistent/missing.docx"));
    assert!(result.is_err());
    assert!(registry.is_empty());
}
