use docx_model::table::BorderStyle;
use docx_model::xml::{self, parse_part, XmlElement};
use docx_model::Package;
use pretty_assertions::assert_eq;
use rstest::*;
use tempfile::TempDir;

#[test]
fn test_parse_part_reconstructs_prefixes() {
    let root = parse_part(
        r#"<?xml version="1.0"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:r><w:t xml:space="preserve"> hi </w:t></w:r></w:p>
  </w:body>
</w:document>"#,
    )
    .unwrap();

    assert_eq!(root.name, "w:document");
    assert_eq!(root.attr("xmlns:w"), Some(xml::WORDML_NS));
    let t = root
        .find("w:body")
        .and_then(|b| b.find("w:p"))
        .and_then(|p| p.find("w:r"))
        .and_then(|r| r.find("w:t"))
        .unwrap();
    assert_eq!(t.attr("xml:space"), Some("preserve"));
    assert_eq!(t.own_text(), " hi ");
}

#[test]
fn test_inter_element_whitespace_is_dropped() {
    let root = parse_part("<a>\n  <b>kept</b>\n  <c/>\n</a>").unwrap();
    assert_eq!(root.children.len(), 2);
    assert_eq!(root.find("b").unwrap().own_text(), "kept");
}

#[test]
fn test_writer_escapes_text_and_attributes() {
    let mut el = XmlElement::new("w:t");
    el.set_attr("w:val", "a\"b<c");
    el.push_text("x < y & z > w");

    let mut out = String::new();
    el.write_into(&mut out);
    assert_eq!(
        out,
        "<w:t w:val=\"a&quot;b&lt;c\">x &lt; y &amp; z &gt; w</w:t>"
    );

    // The escaped form parses back to the original payload.
    let mut plain = XmlElement::new("t");
    plain.set_attr("val", "a\"b<c");
    plain.push_text("x < y & z > w");
    let mut out = String::new();
    plain.write_into(&mut out);
    let reparsed = parse_part(&out).unwrap();
    assert_eq!(reparsed.own_text(), "x < y & z > w");
    assert_eq!(reparsed.attr("val"), Some("a\"b<c"));
}

#[test]
fn test_empty_element_is_self_closing() {
    let mut out = String::new();
    XmlElement::new("w:br").write_into(&mut out);
    assert_eq!(out, "<w:br/>");
}

#[test]
fn test_part_xml_carries_declaration() {
    let part = XmlElement::new("w:styles").to_part_xml();
    assert!(part.starts_with("<?xml version=\"1.0\""));
    assert!(part.ends_with("<w:styles/>"));
}

#[test]
fn test_set_cell_border_is_idempotent_per_edge() {
    let mut tc_pr = XmlElement::new("w:tcPr");
    xml::set_cell_border(&mut tc_pr, &["top", "bottom"], "single", 4, "000000");
    xml::set_cell_border(&mut tc_pr, &["top"], "thick", 12, "FF0000");

    let borders = tc_pr.find("w:tcBorders").unwrap();
    assert_eq!(borders.find_all("w:top").count(), 1);
    let top = borders.find("w:top").unwrap();
    assert_eq!(top.attr("w:val"), Some("thick"));
    assert_eq!(top.attr("w:sz"), Some("12"));
    assert_eq!(top.attr("w:color"), Some("FF0000"));
    // The untouched edge keeps its original descriptor.
    let bottom = borders.find("w:bottom").unwrap();
    assert_eq!(bottom.attr("w:val"), Some("single"));
    assert!(borders.find("w:left").is_none());
}

#[test]
fn test_set_cell_shading_accumulates_and_first_wins() {
    let mut tc_pr = XmlElement::new("w:tcPr");
    xml::set_cell_shading(&mut tc_pr, "FF0000");
    xml::set_cell_shading(&mut tc_pr, "0000FF");

    assert_eq!(tc_pr.find_all("w:shd").count(), 2);
    assert_eq!(xml::cell_shading(&tc_pr), Some("FF0000"));
}

#[rstest]
#[case("none", "nil", 4)]
#[case("single", "single", 4)]
#[case("double", "double", 4)]
#[case("thick", "thick", 12)]
#[case("dotted", "single", 4)]
#[case("SINGLE", "single", 4)]
fn test_border_style_descriptor_values(
    #[case] input: &str,
    #[case] val: &str,
    #[case] weight: u32,
) {
    let style = BorderStyle::parse(input);
    assert_eq!(style.val(), val);
    assert_eq!(style.weight(), weight);
}

#[test]
fn test_empty_package_has_core_parts() {
    let package = Package::empty().unwrap();
    assert!(package.has_part("word/document.xml"));
    assert!(package.has_part("[Content_Types].xml"));
    assert!(package.part_names().count() > 2);
}

#[test]
fn test_package_preserves_unknown_parts_byte_for_byte() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("opaque.docx");

    let mut package = Package::empty().unwrap();
    let payload = b"<custom>payload \xc3\xa9</custom>".to_vec();
    package.set_part("word/custom.xml", payload.clone());
    package.save(&path).unwrap();

    let reopened = Package::open(&path).unwrap();
    assert_eq!(reopened.part("word/custom.xml"), Some(payload.as_slice()));
    assert_eq!(
        reopened.part_names().count(),
        package.part_names().count()
    );
}

#[test]
fn test_missing_part_reads_as_none() {
    let package = Package::empty().unwrap();
    assert_eq!(package.xml("word/nonexistent.xml").unwrap(), None);
    assert_eq!(package.part("word/nonexistent.xml"), None);
}

#[test]
fn test_set_child_text_creates_and_replaces() {
    let mut root = XmlElement::new("cp:coreProperties");
    root.set_child_text("dc:title", "First");
    root.set_child_text("dc:title", "Second");

    assert_eq!(root.find_all("dc:title").count(), 1);
    assert_eq!(root.find("dc:title").unwrap().own_text(), "Second");
}

#[test]
fn test_gather_text_walks_nested_elements() {
    let root = parse_part(
        r#"<w:footnote xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:p><w:r><w:t>one </w:t></w:r><w:r><w:t>two</w:t></w:r></w:p>
</w:footnote>"#,
    )
    .unwrap();
    let mut text = String::new();
    root.gather_text("w:t", &mut text);
    assert_eq!(text, "one two");
}
