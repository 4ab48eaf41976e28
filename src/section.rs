//! Section geometry and header/footer references.
//!
//! A section is a typed view over a preserved `w:sectPr` fragment: geometry
//! reads go through attribute lookups, and the fragment itself round-trips
//! verbatim on save. A header/footer with no reference of its kind is
//! "linked to previous"; its content is inherited, not stored here.

use serde_json::{json, Value};

use crate::xml::XmlElement;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderFooterKind {
    Header,
    Footer,
}

impl HeaderFooterKind {
    pub(crate) fn reference_tag(&self) -> &'static str {
        match self {
            HeaderFooterKind::Header => "w:headerReference",
            HeaderFooterKind::Footer => "w:footerReference",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            HeaderFooterKind::Header => "header",
            HeaderFooterKind::Footer => "footer",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Portrait,
    Landscape,
}

impl Orientation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Portrait => "portrait",
            Orientation::Landscape => "landscape",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Margins {
    pub left: Option<i64>,
    pub right: Option<i64>,
    pub top: Option<i64>,
    pub bottom: Option<i64>,
}

/// Read-only view over one section's `w:sectPr`. All lengths are twips.
#[derive(Debug, Clone, Copy)]
pub struct Section<'a> {
    pub(crate) sect_pr: &'a XmlElement,
}

impl Section<'_> {
    fn pg_sz_attr(&self, name: &str) -> Option<i64> {
        self.sect_pr
            .find("w:pgSz")
            .and_then(|sz| sz.attr(name))
            .and_then(|v| v.parse().ok())
    }

    pub fn page_width(&self) -> Option<i64> {
        self.pg_sz_attr("w:w")
    }

    pub fn page_height(&self) -> Option<i64> {
        self.pg_sz_attr("w:h")
    }

    pub fn orientation(&self) -> Orientation {
        match self.sect_pr.find("w:pgSz").and_then(|sz| sz.attr("w:orient")) {
            Some("landscape") => Orientation::Landscape,
            _ => Orientation::Portrait,
        }
    }

    pub fn margins(&self) -> Margins {
        let mar = self.sect_pr.find("w:pgMar");
        let read = |name: &str| {
            mar.and_then(|m| m.attr(name)).and_then(|v| v.parse().ok())
        };
        Margins {
            left: read("w:left"),
            right: read("w:right"),
            top: read("w:top"),
            bottom: read("w:bottom"),
        }
    }

    /// Relationship id of this section's own default header or footer.
    /// `None` means the part is linked to the previous section.
    pub fn reference(&self, kind: HeaderFooterKind) -> Option<&str> {
        let references: Vec<&XmlElement> =
            self.sect_pr.find_all(kind.reference_tag()).collect();
        references
            .iter()
            .find(|r| r.attr("w:type") == Some("default"))
            .or_else(|| references.first())
            .and_then(|r| r.attr("r:id"))
    }

    pub fn geometry(&self, index: usize) -> Value {
        let margins = self.margins();
        json!({
            "index": index,
            "page_width": self.page_width(),
            "page_height": self.page_height(),
            "left_margin": margins.left,
            "right_margin": margins.right,
            "top_margin": margins.top,
            "bottom_margin": margins.bottom,
            "orientation": self.orientation().as_str(),
        })
    }
}
