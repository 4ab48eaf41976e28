use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DocxError>;

/// Error taxonomy for the document model.
///
/// Recoverable, entity-local conditions (a missing style, one malformed
/// style during enumeration, a broken notes part) never surface here; they
/// are absorbed into the successful result and reported inline. A `DocxError`
/// always means the single requested operation was aborted without mutating
/// the document.
#[derive(Debug, Error)]
pub enum DocxError {
    /// A named or indexed entity (table, section, style, part) did not resolve.
    #[error("{0} not found")]
    NotFound(String),

    /// Out-of-bounds paragraph index or text offsets.
    #[error("invalid range: {0}")]
    InvalidRange(String),

    /// A value outside a closed enumeration, or an otherwise unusable argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The save target cannot be written. Nothing was modified on disk.
    #[error("cannot write {path}: {reason}")]
    WriteBlocked { path: PathBuf, reason: String },

    /// A requested property path has no safe access in the loaded markup.
    #[error("feature unavailable: {0}")]
    PartialFeatureUnavailable(String),

    /// Serializing the tree would produce an invalid package. Save aborts
    /// before anything is written.
    #[error("document tree is not serializable: {0}")]
    StructuralCorruption(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("package error: {0}")]
    Package(#[from] zip::result::ZipError),

    #[error("malformed markup: {0}")]
    Markup(#[from] roxmltree::Error),
}
