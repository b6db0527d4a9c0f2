//! Error types for slide-deck mail merge.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while merging spreadsheet rows into a template.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to open or read a file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// The tabular source could not be opened or parsed.
    #[error("Failed to read spreadsheet '{}': {reason}", path.display())]
    SourceRead { path: PathBuf, reason: String },

    /// The template document could not be opened or parsed.
    #[error("Failed to read template '{}': {reason}", path.display())]
    TemplateRead { path: PathBuf, reason: String },

    /// A data row does not have one value per header column.
    #[error("Row {row} has {found} values but the header row has {expected} columns")]
    RowShapeMismatch {
        row: usize,
        expected: usize,
        found: usize,
    },

    /// A cell value cannot be turned into replacement text.
    #[error("Row {row}, column '{column}': value cannot be used as text ({reason})")]
    ValueCoercion {
        row: usize,
        column: String,
        reason: String,
    },

    /// A row has no slide to land on in slide-per-row mode.
    #[error("Row {row} targets slide {slide} but the template only has {slide_count} slides")]
    SlideRangeExhausted {
        row: usize,
        slide: usize,
        slide_count: usize,
    },

    /// An output document could not be written.
    #[error("Failed to save '{}': {reason}", path.display())]
    Save { path: PathBuf, reason: String },

    /// The external page-format converter could not be started.
    #[error("Converter unavailable: {0}")]
    ConverterUnavailable(String),

    /// The external converter failed on one document.
    #[error("Failed to convert '{}': {reason}", path.display())]
    Conversion { path: PathBuf, reason: String },

    /// A page-format artifact could not be read or the merged output written.
    #[error("Consolidation failed at '{}': {reason}", path.display())]
    Consolidation { path: PathBuf, reason: String },

    /// Consolidation was requested with no inputs.
    #[error("No page-format artifacts to consolidate")]
    NothingToConsolidate,

    /// The file format is not supported for the requested operation.
    #[error("Unsupported or unrecognized file format: {0}")]
    UnsupportedFormat(String),

    /// Failed to interpret the PPTX package structure.
    #[error("PPTX parsing error: {0}")]
    PptxParseError(String),

    /// Failed to interpret the XLSX workbook structure.
    #[error("XLSX parsing error: {0}")]
    XlsxParseError(String),

    /// ZIP archive error (for PPTX and XLSX).
    #[error("ZIP error: {0}")]
    ZipError(String),

    /// XML parsing or writing error.
    #[error("XML error: {0}")]
    XmlError(String),
}

/// Broad failure classes, used to pick a process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Spreadsheet or template could not be read.
    SourceRead,
    /// A single row could not be merged.
    Row,
    /// Non-fatal: a row had no slide to land on.
    Skipped,
    /// The converter failed or was unavailable.
    Conversion,
    /// Consolidation failed.
    Consolidation,
    /// Anything else.
    Other,
}

impl Error {
    /// Classify this error for reporting and exit codes.
    pub fn class(&self) -> ErrorClass {
        match self {
            Error::SourceRead { .. }
            | Error::TemplateRead { .. }
            | Error::PptxParseError(_)
            | Error::XlsxParseError(_)
            | Error::ZipError(_)
            | Error::XmlError(_) => ErrorClass::SourceRead,
            Error::RowShapeMismatch { .. } | Error::ValueCoercion { .. } => ErrorClass::Row,
            Error::SlideRangeExhausted { .. } => ErrorClass::Skipped,
            Error::ConverterUnavailable(_) | Error::Conversion { .. } => ErrorClass::Conversion,
            Error::Consolidation { .. } | Error::NothingToConsolidate => {
                ErrorClass::Consolidation
            }
            Error::IoError(_) | Error::Save { .. } | Error::UnsupportedFormat(_) => {
                ErrorClass::Other
            }
        }
    }

    /// Wrap a backend error as a spreadsheet read failure.
    pub fn source_read(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Error::SourceRead {
            path: path.into(),
            reason: err.to_string(),
        }
    }

    /// Wrap a backend error as a template read failure.
    pub fn template_read(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Error::TemplateRead {
            path: path.into(),
            reason: err.to_string(),
        }
    }

    /// Wrap a backend error as a save failure.
    pub fn save(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Error::Save {
            path: path.into(),
            reason: err.to_string(),
        }
    }
}
