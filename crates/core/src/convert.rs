//! Page-format conversion through a scoped converter session.
//!
//! Opening a converter can be expensive (an office suite, a profile
//! directory), so a batch opens one [`ConversionSession`] and runs every
//! document through it. Sessions release their resources in `Drop`, which
//! covers the success path, early returns and panics alike.

use crate::artifacts::page_artifact_path;
use crate::error::{Error, Result};
use crate::types::DocumentFormat;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// An open handle on an external document converter.
pub trait ConversionSession {
    /// Convert `source` into a page-format document at `target`.
    fn convert(&mut self, source: &Path, target: &Path) -> Result<()>;
}

/// Factory for converter sessions.
pub trait PageConverter {
    /// Session type; releases the converter when dropped.
    type Session: ConversionSession;

    /// Acquire the converter.
    fn open(&self) -> Result<Self::Session>;
}

/// A document and its page-format rendition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConvertedArtifact {
    /// Source document.
    pub source: PathBuf,
    /// Page-format output.
    pub target: PathBuf,
}

/// A document that could not be converted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionIssue {
    /// Source document.
    pub source: PathBuf,
    /// Why it failed.
    pub reason: String,
}

/// Outcome of a conversion batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConversionReport {
    /// Successful conversions, in input order.
    pub converted: Vec<ConvertedArtifact>,
    /// Failed conversions, in input order.
    pub failed: Vec<ConversionIssue>,
}

impl ConversionReport {
    /// Page-format outputs, in input order.
    pub fn targets(&self) -> Vec<PathBuf> {
        self.converted.iter().map(|c| c.target.clone()).collect()
    }
}

/// Convert every source with one converter session.
///
/// Failing to open the converter is fatal. A failure on one document is
/// logged and recorded, and the batch moves on to the next.
pub fn convert_batch<C: PageConverter>(
    converter: &C,
    sources: &[PathBuf],
) -> Result<ConversionReport> {
    let mut report = ConversionReport::default();
    if sources.is_empty() {
        log::info!("Nothing to convert");
        return Ok(report);
    }

    let mut session = converter.open()?;
    for source in sources {
        let target = page_artifact_path(source);
        log::info!("Generating {} to {}", source.display(), target.display());

        match session.convert(source, &target) {
            Ok(()) => {
                log::info!("Converted {} to {}", source.display(), target.display());
                report.converted.push(ConvertedArtifact {
                    source: source.clone(),
                    target,
                });
            }
            Err(err) => {
                log::error!("Failed to convert {} to PDF: {}", source.display(), err);
                report.failed.push(ConversionIssue {
                    source: source.clone(),
                    reason: err.to_string(),
                });
            }
        }
    }
    drop(session);

    log::debug!(
        "Conversion batch done: {} converted, {} failed",
        report.converted.len(),
        report.failed.len()
    );
    Ok(report)
}

/// Convert a single `.pptx` document next to itself.
pub fn convert_one<C: PageConverter>(converter: &C, source: &Path) -> Result<PathBuf> {
    if DocumentFormat::from_path(source) != Some(DocumentFormat::Pptx) {
        return Err(Error::UnsupportedFormat(format!(
            "only PPTX files can be converted to PDF: {}",
            source.display()
        )));
    }

    let target = page_artifact_path(source);
    let mut session = converter.open()?;
    session.convert(source, &target)?;
    log::info!("Converted {} to {}", source.display(), target.display());
    Ok(target)
}
