//! Row-to-output merge strategies.
//!
//! * [`merge_slide_per_row`]: one output deck, data row `r` fills slide `r`.
//! * [`merge_document_per_row`]: one output deck per data row, each a fresh
//!   clone of the whole template.

use crate::artifacts::{slide_merge_output_name, split_output_name};
use crate::document::TemplateDocument;
use crate::error::{Error, Result};
use crate::resolve::resolve;
use crate::substitute::{substitute_deck, substitute_slide};
use crate::types::Table;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Extension used for split artifacts when the template path has none.
const DEFAULT_EXTENSION: &str = "pptx";

/// Row-to-output mapping policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergeMode {
    /// Single output; data row `r` maps to slide `r`.
    SlidePerRow,
    /// One output per data row; every slide of the clone is filled.
    DocumentPerRow,
}

/// Options shared by both merge strategies.
#[derive(Debug, Clone)]
pub struct MergeOptions {
    /// Directory that receives every generated file.
    output_dir: PathBuf,

    /// Whether document-per-row mode goes on to convert and consolidate.
    convert_outputs: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            convert_outputs: true,
        }
    }
}

impl MergeOptions {
    /// Options writing to the current directory, with conversion enabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the output directory.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Enable or disable the conversion and consolidation steps that
    /// follow document-per-row generation.
    pub fn with_conversion(mut self, enabled: bool) -> Self {
        self.convert_outputs = enabled;
        self
    }

    /// The output directory.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Whether generated documents are converted and consolidated.
    pub fn converts_outputs(&self) -> bool {
        self.convert_outputs
    }
}

/// A row that reached its output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedRow {
    /// Sheet row number.
    pub row: usize,
    /// Target slide number; `None` when the whole deck was filled.
    pub slide: Option<usize>,
    /// File holding the row's substitutions.
    pub artifact: PathBuf,
    /// Runs whose text changed.
    pub runs_changed: usize,
}

/// A row that was skipped or failed, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowIssue {
    /// Sheet row number.
    pub row: usize,
    /// Human-readable reason.
    pub reason: String,
}

/// What a merge run did, row by row.
#[derive(Debug, Clone, Serialize)]
pub struct MergeReport {
    /// Strategy used.
    pub mode: MergeMode,
    /// Files written, in generation order.
    pub artifacts: Vec<PathBuf>,
    /// Rows that were merged.
    pub applied: Vec<AppliedRow>,
    /// Rows with no slide to land on (slide-per-row only).
    pub skipped: Vec<RowIssue>,
    /// Rows that could not be merged.
    pub failed: Vec<RowIssue>,
}

impl MergeReport {
    fn new(mode: MergeMode) -> Self {
        Self {
            mode,
            artifacts: Vec::new(),
            applied: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
        }
    }

    fn fail(&mut self, row: usize, err: &Error) {
        log::error!("Row {:03} failed: {}", row, err);
        self.failed.push(RowIssue {
            row,
            reason: err.to_string(),
        });
    }

    /// True if no row failed.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Merge row `r` into slide `r` of a single document.
///
/// Rows beyond the last slide are skipped and reported. The document is
/// saved to `<output-dir>/merged_<template-filename>` after each merged row,
/// so the file on disk is always a complete snapshot. If no row lands on a
/// slide the untouched template is saved once, so the output always exists.
pub fn merge_slide_per_row<D: TemplateDocument>(
    mut document: D,
    template_path: &Path,
    table: &Table,
    options: &MergeOptions,
) -> Result<MergeReport> {
    let output = options
        .output_dir()
        .join(slide_merge_output_name(template_path)?);
    let slide_count = document.deck().slide_count();
    let mut report = MergeReport::new(MergeMode::SlidePerRow);

    log::info!("Generating {}...", output.display());

    for (index, row) in table.rows.iter().enumerate() {
        if index >= slide_count {
            let skipped = Error::SlideRangeExhausted {
                row: row.number,
                slide: index + 1,
                slide_count,
            };
            log::warn!("Skipping row {:03}: {}", row.number, skipped);
            report.skipped.push(RowIssue {
                row: row.number,
                reason: skipped.to_string(),
            });
            continue;
        }

        let replacements = match resolve(&table.headers, row) {
            Ok(map) => map,
            Err(err) => {
                report.fail(row.number, &err);
                continue;
            }
        };

        let slide = &mut document.deck_mut().slides[index];
        let runs_changed = substitute_slide(slide, &replacements);
        document.save(&output)?;

        log::info!("Updated row {:03} to slide {:03}", row.number, index + 1);
        log::debug!("Row {:03}: {} run(s) changed", row.number, runs_changed);
        report.applied.push(AppliedRow {
            row: row.number,
            slide: Some(index + 1),
            artifact: output.clone(),
            runs_changed,
        });
    }

    if report.applied.is_empty() {
        log::warn!("No row was merged; writing the template unchanged");
        document.save(&output)?;
    }

    report.artifacts.push(output.clone());
    log::info!("Generated {}", output.display());
    Ok(report)
}

/// Produce one full copy of the template per data row.
///
/// Each copy gets every slide filled from its row and is saved as
/// `<output-dir>/Row_<NNN>_slide.<template-extension>`, `NNN` being the
/// zero-padded sheet row number. A failing row produces no file and does not
/// stop the remaining rows.
pub fn merge_document_per_row<D: TemplateDocument>(
    template: &D,
    template_path: &Path,
    table: &Table,
    options: &MergeOptions,
) -> Result<MergeReport> {
    let extension = template_path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or(DEFAULT_EXTENSION);
    let mut report = MergeReport::new(MergeMode::DocumentPerRow);

    for row in &table.rows {
        let replacements = match resolve(&table.headers, row) {
            Ok(map) => map,
            Err(err) => {
                report.fail(row.number, &err);
                continue;
            }
        };

        let mut document = template.clone();
        let runs_changed = substitute_deck(document.deck_mut(), &replacements);

        let output = options
            .output_dir()
            .join(split_output_name(row.number, extension));
        if let Err(err) = document.save(&output) {
            report.fail(row.number, &err);
            continue;
        }

        log::info!("Generated {}", output.display());
        log::debug!("Row {:03}: {} run(s) changed", row.number, runs_changed);
        report.applied.push(AppliedRow {
            row: row.number,
            slide: None,
            artifact: output.clone(),
            runs_changed,
        });
        report.artifacts.push(output);
    }

    Ok(report)
}
