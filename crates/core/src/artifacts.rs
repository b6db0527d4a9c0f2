//! Output naming, artifact ordering and directory discovery.

use crate::error::{Error, Result};
use regex::Regex;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Reserved file name of the consolidated page-format output.
pub const CONSOLIDATED_NAME: &str = "merged.pdf";

/// Extension of page-format artifacts.
pub const PAGE_EXTENSION: &str = "pdf";

/// Suffix shared by every split-mode document (before the extension).
const SPLIT_SUFFIX: &str = "_slide";

/// Matches the row index embedded in split-mode names (`Row_002_slide.pdf`).
static ROW_INDEX_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Row_(\d+)_").unwrap());

/// Output name for slide-per-row mode: `merged_<template-filename>`.
pub fn slide_merge_output_name(template: &Path) -> Result<String> {
    let filename = template
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            Error::UnsupportedFormat(format!("template path has no file name: {}", template.display()))
        })?;
    Ok(format!("merged_{}", filename))
}

/// Output name for one document-per-row artifact: `Row_<NNN>_slide.<ext>`.
pub fn split_output_name(row_number: usize, extension: &str) -> String {
    format!("Row_{:03}{}.{}", row_number, SPLIT_SUFFIX, extension)
}

/// Where the page-format rendition of a document goes: same folder and
/// stem, `.pdf` extension.
pub fn page_artifact_path(source: &Path) -> PathBuf {
    source.with_extension(PAGE_EXTENSION)
}

/// The row index embedded in a split-mode file name, if any.
pub fn artifact_index(path: &Path) -> Option<u64> {
    let name = path.file_name()?.to_str()?;
    ROW_INDEX_REGEX
        .captures(name)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Compare two artifacts for consolidation order.
///
/// Indexed names (`Row_<n>_…`) come first in ascending numeric order, so
/// `Row_1000` follows `Row_999`. Everything else follows by file name.
pub fn compare_artifacts(a: &Path, b: &Path) -> Ordering {
    match (artifact_index(a), artifact_index(b)) {
        (Some(ia), Some(ib)) => ia.cmp(&ib).then_with(|| file_name(a).cmp(file_name(b))),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => file_name(a).cmp(file_name(b)),
    }
}

/// Sort artifacts into consolidation order.
pub fn order_artifacts(artifacts: &mut [PathBuf]) {
    artifacts.sort_by(|a, b| compare_artifacts(a, b));
}

fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or("")
}

/// Which files a directory scan picks up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactFilter {
    /// Split-mode documents: `*_slide.pptx`.
    SplitDocuments,
    /// Page-format files, except a previous consolidation.
    PageDocuments,
}

impl ArtifactFilter {
    /// Check whether a file name belongs to this set. Extensions compare
    /// case-insensitively.
    pub fn matches(&self, name: &str) -> bool {
        let name = name.to_ascii_lowercase();
        match self {
            ArtifactFilter::SplitDocuments => name.ends_with(&format!("{}.pptx", SPLIT_SUFFIX)),
            ArtifactFilter::PageDocuments => {
                name.ends_with(&format!(".{}", PAGE_EXTENSION)) && !name.contains(CONSOLIDATED_NAME)
            }
        }
    }
}

/// List the files in `dir` matching `filter`, in consolidation order.
pub fn discover_artifacts(dir: &Path, filter: ArtifactFilter) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let path = entry.path();
        if path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| filter.matches(n))
        {
            found.push(path);
        }
    }

    order_artifacts(&mut found);
    log::debug!(
        "Found {} {:?} artifact(s) in {}",
        found.len(),
        filter,
        dir.display()
    );
    Ok(found)
}
