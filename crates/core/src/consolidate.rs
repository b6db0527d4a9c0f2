//! Consolidation of page-format artifacts into one document.

use crate::artifacts::{order_artifacts, CONSOLIDATED_NAME};
use crate::error::{Error, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Appends whole page sequences of several documents into one.
pub trait PageMerger {
    /// Write every page of `inputs`, in the given order, to `output`.
    ///
    /// Must fail without writing `output` if any input cannot be read.
    /// Returns the number of pages written.
    fn merge(&self, inputs: &[PathBuf], output: &Path) -> Result<usize>;
}

/// The single document produced by consolidation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsolidatedArtifact {
    /// Output file.
    pub path: PathBuf,
    /// Inputs, in the order their pages were appended.
    pub inputs: Vec<PathBuf>,
    /// Total page count.
    pub pages: usize,
}

/// Concatenate `artifacts` into `output`, in artifact order.
///
/// A previous consolidation (the reserved `merged.pdf` name, or `output`
/// itself) is never taken as input.
pub fn consolidate<M: PageMerger>(
    merger: &M,
    artifacts: &[PathBuf],
    output: &Path,
) -> Result<ConsolidatedArtifact> {
    let mut inputs: Vec<PathBuf> = artifacts
        .iter()
        .filter(|p| !is_reserved(p, output))
        .cloned()
        .collect();
    order_artifacts(&mut inputs);

    if inputs.is_empty() {
        return Err(Error::NothingToConsolidate);
    }

    for input in &inputs {
        log::info!("Merging {}", input.display());
    }
    let pages = merger.merge(&inputs, output)?;
    log::info!(
        "Merged {} file(s), {} page(s) into {}",
        inputs.len(),
        pages,
        output.display()
    );

    Ok(ConsolidatedArtifact {
        path: output.to_path_buf(),
        inputs,
        pages,
    })
}

fn is_reserved(path: &Path, output: &Path) -> bool {
    path == output
        || path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n == CONSOLIDATED_NAME)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Records the order it was asked to merge in; fails on "missing".
    #[derive(Debug, Default)]
    pub(crate) struct RecordingMerger {
        pub calls: RefCell<Vec<Vec<PathBuf>>>,
    }

    impl PageMerger for RecordingMerger {
        fn merge(&self, inputs: &[PathBuf], _output: &Path) -> Result<usize> {
            if let Some(bad) = inputs.iter().find(|p| p.to_string_lossy().contains("missing")) {
                return Err(Error::Consolidation {
                    path: bad.clone(),
                    reason: "unreadable".to_string(),
                });
            }
            self.calls.borrow_mut().push(inputs.to_vec());
            Ok(inputs.len())
        }
    }

    #[test]
    fn test_inputs_sorted_by_index() {
        let merger = RecordingMerger::default();
        let artifacts: Vec<PathBuf> = [3, 10, 1, 2]
            .iter()
            .map(|i| PathBuf::from(format!("Row_{:03}_slide.pdf", i)))
            .collect();

        let result = consolidate(&merger, &artifacts, Path::new("merged.pdf")).unwrap();

        assert_eq!(
            result.inputs,
            vec![
                PathBuf::from("Row_001_slide.pdf"),
                PathBuf::from("Row_002_slide.pdf"),
                PathBuf::from("Row_003_slide.pdf"),
                PathBuf::from("Row_010_slide.pdf"),
            ]
        );
        assert_eq!(result.pages, 4);
    }

    #[test]
    fn test_previous_consolidation_excluded() {
        let merger = RecordingMerger::default();
        let artifacts = vec![
            PathBuf::from("out/merged.pdf"),
            PathBuf::from("out/Row_002_slide.pdf"),
        ];
        let result = consolidate(&merger, &artifacts, Path::new("out/merged.pdf")).unwrap();
        assert_eq!(result.inputs, vec![PathBuf::from("out/Row_002_slide.pdf")]);
    }

    #[test]
    fn test_nothing_to_consolidate() {
        let merger = RecordingMerger::default();
        let err = consolidate(&merger, &[PathBuf::from("merged.pdf")], Path::new("merged.pdf"))
            .unwrap_err();
        assert!(matches!(err, Error::NothingToConsolidate));
        assert!(merger.calls.borrow().is_empty());
    }

    #[test]
    fn test_unreadable_input_aborts() {
        let merger = RecordingMerger::default();
        let artifacts = vec![
            PathBuf::from("Row_002_slide.pdf"),
            PathBuf::from("Row_003_missing.pdf"),
        ];
        let err = consolidate(&merger, &artifacts, Path::new("merged.pdf")).unwrap_err();
        assert!(matches!(err, Error::Consolidation { .. }));
    }
}
