//! The document-per-row pipeline: generate, convert, consolidate.

use crate::artifacts::CONSOLIDATED_NAME;
use crate::consolidate::{consolidate, ConsolidatedArtifact, PageMerger};
use crate::convert::{convert_batch, ConversionReport, PageConverter};
use crate::document::TemplateDocument;
use crate::error::{Error, Result};
use crate::merge::{merge_document_per_row, MergeOptions, MergeReport};
use crate::types::Table;
use serde::Serialize;
use std::path::Path;

/// A pipeline step after generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStep {
    Conversion,
    Consolidation,
}

/// The step that stopped the pipeline and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepFailure {
    pub step: PipelineStep,
    pub reason: String,
}

impl StepFailure {
    fn new(step: PipelineStep, err: &Error) -> Self {
        log::error!("{:?} step failed: {}", step, err);
        Self {
            step,
            reason: err.to_string(),
        }
    }
}

/// Everything the split pipeline produced.
#[derive(Debug, Clone, Serialize)]
pub struct SplitReport {
    /// Per-row generation results.
    pub merge: MergeReport,
    /// Conversion results, if conversion ran.
    pub conversion: Option<ConversionReport>,
    /// The consolidated document, if one was written.
    pub consolidated: Option<ConsolidatedArtifact>,
    /// Set when conversion or consolidation stopped the pipeline.
    pub failure: Option<StepFailure>,
}

/// Run document-per-row generation and, unless disabled in `options`,
/// convert exactly the generated documents and consolidate the results in
/// row order into `<output-dir>/merged.pdf`.
///
/// Rows and single conversions may fail without stopping the pipeline.
/// An unavailable converter, a batch where nothing converted, or a failed
/// consolidation stops it; the report is still returned with
/// [`SplitReport::failure`] set. Only generation errors are returned as `Err`.
pub fn run_split_pipeline<D, C, M>(
    template: &D,
    template_path: &Path,
    table: &Table,
    options: &MergeOptions,
    converter: &C,
    merger: &M,
) -> Result<SplitReport>
where
    D: TemplateDocument,
    C: PageConverter,
    M: PageMerger,
{
    let merge = merge_document_per_row(template, template_path, table, options)?;
    let mut report = SplitReport {
        merge,
        conversion: None,
        consolidated: None,
        failure: None,
    };

    if !options.converts_outputs() {
        log::debug!("Conversion disabled; stopping after generation");
        return Ok(report);
    }
    if report.merge.artifacts.is_empty() {
        log::warn!("No documents were generated; nothing to convert");
        return Ok(report);
    }

    let conversion = match convert_batch(converter, &report.merge.artifacts) {
        Ok(conversion) => conversion,
        Err(err) => {
            report.failure = Some(StepFailure::new(PipelineStep::Conversion, &err));
            return Ok(report);
        }
    };
    if conversion.converted.is_empty() {
        if let Some(first) = conversion.failed.first() {
            let err = Error::Conversion {
                path: first.source.clone(),
                reason: format!(
                    "all {} conversion(s) failed, first: {}",
                    conversion.failed.len(),
                    first.reason
                ),
            };
            report.failure = Some(StepFailure::new(PipelineStep::Conversion, &err));
            report.conversion = Some(conversion);
            return Ok(report);
        }
    }

    let output = options.output_dir().join(CONSOLIDATED_NAME);
    match consolidate(merger, &conversion.targets(), &output) {
        Ok(consolidated) => report.consolidated = Some(consolidated),
        Err(err) => report.failure = Some(StepFailure::new(PipelineStep::Consolidation, &err)),
    }
    report.conversion = Some(conversion);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consolidate::tests::RecordingMerger;
    use crate::convert::tests::FakeConverter;
    use crate::merge::tests::{name_table, MemoryDocument};
    use std::path::PathBuf;

    #[test]
    fn test_pipeline_converts_and_consolidates_in_row_order() {
        let template = MemoryDocument::with_slides(&["Dear name"]);
        let names: Vec<String> = (0..11).map(|i| format!("P{}", i)).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let table = name_table(&refs);
        let converter = FakeConverter::default();
        let merger = RecordingMerger::default();
        let options = MergeOptions::new().with_output_dir("out");

        let report = run_split_pipeline(
            &template,
            Path::new("deck.pptx"),
            &table,
            &options,
            &converter,
            &merger,
        )
        .unwrap();

        assert_eq!(report.merge.artifacts.len(), 11);
        assert_eq!(converter.counters.borrow().opened, 1);
        assert_eq!(converter.counters.borrow().released, 1);

        let consolidated = report.consolidated.unwrap();
        assert_eq!(consolidated.path, PathBuf::from("out/merged.pdf"));
        let expected: Vec<PathBuf> = (2..=12)
            .map(|n| PathBuf::from(format!("out/Row_{:03}_slide.pdf", n)))
            .collect();
        assert_eq!(consolidated.inputs, expected);
    }

    #[test]
    fn test_pipeline_without_conversion() {
        let template = MemoryDocument::with_slides(&["Dear name"]);
        let table = name_table(&["Ann"]);
        let converter = FakeConverter::default();
        let merger = RecordingMerger::default();
        let options = MergeOptions::new().with_conversion(false);

        let report = run_split_pipeline(
            &template,
            Path::new("deck.pptx"),
            &table,
            &options,
            &converter,
            &merger,
        )
        .unwrap();

        assert_eq!(report.merge.artifacts.len(), 1);
        assert!(report.conversion.is_none());
        assert_eq!(converter.counters.borrow().opened, 0);
    }

    #[test]
    fn test_pipeline_converter_unavailable() {
        let template = MemoryDocument::with_slides(&["Dear name"]);
        let table = name_table(&["Ann"]);
        let converter = FakeConverter {
            unavailable: true,
            ..FakeConverter::default()
        };
        let merger = RecordingMerger::default();

        let report = run_split_pipeline(
            &template,
            Path::new("deck.pptx"),
            &table,
            &MergeOptions::new(),
            &converter,
            &merger,
        )
        .unwrap();

        assert_eq!(report.merge.artifacts.len(), 1);
        assert!(report.conversion.is_none());
        assert!(report.consolidated.is_none());
        let failure = report.failure.unwrap();
        assert_eq!(failure.step, PipelineStep::Conversion);
        assert!(failure.reason.contains("not installed"));
    }

    #[test]
    fn test_pipeline_all_conversions_failed_keeps_report() {
        let template = MemoryDocument::with_slides(&["Dear name"]);
        let table = name_table(&["Ann", "Bo"]);
        let converter = FakeConverter::default();
        let merger = RecordingMerger::default();
        let options = MergeOptions::new().with_output_dir("bad");

        let report = run_split_pipeline(
            &template,
            Path::new("deck.pptx"),
            &table,
            &options,
            &converter,
            &merger,
        )
        .unwrap();

        assert_eq!(report.merge.artifacts.len(), 2);
        assert_eq!(report.conversion.as_ref().unwrap().failed.len(), 2);
        assert_eq!(report.failure.unwrap().step, PipelineStep::Conversion);
        assert!(merger.calls.borrow().is_empty());
    }

    #[test]
    fn test_pipeline_consolidation_failure_keeps_report() {
        let template = MemoryDocument::with_slides(&["Dear name"]);
        let table = name_table(&["Ann", "Bo"]);
        let converter = FakeConverter::default();
        let merger = RecordingMerger::default();
        let options = MergeOptions::new().with_output_dir("missing");

        let report = run_split_pipeline(
            &template,
            Path::new("deck.pptx"),
            &table,
            &options,
            &converter,
            &merger,
        )
        .unwrap();

        assert_eq!(report.conversion.as_ref().unwrap().converted.len(), 2);
        assert!(report.consolidated.is_none());
        let failure = report.failure.clone().unwrap();
        assert_eq!(failure.step, PipelineStep::Consolidation);
        assert!(failure.reason.contains("unreadable"));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["failure"]["step"], "consolidation");
        assert_eq!(json["merge"]["artifacts"].as_array().unwrap().len(), 2);
    }
}
