//! Core of the slide-deck mail merge: placeholder resolution, run-level
//! substitution, row-to-output merge strategies, conversion sessions and
//! ordered consolidation.

pub mod artifacts;
pub mod consolidate;
pub mod convert;
pub mod document;
pub mod error;
pub mod merge;
pub mod pipeline;
pub mod resolve;
pub mod substitute;
pub mod types;

pub use artifacts::{discover_artifacts, order_artifacts, ArtifactFilter, CONSOLIDATED_NAME};
pub use consolidate::{consolidate, ConsolidatedArtifact, PageMerger};
pub use convert::{convert_batch, convert_one, ConversionReport, ConversionSession, PageConverter};
pub use document::TemplateDocument;
pub use error::{Error, ErrorClass, Result};
pub use merge::{merge_document_per_row, merge_slide_per_row, MergeMode, MergeOptions, MergeReport};
pub use pipeline::{run_split_pipeline, PipelineStep, SplitReport, StepFailure};
pub use resolve::{resolve, ReplacementMap};
pub use substitute::{substitute_deck, substitute_shape, substitute_slide};
pub use types::{CellValue, DataRow, Deck, DocumentFormat, Paragraph, Run, Shape, Slide, Table, TextFrame};
