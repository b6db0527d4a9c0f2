//! PPTX (Office Open XML) template backend for slide-deck mail merge.
//!
//! A .pptx file is a ZIP archive of XML parts. Slides are parsed into the
//! shape/paragraph/run tree of `mailmerge-core`; on save, only slides whose
//! run text changed are re-serialized and every other part is copied as is.

pub mod package;
mod slide;

pub use package::PptxDocument;
