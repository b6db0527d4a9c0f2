//! PDF backends for slide-deck mail merge: document conversion through a
//! headless LibreOffice and page consolidation with lopdf.

pub mod convert;
pub mod merge;

pub use convert::{SofficeConverter, SofficeSession};
pub use merge::LopdfMerger;
