//! The seam between the merge engine and a concrete document format.

use crate::error::Result;
use crate::types::Deck;
use std::path::Path;

/// A loaded template that exposes its text tree and can be saved.
///
/// `Clone` must produce a fully independent copy: document-per-row mode
/// clones the template once per row and mutates each copy separately.
pub trait TemplateDocument: Clone {
    /// The text tree.
    fn deck(&self) -> &Deck;

    /// Mutable access to run text. Implementations may assume the tree's
    /// shape (slides, shapes, paragraphs, runs) is never changed.
    fn deck_mut(&mut self) -> &mut Deck;

    /// Write the document, with current run text, to `path`.
    ///
    /// Every call writes a complete document, so repeated saves to the same
    /// path act as checkpoints.
    fn save(&self, path: &Path) -> Result<()>;
}
