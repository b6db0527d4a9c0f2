//! Run-level placeholder substitution.
//!
//! Matching happens inside a single run only. When formatting splits a token
//! across two runs (`"na"` + `"me"`), neither run contains the token and it
//! is left as-is. Template authors avoid this by typing each placeholder in
//! one go with uniform formatting.

use crate::resolve::ReplacementMap;
use crate::types::{Deck, Run, Shape, Slide};

/// Replace placeholders in one run. Returns true if the text changed.
///
/// Tokens are applied in map order, each against the result of the
/// previous one.
pub fn substitute_run(run: &mut Run, replacements: &ReplacementMap) -> bool {
    let mut changed = false;
    for (token, value) in replacements.iter() {
        if token.is_empty() {
            continue;
        }
        if run.text.contains(token) {
            let replaced = run.text.replace(token, value);
            changed |= replaced != run.text;
            run.text = replaced;
        }
    }
    changed
}

/// Replace placeholders in every run of a shape's text frame.
///
/// Shapes without a text frame are left alone. Returns the number of runs
/// whose text changed.
pub fn substitute_shape(shape: &mut Shape, replacements: &ReplacementMap) -> usize {
    let Some(text_frame) = shape.text_frame.as_mut() else {
        return 0;
    };

    let mut changed = 0;
    for paragraph in &mut text_frame.paragraphs {
        for run in &mut paragraph.runs {
            if substitute_run(run, replacements) {
                changed += 1;
            }
        }
    }
    changed
}

/// Replace placeholders in every shape of a slide.
pub fn substitute_slide(slide: &mut Slide, replacements: &ReplacementMap) -> usize {
    slide
        .shapes
        .iter_mut()
        .map(|shape| substitute_shape(shape, replacements))
        .sum()
}

/// Replace placeholders on every slide of a deck.
pub fn substitute_deck(deck: &mut Deck, replacements: &ReplacementMap) -> usize {
    deck.slides
        .iter_mut()
        .map(|slide| substitute_slide(slide, replacements))
        .sum()
}
