//! Romaji variant matching.
//!
//! A canonical romaji string can usually be typed several ways (`shi` / `si`,
//! `tsu` / `tu`, ...). This module expands the canonical spelling into the set
//! of accepted spellings and answers the per-keystroke questions a round needs:
//!
//! - **Prefix validity**: can the partial input still grow into an accepted spelling?
//! - **Completion**: is the input exactly one of the accepted spellings?
//! - **Highlight**: which part of the closest spelling is typed, next, and remaining?

mod matcher;
mod rules;
mod variants;

pub use matcher::{
    Highlight, RomajiTarget, highlight_split, is_complete, is_prefix_valid, normalize,
};
pub use rules::{VARIANT_RULES, VariantRule, rule_at};
pub use variants::{DEFAULT_VARIANT_CAP, expand_variants};
