use super::variants::{DEFAULT_VARIANT_CAP, expand_variants};

/// Case-normalize a romaji string for comparison.
pub fn normalize(s: &str) -> String {
    s.to_lowercase()
}

/// Highlight split of the spelling closest to the current input.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Highlight {
    /// Portion of the chosen spelling already typed correctly
    pub matched: String,
    /// Next expected character, `None` once the spelling is fully typed
    pub next_char: Option<char>,
    /// Everything after `next_char`
    pub remainder: String,
    /// True when the input runs past the matched prefix
    pub is_mismatch: bool,
}

/// A canonical spelling with its accepted variants expanded once.
///
/// Rounds build one of these when a prompt becomes current so each keystroke
/// only scans the precomputed spellings.
#[derive(Debug, Clone)]
pub struct RomajiTarget {
    canonical: String,
    variants: Vec<String>,
}

impl RomajiTarget {
    pub fn new(canonical: &str) -> Self {
        Self::with_cap(canonical, DEFAULT_VARIANT_CAP)
    }

    pub fn with_cap(canonical: &str, cap: usize) -> Self {
        let canonical = normalize(canonical);
        let variants = expand_variants(&canonical, cap);
        Self {
            canonical,
            variants,
        }
    }

    /// Normalized canonical spelling
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    /// All accepted spellings, canonical first
    pub fn variants(&self) -> &[String] {
        &self.variants
    }

    /// True iff `input` can still grow into an accepted spelling.
    ///
    /// Empty input is always valid. An empty target accepts any input as a
    /// prefix (there is nothing to diverge from).
    pub fn is_prefix_valid(&self, input: &str) -> bool {
        if input.is_empty() || self.canonical.is_empty() {
            return true;
        }
        let input = normalize(input);
        self.variants.iter().any(|v| v.starts_with(&input))
    }

    /// True iff `input` (trimmed, case-normalized) is exactly an accepted spelling.
    ///
    /// A blank target is completed only by exactly its own text.
    pub fn is_complete(&self, input: &str) -> bool {
        if self.canonical.trim().is_empty() {
            return input == self.canonical;
        }
        let input = normalize(input.trim());
        self.variants.iter().any(|v| v.trim() == input)
    }

    /// Pick the spelling sharing the longest prefix with `input` and split it
    /// for display. Ties go to the earlier spelling (canonical first).
    pub fn highlight(&self, input: &str) -> Highlight {
        let input: Vec<char> = normalize(input).chars().collect();

        let mut best: &str = &self.canonical;
        let mut best_len = common_prefix_len(&input, best);
        for variant in &self.variants {
            if best_len == input.len() {
                break;
            }
            let len = common_prefix_len(&input, variant);
            if len > best_len {
                best = variant;
                best_len = len;
            }
        }

        let mut chars = best.chars();
        let matched: String = chars.by_ref().take(best_len).collect();
        let next_char = chars.next();
        let remainder: String = chars.collect();

        Highlight {
            matched,
            next_char,
            remainder,
            is_mismatch: input.len() > best_len,
        }
    }
}

fn common_prefix_len(input: &[char], spelling: &str) -> usize {
    input
        .iter()
        .zip(spelling.chars())
        .take_while(|(a, b)| **a == *b)
        .count()
}

/// True iff `input` is a prefix of `canonical` or of any of its variants.
pub fn is_prefix_valid(input: &str, canonical: &str) -> bool {
    RomajiTarget::new(canonical).is_prefix_valid(input)
}

/// True iff `input` is exactly `canonical` or one of its variants.
pub fn is_complete(input: &str, canonical: &str) -> bool {
    RomajiTarget::new(canonical).is_complete(input)
}

/// Highlight split for `input` against the closest spelling of `canonical`.
pub fn highlight_split(input: &str, canonical: &str) -> Highlight {
    RomajiTarget::new(canonical).highlight(input)
}
