use std::collections::HashSet;

use super::rules::{VariantRule, rule_at};

/// Default upper bound on the number of spellings produced per canonical string.
pub const DEFAULT_VARIANT_CAP: usize = 256;

#[derive(Debug, Clone, Copy)]
enum Segment {
    Literal(char),
    Rule(&'static VariantRule),
}

/// Split `chars` into rule segments and literal characters, taking the
/// longest matching rule at each position from left to right.
fn segment(chars: &[char]) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut pos = 0;
    while pos < chars.len() {
        match rule_at(chars, pos) {
            Some(rule) => {
                segments.push(Segment::Rule(rule));
                pos += rule.pattern.chars().count();
            }
            None => {
                segments.push(Segment::Literal(chars[pos]));
                pos += 1;
            }
        }
    }
    segments
}

/// Expand `canonical` into every accepted spelling, up to `cap` entries.
///
/// The expansion is a table over segment indices filled from the end: row `i`
/// holds the distinct spellings of segments `i..`, each row capped at `cap`.
/// The canonical string is always the first entry of the result, so the output
/// is non-empty for any `cap` (a `cap` of zero is treated as one).
///
/// Output order is fully determined by the rule table and the input.
pub fn expand_variants(canonical: &str, cap: usize) -> Vec<String> {
    let cap = cap.max(1);
    let chars: Vec<char> = canonical.chars().collect();
    let segments = segment(&chars);

    let mut table: Vec<Vec<String>> = vec![Vec::new(); segments.len() + 1];
    table[segments.len()].push(String::new());

    for i in (0..segments.len()).rev() {
        let (head, tail) = table.split_at_mut(i + 1);
        let suffixes = &tail[0];
        let row = &mut head[i];
        let mut seen = HashSet::new();

        let alternatives: Vec<String> = match segments[i] {
            Segment::Literal(c) => vec![c.to_string()],
            Segment::Rule(rule) => rule.alternatives.iter().map(|a| a.to_string()).collect(),
        };

        'fill: for alt in &alternatives {
            for suffix in suffixes {
                if row.len() >= cap {
                    break 'fill;
                }
                let spelling = format!("{alt}{suffix}");
                if seen.insert(spelling.clone()) {
                    row.push(spelling);
                }
            }
        }
    }

    let mut variants = std::mem::take(&mut table[0]);
    if let Some(idx) = variants.iter().position(|v| v == canonical) {
        if idx != 0 {
            let canon = variants.remove(idx);
            variants.insert(0, canon);
        }
    } else {
        variants.insert(0, canonical.to_string());
        variants.truncate(cap);
    }
    variants
}
