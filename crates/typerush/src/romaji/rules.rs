/// A substitution rule: wherever `pattern` appears in a canonical spelling,
/// any of `alternatives` is accepted instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariantRule {
    pub pattern: &'static str,
    pub alternatives: &'static [&'static str],
}

/// Fixed rule table shared by every matcher call.
///
/// Alternatives are listed in preference order; the first one is what the
/// expansion tries first. `zzi` deliberately omits itself (the canonical
/// spelling is always added back by the expander).
pub const VARIANT_RULES: &[VariantRule] = &[
    VariantRule {
        pattern: "sha",
        alternatives: &["sha", "sya", "shya"],
    },
    VariantRule {
        pattern: "shu",
        alternatives: &["shu", "syu", "shyu"],
    },
    VariantRule {
        pattern: "sho",
        alternatives: &["sho", "syo", "shyo"],
    },
    VariantRule {
        pattern: "ja",
        alternatives: &["ja", "jya", "zya"],
    },
    VariantRule {
        pattern: "ju",
        alternatives: &["ju", "jyu", "zyu"],
    },
    VariantRule {
        pattern: "jo",
        alternatives: &["jo", "jyo", "zyo"],
    },
    VariantRule {
        pattern: "shi",
        alternatives: &["shi", "si"],
    },
    VariantRule {
        pattern: "chi",
        alternatives: &["chi", "ti", "ci"],
    },
    VariantRule {
        pattern: "tsu",
        alternatives: &["tsu", "tu"],
    },
    VariantRule {
        pattern: "ji",
        alternatives: &["ji", "zi"],
    },
    VariantRule {
        pattern: "fu",
        alternatives: &["fu", "hu"],
    },
    VariantRule {
        pattern: "zzi",
        alternatives: &["jji"],
    },
];

/// Find the rule whose pattern matches `chars` at `pos`, preferring the
/// longest pattern. Returns `None` when the character at `pos` is a literal.
pub fn rule_at(chars: &[char], pos: usize) -> Option<&'static VariantRule> {
    let rest = chars.get(pos..)?;
    VARIANT_RULES
        .iter()
        .filter(|rule| {
            let len = rule.pattern.chars().count();
            rest.len() >= len && rule.pattern.chars().zip(rest).all(|(p, c)| p == *c)
        })
        .max_by_key(|rule| rule.pattern.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn test_rule_at_matches_pattern() {
        let c = chars("tsuki");
        let rule = rule_at(&c, 0).unwrap();
        assert_eq!(rule.pattern, "tsu");
        assert!(rule_at(&c, 3).is_none());
    }

    #[test]
    fn test_rule_at_prefers_longest_pattern() {
        // "shi" and "sha" share a prefix with nothing shorter, but "zzi" must beat
        // any shorter rule that could also start at the same position.
        let c = chars("zzi");
        assert_eq!(rule_at(&c, 0).unwrap().pattern, "zzi");
        // At position 1 only the literal 'z' remains before "i".
        assert!(rule_at(&c, 1).is_none());
    }

    #[test]
    fn test_rule_at_out_of_range() {
        let c = chars("ka");
        assert!(rule_at(&c, 2).is_none());
        assert!(rule_at(&c, 10).is_none());
    }

    #[test]
    fn test_rule_table_patterns_are_lowercase_ascii() {
        for rule in VARIANT_RULES {
            assert!(rule.pattern.bytes().all(|b| b.is_ascii_lowercase()));
            assert!(!rule.alternatives.is_empty(), "{} has no alternatives", rule.pattern);
        }
    }
}
