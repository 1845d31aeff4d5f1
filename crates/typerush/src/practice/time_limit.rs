use crate::score::Difficulty;

/// Per-character allowance and ceiling for one difficulty
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeLimitPreset {
    pub per_char_ms: i64,
    pub max_secs: i64,
}

pub fn preset(difficulty: Difficulty) -> TimeLimitPreset {
    match difficulty {
        Difficulty::Easy => TimeLimitPreset {
            per_char_ms: 500,
            max_secs: 45,
        },
        Difficulty::Normal => TimeLimitPreset {
            per_char_ms: 400,
            max_secs: 34,
        },
        Difficulty::Hard => TimeLimitPreset {
            per_char_ms: 300,
            max_secs: 20,
        },
    }
}

/// Seconds allowed for typing `romaji`, counting every character.
///
/// Rounded to whole seconds, never less than one.
pub fn time_limit_secs(romaji: &str, difficulty: Difficulty) -> i64 {
    let preset = preset(difficulty);
    let len = romaji.chars().count() as f64;
    let secs = (len * preset.per_char_ms as f64 / 1000.0).min(preset.max_secs as f64);
    (secs.round() as i64).max(1)
}

pub fn time_limit_ms(romaji: &str, difficulty: Difficulty) -> i64 {
    time_limit_secs(romaji, difficulty) * 1000
}
