/// Words per minute, counting five characters as a word, to one decimal.
pub fn compute_wpm(typed_chars: u64, elapsed_ms: i64) -> f64 {
    if elapsed_ms <= 0 {
        return 0.0;
    }
    let words = typed_chars as f64 / 5.0;
    let minutes = elapsed_ms as f64 / 60_000.0;
    round1((words / minutes).max(0.0))
}

/// Percentage of keystrokes that were accepted, to one decimal. 100 with no keystrokes.
pub fn compute_accuracy(total_keystrokes: u64, mistakes: u64) -> f64 {
    if total_keystrokes == 0 {
        return 100.0;
    }
    let correct = total_keystrokes.saturating_sub(mistakes);
    round1(correct as f64 / total_keystrokes as f64 * 100.0)
}

/// Typed fraction of the target, clamped to `0.0..=1.0`.
pub fn progress_ratio(input_len: usize, target_len: usize) -> f64 {
    if target_len == 0 {
        return 0.0;
    }
    (input_len as f64 / target_len as f64).clamp(0.0, 1.0)
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
