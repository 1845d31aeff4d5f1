use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use tracing::{debug, warn};

use super::{Prompt, PromptSource, SharedPrompt};
use crate::error::{Error, Result};

/// Difficulty target a fresh player starts at
pub const DEFAULT_TARGET: u32 = 300;
pub const TARGET_MIN: u32 = 100;
pub const TARGET_MAX: u32 = 2000;

/// Random spread added to each candidate's distance from the target
const PICK_JITTER: f64 = 5.0;

/// How the pool chooses the next prompt
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PickMode {
    #[default]
    Random,
    /// Closest difficulty to the player's current target
    Adaptive,
}

/// Move the difficulty target after a solved round.
pub fn update_target(current: u32, wpm: f64, accuracy: f64) -> u32 {
    let delta = (wpm - 45.0) * 4.0 + (accuracy - 95.0) * 6.0;
    (current as f64 + delta)
        .round()
        .clamp(TARGET_MIN as f64, TARGET_MAX as f64) as u32
}

/// Owns the fetched prompts and hands out shared references to them.
pub struct PromptPool {
    prompts: Vec<SharedPrompt>,
    current: Option<SharedPrompt>,
    target: u32,
    rng: StdRng,
}

impl PromptPool {
    pub fn new(prompts: Vec<Prompt>) -> Self {
        Self::with_rng(prompts, StdRng::from_os_rng())
    }

    /// Pool with a fixed seed, for reproducible picks
    pub fn with_seed(prompts: Vec<Prompt>, seed: u64) -> Self {
        Self::with_rng(prompts, StdRng::seed_from_u64(seed))
    }

    fn with_rng(prompts: Vec<Prompt>, rng: StdRng) -> Self {
        Self {
            prompts: prompts.into_iter().map(Arc::new).collect(),
            current: None,
            target: DEFAULT_TARGET,
            rng,
        }
    }

    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }

    pub fn prompts(&self) -> &[SharedPrompt] {
        &self.prompts
    }

    pub fn current(&self) -> Option<&SharedPrompt> {
        self.current.as_ref()
    }

    pub fn target(&self) -> u32 {
        self.target
    }

    pub fn set_target(&mut self, target: u32) {
        self.target = target.clamp(TARGET_MIN, TARGET_MAX);
    }

    /// Feed a solved round's speed and accuracy into the difficulty target.
    pub fn record_result(&mut self, wpm: f64, accuracy: f64) -> u32 {
        let next = update_target(self.target, wpm, accuracy);
        debug!("Difficulty target {} -> {}", self.target, next);
        self.target = next;
        next
    }

    /// Replace the prompt list with a fresh fetch.
    ///
    /// A failed or empty fetch keeps the current prompts and reports the
    /// error; no retry is attempted.
    pub fn refresh(&mut self, source: &dyn PromptSource) -> Result<usize> {
        match source.fetch_prompts() {
            Ok(prompts) if !prompts.is_empty() => {
                self.prompts = prompts.into_iter().map(Arc::new).collect();
                self.current = None;
                debug!("Loaded {} prompts", self.prompts.len());
                Ok(self.prompts.len())
            }
            Ok(_) => {
                warn!("Prompt source returned no prompts, keeping {}", self.len());
                Err(Error::DataUnavailable("prompt source returned no prompts".into()))
            }
            Err(e) => {
                warn!("Prompt fetch failed, keeping {}: {}", self.len(), e);
                Err(e)
            }
        }
    }

    /// Pick the next prompt and make it current.
    pub fn next(&mut self, mode: PickMode) -> Option<SharedPrompt> {
        let picked = match mode {
            PickMode::Random => self.pick_random(),
            PickMode::Adaptive => self.pick_adaptive(),
        }?;
        self.current = Some(Arc::clone(&picked));
        Some(picked)
    }

    fn candidates(&self) -> Vec<&SharedPrompt> {
        let current_id = self.current.as_ref().map(|p| p.id);
        let others: Vec<_> = self
            .prompts
            .iter()
            .filter(|p| Some(p.id) != current_id)
            .collect();
        if others.is_empty() {
            self.prompts.iter().collect()
        } else {
            others
        }
    }

    fn pick_random(&mut self) -> Option<SharedPrompt> {
        let len = self.candidates().len();
        if len == 0 {
            return None;
        }
        let idx = self.rng.random_range(0..len);
        self.candidates().get(idx).map(|p| Arc::clone(p))
    }

    fn pick_adaptive(&mut self) -> Option<SharedPrompt> {
        let target = self.target as f64;
        let len = self.candidates().len();
        let jitter: Vec<f64> = (0..len)
            .map(|_| self.rng.random_range(0.0..PICK_JITTER))
            .collect();
        self.candidates()
            .into_iter()
            .zip(jitter)
            .map(|(p, j)| (p, (p.difficulty_score as f64 - target).abs() + j))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(p, _)| Arc::clone(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::StaticPrompts;

    fn sample() -> Vec<Prompt> {
        vec![
            Prompt::new(1, "こんにちは", "konnichiwa", 300),
            Prompt::new(2, "ありがとうございます", "arigatougozaimasu", 500),
            Prompt::new(3, "すばやいきつね", "subayaikitsune", 350),
            Prompt::new(4, "タイプスクリプト", "taipusukuriputo", 700),
        ]
    }

    #[test]
    fn test_update_target_clamps() {
        assert_eq!(update_target(300, 45.0, 95.0), 300);
        assert_eq!(update_target(300, 55.0, 100.0), 370);
        assert_eq!(update_target(150, 0.0, 50.0), TARGET_MIN);
        assert_eq!(update_target(1990, 200.0, 100.0), TARGET_MAX);
    }

    #[test]
    fn test_random_pick_never_repeats_current() {
        let mut pool = PromptPool::with_seed(sample(), 7);
        let mut last = pool.next(PickMode::Random).unwrap().id;
        for _ in 0..50 {
            let next = pool.next(PickMode::Random).unwrap().id;
            assert_ne!(next, last);
            last = next;
        }
    }

    #[test]
    fn test_single_prompt_repeats() {
        let mut pool = PromptPool::with_seed(vec![Prompt::new(9, "a", "a", 100)], 1);
        assert_eq!(pool.next(PickMode::Random).unwrap().id, 9);
        assert_eq!(pool.next(PickMode::Adaptive).unwrap().id, 9);
    }

    #[test]
    fn test_adaptive_pick_tracks_target() {
        let mut pool = PromptPool::with_seed(sample(), 3);
        pool.set_target(700);
        assert_eq!(pool.next(PickMode::Adaptive).unwrap().id, 4);
        // Current is excluded, 500 is the next closest
        assert_eq!(pool.next(PickMode::Adaptive).unwrap().id, 2);
    }

    #[test]
    fn test_empty_pool_picks_nothing() {
        let mut pool = PromptPool::with_seed(Vec::new(), 0);
        assert!(pool.next(PickMode::Random).is_none());
        assert!(pool.current().is_none());
    }

    #[test]
    fn test_refresh_keeps_prompts_on_empty_fetch() {
        let mut pool = PromptPool::with_seed(sample(), 0);
        let err = pool.refresh(&StaticPrompts::new(Vec::new())).unwrap_err();
        assert!(err.is_data_unavailable());
        assert_eq!(pool.len(), 4);

        let count = pool
            .refresh(&StaticPrompts::new(vec![Prompt::new(5, "ねこ", "neko", 120)]))
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(pool.prompts()[0].canonical_romaji, "neko");
    }

    #[test]
    fn test_record_result_moves_target() {
        let mut pool = PromptPool::with_seed(sample(), 0);
        assert_eq!(pool.target(), DEFAULT_TARGET);
        assert_eq!(pool.record_result(50.0, 95.0), 320);
        assert_eq!(pool.target(), 320);
    }
}
