use strum::{Display, IntoStaticStr};

/// Phase of the round currently driven by a machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum RoundPhase {
    #[default]
    Idle,
    /// Pre-round countdown; `remaining` ticks left
    Countdown { remaining: u32 },
    /// Prompt is shown, input is not yet live
    Revealing,
    Active,
    Resolved,
    TimedOut,
    /// The missed answer is on screen before the next round
    ShowingAnswer,
    /// Session over
    Finished,
}

impl RoundPhase {
    pub fn accepts_input(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// A round has been started and has not produced an outcome yet
    pub fn is_in_round(&self) -> bool {
        matches!(
            self,
            Self::Countdown { .. } | Self::Revealing | Self::Active
        )
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Finished)
    }
}
