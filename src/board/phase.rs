//! Match phase state machine.
//!
//! Phases advance linearly and never cycle:
//! `Before -> FirstHalf -> HalfTime -> SecondHalf -> Ended`. Every
//! transition is caused by an explicit [`PhaseAction`] checked against one
//! central table; nothing advances on a timer. The formation-changing flag
//! is an orthogonal overlay that permits free dragging between kickoff and
//! full time.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Phase of the match session.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumIter,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum MatchPhase {
    /// Roster building; free dragging, no match actions.
    Before,
    /// First half in progress.
    FirstHalf,
    /// Interval between halves.
    HalfTime,
    /// Second half in progress.
    SecondHalf,
    /// Match over; terminal.
    Ended,
}

/// An action that may cause a phase transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum PhaseAction {
    /// Kickoff: confirm the opponent team name and start the first half.
    StartMatch,
    /// End the first half and enter half-time.
    EndFirstHalf,
    /// Confirm the second-half start.
    StartSecondHalf,
    /// End the match from the second half.
    EndMatch,
    /// End the match early, from the first half, with explicit confirmation.
    EndMatchOverride,
    /// Raise the formation-changing overlay.
    BeginFormationChange,
    /// Confirm the formation change, clearing the overlay.
    ConfirmFormationChange,
    /// Abandon the formation change, clearing the overlay.
    CancelFormationChange,
}

/// Rejection from the transition table.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum PhaseError {
    /// The action is not legal in the current phase.
    #[display("{action} is not allowed during {phase}")]
    NotAllowed {
        /// The rejected action.
        action: PhaseAction,
        /// Phase at the time of the attempt.
        phase: MatchPhase,
    },
    /// Ending from the first half needs the explicit override action.
    #[display("the first half has not ended; ending now requires an explicit override")]
    OverrideRequired,
    /// A formation-change confirmation or cancel arrived with no change
    /// in progress.
    #[display("no formation change is in progress")]
    NotChangingFormation,
}

impl std::error::Error for PhaseError {}

/// The phase machine: current phase plus the formation-changing overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseMachine {
    phase: MatchPhase,
    formation_changing: bool,
}

impl Default for PhaseMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseMachine {
    /// Creates a machine in the `Before` phase.
    pub fn new() -> Self {
        Self {
            phase: MatchPhase::Before,
            formation_changing: false,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    /// True while the formation-changing overlay is raised.
    pub fn formation_changing(&self) -> bool {
        self.formation_changing
    }

    /// True once kickoff has happened and the match has not ended.
    pub fn is_match_started(&self) -> bool {
        matches!(
            self.phase,
            MatchPhase::FirstHalf | MatchPhase::HalfTime | MatchPhase::SecondHalf
        )
    }

    /// True when tokens may be dragged freely: before kickoff, or while the
    /// formation-changing overlay is raised.
    pub fn allows_free_drag(&self) -> bool {
        self.phase == MatchPhase::Before || self.formation_changing
    }

    /// True when a goal can be recorded. Goal actions are hidden while the
    /// formation overlay is up.
    pub fn can_record_goal(&self) -> bool {
        !self.formation_changing
            && matches!(self.phase, MatchPhase::FirstHalf | MatchPhase::SecondHalf)
    }

    /// True when a substitution can start. Substitutions are also offered
    /// during half-time while adjusting for the second half.
    pub fn can_substitute(&self) -> bool {
        match self.phase {
            MatchPhase::FirstHalf | MatchPhase::SecondHalf => !self.formation_changing,
            MatchPhase::HalfTime => self.formation_changing,
            _ => false,
        }
    }

    /// Applies an action through the central transition table.
    ///
    /// On rejection the machine is unchanged.
    pub fn apply(&mut self, action: PhaseAction) -> Result<(), PhaseError> {
        use MatchPhase::*;
        use PhaseAction::*;

        let next = match (self.phase, action) {
            (Before, StartMatch) => Some(FirstHalf),
            (FirstHalf, EndFirstHalf) => Some(HalfTime),
            (HalfTime, StartSecondHalf) => Some(SecondHalf),
            (SecondHalf, EndMatch | EndMatchOverride) => Some(Ended),
            (FirstHalf, EndMatchOverride) => Some(Ended),
            (FirstHalf, EndMatch) => {
                warn!("end-match refused: first half still in progress");
                return Err(PhaseError::OverrideRequired);
            }
            (phase, BeginFormationChange) => {
                if matches!(phase, FirstHalf | HalfTime | SecondHalf) {
                    self.formation_changing = true;
                    info!(%phase, "formation change begun");
                    return Ok(());
                }
                return Err(PhaseError::NotAllowed { action, phase });
            }
            (_, ConfirmFormationChange | CancelFormationChange) => {
                if !self.formation_changing {
                    return Err(PhaseError::NotChangingFormation);
                }
                self.formation_changing = false;
                info!(phase = %self.phase, %action, "formation change closed");
                return Ok(());
            }
            _ => None,
        };

        match next {
            Some(next) => {
                info!(from = %self.phase, to = %next, %action, "phase transition");
                self.phase = next;
                // Half-time invites pre-second-half adjustments; confirming
                // or canceling the second-half start clears the overlay.
                self.formation_changing = next == HalfTime;
                Ok(())
            }
            None => Err(PhaseError::NotAllowed {
                action,
                phase: self.phase,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    fn advance(machine: &mut PhaseMachine, action: PhaseAction) {
        machine.apply(action).expect("legal transition");
    }

    #[test]
    fn phases_advance_linearly() {
        let mut machine = PhaseMachine::new();
        assert_eq!(machine.phase(), MatchPhase::Before);
        advance(&mut machine, PhaseAction::StartMatch);
        assert_eq!(machine.phase(), MatchPhase::FirstHalf);
        advance(&mut machine, PhaseAction::EndFirstHalf);
        assert_eq!(machine.phase(), MatchPhase::HalfTime);
        advance(&mut machine, PhaseAction::StartSecondHalf);
        assert_eq!(machine.phase(), MatchPhase::SecondHalf);
        advance(&mut machine, PhaseAction::EndMatch);
        assert_eq!(machine.phase(), MatchPhase::Ended);
    }

    #[test]
    fn ended_is_terminal() {
        let mut machine = PhaseMachine::new();
        advance(&mut machine, PhaseAction::StartMatch);
        advance(&mut machine, PhaseAction::EndFirstHalf);
        advance(&mut machine, PhaseAction::StartSecondHalf);
        advance(&mut machine, PhaseAction::EndMatch);

        use PhaseAction::*;
        for action in [
            StartMatch,
            EndFirstHalf,
            StartSecondHalf,
            EndMatch,
            EndMatchOverride,
            BeginFormationChange,
            ConfirmFormationChange,
            CancelFormationChange,
        ] {
            assert!(machine.apply(action).is_err(), "{action} escaped Ended");
            assert_eq!(machine.phase(), MatchPhase::Ended);
        }
    }

    #[test]
    fn no_phase_can_be_skipped() {
        let mut machine = PhaseMachine::new();
        assert!(machine.apply(PhaseAction::EndFirstHalf).is_err());
        assert!(machine.apply(PhaseAction::StartSecondHalf).is_err());
        assert!(machine.apply(PhaseAction::EndMatch).is_err());
    }

    #[test]
    fn ending_the_first_half_early_needs_override() {
        let mut machine = PhaseMachine::new();
        advance(&mut machine, PhaseAction::StartMatch);
        assert_eq!(
            machine.apply(PhaseAction::EndMatch),
            Err(PhaseError::OverrideRequired)
        );
        assert_eq!(machine.phase(), MatchPhase::FirstHalf);
        advance(&mut machine, PhaseAction::EndMatchOverride);
        assert_eq!(machine.phase(), MatchPhase::Ended);
    }

    #[test]
    fn half_time_raises_the_formation_overlay() {
        let mut machine = PhaseMachine::new();
        advance(&mut machine, PhaseAction::StartMatch);
        assert!(!machine.formation_changing());
        advance(&mut machine, PhaseAction::EndFirstHalf);
        assert!(machine.formation_changing());
        advance(&mut machine, PhaseAction::StartSecondHalf);
        assert!(!machine.formation_changing());
    }

    #[test]
    fn formation_overlay_only_between_kickoff_and_full_time() {
        let mut machine = PhaseMachine::new();
        assert!(machine.apply(PhaseAction::BeginFormationChange).is_err());

        advance(&mut machine, PhaseAction::StartMatch);
        advance(&mut machine, PhaseAction::BeginFormationChange);
        assert!(machine.formation_changing());
        assert!(machine.allows_free_drag());
        assert!(!machine.can_record_goal());

        advance(&mut machine, PhaseAction::CancelFormationChange);
        assert!(!machine.formation_changing());
        assert!(!machine.allows_free_drag());
        assert!(machine.can_record_goal());
    }

    #[test]
    fn substitutions_at_half_time_require_the_overlay() {
        let mut machine = PhaseMachine::new();
        advance(&mut machine, PhaseAction::StartMatch);
        assert!(machine.can_substitute());
        advance(&mut machine, PhaseAction::EndFirstHalf);
        // Overlay is up automatically, inviting second-half adjustments.
        assert!(machine.can_substitute());
        advance(&mut machine, PhaseAction::CancelFormationChange);
        assert!(!machine.can_substitute());
    }

    #[test]
    fn free_drag_before_kickoff_only() {
        let mut machine = PhaseMachine::new();
        assert!(machine.allows_free_drag());
        advance(&mut machine, PhaseAction::StartMatch);
        assert!(!machine.allows_free_drag());
    }

    #[test]
    fn rejected_actions_leave_the_machine_unchanged() {
        for phase in MatchPhase::iter() {
            let machine = PhaseMachine {
                phase,
                formation_changing: false,
            };
            let mut probe = machine;
            let _ = probe.apply(PhaseAction::StartSecondHalf);
            if machine.phase != MatchPhase::HalfTime {
                assert_eq!(probe, machine);
            }
        }
    }
}
