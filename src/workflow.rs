//! Modal workflow state.
//!
//! At most one modal workflow is active at a time. Each workflow is a
//! tagged variant carrying its own payload, so the session can switch
//! exhaustively instead of juggling dialog booleans and step strings.

use crate::board::{Player, PlayerId};
use serde::{Deserialize, Serialize};

/// Step of the two-stage team-name entry at kickoff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TeamNameStep {
    /// Entering the ally team name.
    Ally,
    /// Entering the opponent team name; the ally name is already confirmed.
    Opponent {
        /// Confirmed ally team name.
        ally: String,
    },
}

/// Step of the two-stage substitution selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubstitutionStep {
    /// Choosing the player to take off.
    SelectOut,
    /// Choosing the replacement; the outgoing player is already chosen.
    SelectIn {
        /// Player leaving the field.
        out: PlayerId,
    },
}

/// The currently open modal workflow, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActiveWorkflow {
    /// Name entry for a new player.
    AddPlayer,
    /// Delete confirmation after a double-tap.
    ConfirmDelete {
        /// Player to be removed on confirmation.
        player: PlayerId,
    },
    /// Two-step team-name entry leading into kickoff.
    TeamNames(TeamNameStep),
    /// Goal-scorer selection.
    GoalScorer,
    /// Two-step substitution selection.
    Substitution(SubstitutionStep),
}

impl ActiveWorkflow {
    /// True for either substitution step; taps are routed to the selection
    /// while this holds.
    pub fn is_substitution(&self) -> bool {
        matches!(self, ActiveWorkflow::Substitution(_))
    }
}

/// Substitution candidates for the current step: everyone for `SelectOut`,
/// everyone but the outgoing player for `SelectIn`.
pub fn substitution_candidates<'a>(
    players: &'a [Player],
    step: &SubstitutionStep,
) -> Vec<&'a Player> {
    match step {
        SubstitutionStep::SelectOut => players.iter().collect(),
        SubstitutionStep::SelectIn { out } => players.iter().filter(|p| p.id != *out).collect(),
    }
}
