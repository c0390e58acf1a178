//! Board-level building blocks: domain types, bench layout, gesture
//! engines, the phase machine and the roster.

mod drag;
mod layout;
mod phase;
mod roster;
mod tap;
mod types;

pub use drag::{DragEngine, DragSession};
pub use layout::{
    bench_index_of, bench_slot, is_on_bench, FALLBACK_SLOT, PIECE_PADDING, PIECE_SIZE,
};
pub use phase::{MatchPhase, PhaseAction, PhaseError, PhaseMachine};
pub use roster::{Roster, RosterError};
pub use tap::{TapClassifier, DOUBLE_TAP_WINDOW};
pub use types::{BoardGeometry, Player, PlayerId, Point, DEFAULT_BG_COLOR, DEFAULT_COLOR};
