//! Touchline - an interactive tactical-board match-session engine
//!
//! This library drives a coach's tactical soccer board through a full
//! match: roster building, bench packing, drag and tap gestures, the
//! phase state machine, goal and substitution workflows, an append-only
//! event log and the capture/composition pipeline that exports the match
//! record as one stacked image.
//!
//! # Architecture
//!
//! - **Board**: domain types, bench layout, gesture engines, phases
//! - **Session**: the aggregate every host event flows through
//! - **Events**: the append-only match timeline
//! - **Capture**: async rasterize/decode boundary plus composition math
//! - **Backend**: host-free rasterizer and artifact sinks
//!
//! # Example
//!
//! ```no_run
//! use touchline::{BufferBackend, CapturePipeline, MatchSession, MemorySink};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let pipeline = CapturePipeline::new(
//!     Box::new(BufferBackend::new()),
//!     Box::new(MemorySink::new()),
//! );
//! let mut session = MatchSession::new(pipeline);
//! session.open_add_player();
//! session.confirm_add_player("Aoi")?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod backend;
mod board;
mod capture;
mod events;
mod session;
mod share;
mod workflow;

// Crate-level exports - Board domain
pub use board::{
    bench_index_of, bench_slot, is_on_bench, BoardGeometry, DragEngine, DragSession, MatchPhase,
    PhaseAction, PhaseError, PhaseMachine, Player, PlayerId, Point, Roster, RosterError,
    TapClassifier, DEFAULT_BG_COLOR, DEFAULT_COLOR, DOUBLE_TAP_WINDOW, FALLBACK_SLOT,
    PIECE_PADDING, PIECE_SIZE,
};

// Crate-level exports - Session aggregate
pub use session::{
    MatchSession, SessionError, DEFAULT_ALLY_NAME, DEFAULT_OPPONENT_NAME, LABEL_FIRST_HALF_END,
    LABEL_FORMATION_CHANGE, LABEL_KICKOFF, LABEL_MATCH_END, LABEL_SECOND_HALF_START,
};

// Crate-level exports - Event log
pub use events::{EventLog, LogEntry, NoteKind};

// Crate-level exports - Capture pipeline
pub use capture::{
    export_filename, plan_composite, ArtifactSink, BoardSnapshot, CaptureBackend, CaptureError,
    CapturePipeline, CompositeLayout, ImageData, RasterizeOptions, RgbaImage, SectionSlot,
    TokenSnapshot, CAPTURE_SCALE, COURT_BACKGROUND,
};

// Crate-level exports - Host-free backend and sinks
pub use backend::{parse_css_color, BufferBackend, FileSink, MemorySink};

// Crate-level exports - Modal workflows
pub use workflow::{substitution_candidates, ActiveWorkflow, SubstitutionStep, TeamNameStep};

// Crate-level exports - Share links
pub use share::{decode_players, encode_players, ShareError, PLAYERS_PARAM};
