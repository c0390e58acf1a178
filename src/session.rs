//! The match session aggregate.
//!
//! One [`MatchSession`] owns the roster, the phase machine, the event log,
//! the gesture engines and the active modal workflow. Every mutation goes
//! through a named operation here, so id uniqueness, non-negative counters
//! and phase ordering are enforced at a single choke point. The session is
//! driven from the host's single event-handling thread; the only awaits
//! are capture-pipeline calls.

use crate::board::{
    BoardGeometry, DragEngine, MatchPhase, PhaseAction, PhaseError, PhaseMachine, Player,
    PlayerId, Point, Roster, RosterError, TapClassifier, bench_slot, is_on_bench,
};
use crate::capture::{
    BoardSnapshot, CaptureError, CapturePipeline, TokenSnapshot, export_filename,
};
use crate::events::{EventLog, LogEntry, NoteKind};
use crate::share::{ShareError, decode_players, encode_players};
use crate::workflow::{ActiveWorkflow, SubstitutionStep, TeamNameStep};
use chrono::Utc;
use tracing::{info, instrument, warn};

/// Default ally team name.
pub const DEFAULT_ALLY_NAME: &str = "味方チーム";

/// Default opponent team name.
pub const DEFAULT_OPPONENT_NAME: &str = "相手チーム";

/// Caption for the kickoff capture.
pub const LABEL_KICKOFF: &str = "試合開始";

/// Caption for the first-half-end capture.
pub const LABEL_FIRST_HALF_END: &str = "前半終了";

/// Caption for the second-half-start capture.
pub const LABEL_SECOND_HALF_START: &str = "後半開始";

/// Caption for formation-change captures.
pub const LABEL_FORMATION_CHANGE: &str = "フォーメーション変更";

/// Caption for the final capture at match end.
pub const LABEL_MATCH_END: &str = "試合終了";

/// Errors surfaced by session operations.
///
/// Every failure leaves the session in its pre-action state; workflows are
/// all-or-nothing with respect to roster and match mutation.
#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::From)]
pub enum SessionError {
    /// The phase machine rejected the transition.
    Phase(PhaseError),
    /// A roster operation failed.
    Roster(RosterError),
    /// The capture pipeline failed; no state was committed.
    Capture(CaptureError),
    /// The share link could not be decoded.
    Share(ShareError),
    /// A team name was empty after trimming.
    #[display("team name must not be empty")]
    #[from(skip)]
    EmptyTeamName,
    /// The roster is empty and the action needs players.
    #[display("add players first")]
    #[from(skip)]
    EmptyRoster,
    /// The action needs more players than the roster holds.
    #[display("at least {needed} players are required, have {have}")]
    #[from(skip)]
    NotEnoughPlayers {
        /// Minimum roster size for the action.
        needed: usize,
        /// Current roster size.
        have: usize,
    },
    /// The operation expected a different (or some) active workflow.
    #[display("no matching workflow is active")]
    #[from(skip)]
    WorkflowMismatch,
    /// A player cannot replace themselves in a substitution.
    #[display("a player cannot be substituted for themselves")]
    #[from(skip)]
    SelfSubstitution,
    /// The action is hidden in the current phase/overlay combination.
    #[display("{_0} is not available right now")]
    #[from(skip)]
    Unavailable(&'static str),
}

impl std::error::Error for SessionError {}

/// The singleton match-session state and its workflow operations.
#[derive(Debug)]
pub struct MatchSession {
    roster: Roster,
    phases: PhaseMachine,
    log: EventLog,
    drag: DragEngine,
    taps: TapClassifier,
    workflow: Option<ActiveWorkflow>,
    geometry: BoardGeometry,
    ally_name: String,
    opponent_name: String,
    getting_point: u32,
    lost_point: u32,
    pipeline: CapturePipeline,
}

impl MatchSession {
    /// Creates a fresh session with an empty roster and default team names.
    pub fn new(pipeline: CapturePipeline) -> Self {
        Self {
            roster: Roster::new(),
            phases: PhaseMachine::new(),
            log: EventLog::new(),
            drag: DragEngine::new(),
            taps: TapClassifier::new(),
            workflow: None,
            geometry: BoardGeometry::default(),
            ally_name: DEFAULT_ALLY_NAME.to_string(),
            opponent_name: DEFAULT_OPPONENT_NAME.to_string(),
            getting_point: 0,
            lost_point: 0,
            pipeline,
        }
    }

    /// Creates a session seeded from a share-link query string.
    ///
    /// Ids are assigned `0..n-1` in array order and tokens are placed at
    /// their bench ordinal. A malformed link is logged and ignored, leaving
    /// the roster empty, as a fresh board would be.
    #[instrument(skip(pipeline, query))]
    pub fn from_share_query(
        pipeline: CapturePipeline,
        query: &str,
        geometry: BoardGeometry,
    ) -> Self {
        let names = decode_players(query).unwrap_or_else(|err| {
            warn!(%err, "ignoring malformed share link");
            Vec::new()
        });
        let slots: Vec<Point> = (0..names.len())
            .map(|i| bench_slot(i, geometry.bench_width, geometry.bench_origin_y))
            .collect();
        let mut session = Self::new(pipeline);
        session.geometry = geometry;
        session.roster = Roster::seed(&names, &slots);
        session
    }

    // ─────────────────────────────────────────────────────────
    //  Geometry and bench packing
    // ─────────────────────────────────────────────────────────

    /// Updates the measured container geometry, re-packing the bench.
    ///
    /// Only the on-bench subset moves; players on the field keep their
    /// positions.
    #[instrument(skip(self))]
    pub fn set_geometry(&mut self, geometry: BoardGeometry) {
        self.geometry = geometry;
        self.repack_bench();
    }

    fn repack_bench(&mut self) {
        let origin_y = self.geometry.bench_origin_y;
        let on_bench: Vec<PlayerId> = self
            .roster
            .players()
            .iter()
            .filter(|p| is_on_bench(p, origin_y))
            .map(|p| p.id)
            .collect();
        for (index, id) in on_bench.into_iter().enumerate() {
            let slot = bench_slot(index, self.geometry.bench_width, origin_y);
            // Ids were just read from the roster; the write cannot miss.
            let _ = self.roster.set_position(id, slot);
        }
    }

    fn next_bench_slot(&self) -> Point {
        bench_slot(
            self.roster.len(),
            self.geometry.bench_width,
            self.geometry.bench_origin_y,
        )
    }

    // ─────────────────────────────────────────────────────────
    //  Roster workflows: add and delete
    // ─────────────────────────────────────────────────────────

    /// Opens the add-player name entry.
    pub fn open_add_player(&mut self) {
        self.workflow = Some(ActiveWorkflow::AddPlayer);
    }

    /// Confirms the add-player entry with the typed name.
    ///
    /// An empty name is rejected and the entry stays open.
    #[instrument(skip(self))]
    pub fn confirm_add_player(&mut self, name: &str) -> Result<PlayerId, SessionError> {
        if self.workflow != Some(ActiveWorkflow::AddPlayer) {
            return Err(SessionError::WorkflowMismatch);
        }
        let id = self.roster.add(name, self.next_bench_slot())?;
        self.workflow = None;
        info!(id, share = %self.share_query(), "player added");
        Ok(id)
    }

    /// Confirms the pending delete, removes the player and re-packs the
    /// bench.
    #[instrument(skip(self))]
    pub fn confirm_delete_player(&mut self) -> Result<Player, SessionError> {
        let Some(ActiveWorkflow::ConfirmDelete { player }) = self.workflow else {
            return Err(SessionError::WorkflowMismatch);
        };
        let removed = self.roster.remove(player)?;
        self.workflow = None;
        self.repack_bench();
        info!(id = removed.id, share = %self.share_query(), "player deleted");
        Ok(removed)
    }

    /// Cancels whatever modal workflow is open, discarding its selection.
    pub fn cancel_workflow(&mut self) {
        self.workflow = None;
    }

    // ─────────────────────────────────────────────────────────
    //  Taps
    // ─────────────────────────────────────────────────────────

    /// Routes a tap on a player token, using the current instant.
    pub fn tap(&mut self, player: PlayerId) -> Result<(), SessionError> {
        self.tap_at(player, std::time::Instant::now())
    }

    /// Routes a tap on a player token at an explicit instant.
    ///
    /// While a substitution selection is open the tap selects; after
    /// kickoff other taps are ignored; before kickoff a double-tap opens
    /// the delete confirmation.
    pub fn tap_at(&mut self, player: PlayerId, at: std::time::Instant) -> Result<(), SessionError> {
        if matches!(&self.workflow, Some(w) if w.is_substitution()) {
            return self.select_substitution_player(player);
        }
        if self.phases.is_match_started() {
            return Ok(());
        }
        if let Some(target) = self.taps.tap_at(player, at)
            && self.roster.get(target).is_some()
        {
            self.workflow = Some(ActiveWorkflow::ConfirmDelete { player: target });
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────
    //  Dragging
    // ─────────────────────────────────────────────────────────

    /// Begins dragging a token, when phase rules permit free placement.
    ///
    /// Outside those rules, and for unknown ids, the press is a no-op.
    pub fn drag_start(&mut self, player: PlayerId, pointer: Point) {
        if !self.phases.allows_free_drag() {
            return;
        }
        let Some(current) = self.roster.get(player) else {
            return;
        };
        self.drag
            .start(player, current.position, pointer, self.geometry.origin);
    }

    /// Moves the in-flight drag; the position write is immediate.
    pub fn drag_move(&mut self, pointer: Point) {
        if let Some((player, position)) = self.drag.drag_to(pointer, self.geometry.origin)
            && self.roster.set_position(player, position).is_err()
        {
            // The token vanished mid-drag; drop the session.
            self.drag.end();
        }
    }

    /// Ends any in-flight drag; the token keeps its last position.
    pub fn drag_end(&mut self) {
        self.drag.end();
    }

    // ─────────────────────────────────────────────────────────
    //  Kickoff
    // ─────────────────────────────────────────────────────────

    /// Opens the two-step team-name entry leading into kickoff.
    pub fn start_match(&mut self) -> Result<(), SessionError> {
        if self.phases.phase() != MatchPhase::Before {
            return Err(SessionError::Unavailable("starting the match"));
        }
        if self.roster.is_empty() {
            return Err(SessionError::EmptyRoster);
        }
        self.workflow = Some(ActiveWorkflow::TeamNames(TeamNameStep::Ally));
        Ok(())
    }

    /// Confirms the ally team name and advances to the opponent step.
    pub fn confirm_ally_name(&mut self, name: &str) -> Result<(), SessionError> {
        if !matches!(
            self.workflow,
            Some(ActiveWorkflow::TeamNames(TeamNameStep::Ally))
        ) {
            return Err(SessionError::WorkflowMismatch);
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(SessionError::EmptyTeamName);
        }
        self.workflow = Some(ActiveWorkflow::TeamNames(TeamNameStep::Opponent {
            ally: name.to_string(),
        }));
        Ok(())
    }

    /// Steps back from the opponent entry to the ally entry.
    pub fn team_names_back(&mut self) {
        if matches!(
            self.workflow,
            Some(ActiveWorkflow::TeamNames(TeamNameStep::Opponent { .. }))
        ) {
            self.workflow = Some(ActiveWorkflow::TeamNames(TeamNameStep::Ally));
        }
    }

    /// Confirms the opponent team name, captures the kickoff board and
    /// starts the first half.
    ///
    /// On capture failure the phase does not advance; the committed team
    /// names are kept, matching the original board's behavior.
    #[instrument(skip(self))]
    pub async fn confirm_opponent_name(&mut self, name: &str) -> Result<(), SessionError> {
        let Some(ActiveWorkflow::TeamNames(TeamNameStep::Opponent { ally })) =
            self.workflow.clone()
        else {
            return Err(SessionError::WorkflowMismatch);
        };
        let name = name.trim();
        if name.is_empty() {
            return Err(SessionError::EmptyTeamName);
        }

        self.ally_name = ally;
        self.opponent_name = name.to_string();
        self.workflow = None;

        self.capture_and_log(LABEL_KICKOFF).await?;
        self.phases.apply(PhaseAction::StartMatch)?;
        info!(ally = %self.ally_name, opponent = %self.opponent_name, "match started");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────
    //  Formation changes
    // ─────────────────────────────────────────────────────────

    /// Raises the formation-changing overlay, permitting free dragging.
    pub fn begin_formation_change(&mut self) -> Result<(), SessionError> {
        self.phases.apply(PhaseAction::BeginFormationChange)?;
        Ok(())
    }

    /// Captures the adjusted formation and clears the overlay.
    #[instrument(skip(self))]
    pub async fn confirm_formation_change(&mut self) -> Result<(), SessionError> {
        if !self.phases.formation_changing() {
            return Err(SessionError::Phase(PhaseError::NotChangingFormation));
        }
        self.capture_and_log(LABEL_FORMATION_CHANGE).await?;
        self.phases.apply(PhaseAction::ConfirmFormationChange)?;
        self.log
            .append_note(NoteKind::FormationChange, "formation changed");
        Ok(())
    }

    /// Abandons the formation change without capturing.
    pub fn cancel_formation_change(&mut self) -> Result<(), SessionError> {
        self.phases.apply(PhaseAction::CancelFormationChange)?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────
    //  Halves
    // ─────────────────────────────────────────────────────────

    /// Captures the board and enters half-time.
    ///
    /// Hidden while the formation overlay is raised; confirm or cancel the
    /// formation change first. Entering half-time raises the overlay to
    /// invite pre-second-half adjustments.
    #[instrument(skip(self))]
    pub async fn end_first_half(&mut self) -> Result<(), SessionError> {
        if self.phases.formation_changing() {
            return Err(SessionError::Unavailable("ending the half"));
        }
        self.probe(PhaseAction::EndFirstHalf)?;
        self.capture_and_log(LABEL_FIRST_HALF_END).await?;
        self.phases.apply(PhaseAction::EndFirstHalf)?;
        Ok(())
    }

    /// Prepares the second-half start, ensuring the formation overlay is
    /// up so substitutions and repositioning are possible.
    pub fn start_second_half(&mut self) -> Result<(), SessionError> {
        if self.phases.phase() != MatchPhase::HalfTime {
            return Err(SessionError::Unavailable("starting the second half"));
        }
        if !self.phases.formation_changing() {
            self.phases.apply(PhaseAction::BeginFormationChange)?;
        }
        Ok(())
    }

    /// Captures the second-half formation and starts the second half,
    /// clearing the overlay.
    #[instrument(skip(self))]
    pub async fn confirm_second_half_start(&mut self) -> Result<(), SessionError> {
        self.probe(PhaseAction::StartSecondHalf)?;
        self.capture_and_log(LABEL_SECOND_HALF_START).await?;
        self.phases.apply(PhaseAction::StartSecondHalf)?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────
    //  Goals
    // ─────────────────────────────────────────────────────────

    /// Opens the goal-scorer selection.
    pub fn record_goal(&mut self) -> Result<(), SessionError> {
        if self.roster.is_empty() {
            return Err(SessionError::EmptyRoster);
        }
        if !self.phases.can_record_goal() {
            return Err(SessionError::Unavailable("recording a goal"));
        }
        self.workflow = Some(ActiveWorkflow::GoalScorer);
        Ok(())
    }

    /// Attributes a goal: the scorer's count and the ally score each grow
    /// by one, and a goal note joins the timeline.
    #[instrument(skip(self))]
    pub fn select_goal_scorer(&mut self, player: PlayerId) -> Result<u32, SessionError> {
        if self.workflow != Some(ActiveWorkflow::GoalScorer) {
            return Err(SessionError::WorkflowMismatch);
        }
        let goals = self.roster.add_goal(player)?;
        self.getting_point += 1;
        let name = self
            .roster
            .get(player)
            .map(|p| p.name.clone())
            .unwrap_or_default();
        self.log.append_note(NoteKind::Goal, format!("{name} scored"));
        self.workflow = None;
        info!(player, goals, getting_point = self.getting_point, "goal recorded");
        Ok(goals)
    }

    /// Records a point conceded, with no player attribution.
    ///
    /// Gated like goals: only during the first or second half with the
    /// formation overlay down. Deliberately asymmetric with goal
    /// attribution: own-goals and untracked opponent scoring only move
    /// the score.
    pub fn record_lost_point(&mut self) -> Result<(), SessionError> {
        if !self.phases.can_record_goal() {
            return Err(SessionError::Unavailable("recording a lost point"));
        }
        self.lost_point += 1;
        self.log.append_note(NoteKind::LostPoint, "lost point");
        info!(lost_point = self.lost_point, "lost point recorded");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────
    //  Substitutions
    // ─────────────────────────────────────────────────────────

    /// Opens the two-step substitution selection.
    pub fn begin_substitution(&mut self) -> Result<(), SessionError> {
        if self.roster.len() < 2 {
            return Err(SessionError::NotEnoughPlayers {
                needed: 2,
                have: self.roster.len(),
            });
        }
        if !self.phases.can_substitute() {
            return Err(SessionError::Unavailable("substitution"));
        }
        self.workflow = Some(ActiveWorkflow::Substitution(SubstitutionStep::SelectOut));
        Ok(())
    }

    /// Advances the substitution selection with the tapped player.
    ///
    /// The first selection records the outgoing player; the second
    /// executes the swap.
    #[instrument(skip(self))]
    pub fn select_substitution_player(&mut self, player: PlayerId) -> Result<(), SessionError> {
        match self.workflow {
            Some(ActiveWorkflow::Substitution(SubstitutionStep::SelectOut)) => {
                if self.roster.get(player).is_none() {
                    return Err(RosterError::UnknownPlayer(player).into());
                }
                self.workflow = Some(ActiveWorkflow::Substitution(SubstitutionStep::SelectIn {
                    out: player,
                }));
                Ok(())
            }
            Some(ActiveWorkflow::Substitution(SubstitutionStep::SelectIn { out })) => {
                if player == out {
                    return Err(SessionError::SelfSubstitution);
                }
                self.execute_substitution(out, player)
            }
            _ => Err(SessionError::WorkflowMismatch),
        }
    }

    /// Steps the substitution selection back to choosing the outgoing
    /// player.
    pub fn substitution_back(&mut self) {
        if matches!(
            self.workflow,
            Some(ActiveWorkflow::Substitution(SubstitutionStep::SelectIn { .. }))
        ) {
            self.workflow = Some(ActiveWorkflow::Substitution(SubstitutionStep::SelectOut));
        }
    }

    fn execute_substitution(&mut self, out: PlayerId, in_: PlayerId) -> Result<(), SessionError> {
        let out_name = self
            .roster
            .get(out)
            .map(|p| p.name.clone())
            .ok_or(RosterError::UnknownPlayer(out))?;
        let in_name = self
            .roster
            .get(in_)
            .map(|p| p.name.clone())
            .ok_or(RosterError::UnknownPlayer(in_))?;
        self.roster.swap_positions(out, in_)?;
        self.log.append_note(
            NoteKind::Substitution,
            format!("OUT {out_name} → IN {in_name}"),
        );
        self.workflow = None;
        info!(out, r#in = in_, "substitution executed");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────
    //  Capture and export
    // ─────────────────────────────────────────────────────────

    /// Captures the live board and appends it to the timeline.
    ///
    /// Returns the committed log index; the append is acknowledged once
    /// this method resolves.
    pub async fn capture_and_log(&mut self, label: &str) -> Result<usize, SessionError> {
        let snapshot = self.snapshot();
        let image = self.pipeline.capture(&snapshot).await?;
        Ok(self.log.append_capture(Some(label.to_string()), image))
    }

    /// Ends the match: final capture, composite export, log cleared.
    ///
    /// From the first half this is refused with
    /// [`PhaseError::OverrideRequired`]; use [`Self::end_match_override`]
    /// after the user confirms. On failure the phase and the scores are
    /// untouched and the log is kept, so the export can be retried; an
    /// already-committed final capture stays in the timeline and is
    /// reused by the retry instead of being captured again.
    pub async fn end_match(&mut self) -> Result<String, SessionError> {
        self.finish(PhaseAction::EndMatch).await
    }

    /// Ends the match early from the first half, after explicit user
    /// confirmation.
    pub async fn end_match_override(&mut self) -> Result<String, SessionError> {
        self.finish(PhaseAction::EndMatchOverride).await
    }

    #[instrument(skip(self))]
    async fn finish(&mut self, action: PhaseAction) -> Result<String, SessionError> {
        if self.phases.formation_changing() {
            return Err(SessionError::Unavailable("ending the match"));
        }
        self.probe(action)?;

        // A retried export after a delivery failure reuses the final
        // capture committed by the failed attempt instead of appending a
        // duplicate section.
        let already_final = matches!(
            self.log.entries().last(),
            Some(LogEntry::Capture { label, .. }) if label.as_deref() == Some(LABEL_MATCH_END)
        );
        if !already_final {
            // The awaited append is the acknowledgment that the final
            // capture is committed; composition must not start before it
            // resolves.
            let committed = self.capture_and_log(LABEL_MATCH_END).await?;
            debug_assert_eq!(committed + 1, self.log.len());
        }

        let composite = self.pipeline.compose(self.log.entries()).await?;
        let filename = export_filename(Utc::now());
        self.pipeline.deliver(&filename, &composite)?;

        self.phases.apply(action)?;
        self.log.reset();
        info!(%filename, "match exported");
        Ok(filename)
    }

    /// Explicitly clears the timeline without exporting.
    pub fn reset_log(&mut self) {
        self.log.reset();
    }

    /// Dry-runs a phase action against a copy of the machine, so captures
    /// are not taken for transitions that would be refused.
    fn probe(&self, action: PhaseAction) -> Result<(), PhaseError> {
        let mut probe = self.phases;
        probe.apply(action)
    }

    // ─────────────────────────────────────────────────────────
    //  Views
    // ─────────────────────────────────────────────────────────

    /// The read-only view handed to the rasterizer.
    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            court_width: self.geometry.court_width,
            court_height: self.geometry.court_height,
            tokens: self
                .roster
                .players()
                .iter()
                .map(|p| TokenSnapshot {
                    name: p.name.clone(),
                    position: p.position,
                    color: p.color.clone(),
                    bg_color: p.bg_color.clone(),
                    goals: p.goals,
                })
                .collect(),
            ally_name: self.ally_name.clone(),
            opponent_name: self.opponent_name.clone(),
            score: (self.getting_point, self.lost_point),
        }
    }

    /// The `players=` query-string pair reflecting the current roster.
    pub fn share_query(&self) -> String {
        encode_players(&self.roster.names())
    }

    /// The roster.
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// The event log.
    pub fn log(&self) -> &EventLog {
        &self.log
    }

    /// Current match phase.
    pub fn phase(&self) -> MatchPhase {
        self.phases.phase()
    }

    /// True while the formation-changing overlay is raised.
    pub fn formation_changing(&self) -> bool {
        self.phases.formation_changing()
    }

    /// True once kickoff has happened and the match has not ended.
    pub fn is_match_started(&self) -> bool {
        self.phases.is_match_started()
    }

    /// The open modal workflow, if any.
    pub fn workflow(&self) -> Option<&ActiveWorkflow> {
        self.workflow.as_ref()
    }

    /// Scores as `(getting_point, lost_point)`.
    pub fn score(&self) -> (u32, u32) {
        (self.getting_point, self.lost_point)
    }

    /// Ally team name.
    pub fn ally_name(&self) -> &str {
        &self.ally_name
    }

    /// Opponent team name.
    pub fn opponent_name(&self) -> &str {
        &self.opponent_name
    }

    /// True while a drag session is in flight.
    pub fn is_dragging(&self) -> bool {
        self.drag.is_dragging()
    }

    /// The measured container geometry.
    pub fn geometry(&self) -> BoardGeometry {
        self.geometry
    }
}
