//! Drag-gesture position engine.
//!
//! Turns raw pointer coordinates into token displacement. The engine holds
//! at most one in-flight drag session and preserves the pointer-to-token
//! offset captured at grab time, so a grabbed token does not jump to the
//! cursor. Positions are written back on every move event without batching,
//! and no boundary clamping is applied: tokens may leave the visible board.

use super::types::{PlayerId, Point};
use tracing::debug;

/// A drag in flight: which token is held and where it was grabbed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragSession {
    /// Token being dragged.
    pub player: PlayerId,
    /// Pointer displacement from the token position at grab time.
    pub offset_x: f64,
    /// Pointer displacement from the token position at grab time.
    pub offset_y: f64,
}

/// Two-state drag machine: idle, or dragging a single session.
#[derive(Debug, Default)]
pub struct DragEngine {
    current: Option<DragSession>,
}

impl DragEngine {
    /// Creates an idle engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Begins dragging `player`.
    ///
    /// `pointer` is in client coordinates, `board_origin` is the board
    /// area's client-space top-left, and `position` is the token's current
    /// board-local position. Phase rules are the caller's responsibility;
    /// the engine records any start it is asked to.
    pub fn start(&mut self, player: PlayerId, position: Point, pointer: Point, board_origin: Point) {
        let session = DragSession {
            player,
            offset_x: pointer.x - board_origin.x - position.x,
            offset_y: pointer.y - board_origin.y - position.y,
        };
        debug!(player, offset_x = session.offset_x, offset_y = session.offset_y, "drag start");
        self.current = Some(session);
    }

    /// Computes the dragged token's new board-local position for a pointer
    /// move. Returns `None` when idle.
    pub fn drag_to(&self, pointer: Point, board_origin: Point) -> Option<(PlayerId, Point)> {
        let session = self.current?;
        Some((
            session.player,
            Point {
                x: pointer.x - board_origin.x - session.offset_x,
                y: pointer.y - board_origin.y - session.offset_y,
            },
        ))
    }

    /// Ends the drag unconditionally; the token keeps its last position.
    pub fn end(&mut self) {
        if self.current.take().is_some() {
            debug!("drag end");
        }
    }

    /// Returns true while a drag session is in flight.
    pub fn is_dragging(&self) -> bool {
        self.current.is_some()
    }

    /// The in-flight session, if any.
    pub fn session(&self) -> Option<&DragSession> {
        self.current.as_ref()
    }
}
