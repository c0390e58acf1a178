//! Tap disambiguation for player tokens.
//!
//! A double-tap is two taps on the same player within a short window. The
//! classifier never emits a single-tap event: a lone tap is only visible as
//! the absence of a following double-tap, so callers that need single-tap
//! semantics must debounce on their side.

use super::types::PlayerId;
use std::time::{Duration, Instant};
use tracing::debug;

/// Two taps on the same player closer together than this are a double-tap.
pub const DOUBLE_TAP_WINDOW: Duration = Duration::from_millis(300);

/// Classifies rapid tap sequences on player tokens.
#[derive(Debug, Default)]
pub struct TapClassifier {
    last: Option<(Instant, PlayerId)>,
}

impl TapClassifier {
    /// Creates a classifier with no recorded taps.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a tap on `player` at the current instant.
    ///
    /// Returns the player id when the tap completes a double-tap.
    pub fn tap(&mut self, player: PlayerId) -> Option<PlayerId> {
        self.tap_at(player, Instant::now())
    }

    /// Records a tap on `player` at an explicit instant.
    ///
    /// A double-tap resets the classifier, so a third rapid tap starts a new
    /// sequence rather than chaining.
    pub fn tap_at(&mut self, player: PlayerId, at: Instant) -> Option<PlayerId> {
        if let Some((last_at, last_player)) = self.last
            && last_player == player
            && at.duration_since(last_at) < DOUBLE_TAP_WINDOW
        {
            debug!(player, "double-tap");
            self.last = None;
            return Some(player);
        }
        self.last = Some((at, player));
        None
    }

    /// Forgets any recorded tap.
    pub fn reset(&mut self) {
        self.last = None;
    }
}
