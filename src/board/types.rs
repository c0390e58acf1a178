//! Core domain types for the tactical board.

use serde::{Deserialize, Serialize};

/// Unique identifier for a player token.
///
/// Assigned monotonically by the roster and never reused within a session.
pub type PlayerId = u32;

/// A point in board-local pixel space.
///
/// The origin is the top-left corner of the board area; `y` grows downward,
/// matching screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, derive_new::new)]
pub struct Point {
    /// Horizontal coordinate in pixels.
    pub x: f64,
    /// Vertical coordinate in pixels.
    pub y: f64,
}

/// Default token foreground color.
pub const DEFAULT_COLOR: &str = "#fff";

/// Default token background color.
pub const DEFAULT_BG_COLOR: &str = "darkblue";

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

fn default_bg_color() -> String {
    DEFAULT_BG_COLOR.to_string()
}

/// A player token on the board.
///
/// Owned exclusively by the roster; other components refer to players only
/// by transient [`PlayerId`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    /// Unique id, assigned by the roster.
    pub id: PlayerId,
    /// Current position in board-local pixel space.
    pub position: Point,
    /// Display name, non-empty after trimming.
    pub name: String,
    /// Foreground (text) color, CSS notation.
    #[serde(default = "default_color")]
    pub color: String,
    /// Background color, CSS notation.
    #[serde(default = "default_bg_color")]
    pub bg_color: String,
    /// Goals attributed to this player so far.
    #[serde(default)]
    pub goals: u32,
}

/// Measured geometry of the board container.
///
/// Captured from the live layout by the host; all values are in the same
/// pixel space as [`Point`]. A default-constructed geometry means the
/// container has not been measured yet, and bench packing falls back to a
/// fixed coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoardGeometry {
    /// Top-left corner of the board area in client (pointer) coordinates.
    pub origin: Point,
    /// Width of the court region in pixels.
    pub court_width: f64,
    /// Height of the court region in pixels.
    pub court_height: f64,
    /// Width of the bench region in pixels.
    pub bench_width: f64,
    /// Board-local y coordinate where the bench region starts.
    pub bench_origin_y: f64,
}

impl BoardGeometry {
    /// Returns true if the bench region has a usable measurement.
    pub fn bench_measurable(&self) -> bool {
        self.bench_width.is_finite() && self.bench_width > 0.0
    }
}
