//! Bench packing layout and bench membership.
//!
//! The bench is not a separate list: a player is "on bench" purely because
//! their y coordinate is at or below the bench region's top edge. Packing
//! assigns bench slots left-to-right, top-to-bottom, with each row centered
//! independently within the bench width (a partial last row is centered
//! against itself, not against the widest row).

use super::types::{Player, PlayerId, Point};

/// Square footprint of a token in pixels.
pub const PIECE_SIZE: f64 = 60.0;

/// Padding between tokens and around the bench edge, in pixels.
pub const PIECE_PADDING: f64 = 10.0;

/// Slot coordinate used when the bench has not been measured yet.
pub const FALLBACK_SLOT: Point = Point { x: 50.0, y: 450.0 };

/// Computes the bench slot for the token at `index`.
///
/// Pure and deterministic. Fails closed: when `bench_width` is not a usable
/// measurement (non-finite or non-positive) the fixed [`FALLBACK_SLOT`] is
/// returned instead of an error.
pub fn bench_slot(index: usize, bench_width: f64, bench_origin_y: f64) -> Point {
    if !bench_width.is_finite() || bench_width <= 0.0 {
        return FALLBACK_SLOT;
    }

    let available_width = bench_width - PIECE_PADDING * 2.0;
    let items_per_row = ((available_width / (PIECE_SIZE + PIECE_PADDING)).floor() as usize).max(1);

    let row = index / items_per_row;
    let col = index % items_per_row;

    // Center the current row: a partial row is measured by its own occupancy.
    let row_items = (index + 1).min(items_per_row);
    let row_width = row_items as f64 * (PIECE_SIZE + PIECE_PADDING) - PIECE_PADDING;
    let center_offset = (bench_width - row_width) / 2.0;

    Point {
        x: center_offset + col as f64 * (PIECE_SIZE + PIECE_PADDING) + PIECE_SIZE / 2.0,
        y: bench_origin_y
            + PIECE_PADDING
            + row as f64 * (PIECE_SIZE + PIECE_PADDING)
            + PIECE_SIZE / 2.0,
    }
}

/// Returns true if the player currently sits in the bench region.
pub fn is_on_bench(player: &Player, bench_origin_y: f64) -> bool {
    player.position.y >= bench_origin_y
}

/// Ordinal position of `id` within the on-bench subset, in roster order.
///
/// Feeds [`bench_slot`] when the bench is re-packed after a roster mutation
/// or a resize. Returns `None` when the player is not on the bench.
pub fn bench_index_of(players: &[Player], id: PlayerId, bench_origin_y: f64) -> Option<usize> {
    players
        .iter()
        .filter(|p| is_on_bench(p, bench_origin_y))
        .position(|p| p.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(id: PlayerId, x: f64, y: f64) -> Player {
        Player {
            id,
            position: Point::new(x, y),
            name: format!("p{id}"),
            color: "#fff".to_string(),
            bg_color: "darkblue".to_string(),
            goals: 0,
        }
    }

    #[test]
    fn bench_slot_is_deterministic() {
        let a = bench_slot(7, 310.0, 400.0);
        let b = bench_slot(7, 310.0, 400.0);
        assert_eq!(a, b);
    }

    #[test]
    fn four_items_fit_per_row_at_width_310() {
        // available = 290, piece + padding = 70 -> 4 per row
        let row0: Vec<Point> = (0..4).map(|i| bench_slot(i, 310.0, 400.0)).collect();
        let row1 = bench_slot(4, 310.0, 400.0);

        for slot in &row0 {
            assert_eq!(slot.y, row0[0].y, "indices 0..3 share row 0");
        }
        assert!(row1.y > row0[0].y, "index 4 starts row 1");
    }

    #[test]
    fn row_width_counts_items_up_to_the_current_index() {
        // Row width is min(index + 1, items_per_row) items, so each token in
        // a growing row is centered against the row occupancy at its own
        // index, not against the finished row.
        assert_eq!(bench_slot(0, 310.0, 400.0).x, 155.0);
        assert_eq!(bench_slot(1, 310.0, 400.0).x, 190.0);
        assert_eq!(bench_slot(2, 310.0, 400.0).x, 225.0);
        assert_eq!(bench_slot(3, 310.0, 400.0).x, 260.0);
        // Index 4 wraps to row 1, col 0, measured against a full row.
        assert_eq!(bench_slot(4, 310.0, 400.0).x, 50.0);
    }

    #[test]
    fn unmeasured_bench_falls_back() {
        assert_eq!(bench_slot(0, 0.0, 400.0), FALLBACK_SLOT);
        assert_eq!(bench_slot(3, f64::NAN, 400.0), FALLBACK_SLOT);
    }

    #[test]
    fn narrow_bench_still_packs_one_per_row() {
        let a = bench_slot(0, 30.0, 100.0);
        let b = bench_slot(1, 30.0, 100.0);
        assert_eq!(a.x, b.x);
        assert!(b.y > a.y);
    }

    #[test]
    fn bench_membership_is_a_y_threshold() {
        let on = player(1, 20.0, 400.0);
        let off = player(2, 20.0, 399.0);
        assert!(is_on_bench(&on, 400.0));
        assert!(!is_on_bench(&off, 400.0));
    }

    #[test]
    fn bench_index_skips_field_players() {
        let players = vec![
            player(1, 10.0, 100.0), // on field
            player(2, 10.0, 450.0),
            player(3, 10.0, 460.0),
        ];
        assert_eq!(bench_index_of(&players, 2, 400.0), Some(0));
        assert_eq!(bench_index_of(&players, 3, 400.0), Some(1));
        assert_eq!(bench_index_of(&players, 1, 400.0), None);
    }
}
