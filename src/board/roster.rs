//! Roster: the owning collection of player tokens.
//!
//! The roster is the single owner of [`Player`] values and of the monotonic
//! id generator. Every mutation flows through a named operation so id
//! uniqueness and non-negative goal counts are enforced in one place.

use super::types::{Player, PlayerId, Point, DEFAULT_BG_COLOR, DEFAULT_COLOR};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// Errors raised by roster operations.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum RosterError {
    /// A player name was empty after trimming.
    #[display("player name must not be empty")]
    EmptyName,
    /// No player carries the given id.
    #[display("no player with id {_0}")]
    UnknownPlayer(PlayerId),
}

impl std::error::Error for RosterError {}

/// Ordered collection of players plus the id generator.
#[derive(Debug, Clone, Default, Serialize, Deserialize, derive_getters::Getters)]
pub struct Roster {
    /// Players in roster order.
    players: Vec<Player>,
    #[getter(skip)]
    next_id: PlayerId,
}

impl Roster {
    /// Creates an empty roster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the roster from a list of names, as decoded from a share link.
    ///
    /// Ids are assigned `0..n-1` in list order and positions are taken from
    /// `positions` (the bench slot for each ordinal). Blank names are
    /// skipped rather than failing the whole seed.
    #[instrument(skip_all, fields(count = names.len()))]
    pub fn seed(names: &[String], positions: &[Point]) -> Self {
        let mut roster = Self::new();
        for (name, position) in names.iter().zip(positions) {
            if name.trim().is_empty() {
                continue;
            }
            roster.players.push(Player {
                id: roster.next_id,
                position: *position,
                name: name.trim().to_string(),
                color: DEFAULT_COLOR.to_string(),
                bg_color: DEFAULT_BG_COLOR.to_string(),
                goals: 0,
            });
            roster.next_id += 1;
        }
        info!(players = roster.players.len(), "roster seeded");
        roster
    }

    /// Adds a player at `position`, returning the assigned id.
    #[instrument(skip(self))]
    pub fn add(&mut self, name: &str, position: Point) -> Result<PlayerId, RosterError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RosterError::EmptyName);
        }
        let id = self.next_id;
        self.next_id += 1;
        self.players.push(Player {
            id,
            position,
            name: name.to_string(),
            color: DEFAULT_COLOR.to_string(),
            bg_color: DEFAULT_BG_COLOR.to_string(),
            goals: 0,
        });
        info!(id, "player added");
        Ok(id)
    }

    /// Removes the player with `id`. The id is never reassigned.
    #[instrument(skip(self))]
    pub fn remove(&mut self, id: PlayerId) -> Result<Player, RosterError> {
        let index = self.index_of(id)?;
        let removed = self.players.remove(index);
        info!(id, name = %removed.name, "player removed");
        Ok(removed)
    }

    /// Looks up a player by id.
    pub fn get(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    /// Writes a player's position, as the drag engine does on every move.
    pub fn set_position(&mut self, id: PlayerId, position: Point) -> Result<(), RosterError> {
        let index = self.index_of(id)?;
        self.players[index].position = position;
        Ok(())
    }

    /// Exchanges the positions of two players; names, colors and goal
    /// counts are untouched.
    #[instrument(skip(self))]
    pub fn swap_positions(&mut self, a: PlayerId, b: PlayerId) -> Result<(), RosterError> {
        let ia = self.index_of(a)?;
        let ib = self.index_of(b)?;
        let pa = self.players[ia].position;
        self.players[ia].position = self.players[ib].position;
        self.players[ib].position = pa;
        Ok(())
    }

    /// Increments a player's goal count by one, returning the new count.
    #[instrument(skip(self))]
    pub fn add_goal(&mut self, id: PlayerId) -> Result<u32, RosterError> {
        let index = self.index_of(id)?;
        self.players[index].goals += 1;
        Ok(self.players[index].goals)
    }

    /// Player names in roster order, for the share link.
    pub fn names(&self) -> Vec<String> {
        self.players.iter().map(|p| p.name.clone()).collect()
    }

    /// Number of players.
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// True when no players exist.
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub(crate) fn get_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    fn index_of(&self, id: PlayerId) -> Result<usize, RosterError> {
        self.players
            .iter()
            .position(|p| p.id == id)
            .ok_or(RosterError::UnknownPlayer(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_monotonic_and_never_reused() {
        let mut roster = Roster::new();
        let a = roster.add("Aoi", Point::default()).unwrap();
        let b = roster.add("Ken", Point::default()).unwrap();
        assert_eq!((a, b), (0, 1));

        roster.remove(a).unwrap();
        let c = roster.add("Rin", Point::default()).unwrap();
        assert_eq!(c, 2, "removed ids are not recycled");
    }

    #[test]
    fn names_are_trimmed_and_blank_names_rejected() {
        let mut roster = Roster::new();
        let id = roster.add("  Aoi ", Point::default()).unwrap();
        assert_eq!(roster.get(id).unwrap().name, "Aoi");
        assert_eq!(roster.add("   ", Point::default()), Err(RosterError::EmptyName));
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn seeding_assigns_ids_in_order_and_continues_the_counter() {
        let names = vec!["Aoi".to_string(), "Ken".to_string()];
        let slots = vec![Point::new(1.0, 2.0), Point::new(3.0, 4.0)];
        let mut roster = Roster::seed(&names, &slots);

        assert_eq!(roster.players()[0].id, 0);
        assert_eq!(roster.players()[1].id, 1);
        assert_eq!(roster.players()[1].position, Point::new(3.0, 4.0));

        let next = roster.add("Rin", Point::default()).unwrap();
        assert_eq!(next, 2);
    }

    #[test]
    fn swap_exchanges_positions_only() {
        let mut roster = Roster::new();
        let a = roster.add("Aoi", Point::new(1.0, 2.0)).unwrap();
        let b = roster.add("Ken", Point::new(3.0, 4.0)).unwrap();
        roster.get_mut(a).unwrap().goals = 2;

        roster.swap_positions(a, b).unwrap();

        let pa = roster.get(a).unwrap();
        let pb = roster.get(b).unwrap();
        assert_eq!(pa.position, Point::new(3.0, 4.0));
        assert_eq!(pb.position, Point::new(1.0, 2.0));
        assert_eq!(pa.name, "Aoi");
        assert_eq!(pa.goals, 2);
        assert_eq!(roster.len(), 2);
    }

    #[test]
    fn goal_counts_only_grow() {
        let mut roster = Roster::new();
        let id = roster.add("Aoi", Point::default()).unwrap();
        assert_eq!(roster.add_goal(id).unwrap(), 1);
        assert_eq!(roster.add_goal(id).unwrap(), 2);
        assert_eq!(roster.add_goal(99), Err(RosterError::UnknownPlayer(99)));
    }
}
