//! Player rotation, the turn counter and income.

use tracing::info;

use crate::catalog::Catalog;
use crate::grid::Grid;
use crate::player::{Player, PlayerId, PlayerProfile};

/// Round-robin over the active players.
///
/// The rotation continues from the seat after the last player who started
/// a turn. Removing a player shifts the rotation so nobody else is skipped
/// or visited twice in the same cycle.
#[derive(Debug, Clone, Default)]
pub struct TurnController {
    players: Vec<Player>,
    active: Vec<PlayerId>,
    current: Option<PlayerId>,
    next_index: usize,
    turn: u32,
}

impl TurnController {
    /// Create an empty rotation at turn 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seat a player at the end of the rotation with no gold.
    ///
    /// Re-activating a known player resets their gold and income.
    pub fn activate(&mut self, profile: &PlayerProfile, ai: bool) -> &mut Player {
        if !self.active.contains(&profile.id) {
            self.active.push(profile.id);
        }
        let index = match self.players.iter().position(|p| p.id == profile.id) {
            Some(i) => {
                self.players[i] = Player::from_profile(profile, ai);
                i
            }
            None => {
                self.players.push(Player::from_profile(profile, ai));
                self.players.len() - 1
            }
        };
        info!(player = %profile.id, ai, "player activated");
        &mut self.players[index]
    }

    /// Forget every player and return to turn 0.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// A player by id, active or not.
    #[must_use]
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    /// Mutable access to a player.
    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    /// Every player that took part, in activation order.
    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter()
    }

    /// Active players in rotation order.
    #[must_use]
    pub fn active(&self) -> &[PlayerId] {
        &self.active
    }

    /// Whether a player is still in the match.
    #[must_use]
    pub fn is_active(&self, id: PlayerId) -> bool {
        self.active.contains(&id)
    }

    /// Player whose turn is running.
    #[must_use]
    pub const fn current(&self) -> Option<PlayerId> {
        self.current
    }

    /// Global turn counter. Every started player turn increments it.
    #[must_use]
    pub const fn turn(&self) -> u32 {
        self.turn
    }

    /// Overwrite the turn counter when restoring a saved match.
    pub fn set_turn(&mut self, turn: u32) {
        self.turn = turn;
    }

    /// The player whose turn comes next.
    #[must_use]
    pub fn next_player(&self) -> Option<PlayerId> {
        let index = if self.next_index >= self.active.len() {
            0
        } else {
            self.next_index
        };
        self.active.get(index).copied()
    }

    /// Make `id` the current player and advance the counter.
    ///
    /// Returns the new turn number, or `None` if `id` is not active.
    pub fn begin(&mut self, id: PlayerId) -> Option<u32> {
        let index = self.active.iter().position(|&p| p == id)?;
        self.turn += 1;
        self.current = Some(id);
        self.next_index = index + 1;
        Some(self.turn)
    }

    /// Add income to a player's gold and remember it.
    pub fn credit(&mut self, id: PlayerId, income: u32) {
        if let Some(player) = self.player_mut(id) {
            player.last_income = income;
            player.gold = player.gold.saturating_add(income);
        }
    }

    /// Clear the current player, returning who it was.
    pub fn end(&mut self) -> Option<PlayerId> {
        self.current.take()
    }

    /// Take a player out of the rotation.
    ///
    /// The cursor steps back past the removed slot rather than restarting at
    /// the first player, so nobody later in the cycle is skipped.
    ///
    /// Returns `false` if the player was not active.
    pub fn remove(&mut self, id: PlayerId) -> bool {
        let Some(index) = self.active.iter().position(|&p| p == id) else {
            return false;
        };
        self.active.remove(index);
        if index < self.next_index {
            self.next_index -= 1;
        }
        if let Some(player) = self.player_mut(id) {
            player.active = false;
        }
        true
    }
}

/// Gold a player earns per turn: the income of every cell they own.
#[must_use]
pub fn income_for(catalog: &Catalog, grid: &Grid, player: PlayerId) -> u32 {
    grid.cells()
        .map(|(_, key)| catalog.terrain(key))
        .filter(|t| t.owner == Some(player))
        .map(|t| t.income)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Terrain;
    use crate::grid::Cell;

    fn rotation(n: u8) -> TurnController {
        let mut turns = TurnController::new();
        for profile in PlayerProfile::default_roster().iter().take(n as usize) {
            turns.activate(profile, false);
        }
        turns
    }

    fn play(turns: &mut TurnController) -> PlayerId {
        let next = turns.next_player().unwrap();
        turns.begin(next);
        turns.end();
        next
    }

    #[test]
    fn test_rotation_wraps() {
        let mut turns = rotation(3);
        let order: Vec<u8> = (0..4).map(|_| play(&mut turns).0).collect();
        assert_eq!(order, vec![1, 2, 3, 1]);
        assert_eq!(turns.turn(), 4);
    }

    #[test]
    fn test_removing_current_player_does_not_skip() {
        let mut turns = rotation(3);
        play(&mut turns);
        let second = turns.next_player().unwrap();
        turns.begin(second);
        turns.remove(second);
        assert_eq!(turns.next_player(), Some(PlayerId(3)));
    }

    #[test]
    fn test_removing_earlier_player_keeps_position() {
        let mut turns = rotation(3);
        play(&mut turns);
        play(&mut turns);
        turns.remove(PlayerId(1));
        assert_eq!(turns.next_player(), Some(PlayerId(3)));
        play(&mut turns);
        assert_eq!(turns.next_player(), Some(PlayerId(2)));
    }

    #[test]
    fn test_removing_last_in_order_wraps_to_first() {
        let mut turns = rotation(3);
        play(&mut turns);
        play(&mut turns);
        turns.remove(PlayerId(3));
        assert_eq!(turns.next_player(), Some(PlayerId(1)));
        assert!(!turns.player(PlayerId(3)).unwrap().active);
        assert!(!turns.remove(PlayerId(3)));
    }

    #[test]
    fn test_begin_rejects_inactive() {
        let mut turns = rotation(2);
        turns.remove(PlayerId(2));
        assert_eq!(turns.begin(PlayerId(2)), None);
        assert_eq!(turns.turn(), 0);
    }

    #[test]
    fn test_income_sums_owned_cells() {
        let castle = Terrain {
            owner: Some(PlayerId(1)),
            income: 3,
            ..Terrain::new("c1", "Castle", 1)
        };
        let village = Terrain {
            owner: Some(PlayerId(1)),
            income: 2,
            ..Terrain::new("v1", "Village", 1)
        };
        let enemy = Terrain {
            owner: Some(PlayerId(2)),
            income: 7,
            ..Terrain::new("v2", "Village", 1)
        };
        let catalog = Catalog::new(
            vec![Terrain::new("a", "Plains", 1), castle, village, enemy],
            vec![],
        )
        .unwrap();
        let mut grid = Grid::new(3, 3, catalog.terrain_key("a").unwrap());
        grid.set_terrain_at(Cell::new(0, 0), catalog.terrain_key("c1").unwrap());
        grid.set_terrain_at(Cell::new(2, 2), catalog.terrain_key("v1").unwrap());
        grid.set_terrain_at(Cell::new(1, 1), catalog.terrain_key("v2").unwrap());

        assert_eq!(income_for(&catalog, &grid, PlayerId(1)), 5);

        let mut turns = rotation(2);
        turns.credit(PlayerId(1), 5);
        turns.credit(PlayerId(1), 5);
        let player = turns.player(PlayerId(1)).unwrap();
        assert_eq!(player.gold, 10);
        assert_eq!(player.last_income, 5);
    }
}
