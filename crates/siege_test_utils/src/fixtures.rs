//! Test fixtures and helpers.
//!
//! A small catalog that exercises every terrain feature and unit trait, and
//! a builder that lays out a game from an ASCII map.

use std::collections::BTreeMap;
use std::sync::Arc;

use siege_core::catalog::{Catalog, Terrain, UnitType};
use siege_core::config::GameConfig;
use siege_core::game::Game;
use siege_core::grid::{Cell, Grid};
use siege_core::player::PlayerId;
use siege_core::rng::RandomSource;
use siege_core::unit::UnitId;

/// First seat (protagonist).
pub const BLUE: PlayerId = PlayerId(1);
/// Second seat.
pub const RED: PlayerId = PlayerId(2);
/// Third seat.
pub const GREEN: PlayerId = PlayerId(3);

/// Shorthand for [`Cell::new`].
#[must_use]
pub const fn cell(x: i32, y: i32) -> Cell {
    Cell::new(x, y)
}

fn owned(base: &Terrain, id: &str, owner: PlayerId) -> Terrain {
    Terrain {
        id: id.to_string(),
        owner: Some(owner),
        ..base.clone()
    }
}

/// Terrain and unit types used across the test suites.
///
/// | map glyph | id   | notes                                   |
/// |-----------|------|-----------------------------------------|
/// | `.`       | `a`  | plains, cost 1                          |
/// | `f`       | `f`  | forest, cost 2, defense 1               |
/// | `h`       | `h`  | hills, cost 3, defense 2                |
/// | `w`       | `w`  | wall, impassable                        |
/// | `v`/`V`/`X` | `v`/`v1`/`v2` | village neutral/blue/red, income 2, heal 2 |
/// | `c`/`C`/`K` | `c`/`c1`/`c2` | castle neutral/blue/red, income 3, factory |
/// | `r`       | `r`  | ruin, repairs into a neutral village    |
///
/// # Panics
///
/// Panics if the fixture data is inconsistent.
#[must_use]
pub fn fixture_catalog() -> Catalog {
    let village = Terrain {
        category: Some("village".into()),
        defense: 1,
        capture: 5,
        income: 2,
        heal: 2,
        ..Terrain::new("v", "Village", 1)
    };
    let castle = Terrain {
        category: Some("castle".into()),
        defense: 3,
        capture: 10,
        income: 3,
        heal: 2,
        factory: true,
        ..Terrain::new("c", "Castle", 1)
    };
    let terrain = vec![
        Terrain::new("a", "Plains", 1),
        Terrain {
            defense: 1,
            ..Terrain::new("f", "Forest", 2)
        },
        Terrain {
            defense: 2,
            ..Terrain::new("h", "Hills", 3)
        },
        Terrain::new("w", "Wall", 99),
        owned(&village, "v1", BLUE),
        owned(&village, "v2", RED),
        village,
        owned(&castle, "c1", BLUE),
        owned(&castle, "c2", RED),
        castle,
        Terrain {
            repair: Some("v".into()),
            ..Terrain::new("r", "Ruin", 1)
        },
    ];

    let soldier = UnitType {
        movement: 3,
        cost: 10,
        capture: 10,
        grave: Some("skeleton".into()),
        ..UnitType::new("soldier", 5, 2, 10)
    };
    let units = vec![
        UnitType {
            movement: 3,
            range_min: 2,
            range_max: 3,
            cost: 15,
            attack_before_move: true,
            ..UnitType::new("archer", 4, 1, 10)
        },
        UnitType {
            movement: 5,
            attack_bonus: 2,
            cost: 25,
            first_strike: true,
            bash: 3,
            grave: Some("skeleton".into()),
            attack_bonuses: BTreeMap::from([("archer".to_string(), 2)]),
            movement_costs: BTreeMap::from([("f".to_string(), 3)]),
            ..UnitType::new("knight", 7, 3, 12)
        },
        UnitType {
            movement: 3,
            cost: 30,
            raise: true,
            ..UnitType::new("necromancer", 3, 1, 8)
        },
        UnitType {
            movement: 3,
            ..UnitType::new("skeleton", 4, 1, 6)
        },
        UnitType {
            movement: 3,
            cost: 20,
            explosive: 4,
            ..UnitType::new("bomber", 4, 0, 8)
        },
        UnitType {
            movement: 3,
            cost: 10,
            repair: true,
            ..UnitType::new("mason", 1, 1, 8)
        },
        UnitType {
            movement: 3,
            cost: 20,
            bless: 2,
            ..UnitType::new("shaman", 2, 1, 8)
        },
        UnitType {
            movement: 3,
            cost: 20,
            berserk: 2,
            ..UnitType::new("warlord", 4, 2, 10)
        },
        UnitType {
            movement: 2,
            range_min: 2,
            range_max: 4,
            cost: 40,
            attack_before_move: true,
            attack_or_move: true,
            ..UnitType::new("catapult", 6, 0, 10)
        },
        soldier.variant("veteran"),
        soldier,
    ];

    Catalog::new(terrain, units).expect("fixture catalog is consistent")
}

/// [`fixture_catalog`] behind an `Arc`.
#[must_use]
pub fn shared_catalog() -> Arc<Catalog> {
    Arc::new(fixture_catalog())
}

/// Terrain id for a map glyph.
///
/// # Panics
///
/// Panics on a glyph outside the fixture legend.
#[must_use]
pub fn terrain_id(glyph: char) -> &'static str {
    match glyph {
        '.' => "a",
        'f' => "f",
        'h' => "h",
        'w' => "w",
        'v' => "v",
        'V' => "v1",
        'X' => "v2",
        'c' => "c",
        'C' => "c1",
        'K' => "c2",
        'r' => "r",
        other => panic!("unknown map glyph {other:?}"),
    }
}

/// Parse an ASCII map into a grid.
///
/// # Panics
///
/// Panics on an unknown glyph or ragged rows.
#[must_use]
pub fn grid_from_ascii(catalog: &Catalog, rows: &[&str]) -> Grid {
    let height = rows.len();
    let width = rows.first().map_or(0, |r| r.chars().count());
    let terrain = rows
        .iter()
        .flat_map(|row| {
            assert_eq!(row.chars().count(), width, "ragged map row {row:?}");
            row.chars()
        })
        .map(|glyph| {
            catalog
                .terrain_key(terrain_id(glyph))
                .expect("fixture terrain exists")
        })
        .collect();
    Grid::from_terrain(width as i32, height as i32, terrain).expect("map size matches")
}

struct Placement {
    type_id: String,
    owner: PlayerId,
    cell: Cell,
    must_survive: bool,
}

/// Builds a [`Game`] on the fixture catalog.
///
/// Attacks roll the maximum unless a random source is supplied.
///
/// ```
/// use siege_test_utils::fixtures::{cell, GameBuilder, BLUE, RED};
///
/// let (game, units) = GameBuilder::new(&["....", ".w.."])
///     .unit("soldier", BLUE, cell(0, 0))
///     .unit("archer", RED, cell(3, 1))
///     .build();
/// assert_eq!(game.units().len(), 2);
/// assert_eq!(units.len(), 2);
/// ```
pub struct GameBuilder {
    catalog: Arc<Catalog>,
    config: GameConfig,
    rows: Vec<String>,
    players: Vec<(PlayerId, bool)>,
    gold: Vec<(PlayerId, u32)>,
    placements: Vec<Placement>,
    random: Option<Box<dyn RandomSource>>,
}

impl GameBuilder {
    /// Start from an ASCII map (see [`fixture_catalog`] for the legend).
    #[must_use]
    pub fn new(rows: &[&str]) -> Self {
        Self {
            catalog: shared_catalog(),
            config: GameConfig {
                random_attacks: false,
                ..GameConfig::default()
            },
            rows: rows.iter().map(|r| (*r).to_string()).collect(),
            players: Vec::new(),
            gold: Vec::new(),
            placements: Vec::new(),
            random: None,
        }
    }

    /// Replace the match settings.
    #[must_use]
    pub fn config(mut self, config: GameConfig) -> Self {
        self.config = config;
        self
    }

    /// Seat a player. Seats follow call order; without any call, blue and
    /// red are seated.
    #[must_use]
    pub fn player(mut self, id: PlayerId, ai: bool) -> Self {
        self.players.push((id, ai));
        self
    }

    /// Starting gold for a seated player.
    #[must_use]
    pub fn gold(mut self, id: PlayerId, amount: u32) -> Self {
        self.gold.push((id, amount));
        self
    }

    /// Place a unit.
    #[must_use]
    pub fn unit(mut self, type_id: &str, owner: PlayerId, cell: Cell) -> Self {
        self.placements.push(Placement {
            type_id: type_id.to_string(),
            owner,
            cell,
            must_survive: false,
        });
        self
    }

    /// Place a unit whose loss defeats its owner.
    #[must_use]
    pub fn hero(mut self, type_id: &str, owner: PlayerId, cell: Cell) -> Self {
        self.placements.push(Placement {
            type_id: type_id.to_string(),
            owner,
            cell,
            must_survive: true,
        });
        self
    }

    /// Roll attacks with `source`.
    #[must_use]
    pub fn random(mut self, source: impl RandomSource + 'static) -> Self {
        self.config.random_attacks = true;
        self.random = Some(Box::new(source));
        self
    }

    /// Build the game. Unit ids follow placement order.
    ///
    /// # Panics
    ///
    /// Panics on invalid fixture input.
    #[must_use]
    pub fn build(self) -> (Game, Vec<UnitId>) {
        let rows: Vec<&str> = self.rows.iter().map(String::as_str).collect();
        let grid = grid_from_ascii(&self.catalog, &rows);
        let mut game = Game::new(self.catalog, self.config, grid);
        if let Some(source) = self.random {
            game = game.with_random(source);
        }

        let players = if self.players.is_empty() {
            vec![(BLUE, false), (RED, false)]
        } else {
            self.players
        };
        for (id, ai) in players {
            game.activate_player(id, ai).expect("fixture player in roster");
        }
        for (id, amount) in self.gold {
            game.grant_gold(id, amount);
        }

        let mut ids = Vec::with_capacity(self.placements.len());
        for p in self.placements {
            let id = game
                .spawn(&p.type_id, p.owner, p.cell)
                .expect("fixture unit placement");
            if let Some(unit) = game.unit_mut(id) {
                unit.must_survive = p.must_survive;
            }
            ids.push(id);
        }
        tracing::debug!(
            width = game.grid().width(),
            height = game.grid().height(),
            units = ids.len(),
            "fixture game built"
        );
        (game, ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_map_layout() {
        let catalog = fixture_catalog();
        let grid = grid_from_ascii(&catalog, &[".w", "Vr"]);
        assert_eq!(grid.width(), 2);
        assert_eq!(grid.height(), 2);
        let id = |x, y| catalog.terrain(grid.terrain_at(cell(x, y)).unwrap()).id.clone();
        assert_eq!(id(1, 0), "w");
        assert_eq!(id(0, 1), "v1");
        assert_eq!(id(1, 1), "r");
    }

    #[test]
    fn test_builder_defaults_to_two_players() {
        let (game, _) = GameBuilder::new(&["..."]).gold(RED, 40).build();
        assert_eq!(game.turns().active(), &[BLUE, RED]);
        assert_eq!(game.player(RED).unwrap().gold, 40);
    }

    #[test]
    fn test_heroes_must_survive() {
        let (game, ids) = GameBuilder::new(&["..."])
            .hero("knight", BLUE, cell(0, 0))
            .unit("soldier", RED, cell(2, 0))
            .build();
        assert!(game.unit(ids[0]).unwrap().must_survive);
        assert!(!game.unit(ids[1]).unwrap().must_survive);
    }
}
