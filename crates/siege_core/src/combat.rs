//! Combat resolution.
//!
//! All functions here are synchronous and touch only the unit store. Kills
//! are recorded by marking the unit dead; the caller turns them into graves,
//! notifications and freed slots.

use tracing::debug;

use crate::catalog::Catalog;
use crate::grid::{BoardView, Cell, Grid};
use crate::math::{manhattan_distance, scale_by_health};
use crate::rng::RandomSource;
use crate::unit::{Unit, UnitId, UnitMode, UnitStore};

/// How the random part of damage is chosen.
pub enum Roll<'a> {
    /// Always take the maximum. Used for previews and AI evaluation.
    Max,
    /// Draw from a random source.
    Random(&'a mut dyn RandomSource),
}

impl Roll<'_> {
    /// `n` when maximal, otherwise a draw in `[0, n)`.
    pub fn roll(&mut self, n: u32) -> u32 {
        match self {
            Self::Max => n,
            Self::Random(source) => source.below(n),
        }
    }
}

impl std::fmt::Debug for Roll<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Max => f.write_str("Roll::Max"),
            Self::Random(_) => f.write_str("Roll::Random"),
        }
    }
}

/// Why damage was dealt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrikeKind {
    /// The opening strike of an attack.
    Opening,
    /// The answer from the unit that was struck first.
    Return,
    /// Explosive damage to a unit next to the struck unit.
    Splash,
    /// Damage from running into a unit at the end of a move.
    Bash,
}

/// A single application of damage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strike {
    /// What kind of hit this was.
    pub kind: StrikeKind,
    /// Unit dealing the damage.
    pub attacker: UnitId,
    /// Unit receiving the damage.
    pub defender: UnitId,
    /// Hitpoints removed (capped by what the defender had).
    pub damage: u32,
    /// Whether the defender died from this strike.
    pub killed: bool,
}

/// Everything that happened during one attack command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CombatReport {
    /// Strikes in the order they were applied.
    pub strikes: Vec<Strike>,
    /// Whether the defender struck first.
    pub first_strike: bool,
}

impl CombatReport {
    /// Units killed during the exchange, in order of death.
    #[must_use]
    pub fn killed(&self) -> Vec<UnitId> {
        self.strikes
            .iter()
            .filter(|s| s.killed)
            .map(|s| s.defender)
            .collect()
    }
}

/// Attack of `attacker` against `defender`, including veterancy, the
/// berserk aura of adjacent allies and type matchup bonuses.
#[must_use]
pub fn attack_value(view: &BoardView<'_>, attacker: &Unit, defender: &Unit) -> i32 {
    let attacker_type = view.unit_type(attacker);
    let berserk: i32 = view
        .units
        .adjacent(attacker.cell)
        .filter(|(_, other)| other.owner == attacker.owner)
        .map(|(_, other)| view.unit_type(other).berserk)
        .sum();
    let matchup = view
        .catalog
        .attack_bonus(attacker_type, view.unit_type(defender));

    attacker_type.attack + attacker.attack_modifier + attacker.veterancy + berserk + matchup
}

/// Defense of `defender`, including terrain and the bless aura of adjacent
/// allies.
#[must_use]
pub fn defense_value(view: &BoardView<'_>, defender: &Unit) -> i32 {
    let bless: i32 = view
        .units
        .adjacent(defender.cell)
        .filter(|(_, other)| other.owner == defender.owner)
        .map(|(_, other)| view.unit_type(other).bless)
        .sum();

    view.unit_type(defender).defense
        + defender.defense_modifier
        + view.terrain_defense(defender.cell)
        + bless
}

/// Damage `attacker` would deal to `defender`.
///
/// The attack/defense difference is scaled by the attacker's health and
/// then the type's attack bonus is added (in full for [`Roll::Max`]). No
/// damage is dealt unless attack exceeds defense.
#[must_use]
pub fn calculate_damage(
    view: &BoardView<'_>,
    attacker: &Unit,
    defender: &Unit,
    roll: &mut Roll<'_>,
) -> u32 {
    let attack = attack_value(view, attacker, defender);
    let defense = defense_value(view, defender);
    if attack <= defense {
        return 0;
    }

    let attacker_type = view.unit_type(attacker);
    let scaled = scale_by_health(attack - defense, attacker.hitpoints, attacker_type.hitpoints);
    (scaled.max(0) as u32).saturating_add(roll.roll(attacker_type.attack_bonus))
}

/// Whether `defender` stands inside `attacker`'s attack range.
#[must_use]
pub fn in_attack_range(view: &BoardView<'_>, attacker: &Unit, defender: &Unit) -> bool {
    view.unit_type(attacker)
        .in_range(manhattan_distance(attacker.cell, defender.cell))
}

/// Remove `amount` hitpoints from a unit.
///
/// Damage equal to or above the remaining hitpoints kills the unit. A unit
/// that survives non-zero damage loses one point of defense until its next
/// turn. Returns `(damage applied, killed)`.
pub fn apply_damage(units: &mut UnitStore, id: UnitId, amount: u32) -> (u32, bool) {
    let Some(unit) = units.get_mut(id) else {
        return (0, false);
    };
    if amount == 0 || unit.dead {
        return (0, false);
    }
    if amount >= unit.hitpoints {
        let dealt = unit.hitpoints;
        unit.hitpoints = 0;
        unit.dead = true;
        unit.mode = UnitMode::Done;
        (dealt, true)
    } else {
        unit.hitpoints -= amount;
        unit.defense_modifier -= 1;
        (amount, false)
    }
}

/// Resolve `initiator` attacking `target`.
///
/// The initiator is marked as having attacked (and moved, for
/// attack-or-move types). A defender with first strike hits first unless
/// the initiator also has it. Each side only strikes if the other is in its
/// range, and the second strike is skipped if the first one killed.
pub fn resolve_attack(
    catalog: &Catalog,
    grid: &Grid,
    units: &mut UnitStore,
    initiator: UnitId,
    target: UnitId,
    roll: &mut Roll<'_>,
) -> CombatReport {
    let mut report = CombatReport::default();

    let Some(attacker) = units.get_mut(initiator) else {
        return report;
    };
    attacker.flags.attacked = true;
    let attacker_type = catalog.unit_type(attacker.type_key);
    if attacker_type.attack_or_move {
        attacker.flags.moved = true;
    }
    let initiator_first_strike = attacker_type.first_strike;

    let Some(defender) = units.get(target) else {
        return report;
    };
    let target_first_strike = catalog.unit_type(defender.type_key).first_strike;

    let (first, second) = if target_first_strike && !initiator_first_strike {
        debug!(?target, "defender strikes first");
        report.first_strike = true;
        (target, initiator)
    } else {
        (initiator, target)
    };

    perform_attack(catalog, grid, units, first, second, StrikeKind::Opening, roll, &mut report);
    if units.get(second).is_some_and(Unit::is_alive) {
        perform_attack(catalog, grid, units, second, first, StrikeKind::Return, roll, &mut report);
    }
    report
}

#[allow(clippy::too_many_arguments)]
fn perform_attack(
    catalog: &Catalog,
    grid: &Grid,
    units: &mut UnitStore,
    striker: UnitId,
    victim: UnitId,
    kind: StrikeKind,
    roll: &mut Roll<'_>,
    report: &mut CombatReport,
) {
    let (damage, splash_amount, splash_targets) = {
        let view = BoardView {
            catalog,
            grid,
            units: &*units,
        };
        let (Some(attacker), Some(defender)) = (units.get(striker), units.get(victim)) else {
            return;
        };
        if !attacker.is_alive() || !defender.is_alive() || !in_attack_range(&view, attacker, defender)
        {
            debug!(?striker, ?victim, "target out of range, no strike");
            return;
        }

        // Adjacency is captured before the hit lands so a kill does not hide
        // the units around the victim.
        let explosive = view.unit_type(attacker).explosive;
        let splash_targets: Vec<UnitId> = if explosive > 0 {
            units
                .adjacent(defender.cell)
                .filter(|(_, u)| u.owner != attacker.owner)
                .map(|(id, _)| id)
                .collect()
        } else {
            Vec::new()
        };

        let damage = calculate_damage(&view, attacker, defender, roll);
        let max_hp = view.unit_type(attacker).hitpoints;
        (damage, (explosive, attacker.hitpoints, max_hp), splash_targets)
    };

    let (dealt, killed) = apply_damage(units, victim, damage);
    debug!(?striker, ?victim, damage = dealt, killed, ?kind, "strike");
    report.strikes.push(Strike {
        kind,
        attacker: striker,
        defender: victim,
        damage: dealt,
        killed,
    });
    if killed {
        if let Some(unit) = units.get_mut(striker) {
            unit.veterancy += 1;
        }
    }

    if splash_targets.is_empty() {
        return;
    }
    let (explosive, hitpoints, max_hp) = splash_amount;
    let splash = scale_by_health(explosive, hitpoints, max_hp);
    for id in splash_targets {
        let amount = {
            let view = BoardView {
                catalog,
                grid,
                units: &*units,
            };
            let Some(unit) = units.get(id) else {
                continue;
            };
            let raw = splash - defense_value(&view, unit);
            if raw < 0 {
                0
            } else {
                roll.roll(raw as u32)
            }
        };
        let (dealt, killed) = apply_damage(units, id, amount);
        debug!(?striker, target = ?id, damage = dealt, killed, "splash");
        report.strikes.push(Strike {
            kind: StrikeKind::Splash,
            attacker: striker,
            defender: id,
            damage: dealt,
            killed,
        });
    }
}

/// Resolve the bash of a unit that just moved from `from` to its cell.
///
/// The bashed cell is the next one along the final step. Only an enemy
/// there is hit. The damage is the basher's bash stat scaled by its health.
/// Returns the strike even when it dealt no damage.
pub fn resolve_bash(
    catalog: &Catalog,
    units: &mut UnitStore,
    basher: UnitId,
    from: Cell,
    roll: &mut Roll<'_>,
) -> Option<Strike> {
    let unit = units.get(basher)?;
    let unit_type = catalog.unit_type(unit.type_key);
    if unit_type.bash <= 0 {
        return None;
    }
    let direction = (unit.cell.x - from.x, unit.cell.y - from.y);
    let bashed = unit.cell.offset(direction.0, direction.1);
    let (target, _) = units
        .at(bashed)
        .filter(|(_, other)| other.owner != unit.owner)?;

    let scaled = scale_by_health(unit_type.bash, unit.hitpoints, unit_type.hitpoints);
    let amount = roll.roll(scaled.max(0) as u32);
    let (dealt, killed) = apply_damage(units, target, amount);
    debug!(?basher, ?target, damage = dealt, killed, "bash");
    Some(Strike {
        kind: StrikeKind::Bash,
        attacker: basher,
        defender: target,
        damage: dealt,
        killed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Terrain, UnitType, UnitTypeKey};
    use crate::player::PlayerId;
    use crate::rng::MaxRandom;

    struct Arena {
        catalog: Catalog,
        grid: Grid,
        units: UnitStore,
    }

    impl Arena {
        fn new(types: Vec<UnitType>) -> Self {
            let catalog = Catalog::new(
                vec![
                    Terrain::new("a", "Plains", 1),
                    Terrain {
                        defense: 2,
                        ..Terrain::new("h", "Hill", 2)
                    },
                ],
                types,
            )
            .unwrap();
            let grid = Grid::new(6, 6, catalog.terrain_key("a").unwrap());
            Self {
                catalog,
                grid,
                units: UnitStore::new(),
            }
        }

        fn key(&self, id: &str) -> UnitTypeKey {
            self.catalog.unit_type_key(id).unwrap()
        }

        fn add(&mut self, id: &str, owner: u8, x: i32, y: i32) -> UnitId {
            let key = self.key(id);
            let unit = Unit::new(key, self.catalog.unit_type(key), PlayerId(owner), Cell::new(x, y));
            self.units.spawn(unit)
        }

        fn view(&self) -> BoardView<'_> {
            BoardView {
                catalog: &self.catalog,
                grid: &self.grid,
                units: &self.units,
            }
        }

        fn unit(&self, id: UnitId) -> &Unit {
            self.units.get(id).unwrap()
        }

        fn attack(&mut self, a: UnitId, d: UnitId) -> CombatReport {
            resolve_attack(
                &self.catalog,
                &self.grid,
                &mut self.units,
                a,
                d,
                &mut Roll::Max,
            )
        }
    }

    fn with_bonus(mut t: UnitType, bonus: u32) -> UnitType {
        t.attack_bonus = bonus;
        t
    }

    #[test]
    fn test_damage_scales_with_attacker_health() {
        let mut arena = Arena::new(vec![
            with_bonus(UnitType::new("soldier", 5, 0, 10), 1),
            UnitType::new("guard", 0, 2, 10),
        ]);
        let a = arena.add("soldier", 1, 0, 0);
        let d = arena.add("guard", 2, 0, 1);
        arena.units.get_mut(a).unwrap().hitpoints = 5;

        let damage = calculate_damage(&arena.view(), arena.unit(a), arena.unit(d), &mut Roll::Max);
        // round(3 * 0.5) = 2, plus the full bonus of 1.
        assert_eq!(damage, 3);

        let mut zero = crate::rng::SeededRandom::new(0);
        let random = calculate_damage(
            &arena.view(),
            arena.unit(a),
            arena.unit(d),
            &mut Roll::Random(&mut zero),
        );
        assert_eq!(random, 2);
    }

    #[test]
    fn test_no_damage_without_advantage() {
        let mut arena = Arena::new(vec![
            with_bonus(UnitType::new("weak", 2, 0, 10), 5),
            UnitType::new("wall", 0, 9, 10),
        ]);
        let a = arena.add("weak", 1, 0, 0);
        let d = arena.add("wall", 2, 1, 0);
        let damage = calculate_damage(&arena.view(), arena.unit(a), arena.unit(d), &mut Roll::Max);
        assert_eq!(damage, 0);
    }

    #[test]
    fn test_terrain_auras_and_matchups() {
        let mut archer = UnitType::new("archer", 4, 1, 10);
        archer.attack_bonuses.insert("dragon".into(), 3);
        let mut drummer = UnitType::new("drummer", 0, 0, 10);
        drummer.berserk = 2;
        let mut priest = UnitType::new("priest", 0, 0, 10);
        priest.bless = 1;
        let mut arena = Arena::new(vec![
            archer,
            drummer,
            priest,
            UnitType::new("dragon", 8, 3, 20),
        ]);
        let hill = arena.catalog.terrain_key("h").unwrap();
        arena.grid.set_terrain_at(Cell::new(2, 3), hill);

        let a = arena.add("archer", 1, 2, 2);
        arena.add("drummer", 1, 1, 1);
        arena.add("drummer", 2, 3, 1);
        let d = arena.add("dragon", 2, 2, 3);
        arena.add("priest", 2, 3, 4);

        assert_eq!(attack_value(&arena.view(), arena.unit(a), arena.unit(d)), 4 + 2 + 3);
        assert_eq!(defense_value(&arena.view(), arena.unit(d)), 3 + 2 + 1);
    }

    #[test]
    fn test_damage_and_defense_penalty() {
        let mut arena = Arena::new(vec![
            UnitType::new("soldier", 5, 1, 10),
            UnitType::new("guard", 1, 2, 10),
        ]);
        let a = arena.add("soldier", 1, 0, 0);
        let d = arena.add("guard", 2, 1, 0);
        let report = arena.attack(a, d);

        assert_eq!(report.strikes.len(), 2);
        assert_eq!(report.strikes[0].damage, 3);
        assert_eq!(arena.unit(d).hitpoints, 7);
        assert_eq!(arena.unit(d).defense_modifier, -1);
        // The guard answers with 1 - 1 = 0 damage, so the soldier is unhurt.
        assert_eq!(report.strikes[1].damage, 0);
        assert_eq!(arena.unit(a).defense_modifier, 0);
        assert!(arena.unit(a).flags.attacked);
    }

    #[test]
    fn test_first_strike_kill_skips_answer() {
        let mut pike = UnitType::new("pike", 20, 0, 10);
        pike.first_strike = true;
        let mut arena = Arena::new(vec![UnitType::new("soldier", 9, 0, 10), pike]);
        let a = arena.add("soldier", 1, 0, 0);
        let d = arena.add("pike", 2, 1, 0);
        let report = arena.attack(a, d);

        assert!(report.first_strike);
        assert_eq!(report.strikes.len(), 1);
        assert_eq!(report.strikes[0].attacker, d);
        assert!(report.strikes[0].killed);
        assert!(!arena.unit(a).is_alive());
        assert_eq!(arena.unit(d).hitpoints, 10);
        assert_eq!(arena.unit(d).veterancy, 1);
        assert_eq!(report.killed(), vec![a]);
    }

    #[test]
    fn test_out_of_range_answer_is_skipped() {
        let mut archer = UnitType::new("archer", 6, 0, 10);
        archer.range_min = 2;
        archer.range_max = 3;
        let mut arena = Arena::new(vec![archer, UnitType::new("soldier", 9, 0, 10)]);
        let a = arena.add("archer", 1, 0, 0);
        let d = arena.add("soldier", 2, 0, 2);
        let report = arena.attack(a, d);
        assert_eq!(report.strikes.len(), 1);
        assert_eq!(arena.unit(a).hitpoints, 10);
    }

    #[test]
    fn test_splash_hits_units_next_to_killed_target() {
        let mut bomber = UnitType::new("bomber", 30, 0, 10);
        bomber.explosive = 6;
        bomber.range_max = 3;
        let mut arena = Arena::new(vec![bomber, UnitType::new("soldier", 1, 1, 10)]);
        let a = arena.add("bomber", 1, 0, 2);
        let d = arena.add("soldier", 2, 2, 2);
        let left = arena.add("soldier", 2, 3, 3);
        let right = arena.add("soldier", 2, 2, 1);
        let ally = arena.add("soldier", 1, 1, 2);
        let report = arena.attack(a, d);

        assert!(!arena.unit(d).is_alive());
        let splashed: Vec<UnitId> = report
            .strikes
            .iter()
            .filter(|s| s.kind == StrikeKind::Splash)
            .map(|s| s.defender)
            .collect();
        assert_eq!(splashed, vec![left, right]);
        assert_eq!(arena.unit(left).hitpoints, 5);
        assert_eq!(arena.unit(ally).hitpoints, 10);
    }

    #[test]
    fn test_bash_hits_enemy_beyond_destination() {
        let mut ram = UnitType::new("ram", 1, 1, 10);
        ram.bash = 4;
        let mut arena = Arena::new(vec![ram, UnitType::new("soldier", 1, 1, 10)]);
        let basher = arena.add("ram", 1, 2, 2);
        let victim = arena.add("soldier", 2, 3, 2);
        let strike = resolve_bash(
            &arena.catalog,
            &mut arena.units,
            basher,
            Cell::new(1, 2),
            &mut Roll::Random(&mut MaxRandom),
        )
        .unwrap();
        assert_eq!(strike.defender, victim);
        assert_eq!(strike.damage, 3);
        assert_eq!(arena.unit(victim).hitpoints, 7);

        let none = resolve_bash(
            &arena.catalog,
            &mut arena.units,
            basher,
            Cell::new(2, 3),
            &mut Roll::Max,
        );
        assert!(none.is_none());
    }
}
