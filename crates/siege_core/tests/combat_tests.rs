//! Attack commands, damage formula and splash/bash side effects.

use std::sync::Arc;

use siege_core::combat::{calculate_damage, Roll, StrikeKind};
use siege_core::effects::Effect;
use siege_core::math::Fixed;
use siege_core::prelude::*;
use siege_test_utils::determinism::strategies::{arb_health, arb_stat};
use siege_test_utils::fixtures::{cell, GameBuilder, BLUE, RED};
use siege_test_utils::proptest::prelude::*;
use siege_test_utils::random::ScriptedRandom;

/// Move a unit one step and leave it in attack mode.
fn step_into_attack(game: &mut Game, id: UnitId, to: Cell) {
    assert!(game.select(id));
    assert!(game.move_unit(id, to));
    game.settle();
    assert_eq!(game.unit(id).unwrap().mode, UnitMode::Attack);
}

#[test]
fn damage_scales_with_attacker_health() {
    let (mut game, ids) = GameBuilder::new(&["...."])
        .unit("soldier", BLUE, cell(0, 0))
        .unit("soldier", RED, cell(1, 0))
        .unit("knight", BLUE, cell(3, 0))
        .build();

    assert_eq!(game.preview_damage(ids[0], ids[1]), Some(3));
    assert_eq!(game.health_fraction(ids[0]), Some(Fixed::ONE));
    game.unit_mut(ids[0]).unwrap().hitpoints = 5;
    assert_eq!(game.preview_damage(ids[0], ids[1]), Some(2));
    assert_eq!(game.health_fraction(ids[0]), Some(Fixed::ONE / 2));

    // Knights add their full attack bonus on a maximal roll.
    assert_eq!(game.preview_damage(ids[2], ids[1]), Some(7));
    game.unit_mut(ids[2]).unwrap().hitpoints = 6;
    assert_eq!(game.preview_damage(ids[2], ids[1]), Some(5));
}

#[test]
fn terrain_and_auras_change_damage() {
    let (mut game, ids) = GameBuilder::new(&["..h..", "....."])
        .unit("soldier", BLUE, cell(1, 0))
        .unit("soldier", RED, cell(2, 0))
        .unit("shaman", RED, cell(3, 1))
        .unit("warlord", BLUE, cell(4, 1))
        .unit("archer", RED, cell(1, 1))
        .build();

    // Hills +2 and the shaman's blessing +2 swallow the soldier's edge.
    assert_eq!(game.preview_damage(ids[0], ids[1]), Some(0));
    assert_eq!(game.preview_damage(ids[0], ids[4]), Some(4));

    // A warlord next to the soldier lends +2 attack.
    game.unit_mut(ids[3]).unwrap().cell = cell(0, 0);
    assert_eq!(game.preview_damage(ids[0], ids[4]), Some(6));
}

#[test]
fn random_rolls_draw_the_attack_bonus() {
    let (mut game, ids) = GameBuilder::new(&["...."])
        .unit("knight", BLUE, cell(0, 0))
        .unit("soldier", RED, cell(2, 0))
        .unit("soldier", RED, cell(3, 0))
        .random(ScriptedRandom::new([1]))
        .build();
    game.start_turn(BLUE);

    step_into_attack(&mut game, ids[0], cell(1, 0));
    let report = game.attack(ids[0], cell(2, 0)).unwrap();
    // 7 - 2 - 1 (bash wound) = 6, plus a roll of 1.
    let opening = report.strikes[0];
    assert_eq!(opening.kind, StrikeKind::Opening);
    assert_eq!(opening.damage, 7);
}

#[test]
fn first_strike_kill_skips_the_answer() {
    let (mut game, ids) = GameBuilder::new(&["....", "...."])
        .unit("soldier", BLUE, cell(0, 0))
        .unit("knight", RED, cell(2, 0))
        .unit("archer", BLUE, cell(0, 1))
        .build();
    game.unit_mut(ids[0]).unwrap().hitpoints = 5;
    game.start_turn(BLUE);

    step_into_attack(&mut game, ids[0], cell(1, 0));
    let report = game.attack(ids[0], cell(2, 0)).unwrap();

    assert!(report.first_strike);
    assert_eq!(report.strikes.len(), 1);
    assert_eq!(report.strikes[0].attacker, ids[1]);
    assert_eq!(report.killed(), vec![ids[0]]);
    assert!(game.unit(ids[0]).is_none());
    assert_eq!(game.unit(ids[1]).unwrap().hitpoints, 12);
    assert_eq!(game.unit(ids[1]).unwrap().veterancy, 1);
    assert!(game.graves().at(cell(1, 0)).is_some());
    assert_eq!(game.outcome(), LevelOutcome::InProgress);
}

#[test]
fn first_striker_out_of_range_cannot_answer() {
    let (mut game, ids) = GameBuilder::new(&["...."])
        .unit("archer", BLUE, cell(0, 0))
        .unit("knight", RED, cell(2, 0))
        .build();
    game.start_turn(BLUE);

    // Archers may shoot before moving.
    assert!(game.select(ids[0]));
    assert_eq!(game.unit(ids[0]).unwrap().mode, UnitMode::Attack);
    let report = game.attack(ids[0], cell(2, 0)).unwrap();

    assert!(report.first_strike);
    assert_eq!(report.strikes.len(), 1);
    assert_eq!(report.strikes[0].attacker, ids[0]);
    assert_eq!(report.strikes[0].damage, 1);
    let knight = game.unit(ids[1]).unwrap();
    assert_eq!(knight.hitpoints, 11);
    assert_eq!(knight.defense_modifier, -1);
    assert_eq!(game.unit(ids[0]).unwrap().mode, UnitMode::Move);
}

#[test]
fn return_strike_follows_a_surviving_defender() {
    let (mut game, ids) = GameBuilder::new(&["...."])
        .unit("soldier", BLUE, cell(0, 0))
        .unit("soldier", RED, cell(2, 0))
        .build();
    game.start_turn(BLUE);

    step_into_attack(&mut game, ids[0], cell(1, 0));
    let report = game.attack(ids[0], cell(2, 0)).unwrap();

    let kinds: Vec<StrikeKind> = report.strikes.iter().map(|s| s.kind).collect();
    assert_eq!(kinds, vec![StrikeKind::Opening, StrikeKind::Return]);
    assert_eq!(report.strikes[0].damage, 3);
    // The wounded defender hits back at 7/10 health against defense 2.
    assert_eq!(report.strikes[1].damage, 2);
    assert!(report.killed().is_empty());

    let batches = game.take_effects();
    let strikes = batches
        .iter()
        .flat_map(|b| &b.effects)
        .filter(|e| matches!(e, Effect::Strike(_)))
        .count();
    assert_eq!(strikes, 2);
}

#[test]
fn splash_hits_everyone_next_to_the_victim() {
    let (mut game, ids) = GameBuilder::new(&["....", "....", "...."])
        .unit("bomber", BLUE, cell(0, 1))
        .unit("soldier", RED, cell(2, 1))
        .unit("soldier", RED, cell(3, 1))
        .unit("soldier", RED, cell(2, 0))
        .unit("soldier", RED, cell(2, 2))
        .unit("soldier", BLUE, cell(1, 0))
        .build();
    game.unit_mut(ids[1]).unwrap().hitpoints = 2;
    game.start_turn(BLUE);

    step_into_attack(&mut game, ids[0], cell(1, 1));
    let report = game.attack(ids[0], cell(2, 1)).unwrap();

    assert_eq!(report.strikes[0].kind, StrikeKind::Opening);
    assert!(report.strikes[0].killed);
    let mut splashed: Vec<UnitId> = report
        .strikes
        .iter()
        .filter(|s| s.kind == StrikeKind::Splash)
        .map(|s| s.defender)
        .collect();
    splashed.sort();
    let mut expected = vec![ids[2], ids[3], ids[4]];
    expected.sort();
    assert_eq!(splashed, expected);
    for id in expected {
        assert_eq!(game.unit(id).unwrap().hitpoints, 8);
    }
    assert_eq!(game.unit(ids[5]).unwrap().hitpoints, 10);
}

#[test]
fn bash_hits_the_enemy_beyond_the_destination() {
    let (mut game, ids) = GameBuilder::new(&["......"])
        .unit("knight", BLUE, cell(0, 0))
        .unit("soldier", RED, cell(3, 0))
        .build();
    game.start_turn(BLUE);

    assert!(game.select(ids[0]));
    assert!(game.move_unit(ids[0], cell(2, 0)));
    let soldier = game.unit(ids[1]).unwrap();
    assert_eq!(soldier.hitpoints, 7);
    assert_eq!(soldier.defense_modifier, -1);

    let batches = game.settle();
    assert!(batches.iter().flat_map(|b| &b.effects).any(|e| matches!(
        e,
        Effect::Strike(s) if s.kind == StrikeKind::Bash && s.defender == ids[1]
    )));
}

#[test]
fn sideways_moves_do_not_bash() {
    let (mut game, ids) = GameBuilder::new(&["....", "...."])
        .unit("knight", BLUE, cell(1, 0))
        .unit("soldier", RED, cell(2, 1))
        .build();
    game.start_turn(BLUE);

    game.select(ids[0]);
    assert!(game.move_unit(ids[0], cell(1, 1)));
    assert_eq!(game.unit(ids[1]).unwrap().hitpoints, 10);
}

#[test]
fn attacks_outside_the_range_are_ignored() {
    let (mut game, ids) = GameBuilder::new(&["....."])
        .unit("soldier", BLUE, cell(0, 0))
        .unit("soldier", RED, cell(4, 0))
        .unit("soldier", BLUE, cell(1, 0))
        .build();
    game.start_turn(BLUE);

    // Not in attack mode yet.
    assert!(game.attack(ids[0], cell(4, 0)).is_none());
    game.select(ids[2]);
    game.advance(ids[2]);
    assert_eq!(game.unit(ids[2]).unwrap().mode, UnitMode::Attack);
    assert!(game.attack(ids[2], cell(4, 0)).is_none());
    assert!(game.attack(ids[2], cell(0, 0)).is_none());
    assert_eq!(game.unit(ids[1]).unwrap().hitpoints, 10);
}

#[test]
fn kills_earn_veterancy_that_survives_turns() {
    let (mut game, ids) = GameBuilder::new(&["....."])
        .unit("soldier", BLUE, cell(0, 0))
        .unit("soldier", RED, cell(2, 0))
        .unit("soldier", RED, cell(4, 0))
        .build();
    game.unit_mut(ids[1]).unwrap().hitpoints = 3;
    game.start_turn(BLUE);

    step_into_attack(&mut game, ids[0], cell(1, 0));
    let report = game.attack(ids[0], cell(2, 0)).unwrap();
    assert_eq!(report.killed(), vec![ids[1]]);
    game.settle();
    assert_eq!(game.unit(ids[0]).unwrap().veterancy, 1);

    game.next_player();
    game.settle();
    game.next_player();
    game.settle();
    assert_eq!(game.current_player(), Some(BLUE));
    assert_eq!(game.unit(ids[0]).unwrap().veterancy, 1);
    assert_eq!(game.preview_damage(ids[0], ids[2]), Some(4));
}

fn duel_game(attack: i32, defense: i32) -> Game {
    let catalog = Catalog::new(
        vec![Terrain::new("a", "Plains", 1)],
        vec![
            UnitType {
                attack_bonus: 3,
                ..UnitType::new("striker", attack, 0, 40)
            },
            UnitType::new("target", 0, defense, 40),
        ],
    )
    .unwrap();
    let grid = Grid::new(2, 1, catalog.terrain_key("a").unwrap());
    let mut game = Game::new(Arc::new(catalog), GameConfig::default(), grid);
    game.activate_player(BLUE, false).unwrap();
    game.activate_player(RED, false).unwrap();
    game.spawn("striker", BLUE, cell(0, 0)).unwrap();
    game.spawn("target", RED, cell(1, 0)).unwrap();
    game
}

proptest! {
    #[test]
    fn damage_is_bounded_by_the_stat_gap(
        attack in arb_stat(),
        defense in arb_stat(),
        (hitpoints, _) in arb_health(),
        draw in 0u32..5,
    ) {
        let game = duel_game(attack, defense);
        let view = game.board();
        let (_, striker) = view.unit_at(cell(0, 0)).unwrap();
        let (_, target) = view.unit_at(cell(1, 0)).unwrap();
        let mut striker = striker.clone();
        striker.hitpoints = hitpoints;

        let max = calculate_damage(&view, &striker, target, &mut Roll::Max);
        let mut source = ScriptedRandom::new([draw]);
        let rolled = calculate_damage(&view, &striker, target, &mut Roll::Random(&mut source));

        if attack <= defense {
            prop_assert_eq!(max, 0);
            prop_assert_eq!(rolled, 0);
        } else {
            let gap = u32::try_from(attack - defense).unwrap();
            prop_assert!(max <= gap + 3);
            prop_assert!(rolled <= max);
        }
    }
}
