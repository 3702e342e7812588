//! QA tests for the dice and rules engine through the public API.
//!
//! Run with: `cargo test -p arcadia-core --test qa_rules`

use arcadia_core::rules::{armor_class, hit_points, modifier, speed_in_tiles};
use arcadia_core::{
    Advantage, Attributes, CharacterClass, Dice, DiceFormula, PlayerCharacter, Race, ScriptedRolls,
};

fn setup() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// =============================================================================
// Character creation numbers
// =============================================================================

#[test]
fn test_fighter_scenario_max_hp() {
    setup();
    let attributes = Attributes::new(15, 12, 14, 10, 10, 10).unwrap();
    let fighter = PlayerCharacter::create("Thorin", Race::Human, CharacterClass::Fighter, attributes);

    // d10 + CON 14 (+2)
    assert_eq!(fighter.stats.max_hp, 12);
    assert_eq!(fighter.stats.hp, fighter.stats.max_hp);
    assert_eq!(fighter.stats.ac, armor_class(12, 10, false));
}

#[test]
fn test_every_class_and_race_yields_valid_record() {
    setup();
    for &class in CharacterClass::all() {
        for &race in Race::all() {
            let attributes = Attributes::for_character(race, class);
            let pc = PlayerCharacter::create("Hero", race, class, attributes);
            assert!(pc.stats.max_hp >= 1, "{race} {class}");
            assert_eq!(pc.stats.speed, 30);
            assert_eq!(speed_in_tiles(pc.stats.speed), 6);
        }
    }
}

#[test]
fn test_negative_modifiers_floor() {
    assert_eq!(modifier(3), -4);
    assert_eq!(modifier(7), -2);
    assert_eq!(modifier(9), -1);
}

#[test]
fn test_hit_points_average_policy() {
    // Level 3 fighter with CON 14: 12 + 2 * (5 + 1 + 2)
    assert_eq!(hit_points(3, 14, 10), 28);
}

// =============================================================================
// Dice
// =============================================================================

#[test]
fn test_scripted_d20_modes() {
    let mut dice = Dice::new(ScriptedRolls::new([7, 16, 7, 16, 7, 16]));

    let normal = dice.d20(Advantage::Normal);
    assert_eq!((normal.result, normal.raw), (7, vec![7]));

    let adv = dice.d20(Advantage::Advantage);
    assert_eq!((adv.result, adv.raw), (16, vec![7, 16]));

    let dis = dice.d20(Advantage::Disadvantage);
    assert_eq!((dis.result, dis.raw), (7, vec![7, 16]));
}

#[test]
fn test_seeded_formula_rolls_repeat() {
    let potion = DiceFormula::new(2, 4, 2);
    let mut a = Dice::seeded(2024);
    let mut b = Dice::seeded(2024);
    for _ in 0..50 {
        let (left, right) = (a.roll(potion), b.roll(potion));
        assert_eq!(left, right);
        assert!((potion.min()..=potion.max()).contains(&left.total));
    }
}
