//! QA tests for phase sequencing, the overworld and timer liveness.
//!
//! Run with: `cargo test -p arcadia-core --test qa_campaign`

use arcadia_core::battle::FIRST_ENEMY_ID;
use arcadia_core::testing::{assert_last_log, assert_phase};
use arcadia_core::{
    Attributes, BattleAction, Campaign, CharacterClass, EngineConfig, HexCoord, LogKind, Phase,
    Position, Race, TerrainType, TestHarness,
};

fn setup() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// =============================================================================
// Creation and overworld
// =============================================================================

#[test]
fn test_full_creation_flow() {
    setup();
    let mut campaign = Campaign::new(EngineConfig::new().with_seed(1));
    assert_eq!(campaign.phase(), Phase::CharacterCreation);
    assert!(campaign.cells().is_empty());

    campaign
        .complete_character_creation_with_scores(
            "Thorin",
            Race::Human,
            CharacterClass::Fighter,
            [15, 12, 14, 10, 10, 10],
        )
        .unwrap();

    assert_eq!(campaign.phase(), Phase::Overworld);
    let player = campaign.player().unwrap();
    assert_eq!(player.stats.max_hp, 12);
    assert_eq!(player.stats.ac, 11);

    // Radius 2 around (5, 5) is fully inside a 20x15 map
    let map = campaign.map().unwrap();
    assert_eq!(map.visible_count(), 19);
    assert_eq!(map.explored_count(), 19);

    let welcome = campaign.log().last().unwrap();
    assert_eq!(welcome.kind, LogKind::Info);
    assert!(welcome.message.starts_with("Welcome to Arcadia, Thorin the Human Fighter."));
}

#[test]
fn test_second_creation_is_ignored() {
    setup();
    let mut harness = TestHarness::new();
    let attributes = Attributes::for_character(Race::Elf, CharacterClass::Wizard);
    harness
        .campaign
        .complete_character_creation("Elara", Race::Elf, CharacterClass::Wizard, attributes);

    assert_eq!(harness.campaign.player().unwrap().name, "Thorin");
    assert_last_log(&harness, "A character is already in play.");
}

#[test]
fn test_walk_keeps_explored_cells() {
    setup();
    let mut harness = TestHarness::new();
    for q in 6..=9 {
        harness.campaign.overworld_move_to(q, 5).unwrap();
    }
    assert_eq!(harness.campaign.player_position(), HexCoord::new(9, 5));

    let map = harness.campaign.map().unwrap();
    let start = map.cell(HexCoord::new(5, 5)).unwrap();
    assert!(start.is_explored);
    assert!(!start.is_visible);
    assert!(map.explored_count() > map.visible_count());
}

#[test]
fn test_off_map_and_far_moves_are_rejected() {
    setup();
    let config = EngineConfig::new()
        .with_seed(4)
        .with_encounter_chance(0.0)
        .with_start(HexCoord::new(0, 0));
    let mut harness = TestHarness::with_config(config);

    harness.campaign.overworld_move_to(-1, 0).unwrap();
    assert_last_log(&harness, "There is nothing there.");

    harness.campaign.overworld_move_to(2, 0).unwrap();
    assert_last_log(&harness, "Too far to travel in one step.");
    assert_eq!(harness.campaign.player_position(), HexCoord::new(0, 0));
}

#[test]
fn test_encounter_flag_consumed_on_trigger() {
    setup();
    let config = EngineConfig::new().with_seed(8).with_encounter_chance(1.0);
    let mut harness = TestHarness::with_config(config);

    let start = harness.campaign.player_position();
    let neighbours = [(1, 0), (-1, 0), (0, 1), (0, -1), (1, -1), (-1, 1)];
    let target = neighbours
        .iter()
        .map(|(dq, dr)| HexCoord::new(start.q + dq, start.r + dr))
        .find(|coord| {
            let cell = harness.campaign.map().unwrap().cell(*coord).unwrap();
            cell.has_encounter && !cell.terrain.is_landmark()
        })
        .unwrap();
    let terrain = harness.campaign.map().unwrap().cell(target).unwrap().terrain;

    harness.campaign.overworld_move_to(target.q, target.r).unwrap();
    assert_phase(&harness, Phase::BattleTactical);
    assert_eq!(harness.battle().unwrap().terrain(), terrain);
    assert!(!harness.campaign.map().unwrap().cell(target).unwrap().has_encounter);
}

#[test]
fn test_overworld_frozen_during_battle() {
    setup();
    let mut harness = TestHarness::new();
    harness.force_battle(TerrainType::Desert).unwrap();

    harness.campaign.overworld_move_to(5, 6).unwrap();
    assert_last_log(&harness, "You can only travel while exploring.");
    assert_eq!(harness.campaign.player_position(), HexCoord::new(5, 5));
}

#[test]
fn test_battle_inputs_outside_battle_are_logged() {
    setup();
    let mut harness = TestHarness::new();
    harness.select(BattleAction::Attack).unwrap();
    assert_last_log(&harness, "There is no battle in progress.");
    harness.campaign.battle_tile_interact(1, 1).unwrap();
    assert_last_log(&harness, "There is no battle in progress.");
    assert_phase(&harness, Phase::Overworld);
}

// =============================================================================
// Quitting and stale timers
// =============================================================================

#[test]
fn test_quit_discards_pending_timers() {
    setup();
    let mut harness = TestHarness::new();
    // Goblin wins initiative, so its turn is pending
    harness.script_rolls([2, 1, 18, 1]);
    harness.force_battle(TerrainType::Grass).unwrap();
    assert_eq!(harness.campaign.scheduler().len(), 1);

    harness.campaign.quit_to_title();
    assert_phase(&harness, Phase::CharacterCreation);
    assert!(harness.campaign.scheduler().is_empty());
    assert!(harness.battle().is_none());
    assert!(harness.campaign.cells().is_empty());

    let logged = harness.campaign.log().len();
    assert_eq!(harness.campaign.advance_clock(5_000).unwrap(), 0);
    assert_eq!(harness.campaign.log().len(), logged);
    assert!(!harness.log_contains("Enemy is acting..."));
}

#[test]
fn test_restart_schedules_only_new_battle() {
    setup();
    let mut harness = TestHarness::new();
    // Goblin first, attacks 19/1 for 6 + 1: lethal at 5 hp
    harness.script_rolls([2, 1, 18, 1, 19, 1, 6, 2, 1, 18, 1]);
    harness.force_battle(TerrainType::Grass).unwrap();
    harness.place(FIRST_ENEMY_ID, Position::new(3, 6)).unwrap();
    harness.set_hp(arcadia_core::battle::PLAYER_ID, 5).unwrap();
    harness.flush().unwrap();
    assert_phase(&harness, Phase::BattleDefeat);

    harness.campaign.restart_after_defeat().unwrap();
    let restarted = harness.battle().unwrap().id();
    assert_eq!(harness.battle().unwrap().current_turn(), Some(FIRST_ENEMY_ID));

    // Only the new battle's enemy turn is pending
    let pending: Vec<_> = harness.campaign.scheduler().pending().collect();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].event.battle(), restarted);
}

#[test]
fn test_new_run_after_quit() {
    setup();
    let mut harness = TestHarness::new();
    harness.campaign.quit_to_title();

    let attributes = Attributes::for_character(Race::Dwarf, CharacterClass::Cleric);
    harness
        .campaign
        .complete_character_creation("Bruni", Race::Dwarf, CharacterClass::Cleric, attributes);

    assert_phase(&harness, Phase::Overworld);
    assert_eq!(harness.campaign.player().unwrap().name, "Bruni");
    assert_eq!(harness.campaign.player_position(), HexCoord::new(5, 5));
    // The old run's log is still there
    assert!(harness.log_contains("Thorin"));
}
