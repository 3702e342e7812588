//! Testing utilities.
//!
//! - `ScriptedRolls` for deterministic dice
//! - `TestHarness` for driving a campaign through scripted scenarios
//! - Assertion helpers for common checks

use crate::battle::{Battle, BattleAction, EntityId, Position};
use crate::campaign::{Campaign, CampaignError, Phase};
use crate::character::{Attributes, CharacterClass, Race};
use crate::config::{EngineConfig, Pacing};
use crate::dice::{Dice, RollSource};
use crate::map::TerrainType;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::VecDeque;

/// A roll source that replays fixed values.
///
/// Each integer draw takes the next queued value, clamped into the requested
/// range. Once the queue runs dry, and for every probability check, draws
/// come from a fixed-seed generator.
#[derive(Debug, Clone)]
pub struct ScriptedRolls {
    queue: VecDeque<i32>,
    fallback: StdRng,
}

impl ScriptedRolls {
    /// Serve `values` in order, then fall back to a seeded generator.
    pub fn new(values: impl IntoIterator<Item = i32>) -> Self {
        Self {
            queue: values.into_iter().collect(),
            fallback: StdRng::seed_from_u64(0),
        }
    }

    /// Queue more values behind the current ones.
    pub fn push(&mut self, value: i32) {
        self.queue.push_back(value);
    }

    /// Scripted values not yet drawn.
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}

impl RollSource for ScriptedRolls {
    fn roll_range(&mut self, low: i32, high: i32) -> i32 {
        match self.queue.pop_front() {
            Some(value) => value.clamp(low, high.max(low)),
            None => self.fallback.roll_range(low, high),
        }
    }

    fn chance(&mut self, probability: f64) -> bool {
        self.fallback.chance(probability)
    }
}

/// Test harness: a seeded campaign with a created Fighter on the overworld.
///
/// Random encounters are off so overworld moves never start a fight on
/// their own; use [`TestHarness::force_battle`].
pub struct TestHarness {
    pub campaign: Campaign,
}

impl TestHarness {
    /// Seeded campaign with a character already created and no encounters.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::new().with_seed(7).with_encounter_chance(0.0))
    }

    /// Harness over a custom configuration.
    pub fn with_config(config: EngineConfig) -> Self {
        let mut campaign = Campaign::new(config);
        // STR 15, DEX 12, CON 14: 12 hp, AC 11
        let attributes = Attributes::table(15, 12, 14, 10, 10, 10);
        campaign.complete_character_creation("Thorin", Race::Human, CharacterClass::Fighter, attributes);
        Self { campaign }
    }

    /// Harness whose timed events are all due immediately.
    pub fn instant() -> Self {
        Self::with_config(
            EngineConfig::new()
                .with_seed(7)
                .with_encounter_chance(0.0)
                .with_pacing(Pacing::instant()),
        )
    }

    /// Replace the campaign's dice with scripted values from here on.
    pub fn script_rolls(&mut self, values: impl IntoIterator<Item = i32>) -> &mut Self {
        self.campaign.replace_dice(Dice::new(ScriptedRolls::new(values)));
        self
    }

    /// Start a battle on `terrain` as if an encounter had triggered.
    pub fn force_battle(&mut self, terrain: TerrainType) -> Result<(), CampaignError> {
        self.campaign.start_battle(terrain)
    }

    pub fn battle(&self) -> Option<&Battle> {
        self.campaign.battle()
    }

    /// Put an entity on a cell, ignoring movement rules.
    pub fn place(&mut self, id: EntityId, at: Position) -> Result<(), CampaignError> {
        let battle = self.campaign.battle_mut().ok_or(CampaignError::NoBattle)?;
        battle.entity_mut(id)?.position = at;
        Ok(())
    }

    /// Set an entity's hp, ignoring the damage rules.
    pub fn set_hp(&mut self, id: EntityId, hp: i32) -> Result<(), CampaignError> {
        let battle = self.campaign.battle_mut().ok_or(CampaignError::NoBattle)?;
        let stats = &mut battle.entity_mut(id)?.stats;
        stats.hp = hp.clamp(0, stats.max_hp);
        Ok(())
    }

    pub fn select(&mut self, action: BattleAction) -> Result<(), CampaignError> {
        self.campaign.select_battle_action(action)
    }

    /// Tap a battle cell twice, confirming whatever the current mode does.
    pub fn confirm(&mut self, x: i32, y: i32) -> Result<(), CampaignError> {
        self.campaign.battle_tile_interact(x, y)?;
        self.campaign.battle_tile_interact(x, y)
    }

    pub fn flush(&mut self) -> Result<usize, CampaignError> {
        self.campaign.flush_timers()
    }

    pub fn phase(&self) -> Phase {
        self.campaign.phase()
    }

    /// Player hp as (current, max) inside the battle, or on the record
    /// outside one.
    pub fn player_hp(&self) -> Option<(i32, i32)> {
        let stats = match self.campaign.battle() {
            Some(battle) => &battle.player().ok()?.stats,
            None => &self.campaign.player()?.stats,
        };
        Some((stats.hp, stats.max_hp))
    }

    pub fn log_contains(&self, text: &str) -> bool {
        self.campaign.log().contains(text)
    }

    pub fn last_log(&self) -> Option<&str> {
        self.campaign.log().last().map(|e| e.message.as_str())
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Assert the campaign is in `phase`.
#[track_caller]
pub fn assert_phase(harness: &TestHarness, phase: Phase) {
    assert_eq!(harness.phase(), phase, "Expected phase {phase:?}");
}

/// Assert some log entry contains `text`.
#[track_caller]
pub fn assert_logged(harness: &TestHarness, text: &str) {
    assert!(
        harness.log_contains(text),
        "Expected log to contain '{text}', last entry was {:?}",
        harness.last_log()
    );
}

/// Assert the last log entry is exactly `text`.
#[track_caller]
pub fn assert_last_log(harness: &TestHarness, text: &str) {
    assert_eq!(harness.last_log(), Some(text));
}
