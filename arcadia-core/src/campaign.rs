//! Campaign controller: phase sequencing, the persistent player record and
//! the game log.
//!
//! Every presentation intent enters through a method here. Calls made in the
//! wrong phase write an informational log entry and change nothing.

use crate::battle::{Battle, BattleAction, BattleContext, BattleError, BattleOutcome, BattleRewards, BattleSnapshot, BattleStatus, Position};
use crate::character::{AttributeError, Attributes, CharacterClass, PlayerCharacter, Race};
use crate::config::{ConfigError, EngineConfig};
use crate::dice::Dice;
use crate::log::{EventLog, LogEntry};
use crate::map::{HexCell, HexCoord, StepOutcome, TerrainType, WorldMap};
use crate::schedule::{BattleId, ScheduledEvent, Scheduler};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound on timed events fired by a single clock advance.
const MAX_TIMERS_PER_ADVANCE: usize = 10_000;

/// Errors from campaign operations. All of them are broken invariants;
/// ordinary misuse is logged instead.
#[derive(Debug, Error)]
pub enum CampaignError {
    #[error("No player record; complete character creation first")]
    NoPlayerRecord,

    #[error("No overworld map while exploring")]
    NoWorldMap,

    #[error("No battle while in a battle phase")]
    NoBattle,

    #[error("Battle error: {0}")]
    Battle(#[from] BattleError),

    #[error("Invalid attributes: {0}")]
    Attributes(#[from] AttributeError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Top-level screen the game is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    CharacterCreation,
    Overworld,
    BattleTactical,
    BattleVictory,
    BattleDefeat,
}

/// Everything the presentation layer renders, in one serialisable value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CampaignSnapshot {
    pub phase: Phase,
    pub player: Option<PlayerCharacter>,
    pub player_position: HexCoord,
    pub cells: Vec<HexCell>,
    pub battle: Option<BattleSnapshot>,
    pub rewards: Option<BattleRewards>,
    pub log: Vec<LogEntry>,
    pub now_ms: u64,
}

/// One playthrough, from character creation to quitting.
#[derive(Debug)]
pub struct Campaign {
    config: EngineConfig,
    dice: Dice,
    log: EventLog,
    scheduler: Scheduler,
    phase: Phase,
    player: Option<PlayerCharacter>,
    position: HexCoord,
    map: Option<WorldMap>,
    battle: Option<Battle>,
    next_battle_id: u64,
}

impl Campaign {
    /// A campaign at the title screen. Dice follow `config.seed`.
    ///
    /// The config is trusted as given; use [`Campaign::try_new`] for one that
    /// has not been through [`EngineConfig::validate`].
    pub fn new(config: EngineConfig) -> Self {
        let dice = match config.seed {
            Some(seed) => Dice::seeded(seed),
            None => Dice::from_entropy(),
        };
        Self::with_dice(config, dice)
    }

    /// Validate `config`, then build the campaign.
    pub fn try_new(config: EngineConfig) -> Result<Self, CampaignError> {
        config.validate()?;
        Ok(Self::new(config))
    }

    /// A campaign drawing from the given dice.
    pub fn with_dice(config: EngineConfig, dice: Dice) -> Self {
        Self {
            position: config.map.start,
            config,
            dice,
            log: EventLog::new(),
            scheduler: Scheduler::new(),
            phase: Phase::CharacterCreation,
            player: None,
            map: None,
            battle: None,
            next_battle_id: 1,
        }
    }

    // ========================================================================
    // Inbound: creation and overworld
    // ========================================================================

    /// Take the creation wizard's result and enter the overworld.
    pub fn complete_character_creation(
        &mut self,
        name: &str,
        race: Race,
        class: CharacterClass,
        attributes: Attributes,
    ) {
        self.stamp();
        if self.phase != Phase::CharacterCreation {
            self.log.info("A character is already in play.");
            return;
        }

        let player = PlayerCharacter::create(name, race, class, attributes);
        let mut map = WorldMap::generate(&self.config.map, &mut self.dice);
        self.position = self.config.map.start;
        map.update_visibility(self.position, self.config.map.sight_radius);

        self.log.info(format!(
            "Welcome to Arcadia, {} the {} {}. Explore the map to begin.",
            player.name, race, class
        ));
        tracing::info!(name = %player.name, %race, %class, max_hp = player.stats.max_hp, "character created");

        self.player = Some(player);
        self.map = Some(map);
        self.set_phase(Phase::Overworld);
    }

    /// Same as [`Campaign::complete_character_creation`] from raw scores in
    /// STR, DEX, CON, INT, WIS, CHA order.
    pub fn complete_character_creation_with_scores(
        &mut self,
        name: &str,
        race: Race,
        class: CharacterClass,
        scores: [u8; 6],
    ) -> Result<(), CampaignError> {
        let [str, dex, con, int, wis, cha] = scores;
        let attributes = Attributes::new(str, dex, con, int, wis, cha)?;
        self.complete_character_creation(name, race, class, attributes);
        Ok(())
    }

    /// Step to an adjacent hex, possibly starting a battle.
    pub fn overworld_move_to(&mut self, q: i32, r: i32) -> Result<(), CampaignError> {
        self.stamp();
        if self.phase != Phase::Overworld {
            self.log.info("You can only travel while exploring.");
            return Ok(());
        }

        let to = HexCoord::new(q, r);
        let sight = self.config.map.sight_radius;
        let map = self.map.as_mut().ok_or(CampaignError::NoWorldMap)?;

        match map.step(self.position, to, sight) {
            StepOutcome::TooFar => self.log.info("Too far to travel in one step."),
            StepOutcome::OffMap => self.log.info("There is nothing there."),
            StepOutcome::Moved { encounter } => {
                self.position = to;
                tracing::debug!(%to, "overworld move");
                if let Some(terrain) = encounter {
                    self.start_battle(terrain)?;
                }
            }
        }
        Ok(())
    }

    // ========================================================================
    // Inbound: battle
    // ========================================================================

    /// Forward a battle menu choice to the current battle.
    pub fn select_battle_action(&mut self, action: BattleAction) -> Result<(), CampaignError> {
        self.stamp();
        if self.phase != Phase::BattleTactical {
            self.log.info("There is no battle in progress.");
            return Ok(());
        }

        let battle = self.battle.as_mut().ok_or(CampaignError::NoBattle)?;
        let mut ctx = BattleContext {
            dice: &mut self.dice,
            log: &mut self.log,
            scheduler: &mut self.scheduler,
            pacing: self.config.pacing,
        };
        battle.select_action(action, &mut ctx)?;
        self.sync_battle_phase();
        Ok(())
    }

    /// Forward a grid tap to the current battle.
    pub fn battle_tile_interact(&mut self, x: i32, y: i32) -> Result<(), CampaignError> {
        self.stamp();
        if self.phase != Phase::BattleTactical {
            self.log.info("There is no battle in progress.");
            return Ok(());
        }

        let battle = self.battle.as_mut().ok_or(CampaignError::NoBattle)?;
        let mut ctx = BattleContext {
            dice: &mut self.dice,
            log: &mut self.log,
            scheduler: &mut self.scheduler,
            pacing: self.config.pacing,
        };
        battle.interact_tile(Position::new(x, y), &mut ctx)?;
        self.sync_battle_phase();
        Ok(())
    }

    /// Leave the victory screen: carry battle hp home, log the rewards.
    ///
    /// XP and gold are reported only; the record does not track them.
    pub fn continue_after_victory(&mut self) -> Result<(), CampaignError> {
        self.stamp();
        if self.phase != Phase::BattleVictory {
            self.log.info("There is no victory to claim.");
            return Ok(());
        }

        let battle = self.battle.take().ok_or(CampaignError::NoBattle)?;
        let hp = battle.player()?.stats.hp;
        let player = self.player.as_mut().ok_or(CampaignError::NoPlayerRecord)?;
        player.stats.hp = hp.clamp(0, player.stats.max_hp);

        let rewards = battle.rewards().unwrap_or_default();
        self.log.narrative(format!(
            "Battle won! Earned {} XP and {} Gold.",
            rewards.xp, rewards.gold
        ));
        self.set_phase(Phase::Overworld);
        Ok(())
    }

    /// Fight the lost battle again from the pre-battle record.
    pub fn restart_after_defeat(&mut self) -> Result<(), CampaignError> {
        self.stamp();
        if self.phase != Phase::BattleDefeat {
            self.log.info("There is no lost battle to retry.");
            return Ok(());
        }

        let terrain = self
            .battle
            .as_ref()
            .map(|b| b.terrain())
            .ok_or(CampaignError::NoBattle)?;
        self.start_battle(terrain)
    }

    /// Drop the run and return to character creation.
    ///
    /// The map, the battle and any pending timers are discarded. The log is
    /// kept.
    pub fn quit_to_title(&mut self) {
        self.stamp();
        self.scheduler.clear();
        self.battle = None;
        self.map = None;
        self.player = None;
        self.position = self.config.map.start;
        self.log.info("Returned to the title screen.");
        self.set_phase(Phase::CharacterCreation);
    }

    pub(crate) fn start_battle(&mut self, terrain: TerrainType) -> Result<(), CampaignError> {
        let player = self.player.as_ref().ok_or(CampaignError::NoPlayerRecord)?;
        let id = BattleId(self.next_battle_id);
        self.next_battle_id += 1;

        self.log.combat("Enemies spotted! Rolling initiative...");
        let mut ctx = BattleContext {
            dice: &mut self.dice,
            log: &mut self.log,
            scheduler: &mut self.scheduler,
            pacing: self.config.pacing,
        };
        let battle = Battle::start(id, player, terrain, &mut ctx)?;

        tracing::info!(battle = %id, %terrain, "battle started");
        self.battle = Some(battle);
        self.set_phase(Phase::BattleTactical);
        Ok(())
    }

    // ========================================================================
    // Timed events
    // ========================================================================

    /// Move the logical clock forward, firing everything that comes due.
    ///
    /// Returns the number of events fired.
    pub fn advance_clock(&mut self, ms: u64) -> Result<usize, CampaignError> {
        let until = self.scheduler.now().saturating_add(ms);
        let fired = self.run_due(until)?;
        self.scheduler.set_now(until);
        self.stamp();
        Ok(fired)
    }

    /// Fire every pending event in due order, including ones scheduled along
    /// the way. The clock ends at the last event's due time.
    pub fn flush_timers(&mut self) -> Result<usize, CampaignError> {
        self.run_due(u64::MAX)
    }

    fn run_due(&mut self, until: u64) -> Result<usize, CampaignError> {
        let mut fired = 0;
        while let Some(scheduled) = self.scheduler.pop_due(until) {
            self.fire(scheduled)?;
            fired += 1;
            if fired >= MAX_TIMERS_PER_ADVANCE {
                tracing::warn!(fired, pending = self.scheduler.len(), "timer limit reached");
                break;
            }
        }
        Ok(fired)
    }

    fn fire(&mut self, scheduled: ScheduledEvent) -> Result<(), CampaignError> {
        self.log.set_clock(scheduled.due_ms);

        let Some(battle) = self.battle.as_mut() else {
            tracing::debug!(event = ?scheduled.event, "dropped timer with no battle");
            return Ok(());
        };
        if self.phase != Phase::BattleTactical {
            tracing::debug!(event = ?scheduled.event, phase = ?self.phase, "dropped timer outside battle");
            return Ok(());
        }

        let mut ctx = BattleContext {
            dice: &mut self.dice,
            log: &mut self.log,
            scheduler: &mut self.scheduler,
            pacing: self.config.pacing,
        };
        battle.handle_timer(scheduled.event, &mut ctx)?;
        self.sync_battle_phase();
        Ok(())
    }

    fn sync_battle_phase(&mut self) {
        if self.phase != Phase::BattleTactical {
            return;
        }
        match self.battle.as_ref().map(|b| b.status()) {
            Some(BattleStatus::Finished(BattleOutcome::Victory)) => self.set_phase(Phase::BattleVictory),
            Some(BattleStatus::Finished(BattleOutcome::Defeat)) => self.set_phase(Phase::BattleDefeat),
            _ => {}
        }
    }

    fn set_phase(&mut self, phase: Phase) {
        if self.phase != phase {
            tracing::info!(from = ?self.phase, to = ?phase, "phase change");
        }
        self.phase = phase;
    }

    fn stamp(&mut self) {
        self.log.set_clock(self.scheduler.now());
    }

    // ========================================================================
    // Outbound
    // ========================================================================

    /// The current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Configuration the campaign was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The persistent player record.
    pub fn player(&self) -> Option<&PlayerCharacter> {
        self.player.as_ref()
    }

    /// The player's hex on the overworld.
    pub fn player_position(&self) -> HexCoord {
        self.position
    }

    /// The overworld, once a character exists.
    pub fn map(&self) -> Option<&WorldMap> {
        self.map.as_ref()
    }

    /// Overworld cells; empty at the title screen.
    pub fn cells(&self) -> &[HexCell] {
        self.map.as_ref().map_or(&[], |m| m.cells())
    }

    /// The battle in progress or awaiting a victory/defeat choice.
    pub fn battle(&self) -> Option<&Battle> {
        self.battle.as_ref()
    }

    /// The game log, kept across runs.
    pub fn log(&self) -> &EventLog {
        &self.log
    }

    /// Rewards of the battle on the victory screen.
    pub fn rewards(&self) -> Option<BattleRewards> {
        match self.phase {
            Phase::BattleVictory => self.battle.as_ref().and_then(|b| b.rewards()),
            _ => None,
        }
    }

    /// Pending timed events.
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Logical clock time in milliseconds.
    pub fn now_ms(&self) -> u64 {
        self.scheduler.now()
    }

    pub(crate) fn battle_mut(&mut self) -> Option<&mut Battle> {
        self.battle.as_mut()
    }

    pub(crate) fn map_mut(&mut self) -> Option<&mut WorldMap> {
        self.map.as_mut()
    }

    pub(crate) fn replace_dice(&mut self, dice: Dice) {
        self.dice = dice;
    }

    /// Everything the presentation layer needs to draw a frame.
    pub fn snapshot(&self) -> CampaignSnapshot {
        CampaignSnapshot {
            phase: self.phase,
            player: self.player.clone(),
            player_position: self.position,
            cells: self.cells().to_vec(),
            battle: self.battle.as_ref().map(|b| b.snapshot()),
            rewards: self.rewards(),
            log: self.log.entries().to_vec(),
            now_ms: self.scheduler.now(),
        }
    }

    /// [`Campaign::snapshot`] as JSON.
    pub fn snapshot_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.snapshot())
    }
}
