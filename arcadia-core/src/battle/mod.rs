//! Tactical battle state machine.
//!
//! A battle runs on an 8x8 grid: initiative fixes the turn order once, then
//! each turn the actor may move once and act once. The human player drives
//! their turns through [`Battle::select_action`] and [`Battle::interact_tile`];
//! enemy turns are run by [`TimedEvent`]s on the campaign's [`Scheduler`].
//!
//! Illegal player input never fails. It writes one informational log entry
//! and leaves the battle untouched. `Err(BattleError)` means the battle itself
//! is broken.

pub mod ai;
pub mod entity;

pub use ai::{plan_enemy_turn, EnemyPlan};
pub use entity::{
    BattleEntity, EntityId, Position, Side, ENEMY_START, GOBLIN_SPRITE, GRID_SIZE, PLAYER_SPRITE,
    PLAYER_START,
};

use crate::character::PlayerCharacter;
use crate::config::Pacing;
use crate::dice::{Advantage, Dice};
use crate::log::EventLog;
use crate::map::TerrainType;
use crate::rules::{self, ATTACK_BONUS, ENEMY_MELEE_DAMAGE, MELEE_RANGE, PLAYER_MELEE_DAMAGE, SPELL_RANGE};
use crate::schedule::{BattleId, Scheduler, TimedEvent};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use thiserror::Error;

/// Invariant violations inside a battle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BattleError {
    #[error("No battle entity with id {0}")]
    MissingEntity(EntityId),

    #[error("Battle has no player entity")]
    NoPlayerEntity,
}

/// Action mode picked from the battle menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BattleAction {
    Move,
    Attack,
    Magic,
    Item,
    Wait,
}

impl BattleAction {
    /// Targeting range in tiles, for actions that target.
    pub fn range(&self) -> Option<i32> {
        match self {
            BattleAction::Attack => Some(MELEE_RANGE),
            BattleAction::Magic => Some(SPELL_RANGE),
            _ => None,
        }
    }
}

/// How a battle ended, from the player's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BattleOutcome {
    Victory,
    Defeat,
}

/// Lifecycle of a battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BattleStatus {
    AwaitingInitiative,
    InProgress,
    /// The deciding blow landed; the reveal is pending.
    Decided(BattleOutcome),
    /// The outcome has been revealed. Terminal.
    Finished(BattleOutcome),
}

impl BattleStatus {
    /// True once the outcome is decided, revealed or not.
    pub fn is_over(&self) -> bool {
        matches!(self, BattleStatus::Decided(_) | BattleStatus::Finished(_))
    }
}

/// Spoils of a victory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BattleRewards {
    pub xp: u32,
    pub gold: u32,
}

/// Per-turn flags of the current actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TurnState {
    pub has_moved: bool,
    pub has_acted: bool,
    /// `None` when no mode is selected.
    pub selected_action: Option<BattleAction>,
    /// First tap of a pending double confirmation.
    pub selected_tile: Option<Position>,
}

/// What a battle operation may touch outside the battle.
pub struct BattleContext<'a> {
    pub dice: &'a mut Dice,
    pub log: &'a mut EventLog,
    pub scheduler: &'a mut Scheduler,
    pub pacing: Pacing,
}

/// Render-facing view of a battle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BattleSnapshot {
    pub id: BattleId,
    pub terrain: TerrainType,
    pub status: BattleStatus,
    pub entities: Vec<BattleEntity>,
    pub turn_order: Vec<EntityId>,
    pub current_turn: Option<EntityId>,
    pub turn: TurnState,
    pub legal_moves: Vec<Position>,
    pub legal_targets: Vec<Position>,
    pub rewards: Option<BattleRewards>,
}

/// Id of the human player in the prototype encounter.
pub const PLAYER_ID: EntityId = EntityId(1);
/// Id of the first enemy; further enemies count up from here.
pub const FIRST_ENEMY_ID: EntityId = EntityId(2);

/// One tactical fight: combatants, turn order and turn flags.
#[derive(Debug, Clone)]
pub struct Battle {
    id: BattleId,
    terrain: TerrainType,
    entities: Vec<BattleEntity>,
    player_id: EntityId,
    turn_order: Vec<EntityId>,
    current: usize,
    /// Bumped at every turn start; timed events carry the value they were
    /// scheduled under.
    turn_serial: u64,
    turn: TurnState,
    status: BattleStatus,
    rewards: Option<BattleRewards>,
}

impl Battle {
    /// Set up the prototype encounter and roll initiative.
    ///
    /// The player's record is copied into the battle; later damage does not
    /// touch `player` until the campaign copies it back.
    pub fn start(
        id: BattleId,
        player: &PlayerCharacter,
        terrain: TerrainType,
        ctx: &mut BattleContext<'_>,
    ) -> Result<Self, BattleError> {
        let entities = vec![
            BattleEntity::from_player(PLAYER_ID, player, PLAYER_START),
            BattleEntity::goblin_scout(FIRST_ENEMY_ID, ENEMY_START),
        ];
        let mut battle = Self::with_entities(id, terrain, entities)?;
        battle.roll_initiative(ctx)?;
        Ok(battle)
    }

    /// A battle over arbitrary combatants, awaiting initiative.
    ///
    /// Exactly one entity is expected on the player side; the first one found
    /// is the human player.
    pub fn with_entities(
        id: BattleId,
        terrain: TerrainType,
        entities: Vec<BattleEntity>,
    ) -> Result<Self, BattleError> {
        let player_id = entities
            .iter()
            .find(|e| e.side == Side::Player)
            .map(|e| e.id)
            .ok_or(BattleError::NoPlayerEntity)?;

        Ok(Self {
            id,
            terrain,
            entities,
            player_id,
            turn_order: Vec::new(),
            current: 0,
            turn_serial: 0,
            turn: TurnState::default(),
            status: BattleStatus::AwaitingInitiative,
            rewards: None,
        })
    }

    // ========================================================================
    // Turn order
    // ========================================================================

    /// Roll initiative for every combatant and begin the first turn.
    ///
    /// Ties go to the player. Does nothing once initiative has been rolled.
    pub fn roll_initiative(&mut self, ctx: &mut BattleContext<'_>) -> Result<(), BattleError> {
        if self.status != BattleStatus::AwaitingInitiative {
            return Ok(());
        }

        let mut rolls: Vec<(EntityId, i32, bool)> = Vec::with_capacity(self.entities.len());
        for entity in &self.entities {
            let total = ctx.dice.d20(Advantage::Normal).result + entity.stats.initiative_bonus;
            rolls.push((entity.id, total, entity.id == self.player_id));
        }

        let player_roll = rolls
            .iter()
            .find(|(_, _, is_player)| *is_player)
            .map(|(_, total, _)| *total)
            .ok_or(BattleError::NoPlayerEntity)?;
        let mut message = format!("Initiative: You({player_roll})");
        for (id, total, is_player) in &rolls {
            if !is_player {
                let name = &self.entity(*id)?.name;
                message.push_str(&format!(" vs {name}({total})"));
            }
        }
        ctx.log.roll(message);

        // Stable sort keeps entity order among equal non-player rolls.
        rolls.sort_by_key(|&(_, total, is_player)| Reverse((total, is_player)));
        self.turn_order = rolls.into_iter().map(|(id, _, _)| id).collect();
        self.current = 0;
        self.status = BattleStatus::InProgress;

        tracing::info!(battle = %self.id, order = ?self.turn_order, "initiative rolled");
        self.begin_turn(ctx)
    }

    /// Start the turn of whoever the pointer names.
    ///
    /// This is the only place the per-turn flags are reset.
    fn begin_turn(&mut self, ctx: &mut BattleContext<'_>) -> Result<(), BattleError> {
        let actor = self.current_turn().ok_or(BattleError::NoPlayerEntity)?;
        self.turn_serial += 1;
        self.turn = TurnState::default();

        if actor == self.player_id {
            self.turn.selected_action = Some(BattleAction::Move);
            ctx.log.info("Your turn.");
        } else {
            self.entity(actor)?;
            ctx.scheduler.schedule(
                ctx.pacing.enemy_turn_delay_ms,
                TimedEvent::EnemyTurn {
                    battle: self.id,
                    turn: self.turn_serial,
                    actor,
                },
            );
        }

        tracing::debug!(battle = %self.id, %actor, serial = self.turn_serial, "turn started");
        Ok(())
    }

    /// Pass the turn to the next entity in the order.
    pub fn end_turn(&mut self, ctx: &mut BattleContext<'_>) -> Result<(), BattleError> {
        if self.status != BattleStatus::InProgress || self.turn_order.is_empty() {
            return Ok(());
        }
        self.current = (self.current + 1) % self.turn_order.len();
        self.begin_turn(ctx)
    }

    // ========================================================================
    // Legality
    // ========================================================================

    /// Cells `actor` may move to this turn.
    ///
    /// Every grid cell within reach that no other living entity stands on,
    /// the actor's own cell included. Empty unless `actor` holds the turn in
    /// move mode and has not moved.
    pub fn legal_moves(&self, actor: EntityId) -> Vec<Position> {
        if !self.holds_turn(actor)
            || self.turn.selected_action != Some(BattleAction::Move)
            || self.turn.has_moved
        {
            return Vec::new();
        }
        let Ok(me) = self.entity(actor) else {
            return Vec::new();
        };

        let reach = rules::speed_in_tiles(me.stats.speed);
        Position::grid()
            .filter(|cell| cell.chebyshev(&me.position) <= reach)
            .filter(|cell| self.living_at(*cell).map_or(true, |e| e.id == actor))
            .collect()
    }

    /// Positions of opposing entities `actor` may target in the current mode.
    pub fn legal_targets(&self, actor: EntityId) -> Vec<Position> {
        if !self.holds_turn(actor) || self.turn.has_acted {
            return Vec::new();
        }
        let Some(range) = self.turn.selected_action.and_then(|a| a.range()) else {
            return Vec::new();
        };
        let Ok(me) = self.entity(actor) else {
            return Vec::new();
        };

        self.entities
            .iter()
            .filter(|e| e.side == me.side.opponent() && e.is_alive())
            .filter(|e| e.position.chebyshev(&me.position) <= range)
            .map(|e| e.position)
            .collect()
    }

    fn holds_turn(&self, actor: EntityId) -> bool {
        self.status == BattleStatus::InProgress && self.current_turn() == Some(actor)
    }

    fn living_at(&self, cell: Position) -> Option<&BattleEntity> {
        self.entities
            .iter()
            .find(|e| e.is_alive() && e.position == cell)
    }

    // ========================================================================
    // Player input
    // ========================================================================

    /// Pick an action mode from the battle menu.
    ///
    /// `Wait` ends the turn and `Item` drinks a potion on the spot; the other
    /// actions only set the mode.
    pub fn select_action(
        &mut self,
        action: BattleAction,
        ctx: &mut BattleContext<'_>,
    ) -> Result<(), BattleError> {
        if !self.accepts_player_input(ctx) {
            return Ok(());
        }

        match action {
            BattleAction::Wait => self.end_turn(ctx),
            BattleAction::Item => {
                self.turn.selected_tile = None;
                if self.turn.has_acted {
                    ctx.log.info("Already acted.");
                    return Ok(());
                }
                self.resolve_item(ctx)
            }
            BattleAction::Move | BattleAction::Attack | BattleAction::Magic => {
                self.turn.selected_tile = None;
                self.turn.selected_action = Some(action);
                Ok(())
            }
        }
    }

    /// Tap a grid cell.
    ///
    /// The first tap on a cell only selects it. A second tap on the same cell
    /// executes the current mode there.
    pub fn interact_tile(
        &mut self,
        cell: Position,
        ctx: &mut BattleContext<'_>,
    ) -> Result<(), BattleError> {
        if !self.accepts_player_input(ctx) {
            return Ok(());
        }
        if !cell.on_grid() {
            ctx.log.info("That tile is off the battlefield.");
            return Ok(());
        }

        if self.turn.selected_tile != Some(cell) {
            self.turn.selected_tile = Some(cell);
            return Ok(());
        }

        match self.turn.selected_action {
            Some(BattleAction::Move) => self.confirm_move(cell, ctx),
            Some(action @ (BattleAction::Attack | BattleAction::Magic)) => {
                self.confirm_target(action, cell, ctx)
            }
            _ => {
                ctx.log.info("Select an action first.");
                Ok(())
            }
        }
    }

    fn accepts_player_input(&self, ctx: &mut BattleContext<'_>) -> bool {
        match self.status {
            BattleStatus::InProgress if self.current_turn() == Some(self.player_id) => true,
            BattleStatus::InProgress | BattleStatus::AwaitingInitiative => {
                ctx.log.info("It is not your turn.");
                false
            }
            BattleStatus::Decided(_) | BattleStatus::Finished(_) => {
                ctx.log.info("The battle is over.");
                false
            }
        }
    }

    fn confirm_move(&mut self, cell: Position, ctx: &mut BattleContext<'_>) -> Result<(), BattleError> {
        if self.turn.has_moved {
            ctx.log.info("Already moved.");
            return Ok(());
        }

        if !self.legal_moves(self.player_id).contains(&cell) {
            let message = match self.living_at(cell) {
                Some(_) => "Destination is occupied.",
                None => "Too far to move.",
            };
            ctx.log.info(message);
            return Ok(());
        }

        let player_id = self.player_id;
        self.entity_mut(player_id)?.position = cell;
        self.turn.has_moved = true;
        self.turn.selected_action = None;
        self.turn.selected_tile = None;
        tracing::debug!(battle = %self.id, to = %cell, "player moved");
        Ok(())
    }

    fn confirm_target(
        &mut self,
        action: BattleAction,
        cell: Position,
        ctx: &mut BattleContext<'_>,
    ) -> Result<(), BattleError> {
        if self.turn.has_acted {
            ctx.log.info("Already acted.");
            return Ok(());
        }
        if !self.legal_targets(self.player_id).contains(&cell) {
            ctx.log.info("Invalid target.");
            return Ok(());
        }

        let target = self
            .entities
            .iter()
            .find(|e| e.is_alive() && e.position == cell && e.side == Side::Enemy)
            .map(|e| e.id);

        if let Some(target) = target {
            match action {
                BattleAction::Magic => self.resolve_magic(target, ctx)?,
                _ => self.resolve_attack(target, ctx)?,
            }
        }
        self.turn.selected_tile = None;
        Ok(())
    }

    // ========================================================================
    // Resolution
    // ========================================================================

    /// The player's weapon attack.
    pub fn resolve_attack(&mut self, target: EntityId, ctx: &mut BattleContext<'_>) -> Result<(), BattleError> {
        let target_ac = self.entity(target)?.stats.ac;
        let outcome = rules::attack_roll(ctx.dice, ATTACK_BONUS, target_ac, PLAYER_MELEE_DAMAGE);

        ctx.log.combat(format!(
            "Attack: Rolled {} + {} = {} vs AC {}",
            outcome.roll.result, outcome.bonus, outcome.total, outcome.target_ac
        ));

        if outcome.hit() {
            let damage = outcome.damage_dealt();
            ctx.log.combat(format!("Hit! Dealt {damage} damage."));
            self.apply_damage(target, damage, ctx)?;
        } else {
            ctx.log.combat("Miss!");
        }

        self.turn.has_acted = true;
        self.turn.selected_action = None;
        Ok(())
    }

    /// The player's auto-hitting arcane bolt.
    pub fn resolve_magic(&mut self, target: EntityId, ctx: &mut BattleContext<'_>) -> Result<(), BattleError> {
        let name = self.entity(target)?.name.clone();
        ctx.log.combat(format!("You cast a spell at {name}!"));

        let damage = ctx.dice.roll(rules::SPELL_DAMAGE).total;
        ctx.log.combat(format!("Arcane energy deals {damage} damage!"));
        self.apply_damage(target, damage, ctx)?;

        self.turn.has_acted = true;
        self.turn.selected_action = None;
        Ok(())
    }

    /// Drink a healing potion. Uses the action; needs no target.
    pub fn resolve_item(&mut self, ctx: &mut BattleContext<'_>) -> Result<(), BattleError> {
        ctx.log.narrative("You drink a Potion of Healing.");

        let heal = ctx.dice.roll(rules::POTION_HEALING).total;
        let player_id = self.player_id;
        let restored = self.entity_mut(player_id)?.stats.heal(heal);
        ctx.log.roll(format!("Recovered {heal} HP."));
        tracing::debug!(heal, restored, "potion");

        self.turn.has_acted = true;
        self.turn.selected_action = None;
        Ok(())
    }

    /// Deal damage and decide the battle if a side has fallen.
    ///
    /// A decided battle schedules its reveal. Damage after that point is
    /// applied but cannot change the outcome.
    pub fn apply_damage(
        &mut self,
        target: EntityId,
        amount: i32,
        ctx: &mut BattleContext<'_>,
    ) -> Result<(), BattleError> {
        self.entity_mut(target)?.stats.take_damage(amount);

        if self.status != BattleStatus::InProgress {
            return Ok(());
        }

        let enemies_down = self
            .entities
            .iter()
            .filter(|e| e.side == Side::Enemy)
            .all(|e| !e.is_alive());
        let player_down = !self.player()?.is_alive();

        let outcome = if enemies_down {
            ctx.log.narrative("Enemy defeated!");
            BattleOutcome::Victory
        } else if player_down {
            ctx.log.narrative("You have fallen!");
            BattleOutcome::Defeat
        } else {
            return Ok(());
        };

        self.status = BattleStatus::Decided(outcome);
        ctx.scheduler.schedule(
            ctx.pacing.outcome_reveal_delay_ms,
            TimedEvent::OutcomeReveal { battle: self.id },
        );
        tracing::info!(battle = %self.id, ?outcome, "battle decided");
        Ok(())
    }

    /// Run an enemy's turn from its plan.
    pub fn enemy_act(&mut self, actor: EntityId, ctx: &mut BattleContext<'_>) -> Result<(), BattleError> {
        if self.status != BattleStatus::InProgress {
            return Ok(());
        }
        if !self.entity(actor)?.is_alive() {
            self.schedule_end_turn(ctx);
            return Ok(());
        }

        ctx.log.combat("Enemy is acting...");

        let me = self.entity(actor)?;
        let player = self.player()?;
        let plan = plan_enemy_turn(me, player, &self.entities);

        match plan {
            EnemyPlan::Attack { target } => {
                let target_ac = self.entity(target)?.stats.ac;
                let outcome = rules::attack_roll(ctx.dice, ATTACK_BONUS, target_ac, ENEMY_MELEE_DAMAGE);
                self.turn.has_acted = true;

                if outcome.hit() {
                    let damage = outcome.damage_dealt();
                    ctx.log.combat(format!("Enemy hits for {damage} damage!"));
                    self.apply_damage(target, damage, ctx)?;
                } else {
                    ctx.log.combat("Enemy attacks but misses!");
                }
            }
            EnemyPlan::Step(cell) => {
                self.entity_mut(actor)?.position = cell;
                self.turn.has_moved = true;
                ctx.log.info("Enemy moves closer.");
            }
            EnemyPlan::Blocked => ctx.log.info("Enemy path blocked."),
        }

        if self.status == BattleStatus::InProgress {
            self.schedule_end_turn(ctx);
        }
        Ok(())
    }

    fn schedule_end_turn(&self, ctx: &mut BattleContext<'_>) {
        ctx.scheduler.schedule(
            ctx.pacing.enemy_action_delay_ms,
            TimedEvent::EndTurn {
                battle: self.id,
                turn: self.turn_serial,
            },
        );
    }

    /// Apply a fired timed event to the current state.
    ///
    /// Events for another battle, an earlier turn or a finished fight are
    /// dropped.
    pub fn handle_timer(&mut self, event: TimedEvent, ctx: &mut BattleContext<'_>) -> Result<(), BattleError> {
        if event.battle() != self.id {
            tracing::debug!(?event, battle = %self.id, "dropped timer for another battle");
            return Ok(());
        }

        match event {
            TimedEvent::EnemyTurn { turn, actor, .. }
                if turn == self.turn_serial && self.holds_turn(actor) =>
            {
                self.enemy_act(actor, ctx)
            }
            TimedEvent::EndTurn { turn, .. }
                if turn == self.turn_serial && self.status == BattleStatus::InProgress =>
            {
                self.end_turn(ctx)
            }
            TimedEvent::OutcomeReveal { .. } => {
                if let BattleStatus::Decided(outcome) = self.status {
                    self.reveal(outcome, ctx);
                } else {
                    tracing::debug!(?event, status = ?self.status, "dropped stale reveal");
                }
                Ok(())
            }
            _ => {
                tracing::debug!(?event, serial = self.turn_serial, "dropped stale timer");
                Ok(())
            }
        }
    }

    fn reveal(&mut self, outcome: BattleOutcome, ctx: &mut BattleContext<'_>) {
        if outcome == BattleOutcome::Victory {
            let gold = ctx.dice.range(rules::VICTORY_GOLD_MIN, rules::VICTORY_GOLD_MAX);
            self.rewards = Some(BattleRewards {
                xp: rules::VICTORY_XP,
                gold: gold.max(0) as u32,
            });
        }
        self.status = BattleStatus::Finished(outcome);
        tracing::info!(battle = %self.id, ?outcome, rewards = ?self.rewards, "battle finished");
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Identifier stamped on this battle's timed events.
    pub fn id(&self) -> BattleId {
        self.id
    }

    /// Overworld terrain the battle was started on.
    pub fn terrain(&self) -> TerrainType {
        self.terrain
    }

    /// Current lifecycle status.
    pub fn status(&self) -> BattleStatus {
        self.status
    }

    /// Rewards, set when a victory is revealed.
    pub fn rewards(&self) -> Option<BattleRewards> {
        self.rewards
    }

    /// All combatants, dead ones included.
    pub fn entities(&self) -> &[BattleEntity] {
        &self.entities
    }

    /// Look up a combatant by id.
    pub fn entity(&self, id: EntityId) -> Result<&BattleEntity, BattleError> {
        self.entities
            .iter()
            .find(|e| e.id == id)
            .ok_or(BattleError::MissingEntity(id))
    }

    /// Direct access for scenario setup. Bypasses every rule.
    pub fn entity_mut(&mut self, id: EntityId) -> Result<&mut BattleEntity, BattleError> {
        self.entities
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(BattleError::MissingEntity(id))
    }

    /// Id of the human-controlled entity.
    pub fn player_id(&self) -> EntityId {
        self.player_id
    }

    /// The human-controlled entity.
    pub fn player(&self) -> Result<&BattleEntity, BattleError> {
        self.entity(self.player_id)
    }

    /// Initiative order, highest first. Empty before initiative.
    pub fn turn_order(&self) -> &[EntityId] {
        &self.turn_order
    }

    /// Entity whose turn it is, once initiative is rolled.
    pub fn current_turn(&self) -> Option<EntityId> {
        self.turn_order.get(self.current).copied()
    }

    /// Whether the player holds the turn of a battle in progress.
    pub fn is_player_turn(&self) -> bool {
        self.holds_turn(self.player_id)
    }

    /// Flags of the current turn.
    pub fn turn_state(&self) -> &TurnState {
        &self.turn
    }

    /// Count of turns started so far.
    pub fn turn_serial(&self) -> u64 {
        self.turn_serial
    }

    /// Render-facing view, with highlights for the current actor.
    pub fn snapshot(&self) -> BattleSnapshot {
        let current = self.current_turn();
        let (legal_moves, legal_targets) = match current {
            Some(actor) => (self.legal_moves(actor), self.legal_targets(actor)),
            None => (Vec::new(), Vec::new()),
        };

        BattleSnapshot {
            id: self.id,
            terrain: self.terrain,
            status: self.status,
            entities: self.entities.clone(),
            turn_order: self.turn_order.clone(),
            current_turn: current,
            turn: self.turn,
            legal_moves,
            legal_targets,
            rewards: self.rewards,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::{Attributes, CharacterClass, Race};
    use crate::testing::ScriptedRolls;
    use proptest::prelude::*;

    struct Fixture {
        dice: Dice,
        log: EventLog,
        scheduler: Scheduler,
    }

    impl Fixture {
        fn new(rolls: impl IntoIterator<Item = i32>) -> Self {
            Self {
                dice: Dice::new(ScriptedRolls::new(rolls)),
                log: EventLog::new(),
                scheduler: Scheduler::new(),
            }
        }

        fn ctx(&mut self) -> BattleContext<'_> {
            BattleContext {
                dice: &mut self.dice,
                log: &mut self.log,
                scheduler: &mut self.scheduler,
                pacing: Pacing::default(),
            }
        }

        fn last(&self) -> &str {
            self.log.last().map(|e| e.message.as_str()).unwrap_or("")
        }
    }

    fn fighter() -> PlayerCharacter {
        let attributes = Attributes::new(15, 12, 14, 10, 10, 10).unwrap();
        PlayerCharacter::create("Thorin", Race::Human, CharacterClass::Fighter, attributes)
    }

    /// Player rolls 15, goblin rolls 5: player first.
    fn player_first(fx: &mut Fixture) -> Battle {
        Battle::start(BattleId(1), &fighter(), TerrainType::Grass, &mut fx.ctx()).unwrap()
    }

    fn tap_twice(battle: &mut Battle, fx: &mut Fixture, cell: Position) {
        battle.interact_tile(cell, &mut fx.ctx()).unwrap();
        battle.interact_tile(cell, &mut fx.ctx()).unwrap();
    }

    #[test]
    fn test_start_places_and_logs_initiative() {
        let mut fx = Fixture::new([15, 1, 5, 1]);
        let battle = player_first(&mut fx);

        assert_eq!(battle.player().unwrap().position, PLAYER_START);
        assert_eq!(battle.entity(FIRST_ENEMY_ID).unwrap().position, ENEMY_START);
        assert_eq!(battle.turn_order(), &[PLAYER_ID, FIRST_ENEMY_ID]);
        assert!(fx.log.contains("Initiative: You(16) vs Goblin Scout(7)"));
        assert_eq!(battle.turn_state().selected_action, Some(BattleAction::Move));
        assert!(fx.scheduler.is_empty());
    }

    #[test]
    fn test_initiative_tie_goes_to_player() {
        // 11 + 1 vs 10 + 2
        let mut fx = Fixture::new([11, 1, 10, 1]);
        let battle = player_first(&mut fx);
        assert_eq!(battle.current_turn(), Some(PLAYER_ID));
    }

    #[test]
    fn test_enemy_first_schedules_ai_turn() {
        let mut fx = Fixture::new([2, 1, 18, 1]);
        let battle = player_first(&mut fx);

        assert_eq!(battle.current_turn(), Some(FIRST_ENEMY_ID));
        assert_eq!(battle.turn_state().selected_action, None);
        let pending: Vec<_> = fx.scheduler.pending().collect();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].due_ms, 1000);
        assert!(matches!(
            pending[0].event,
            TimedEvent::EnemyTurn { actor: FIRST_ENEMY_ID, turn: 1, .. }
        ));
    }

    #[test]
    fn test_missing_player_is_an_error() {
        let goblin = BattleEntity::goblin_scout(EntityId(2), ENEMY_START);
        let result = Battle::with_entities(BattleId(1), TerrainType::Grass, vec![goblin]);
        assert_eq!(result.unwrap_err(), BattleError::NoPlayerEntity);
    }

    #[test]
    fn test_legal_moves_respect_speed_and_occupancy() {
        let mut fx = Fixture::new([15, 1, 5, 1]);
        let mut battle = player_first(&mut fx);
        battle.entity_mut(FIRST_ENEMY_ID).unwrap().position = Position::new(3, 6);

        let moves = battle.legal_moves(PLAYER_ID);
        assert!(!moves.contains(&Position::new(3, 6)));
        assert!(moves.contains(&PLAYER_START));
        assert!(moves.contains(&Position::new(0, 1)));
        // Speed 30 reaches six tiles; row 0 is seven away
        assert!(!moves.iter().any(|p| p.y == 0));
        assert!(battle.legal_moves(FIRST_ENEMY_ID).is_empty());
    }

    #[test]
    fn test_dead_enemy_does_not_block() {
        let mut fx = Fixture::new([15, 1, 5, 1]);
        let mut battle = player_first(&mut fx);
        let goblin = battle.entity_mut(FIRST_ENEMY_ID).unwrap();
        goblin.position = Position::new(3, 6);
        goblin.stats.hp = 0;
        assert!(battle.legal_moves(PLAYER_ID).contains(&Position::new(3, 6)));
    }

    #[test]
    fn test_targets_by_range() {
        let mut fx = Fixture::new([15, 1, 5, 1]);
        let mut battle = player_first(&mut fx);

        battle.select_action(BattleAction::Attack, &mut fx.ctx()).unwrap();
        assert!(battle.legal_targets(PLAYER_ID).is_empty());

        battle.select_action(BattleAction::Magic, &mut fx.ctx()).unwrap();
        assert_eq!(battle.legal_targets(PLAYER_ID), vec![ENEMY_START]);

        battle.select_action(BattleAction::Move, &mut fx.ctx()).unwrap();
        assert!(battle.legal_targets(PLAYER_ID).is_empty());
    }

    #[test]
    fn test_move_rejections() {
        let mut fx = Fixture::new([15, 1, 5, 1]);
        let mut battle = player_first(&mut fx);

        tap_twice(&mut battle, &mut fx, ENEMY_START);
        assert_eq!(fx.last(), "Destination is occupied.");

        // Seven rows away
        tap_twice(&mut battle, &mut fx, Position::new(3, 0));
        assert_eq!(fx.last(), "Too far to move.");

        assert_eq!(battle.player().unwrap().position, PLAYER_START);
        assert!(!battle.turn_state().has_moved);
    }

    #[test]
    fn test_moving_onto_own_cell_spends_the_move() {
        let mut fx = Fixture::new([15, 1, 5, 1]);
        let mut battle = player_first(&mut fx);
        let logged = fx.log.len();

        tap_twice(&mut battle, &mut fx, PLAYER_START);
        assert_eq!(battle.player().unwrap().position, PLAYER_START);
        assert!(battle.turn_state().has_moved);
        assert_eq!(battle.turn_state().selected_action, None);
        assert_eq!(fx.log.len(), logged);
    }

    #[test]
    fn test_second_move_rejected() {
        let mut fx = Fixture::new([15, 1, 5, 1]);
        let mut battle = player_first(&mut fx);

        tap_twice(&mut battle, &mut fx, Position::new(3, 5));
        battle.select_action(BattleAction::Move, &mut fx.ctx()).unwrap();
        tap_twice(&mut battle, &mut fx, Position::new(3, 4));

        assert_eq!(fx.last(), "Already moved.");
        assert_eq!(battle.player().unwrap().position, Position::new(3, 5));
    }

    #[test]
    fn test_confirm_without_mode() {
        let mut fx = Fixture::new([15, 1, 5, 1]);
        let mut battle = player_first(&mut fx);
        tap_twice(&mut battle, &mut fx, Position::new(3, 5));
        tap_twice(&mut battle, &mut fx, Position::new(2, 5));
        assert_eq!(fx.last(), "Select an action first.");
    }

    #[test]
    fn test_off_grid_tap() {
        let mut fx = Fixture::new([15, 1, 5, 1]);
        let mut battle = player_first(&mut fx);
        battle.interact_tile(Position::new(8, 3), &mut fx.ctx()).unwrap();
        assert_eq!(fx.last(), "That tile is off the battlefield.");
        assert_eq!(battle.turn_state().selected_tile, None);
    }

    #[test]
    fn test_attack_hit_and_victory() {
        // Initiative, then attack d20 pair 18/1, damage die 8
        let mut fx = Fixture::new([15, 1, 5, 1, 18, 1, 8]);
        let mut battle = player_first(&mut fx);
        battle.entity_mut(FIRST_ENEMY_ID).unwrap().position = Position::new(4, 6);

        battle.select_action(BattleAction::Attack, &mut fx.ctx()).unwrap();
        tap_twice(&mut battle, &mut fx, Position::new(4, 6));

        assert!(fx.log.contains("Attack: Rolled 18 + 4 = 22 vs AC 15"));
        assert!(fx.log.contains("Hit! Dealt 10 damage."));
        assert!(fx.log.contains("Enemy defeated!"));
        assert_eq!(battle.entity(FIRST_ENEMY_ID).unwrap().stats.hp, 0);
        assert_eq!(battle.status(), BattleStatus::Decided(BattleOutcome::Victory));
        assert!(battle.turn_state().has_acted);

        let reveal = fx.scheduler.pop_due(u64::MAX).unwrap();
        assert_eq!(reveal.due_ms, 1000);
        battle.handle_timer(reveal.event, &mut fx.ctx()).unwrap();
        assert_eq!(battle.status(), BattleStatus::Finished(BattleOutcome::Victory));
        let rewards = battle.rewards().unwrap();
        assert_eq!(rewards.xp, 50);
        assert!((10..=19).contains(&rewards.gold));
    }

    #[test]
    fn test_attack_miss() {
        let mut fx = Fixture::new([15, 1, 5, 1, 3, 20]);
        let mut battle = player_first(&mut fx);
        battle.entity_mut(FIRST_ENEMY_ID).unwrap().position = Position::new(4, 6);

        battle.select_action(BattleAction::Attack, &mut fx.ctx()).unwrap();
        tap_twice(&mut battle, &mut fx, Position::new(4, 6));

        assert_eq!(fx.last(), "Miss!");
        assert_eq!(battle.entity(FIRST_ENEMY_ID).unwrap().stats.hp, 7);

        battle.select_action(BattleAction::Attack, &mut fx.ctx()).unwrap();
        tap_twice(&mut battle, &mut fx, Position::new(4, 6));
        assert_eq!(fx.last(), "Already acted.");
    }

    #[test]
    fn test_invalid_target() {
        let mut fx = Fixture::new([15, 1, 5, 1]);
        let mut battle = player_first(&mut fx);
        battle.select_action(BattleAction::Attack, &mut fx.ctx()).unwrap();
        tap_twice(&mut battle, &mut fx, ENEMY_START);
        assert_eq!(fx.last(), "Invalid target.");
    }

    #[test]
    fn test_magic_auto_hits() {
        let mut fx = Fixture::new([15, 1, 5, 1, 2, 3]);
        let mut battle = player_first(&mut fx);

        battle.select_action(BattleAction::Magic, &mut fx.ctx()).unwrap();
        tap_twice(&mut battle, &mut fx, ENEMY_START);

        assert!(fx.log.contains("You cast a spell at Goblin Scout!"));
        assert!(fx.log.contains("Arcane energy deals 5 damage!"));
        assert_eq!(battle.entity(FIRST_ENEMY_ID).unwrap().stats.hp, 2);
        assert_eq!(battle.status(), BattleStatus::InProgress);
    }

    #[test]
    fn test_potion_heals_and_uses_action() {
        let mut fx = Fixture::new([15, 1, 5, 1, 4, 4]);
        let mut battle = player_first(&mut fx);
        battle.entity_mut(PLAYER_ID).unwrap().stats.hp = 3;

        battle.select_action(BattleAction::Item, &mut fx.ctx()).unwrap();
        assert_eq!(battle.player().unwrap().stats.hp, 12);
        assert!(fx.log.contains("Recovered 10 HP."));
        assert!(battle.turn_state().has_acted);

        battle.select_action(BattleAction::Item, &mut fx.ctx()).unwrap();
        assert_eq!(fx.last(), "Already acted.");
    }

    #[test]
    fn test_wait_hands_turn_to_enemy() {
        let mut fx = Fixture::new([15, 1, 5, 1]);
        let mut battle = player_first(&mut fx);

        battle.select_action(BattleAction::Wait, &mut fx.ctx()).unwrap();
        assert_eq!(battle.current_turn(), Some(FIRST_ENEMY_ID));
        assert_eq!(battle.turn_serial(), 2);

        let before = fx.log.len();
        battle.select_action(BattleAction::Attack, &mut fx.ctx()).unwrap();
        assert_eq!(fx.log.len(), before + 1);
        assert_eq!(fx.last(), "It is not your turn.");
    }

    #[test]
    fn test_enemy_lethal_hit_skips_end_turn() {
        // Enemy first; then enemy attack 19/1 and damage die 6
        let mut fx = Fixture::new([2, 1, 18, 1, 19, 1, 6]);
        let mut battle = player_first(&mut fx);
        battle.entity_mut(FIRST_ENEMY_ID).unwrap().position = Position::new(3, 6);
        battle.entity_mut(PLAYER_ID).unwrap().stats.hp = 5;

        let turn = fx.scheduler.pop_due(u64::MAX).unwrap();
        battle.handle_timer(turn.event, &mut fx.ctx()).unwrap();

        assert!(fx.log.contains("Enemy hits for 7 damage!"));
        assert_eq!(battle.player().unwrap().stats.hp, 0);
        assert_eq!(battle.status(), BattleStatus::Decided(BattleOutcome::Defeat));

        let pending: Vec<_> = fx.scheduler.pending().collect();
        assert_eq!(pending.len(), 1);
        assert!(matches!(pending[0].event, TimedEvent::OutcomeReveal { .. }));
    }

    #[test]
    fn test_stale_end_turn_ignored() {
        let mut fx = Fixture::new([15, 1, 5, 1]);
        let mut battle = player_first(&mut fx);
        let stale = TimedEvent::EndTurn {
            battle: BattleId(1),
            turn: 0,
        };
        battle.handle_timer(stale, &mut fx.ctx()).unwrap();
        assert_eq!(battle.current_turn(), Some(PLAYER_ID));

        let other = TimedEvent::EndTurn {
            battle: BattleId(9),
            turn: battle.turn_serial(),
        };
        battle.handle_timer(other, &mut fx.ctx()).unwrap();
        assert_eq!(battle.current_turn(), Some(PLAYER_ID));
    }

    #[test]
    fn test_input_after_decision_rejected() {
        let mut fx = Fixture::new([15, 1, 5, 1, 2, 3]);
        let mut battle = player_first(&mut fx);
        battle.entity_mut(FIRST_ENEMY_ID).unwrap().stats.hp = 1;

        battle.select_action(BattleAction::Magic, &mut fx.ctx()).unwrap();
        tap_twice(&mut battle, &mut fx, ENEMY_START);
        assert!(battle.status().is_over());

        battle.select_action(BattleAction::Wait, &mut fx.ctx()).unwrap();
        assert_eq!(fx.last(), "The battle is over.");
        assert_eq!(battle.current_turn(), Some(PLAYER_ID));
    }

    proptest! {
        #[test]
        fn prop_legal_moves_in_range_and_free(
            px in 0i32..GRID_SIZE, py in 0i32..GRID_SIZE,
            ex in 0i32..GRID_SIZE, ey in 0i32..GRID_SIZE,
            speed in 0i32..50,
        ) {
            prop_assume!((px, py) != (ex, ey));
            let mut fx = Fixture::new([15, 1, 5, 1]);
            let mut battle = player_first(&mut fx);
            {
                let player = battle.entity_mut(PLAYER_ID).unwrap();
                player.position = Position::new(px, py);
                player.stats.speed = speed;
            }
            battle.entity_mut(FIRST_ENEMY_ID).unwrap().position = Position::new(ex, ey);

            let reach = rules::speed_in_tiles(speed);
            let moves = battle.legal_moves(PLAYER_ID);
            prop_assert!(moves.contains(&Position::new(px, py)));
            for cell in moves {
                prop_assert!(cell.on_grid());
                prop_assert!(cell.chebyshev(&Position::new(px, py)) <= reach);
                prop_assert_ne!(cell, Position::new(ex, ey));
            }
        }
    }
}
