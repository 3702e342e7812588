//! Turn engine for a small tactical RPG.
//!
//! This crate provides:
//! - A minimal D&D 5e rules subset with injectable dice
//! - An overworld hex map with fog of war and random encounters
//! - 8x8 tactical battles with turn order, action legality and enemy AI
//! - A campaign controller that sequences the game phases and keeps the log
//!
//! Presentation pacing is modelled as timed events on a logical clock.
//! Tests flush them synchronously; [`PacedCampaign`] plays them out in real
//! time on tokio.
//!
//! # Quick Start
//!
//! ```
//! use arcadia_core::{Attributes, BattleAction, Campaign, CharacterClass, EngineConfig, Race};
//!
//! let mut campaign = Campaign::new(EngineConfig::new().with_seed(42));
//! let attributes = Attributes::for_character(Race::Elf, CharacterClass::Wizard);
//! campaign.complete_character_creation("Elara", Race::Elf, CharacterClass::Wizard, attributes);
//!
//! campaign.overworld_move_to(5, 6)?;
//! if campaign.battle().is_some() {
//!     campaign.select_battle_action(BattleAction::Wait)?;
//!     campaign.flush_timers()?;
//! }
//! println!("{}", campaign.snapshot_json()?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod battle;
pub mod campaign;
pub mod character;
pub mod config;
pub mod dice;
pub mod log;
pub mod map;
pub mod pacing;
pub mod rules;
pub mod schedule;
pub mod testing;

// Primary public API
pub use battle::{
    Battle, BattleAction, BattleEntity, BattleError, BattleOutcome, BattleRewards, BattleSnapshot,
    BattleStatus, EntityId, Position, Side,
};
pub use campaign::{Campaign, CampaignError, CampaignSnapshot, Phase};
pub use character::{Ability, AttributeError, Attributes, CharacterClass, CombatStats, PlayerCharacter, Race};
pub use config::{ConfigError, EngineConfig, MapConfig, Pacing};
pub use dice::{Advantage, Dice, DiceFormula, RollSource};
pub use log::{EventLog, LogEntry, LogKind};
pub use map::{HexCell, HexCoord, TerrainType, WorldMap};
pub use pacing::PacedCampaign;
pub use schedule::{BattleId, Scheduler, TimedEvent};
pub use testing::{ScriptedRolls, TestHarness};
