//! Engine configuration.
//!
//! Defaults reproduce the prototype. Every field can be overridden through
//! the builder methods or a partial JSON document.

use crate::map::HexCoord;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from loading a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Map must be at least 1x1, got {width}x{height}")]
    EmptyMap { width: i32, height: i32 },

    #[error("Start {start} lies outside the {width}x{height} map")]
    StartOffMap { start: HexCoord, width: i32, height: i32 },
}

/// Overworld generation and fog settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub width: i32,
    pub height: i32,
    /// Where a freshly created character enters the overworld.
    pub start: HexCoord,
    /// Hex radius revealed around the player.
    pub sight_radius: i32,
    pub encounter_chance: f64,
    pub village_chance: f64,
    pub castle_chance: f64,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            width: 20,
            height: 15,
            start: HexCoord::new(5, 5),
            sight_radius: 2,
            encounter_chance: 0.15,
            village_chance: 0.05,
            castle_chance: 0.02,
        }
    }
}

/// Presentation delays for timed battle transitions, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pacing {
    /// Between an enemy's turn starting and the enemy acting.
    pub enemy_turn_delay_ms: u64,
    /// Between an enemy's action and the turn passing on.
    pub enemy_action_delay_ms: u64,
    /// Between the deciding blow and the victory/defeat screen.
    pub outcome_reveal_delay_ms: u64,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            enemy_turn_delay_ms: 1000,
            enemy_action_delay_ms: 1500,
            outcome_reveal_delay_ms: 1000,
        }
    }
}

impl Pacing {
    /// Zero delays; every timed transition is due immediately.
    pub fn instant() -> Self {
        Self {
            enemy_turn_delay_ms: 0,
            enemy_action_delay_ms: 0,
            outcome_reveal_delay_ms: 0,
        }
    }
}

/// Configuration for a campaign.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub map: MapConfig,
    pub pacing: Pacing,
    /// Seed for all dice. `None` seeds from the operating system.
    pub seed: Option<u64>,
}

impl EngineConfig {
    /// The prototype defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a (possibly partial) JSON document over the defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject maps with no cells and starts that fall off the map.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let MapConfig { width, height, start, .. } = self.map;
        if width < 1 || height < 1 {
            return Err(ConfigError::EmptyMap { width, height });
        }
        if !(0..width).contains(&start.q) || !(0..height).contains(&start.r) {
            return Err(ConfigError::StartOffMap { start, width, height });
        }
        Ok(())
    }

    /// Fix the dice seed for reproducible campaigns.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Resize the overworld. The start is not moved; pair with
    /// [`with_start`](Self::with_start) when shrinking below it.
    pub fn with_map_size(mut self, width: i32, height: i32) -> Self {
        self.map.width = width;
        self.map.height = height;
        self
    }

    /// Hex where new characters enter the overworld.
    pub fn with_start(mut self, start: HexCoord) -> Self {
        self.map.start = start;
        self
    }

    /// Per-cell chance of a hidden encounter.
    pub fn with_encounter_chance(mut self, chance: f64) -> Self {
        self.map.encounter_chance = chance;
        self
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }
}
