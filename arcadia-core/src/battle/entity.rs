//! Combatants on the tactical grid.

use crate::character::{Attributes, CombatStats, PlayerCharacter};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Width and height of the tactical grid.
pub const GRID_SIZE: i32 = 8;

/// Player spawn, bottom centre of the grid.
pub const PLAYER_START: Position = Position::new(3, 7);
/// Goblin spawn, top centre.
pub const ENEMY_START: Position = Position::new(4, 2);

/// Sprite keys the renderer maps to art.
pub const PLAYER_SPRITE: &str = "PLAYER";
pub const GOBLIN_SPRITE: &str = "GOBLIN";

/// Which team a combatant fights for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Player,
    Enemy,
}

impl Side {
    /// The side this one fights against.
    pub fn opponent(&self) -> Side {
        match self {
            Side::Player => Side::Enemy,
            Side::Enemy => Side::Player,
        }
    }
}

/// Identifier of a combatant, unique within one battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A cell on the tactical grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Largest per-axis difference.
    pub fn chebyshev(&self, other: &Position) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }

    /// Whether the cell lies on the 8x8 grid.
    pub fn on_grid(&self) -> bool {
        (0..GRID_SIZE).contains(&self.x) && (0..GRID_SIZE).contains(&self.y)
    }

    /// This position shifted by `(dx, dy)`. May leave the grid.
    pub fn offset(&self, dx: i32, dy: i32) -> Position {
        Position::new(self.x + dx, self.y + dy)
    }

    /// Every cell of the grid in x-major order.
    pub fn grid() -> impl Iterator<Item = Position> {
        (0..GRID_SIZE).flat_map(|x| (0..GRID_SIZE).map(move |y| Position::new(x, y)))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A combatant. Owned by the battle for its duration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BattleEntity {
    pub id: EntityId,
    pub name: String,
    pub side: Side,
    pub stats: CombatStats,
    pub position: Position,
    /// Opaque visual reference for the renderer.
    pub sprite: String,
}

impl BattleEntity {
    /// Battle copy of the persistent player record.
    pub fn from_player(id: EntityId, player: &PlayerCharacter, position: Position) -> Self {
        Self {
            id,
            name: player.name.clone(),
            side: Side::Player,
            stats: player.stats.clone(),
            position,
            sprite: PLAYER_SPRITE.to_string(),
        }
    }

    /// The prototype's only monster.
    pub fn goblin_scout(id: EntityId, position: Position) -> Self {
        Self {
            id,
            name: "Goblin Scout".to_string(),
            side: Side::Enemy,
            stats: CombatStats {
                hp: 7,
                max_hp: 7,
                ac: 15,
                initiative_bonus: 2,
                speed: 30,
                attributes: goblin_attributes(),
            },
            position,
            sprite: GOBLIN_SPRITE.to_string(),
        }
    }

    /// Alive while hp is above zero.
    pub fn is_alive(&self) -> bool {
        self.stats.is_alive()
    }
}

fn goblin_attributes() -> Attributes {
    Attributes::table(8, 14, 10, 10, 8, 8)
}
