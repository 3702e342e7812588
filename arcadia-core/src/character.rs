//! Player character data: ability scores, classes, races and combat stats.
//!
//! The creation wizard lives in the presentation layer; this module holds
//! the stat tables it draws from and turns its output into a
//! [`PlayerCharacter`].

use crate::rules;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Default walking speed for every playable race.
pub const BASE_SPEED: i32 = 30;

/// Name used when the wizard hands over a blank name.
pub const DEFAULT_NAME: &str = "Adventurer";

/// Error type for invalid ability scores.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttributeError {
    #[error("{ability} score must be at least 1")]
    ZeroScore { ability: Ability },
}

// ============================================================================
// Ability Scores
// ============================================================================

/// The six ability scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ability {
    Strength,
    Dexterity,
    Constitution,
    Intelligence,
    Wisdom,
    Charisma,
}

impl Ability {
    pub fn abbreviation(&self) -> &'static str {
        match self {
            Ability::Strength => "STR",
            Ability::Dexterity => "DEX",
            Ability::Constitution => "CON",
            Ability::Intelligence => "INT",
            Ability::Wisdom => "WIS",
            Ability::Charisma => "CHA",
        }
    }

    pub fn all() -> [Ability; 6] {
        [
            Ability::Strength,
            Ability::Dexterity,
            Ability::Constitution,
            Ability::Intelligence,
            Ability::Wisdom,
            Ability::Charisma,
        ]
    }
}

impl fmt::Display for Ability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.abbreviation())
    }
}

/// A finalized set of ability scores. Every score is at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Attributes {
    strength: u8,
    dexterity: u8,
    constitution: u8,
    intelligence: u8,
    wisdom: u8,
    charisma: u8,
}

impl Attributes {
    /// Validated scores in STR, DEX, CON, INT, WIS, CHA order. Rejects a zero.
    pub fn new(str: u8, dex: u8, con: u8, int: u8, wis: u8, cha: u8) -> Result<Self, AttributeError> {
        let attributes = Self {
            strength: str,
            dexterity: dex,
            constitution: con,
            intelligence: int,
            wisdom: wis,
            charisma: cha,
        };
        match Ability::all().into_iter().find(|a| attributes.get(*a) == 0) {
            Some(ability) => Err(AttributeError::ZeroScore { ability }),
            None => Ok(attributes),
        }
    }

    /// Class baseline plus racial bonuses, as the creation wizard computes it.
    pub fn for_character(race: Race, class: CharacterClass) -> Self {
        let mut attributes = class.base_attributes();
        race.apply_bonuses(&mut attributes);
        attributes
    }

    /// Raw score for one ability.
    pub fn get(&self, ability: Ability) -> u8 {
        match ability {
            Ability::Strength => self.strength,
            Ability::Dexterity => self.dexterity,
            Ability::Constitution => self.constitution,
            Ability::Intelligence => self.intelligence,
            Ability::Wisdom => self.wisdom,
            Ability::Charisma => self.charisma,
        }
    }

    /// Ability modifier, `floor((score - 10) / 2)`.
    pub fn modifier(&self, ability: Ability) -> i32 {
        rules::modifier(self.get(ability) as i32)
    }

    fn add(&mut self, ability: Ability, bonus: u8) {
        let slot = match ability {
            Ability::Strength => &mut self.strength,
            Ability::Dexterity => &mut self.dexterity,
            Ability::Constitution => &mut self.constitution,
            Ability::Intelligence => &mut self.intelligence,
            Ability::Wisdom => &mut self.wisdom,
            Ability::Charisma => &mut self.charisma,
        };
        *slot = slot.saturating_add(bonus);
    }

    /// Construct from a table row known to hold no zeros.
    pub(crate) const fn table(str: u8, dex: u8, con: u8, int: u8, wis: u8, cha: u8) -> Self {
        Self {
            strength: str,
            dexterity: dex,
            constitution: con,
            intelligence: int,
            wisdom: wis,
            charisma: cha,
        }
    }
}

// ============================================================================
// Classes and Races
// ============================================================================

/// Playable classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CharacterClass {
    Fighter,
    Wizard,
    Rogue,
    Cleric,
}

impl CharacterClass {
    pub fn name(&self) -> &'static str {
        match self {
            CharacterClass::Fighter => "Fighter",
            CharacterClass::Wizard => "Wizard",
            CharacterClass::Rogue => "Rogue",
            CharacterClass::Cleric => "Cleric",
        }
    }

    /// Faces of the class hit die.
    pub fn hit_die(&self) -> i32 {
        match self {
            CharacterClass::Wizard => 6,
            CharacterClass::Fighter => 10,
            CharacterClass::Rogue | CharacterClass::Cleric => 8,
        }
    }

    /// Class array before racial bonuses.
    pub fn base_attributes(&self) -> Attributes {
        match self {
            CharacterClass::Fighter => Attributes::table(15, 12, 14, 10, 10, 10),
            CharacterClass::Wizard => Attributes::table(8, 12, 12, 15, 13, 10),
            CharacterClass::Rogue => Attributes::table(10, 15, 12, 12, 10, 12),
            CharacterClass::Cleric => Attributes::table(12, 10, 13, 10, 15, 12),
        }
    }

    pub fn all() -> &'static [CharacterClass] {
        &[
            CharacterClass::Fighter,
            CharacterClass::Wizard,
            CharacterClass::Rogue,
            CharacterClass::Cleric,
        ]
    }
}

impl fmt::Display for CharacterClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Playable races.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Race {
    Human,
    Elf,
    Dwarf,
}

impl Race {
    pub fn name(&self) -> &'static str {
        match self {
            Race::Human => "Human",
            Race::Elf => "Elf",
            Race::Dwarf => "Dwarf",
        }
    }

    /// Apply racial ability score bonuses to base scores.
    pub fn apply_bonuses(&self, attributes: &mut Attributes) {
        match self {
            Race::Human => {
                for ability in Ability::all() {
                    attributes.add(ability, 1);
                }
            }
            Race::Elf => {
                attributes.add(Ability::Dexterity, 2);
                attributes.add(Ability::Intelligence, 1);
            }
            // Mountain dwarf
            Race::Dwarf => {
                attributes.add(Ability::Constitution, 2);
                attributes.add(Ability::Strength, 2);
            }
        }
    }

    pub fn all() -> &'static [Race] {
        &[Race::Human, Race::Elf, Race::Dwarf]
    }
}

impl fmt::Display for Race {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// Combat Stats
// ============================================================================

/// Combat-relevant numbers shared by players and monsters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CombatStats {
    pub hp: i32,
    pub max_hp: i32,
    pub ac: i32,
    pub initiative_bonus: i32,
    /// Walking speed in feet.
    pub speed: i32,
    pub attributes: Attributes,
}

impl CombatStats {
    /// Lose hit points, never dropping below zero. Returns the hp lost.
    pub fn take_damage(&mut self, amount: i32) -> i32 {
        let before = self.hp;
        self.hp = (self.hp - amount.max(0)).max(0);
        before - self.hp
    }

    /// Regain hit points up to the maximum. Returns the hp restored.
    pub fn heal(&mut self, amount: i32) -> i32 {
        let before = self.hp;
        self.hp = (self.hp + amount.max(0)).min(self.max_hp);
        self.hp - before
    }

    /// Alive while hp is above zero.
    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }
}

/// The persistent player record carried between battles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerCharacter {
    pub name: String,
    pub race: Race,
    pub class: CharacterClass,
    pub stats: CombatStats,
}

impl PlayerCharacter {
    /// Build a level 1 character from the creation wizard's output.
    pub fn create(
        name: impl Into<String>,
        race: Race,
        class: CharacterClass,
        attributes: Attributes,
    ) -> Self {
        let name = name.into();
        let name = if name.trim().is_empty() {
            DEFAULT_NAME.to_string()
        } else {
            name.trim().to_string()
        };

        let con = attributes.get(Ability::Constitution) as i32;
        let dex = attributes.get(Ability::Dexterity) as i32;
        let max_hp = rules::hit_points(1, con, class.hit_die()).max(1);

        Self {
            name,
            race,
            class,
            stats: CombatStats {
                hp: max_hp,
                max_hp,
                ac: rules::armor_class(dex, 10, false),
                initiative_bonus: rules::modifier(dex),
                speed: BASE_SPEED,
                attributes,
            },
        }
    }
}
