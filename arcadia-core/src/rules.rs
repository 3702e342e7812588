//! D&D 5e rules subset used by the tactical battles.
//!
//! Pure formulas (ability modifiers, armor class, hit points) plus the
//! fixed numbers of the prototype ruleset: one melee attack, one spell,
//! one healing potion.

use crate::dice::{Advantage, D20Roll, Dice, DiceFormula, DiceRoll};
use serde::{Deserialize, Serialize};

/// Distance units covered by one grid tile.
pub const FEET_PER_TILE: i32 = 5;

/// Flat attack bonus (proficiency + ability) for every attack roll.
pub const ATTACK_BONUS: i32 = 4;

/// Melee reach in tiles.
pub const MELEE_RANGE: i32 = 1;

/// Spell range in tiles (30 ft).
pub const SPELL_RANGE: i32 = 6;

/// Player weapon damage, 3..=10.
pub const PLAYER_MELEE_DAMAGE: DiceFormula = DiceFormula::new(1, 8, 2);

/// Enemy weapon damage, 2..=7.
pub const ENEMY_MELEE_DAMAGE: DiceFormula = DiceFormula::new(1, 6, 1);

/// Auto-hitting arcane bolt.
pub const SPELL_DAMAGE: DiceFormula = DiceFormula::new(2, 4, 0);

/// Potion of Healing.
pub const POTION_HEALING: DiceFormula = DiceFormula::new(2, 4, 2);

/// Experience for winning a battle.
pub const VICTORY_XP: u32 = 50;
/// Gold for a win is drawn uniformly from this inclusive range.
pub const VICTORY_GOLD_MIN: i32 = 10;
pub const VICTORY_GOLD_MAX: i32 = 19;

/// Ability modifier for a score: `floor((score - 10) / 2)`.
pub fn modifier(score: i32) -> i32 {
    // Euclidean division floors toward negative infinity for a positive divisor.
    (score - 10).div_euclid(2)
}

/// Armor class from dexterity, an armor base and an optional shield.
pub fn armor_class(dex: i32, base: i32, has_shield: bool) -> i32 {
    let shield = if has_shield { 2 } else { 0 };
    base + modifier(dex) + shield
}

/// Maximum hit points: full hit die at level 1, average roll afterwards.
///
/// Level 0 is treated as level 1.
pub fn hit_points(level: u32, con: i32, hit_die: i32) -> i32 {
    let con_mod = modifier(con);
    let extra_levels = level.saturating_sub(1) as i32;
    (hit_die + con_mod) + extra_levels * (hit_die / 2 + 1 + con_mod)
}

/// Movement speed converted to grid tiles.
pub fn speed_in_tiles(speed: i32) -> i32 {
    speed.max(0) / FEET_PER_TILE
}

/// Result of an attack roll against a target's armor class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackOutcome {
    pub roll: D20Roll,
    pub bonus: i32,
    pub total: i32,
    pub target_ac: i32,
    /// Present only when the attack hit.
    pub damage: Option<DiceRoll>,
}

impl AttackOutcome {
    /// Total meets or beats the target AC.
    pub fn hit(&self) -> bool {
        self.damage.is_some()
    }

    /// Damage if the attack hit, otherwise 0.
    pub fn damage_dealt(&self) -> i32 {
        self.damage.as_ref().map_or(0, |d| d.total.max(0))
    }
}

/// Roll to hit and, on a hit, roll damage.
///
/// The attack hits when `d20 + bonus >= target_ac`.
pub fn attack_roll(
    dice: &mut Dice,
    bonus: i32,
    target_ac: i32,
    damage: DiceFormula,
) -> AttackOutcome {
    let roll = dice.d20(Advantage::Normal);
    let total = roll.result + bonus;
    let damage = (total >= target_ac).then(|| dice.roll(damage));

    tracing::debug!(
        d20 = roll.result,
        total,
        target_ac,
        hit = damage.is_some(),
        "attack roll"
    );

    AttackOutcome {
        roll,
        bonus,
        total,
        target_ac,
        damage,
    }
}
