//! Dice rolling for the battle rules.
//!
//! Every random draw in the engine goes through the [`RollSource`] held by a
//! [`Dice`] value, so a seeded source reproduces a whole campaign: map,
//! initiative, attacks and rewards.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A source of uniform random draws.
pub trait RollSource: Send {
    /// Uniform integer in `low..=high`.
    fn roll_range(&mut self, low: i32, high: i32) -> i32;

    /// Returns true with the given probability.
    fn chance(&mut self, probability: f64) -> bool;
}

impl RollSource for StdRng {
    fn roll_range(&mut self, low: i32, high: i32) -> i32 {
        if low >= high {
            return low;
        }
        self.gen_range(low..=high)
    }

    fn chance(&mut self, probability: f64) -> bool {
        if !(probability > 0.0) {
            return false;
        }
        if probability >= 1.0 {
            return true;
        }
        self.gen_bool(probability)
    }
}

/// Advantage state for d20 rolls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Advantage {
    #[default]
    Normal,
    Advantage,
    Disadvantage,
}

/// Result of a d20 roll.
///
/// `raw` holds the draws shown to the player: one value for a normal roll,
/// both values when advantage or disadvantage picked between them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct D20Roll {
    pub result: i32,
    pub raw: Vec<i32>,
}

impl D20Roll {
    /// The kept die shows 20.
    pub fn is_natural_20(&self) -> bool {
        self.result == 20
    }

    /// The kept die shows 1.
    pub fn is_natural_1(&self) -> bool {
        self.result == 1
    }
}

/// A fixed dice expression such as `2d4+2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceFormula {
    pub count: u32,
    pub sides: u32,
    pub bonus: i32,
}

impl DiceFormula {
    /// `count`d`sides` plus `bonus`.
    pub const fn new(count: u32, sides: u32, bonus: i32) -> Self {
        Self {
            count,
            sides,
            bonus,
        }
    }

    /// Smallest possible total.
    pub fn min(&self) -> i32 {
        self.count as i32 + self.bonus
    }

    /// Largest possible total.
    pub fn max(&self) -> i32 {
        (self.count * self.sides) as i32 + self.bonus
    }
}

impl fmt::Display for DiceFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d{}", self.count, self.sides)?;
        match self.bonus {
            0 => Ok(()),
            b if b > 0 => write!(f, "+{b}"),
            b => write!(f, "-{}", b.abs()),
        }
    }
}

/// Result of rolling a [`DiceFormula`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceRoll {
    pub formula: DiceFormula,
    pub rolls: Vec<i32>,
    pub total: i32,
}

impl fmt::Display for DiceRoll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dice = self
            .rolls
            .iter()
            .map(|r| r.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        match self.formula.bonus {
            0 => write!(f, "[{dice}] = {}", self.total),
            b if b > 0 => write!(f, "[{dice}] + {b} = {}", self.total),
            b => write!(f, "[{dice}] - {} = {}", b.abs(), self.total),
        }
    }
}

/// The engine's dice cup.
pub struct Dice {
    source: Box<dyn RollSource>,
}

impl Dice {
    /// Wrap an arbitrary roll source.
    pub fn new(source: impl RollSource + 'static) -> Self {
        Self {
            source: Box::new(source),
        }
    }

    /// Reproducible dice for a given seed.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    /// Dice seeded from the operating system.
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    /// Roll a single die with the given number of sides.
    pub fn die(&mut self, sides: u32) -> i32 {
        self.source.roll_range(1, sides.max(1) as i32)
    }

    /// Roll a d20.
    ///
    /// Two values are always drawn so that switching modes never shifts the
    /// rest of the roll sequence; a normal roll keeps the first.
    pub fn d20(&mut self, advantage: Advantage) -> D20Roll {
        let r1 = self.die(20);
        let r2 = self.die(20);

        match advantage {
            Advantage::Normal => D20Roll {
                result: r1,
                raw: vec![r1],
            },
            Advantage::Advantage => D20Roll {
                result: r1.max(r2),
                raw: vec![r1, r2],
            },
            Advantage::Disadvantage => D20Roll {
                result: r1.min(r2),
                raw: vec![r1, r2],
            },
        }
    }

    /// Sum of `count` dice with `sides` sides.
    pub fn roll_dice(&mut self, sides: u32, count: u32) -> i32 {
        (0..count).map(|_| self.die(sides)).sum()
    }

    /// Roll a formula, keeping the individual dice for display.
    pub fn roll(&mut self, formula: DiceFormula) -> DiceRoll {
        let rolls: Vec<i32> = (0..formula.count).map(|_| self.die(formula.sides)).collect();
        let total = rolls.iter().sum::<i32>() + formula.bonus;
        DiceRoll {
            formula,
            rolls,
            total,
        }
    }

    /// Uniform integer in `low..=high`.
    pub fn range(&mut self, low: i32, high: i32) -> i32 {
        self.source.roll_range(low, high)
    }

    /// Returns true with the given probability.
    pub fn chance(&mut self, probability: f64) -> bool {
        self.source.chance(probability)
    }
}

impl fmt::Debug for Dice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dice").finish_non_exhaustive()
    }
}
