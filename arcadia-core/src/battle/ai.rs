//! Enemy decision making.
//!
//! Planning is pure: it looks at the entities and returns what the enemy
//! wants to do. The battle applies the plan, rolls dice and writes the log.

use super::entity::{BattleEntity, EntityId, Position};

/// What an enemy does with its turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnemyPlan {
    /// The target is adjacent on both axes.
    Attack { target: EntityId },
    /// Close in by one cell.
    Step(Position),
    /// Every approach cell is taken; stay put.
    Blocked,
}

/// Decide the turn for `me` against `target`.
///
/// Adjacent targets are attacked. Otherwise the enemy steps one cell
/// toward the target, trying the diagonal first, then the horizontal slide,
/// then the vertical slide. A cell is free when no other living entity
/// stands on it.
pub fn plan_enemy_turn(me: &BattleEntity, target: &BattleEntity, entities: &[BattleEntity]) -> EnemyPlan {
    let here = me.position;
    let there = target.position;

    if (here.x - there.x).abs() <= 1 && (here.y - there.y).abs() <= 1 {
        return EnemyPlan::Attack { target: target.id };
    }

    let dx = (there.x - here.x).signum();
    let dy = (there.y - here.y).signum();

    let is_free = |cell: Position| {
        cell.on_grid()
            && !entities
                .iter()
                .any(|e| e.id != me.id && e.is_alive() && e.position == cell)
    };

    let candidates = [
        (true, here.offset(dx, dy)),
        (dx != 0, here.offset(dx, 0)),
        (dy != 0, here.offset(0, dy)),
    ];

    let plan = candidates
        .into_iter()
        .find(|&(allowed, cell)| allowed && is_free(cell))
        .map_or(EnemyPlan::Blocked, |(_, cell)| EnemyPlan::Step(cell));

    tracing::debug!(enemy = %me.id, ?plan, "enemy plan");
    plan
}
