//! Timed transitions owned by the engine.
//!
//! Presentation pacing (the pause before an enemy acts, the beat before the
//! victory screen) is modelled as events on a logical clock instead of
//! wall-clock callbacks. Nothing fires until the owner advances the clock, so
//! tests can run a whole battle synchronously and a driver such as
//! [`crate::pacing::PacedCampaign`] can map the clock onto real time.

use crate::battle::EntityId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identifies one battle instance within a campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BattleId(pub u64);

impl fmt::Display for BattleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "battle-{}", self.0)
    }
}

/// A transition waiting on the clock.
///
/// Each event names the battle and the turn it was scheduled for. The battle
/// compares both against its current state when the event fires and ignores
/// it on mismatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimedEvent {
    /// Run the enemy AI for `actor`.
    EnemyTurn {
        battle: BattleId,
        turn: u64,
        actor: EntityId,
    },
    /// Pass the turn on after an enemy's action.
    EndTurn { battle: BattleId, turn: u64 },
    /// Reveal the decided outcome and roll rewards.
    OutcomeReveal { battle: BattleId },
}

impl TimedEvent {
    /// The battle this event belongs to.
    pub fn battle(&self) -> BattleId {
        match self {
            TimedEvent::EnemyTurn { battle, .. }
            | TimedEvent::EndTurn { battle, .. }
            | TimedEvent::OutcomeReveal { battle } => *battle,
        }
    }
}

/// An event with its due time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScheduledEvent {
    pub due_ms: u64,
    pub event: TimedEvent,
}

/// Logical clock plus a queue of pending events.
///
/// Events due at the same time fire in the order they were scheduled.
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    now_ms: u64,
    next_seq: u64,
    queue: BTreeMap<(u64, u64), TimedEvent>,
}

impl Scheduler {
    /// An empty queue at time 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current logical time in milliseconds.
    pub fn now(&self) -> u64 {
        self.now_ms
    }

    /// Queue `event` to fire `delay_ms` from now.
    pub fn schedule(&mut self, delay_ms: u64, event: TimedEvent) {
        let due = self.now_ms.saturating_add(delay_ms);
        let seq = self.next_seq;
        self.next_seq += 1;
        tracing::debug!(due_ms = due, ?event, "scheduled timed event");
        self.queue.insert((due, seq), event);
    }

    /// Remove and return the earliest event due at or before `until`.
    ///
    /// The clock moves forward to the event's due time so that anything it
    /// schedules in turn is relative to the moment it fired.
    pub fn pop_due(&mut self, until: u64) -> Option<ScheduledEvent> {
        let (&(due, seq), _) = self.queue.iter().next()?;
        if due > until {
            return None;
        }
        let event = self.queue.remove(&(due, seq))?;
        self.now_ms = self.now_ms.max(due);
        Some(ScheduledEvent { due_ms: due, event })
    }

    /// Move the clock to `to` without firing anything. Never goes backwards.
    pub fn set_now(&mut self, to: u64) {
        self.now_ms = self.now_ms.max(to);
    }

    /// Due time of the earliest pending event.
    pub fn next_due(&self) -> Option<u64> {
        self.queue.keys().next().map(|&(due, _)| due)
    }

    /// Milliseconds until the earliest pending event, zero if overdue.
    pub fn next_due_in(&self) -> Option<u64> {
        self.next_due().map(|due| due.saturating_sub(self.now_ms))
    }

    /// Drop every pending event. The clock keeps its value.
    pub fn clear(&mut self) {
        if !self.queue.is_empty() {
            tracing::debug!(dropped = self.queue.len(), "cleared timed events");
        }
        self.queue.clear();
    }

    /// Pending events in firing order.
    pub fn pending(&self) -> impl Iterator<Item = ScheduledEvent> + '_ {
        self.queue
            .iter()
            .map(|(&(due_ms, _), &event)| ScheduledEvent { due_ms, event })
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
