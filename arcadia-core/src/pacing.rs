//! Wall-clock driver for a campaign's timed events.
//!
//! The campaign itself never sleeps. `PacedCampaign` shares it behind an
//! async mutex and turns the scheduler's logical delays into real ones, so a
//! renderer sees "Enemy is acting..." a beat before the blow lands.

use crate::campaign::{Campaign, CampaignError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// A campaign shared between input handlers and the timer loop.
#[derive(Debug, Clone)]
pub struct PacedCampaign {
    inner: Arc<Mutex<Campaign>>,
}

impl PacedCampaign {
    /// Wrap a campaign for shared async access.
    pub fn new(campaign: Campaign) -> Self {
        Self {
            inner: Arc::new(Mutex::new(campaign)),
        }
    }

    /// Run `f` against the current campaign state.
    pub async fn with<R>(&self, f: impl FnOnce(&mut Campaign) -> R) -> R {
        let mut campaign = self.inner.lock().await;
        f(&mut campaign)
    }

    /// Sleep until each pending event is due and fire it, until none remain.
    ///
    /// The lock is released while sleeping. Events are applied to whatever
    /// state the campaign holds when they come due. Returns the number of
    /// events fired.
    pub async fn run_timers(&self) -> Result<usize, CampaignError> {
        let mut fired = 0;
        loop {
            let wait = self.inner.lock().await.scheduler().next_due_in();
            let Some(wait) = wait else {
                return Ok(fired);
            };

            tokio::time::sleep(Duration::from_millis(wait)).await;
            fired += self.inner.lock().await.advance_clock(wait)?;
        }
    }

    /// Take the campaign back once no other handle is alive.
    pub fn into_inner(self) -> Option<Campaign> {
        Arc::try_unwrap(self.inner).ok().map(Mutex::into_inner)
    }
}
