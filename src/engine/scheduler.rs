//! Poll scheduler: one recurring timer per active feed
//!
//! Each feed is a small state machine, `Inactive` ⇄ `Active`. Entering
//! `Active` spawns the feed's timer task; leaving it signals the task to stop.
//! A tick that is already running when the stop signal arrives is allowed to
//! finish, so its fetch still lands in the cache.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::common::traits::TickHandler;
use crate::common::types::Feed;

/// Polling state of a feed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Inactive,
    Active,
}

struct PollTimer {
    stop: oneshot::Sender<()>,
}

pub struct PollScheduler {
    period: Duration,
    handler: Arc<dyn TickHandler>,
    timers: HashMap<Feed, PollTimer>,
}

impl PollScheduler {
    pub fn new(period: Duration, handler: Arc<dyn TickHandler>) -> Self {
        Self {
            period,
            handler,
            timers: HashMap::new(),
        }
    }

    pub fn state(&self, feed: &Feed) -> PollState {
        if self.timers.contains_key(feed) {
            PollState::Active
        } else {
            PollState::Inactive
        }
    }

    /// `Inactive -> Active`; returns false if the feed was already active
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_polling(&mut self, feed: Feed) -> bool {
        if self.timers.contains_key(&feed) {
            return false;
        }

        let (stop, mut stopped) = oneshot::channel();
        let handler = self.handler.clone();
        let period = self.period;
        let task_feed = feed.clone();

        tokio::spawn(async move {
            // The first tick comes one period in; subscribers already got data.
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = &mut stopped => break,
                    _ = ticker.tick() => handler.on_tick(&task_feed).await,
                }
            }
            debug!("Poll timer for {} exited", task_feed);
        });

        info!("Started polling {} every {:?}", feed, self.period);
        self.timers.insert(feed, PollTimer { stop });
        true
    }

    /// `Active -> Inactive`; returns false if the feed was not active
    pub fn stop_polling(&mut self, feed: &Feed) -> bool {
        match self.timers.remove(feed) {
            Some(timer) => {
                let _ = timer.stop.send(());
                info!("Stopped polling {}", feed);
                true
            }
            None => false,
        }
    }

    pub fn stop_all(&mut self) {
        for (feed, timer) in self.timers.drain() {
            let _ = timer.stop.send(());
            debug!("Stopped polling {}", feed);
        }
    }

    pub fn active_feeds(&self) -> Vec<Feed> {
        let mut feeds: Vec<_> = self.timers.keys().cloned().collect();
        feeds.sort();
        feeds
    }

    pub fn active_count(&self) -> usize {
        self.timers.len()
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        self.stop_all();
    }
}
