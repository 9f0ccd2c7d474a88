//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Idle countdown with a two-strike roster check
//!
//! The [`HibernationTimer`] counts down while the real server is up. When
//! the countdown expires it asks the [`ServerHost`] for the player roster,
//! ignores blacklisted names, and:
//!
//! - rearms if anyone else is online, or if the roster could not be read;
//! - rearms once more and marks a retest as pending the first time the
//!   roster is empty;
//! - suspends the server the second consecutive time it is empty.
//!
//! A single driver task owns the countdown. `start` and `cancel` only
//! publish a new schedule; every schedule carries a generation number and
//! an evaluation whose generation is no longer current is discarded.

use crate::{Blacklist, HibernateError, Result, RosterSplit, ServerHost, TimerConfig, TimerState};
use metrics::{counter, gauge};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until, timeout};
use tracing::Instrument;

/// Idle countdown that suspends the real server
///
/// # Example
///
/// ```no_run
/// use hibernate_service::{Blacklist, HibernationTimer, ServerHost, TimerConfig};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// fn arm(host: Arc<dyn ServerHost>) -> hibernate_service::Result<HibernationTimer> {
///     let timer = HibernationTimer::new(
///         TimerConfig::new(Duration::from_secs(600)),
///         Blacklist::compile(["bot_.*"]),
///     )?;
///     timer.start(host);
///     Ok(timer)
/// }
/// ```
pub struct HibernationTimer {
    shared: Arc<TimerShared>,
}

struct TimerShared {
    config: TimerConfig,
    blacklist: Blacklist,
    schedule: watch::Sender<Schedule>,
    slot: Mutex<Slot>,
}

/// Mutable timer state; only touched with the lock held
#[derive(Default)]
struct Slot {
    generation: u64,
    retest_pending: bool,
    host: Option<Arc<dyn ServerHost>>,
    driver: Option<JoinHandle<()>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Schedule {
    Disarmed,
    Armed { deadline: Instant, generation: u64 },
}

/// Result of looking at the roster once
#[derive(Debug)]
enum Probe {
    Roster(RosterSplit),
    Failed,
    ServerDown,
}

impl HibernationTimer {
    /// Create a stopped timer
    ///
    /// Fails if `config` does not validate; a zero countdown would query
    /// the roster in a tight loop.
    pub fn new(config: TimerConfig, blacklist: Blacklist) -> Result<Self> {
        config.validate().map_err(HibernateError::Config)?;
        let (schedule, _) = watch::channel(Schedule::Disarmed);
        Ok(Self {
            shared: Arc::new(TimerShared {
                config,
                blacklist,
                schedule,
                slot: Mutex::new(Slot::default()),
            }),
        })
    }

    /// Start a fresh countdown, replacing any pending one
    ///
    /// Clears a pending retest, like [`cancel`](Self::cancel).
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn start(&self, host: Arc<dyn ServerHost>) {
        let mut slot = self.shared.lock();
        slot.host = Some(host);
        slot.retest_pending = false;
        self.shared.rearm(&mut slot);

        if slot.driver.as_ref().is_none_or(JoinHandle::is_finished) {
            let schedule = self.shared.schedule.subscribe();
            slot.driver = Some(tokio::spawn(
                drive(self.shared.clone(), schedule).in_current_span(),
            ));
        }
        tracing::info!(idle = ?self.shared.config.idle_timeout, "Idle countdown started");
    }

    /// Cancel a pending countdown and clear a pending retest
    pub fn cancel(&self) {
        let mut slot = self.shared.lock();
        let was_armed = self.state() == TimerState::Armed;
        slot.retest_pending = false;
        slot.host = None;
        self.shared.disarm(&mut slot);
        if was_armed {
            tracing::info!("Idle countdown cancelled");
        }
    }

    /// Whether a countdown is pending
    pub fn state(&self) -> TimerState {
        match *self.shared.schedule.borrow() {
            Schedule::Disarmed => TimerState::Stopped,
            Schedule::Armed { .. } => TimerState::Armed,
        }
    }

    /// When the pending countdown expires
    pub fn deadline(&self) -> Option<Instant> {
        match *self.shared.schedule.borrow() {
            Schedule::Disarmed => None,
            Schedule::Armed { deadline, .. } => Some(deadline),
        }
    }

    /// Whether the last check found nobody and a second one is pending
    pub fn retest_pending(&self) -> bool {
        self.shared.lock().retest_pending
    }

    /// Timer configuration
    pub fn config(&self) -> &TimerConfig {
        &self.shared.config
    }

    /// Blacklist applied to the roster
    pub fn blacklist(&self) -> &Blacklist {
        &self.shared.blacklist
    }
}

impl std::fmt::Debug for HibernationTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HibernationTimer")
            .field("idle_timeout", &self.shared.config.idle_timeout)
            .field("state", &self.state())
            .field("retest_pending", &self.retest_pending())
            .finish()
    }
}

impl Drop for HibernationTimer {
    fn drop(&mut self) {
        if let Some(driver) = self.shared.lock().driver.take() {
            driver.abort();
        }
    }
}

impl TimerShared {
    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn rearm(&self, slot: &mut Slot) {
        slot.generation += 1;
        self.schedule.send_replace(Schedule::Armed {
            deadline: Instant::now() + self.config.idle_timeout,
            generation: slot.generation,
        });
        gauge!("hibernate.timer.armed").set(1.0);
    }

    fn disarm(&self, slot: &mut Slot) {
        slot.generation += 1;
        self.schedule.send_replace(Schedule::Disarmed);
        gauge!("hibernate.timer.armed").set(0.0);
    }

    async fn expire(self: &Arc<Self>, generation: u64) {
        let host = {
            let slot = self.lock();
            match (&slot.host, slot.generation == generation) {
                (Some(host), true) => host.clone(),
                _ => return,
            }
        };
        counter!("hibernate.timer.expirations").increment(1);
        tracing::info!("Idle countdown expired, checking players");

        // A panicking host must not take the driver down with it.
        let shared = Arc::clone(self);
        let probe_host = host.clone();
        let probe_task = async move { shared.probe(probe_host).await }.in_current_span();
        let probe = match tokio::spawn(probe_task).await {
            Ok(probe) => probe,
            Err(e) => {
                tracing::error!(error = %e, "Roster check failed unexpectedly, countdown restarted");
                Probe::Failed
            }
        };

        let suspend = {
            let mut slot = self.lock();
            if slot.generation != generation {
                tracing::debug!("Countdown replaced during the roster check, result discarded");
                return;
            }
            match probe {
                Probe::ServerDown => {
                    tracing::info!("Real server is not running, countdown stopped");
                    slot.retest_pending = false;
                    self.disarm(&mut slot);
                    false
                }
                Probe::Failed => {
                    counter!("hibernate.timer.roster_failures").increment(1);
                    self.rearm(&mut slot);
                    false
                }
                Probe::Roster(split) if !split.is_idle() => {
                    tracing::info!(
                        active = ?split.active,
                        blacklisted = ?split.blacklisted,
                        "Players online, countdown restarted"
                    );
                    slot.retest_pending = false;
                    self.rearm(&mut slot);
                    false
                }
                Probe::Roster(split) if !slot.retest_pending => {
                    tracing::info!(
                        blacklisted = ?split.blacklisted,
                        "No players online, checking once more before suspending"
                    );
                    counter!("hibernate.timer.first_strikes").increment(1);
                    slot.retest_pending = true;
                    self.rearm(&mut slot);
                    false
                }
                Probe::Roster(split) => {
                    tracing::info!(
                        blacklisted = ?split.blacklisted,
                        "No players online twice in a row, suspending the real server"
                    );
                    slot.retest_pending = false;
                    slot.host = None;
                    self.disarm(&mut slot);
                    true
                }
            }
        };

        if suspend {
            counter!("hibernate.timer.suspensions").increment(1);
            let stop_task = async move { host.stop_server().await }.in_current_span();
            if let Err(e) = tokio::spawn(stop_task).await {
                tracing::error!(error = %e, "Stopping the real server failed unexpectedly");
            }
        }
    }

    async fn probe(&self, host: Arc<dyn ServerHost>) -> Probe {
        if !host.is_running().await {
            return Probe::ServerDown;
        }
        let bound = self.config.roster_timeout;
        let error = match timeout(bound, host.player_roster()).await {
            Ok(Ok(roster)) => return Probe::Roster(self.blacklist.partition(roster)),
            Ok(Err(e)) => e,
            Err(_) => HibernateError::RosterFetch(format!("no answer within {:?}", bound)),
        };
        tracing::warn!(error = %error, "Roster unavailable, countdown restarted");
        Probe::Failed
    }
}

async fn drive(shared: Arc<TimerShared>, mut schedule: watch::Receiver<Schedule>) {
    loop {
        let current = *schedule.borrow_and_update();
        match current {
            Schedule::Disarmed => {
                if schedule.changed().await.is_err() {
                    return;
                }
            }
            Schedule::Armed {
                deadline,
                generation,
            } => {
                tokio::select! {
                    () = sleep_until(deadline) => shared.expire(generation).await,
                    changed = schedule.changed() => {
                        if changed.is_err() {
                            return;
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct CountingHost {
        stops: AtomicUsize,
    }

    #[async_trait]
    impl ServerHost for CountingHost {
        async fn start_server(&self) {}
        async fn stop_server(&self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
        async fn is_running(&self) -> bool {
            true
        }
        async fn player_roster(&self) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
    }

    fn timer() -> HibernationTimer {
        HibernationTimer::new(TimerConfig::new(Duration::from_secs(60)), Blacklist::default())
            .unwrap()
    }

    #[test]
    fn test_zero_countdown_is_rejected() {
        let err = HibernationTimer::new(TimerConfig::new(Duration::ZERO), Blacklist::default())
            .unwrap_err();
        assert!(matches!(err, HibernateError::Config(_)));

        let config = TimerConfig::new(Duration::from_secs(60)).with_roster_timeout(Duration::ZERO);
        assert!(HibernationTimer::new(config, Blacklist::default()).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_arms_and_cancel_disarms() {
        let timer = timer();
        assert_eq!(timer.state(), TimerState::Stopped);

        timer.start(Arc::new(CountingHost::default()));
        assert_eq!(timer.state(), TimerState::Armed);
        assert!(timer.deadline().is_some());

        timer.cancel();
        assert_eq!(timer.state(), TimerState::Stopped);
        assert!(timer.deadline().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_moves_deadline() {
        let timer = timer();
        let host = Arc::new(CountingHost::default());
        timer.start(host.clone());
        let first = timer.deadline().unwrap();

        tokio::time::sleep(Duration::from_secs(30)).await;
        timer.start(host.clone());
        assert_eq!(timer.deadline().unwrap(), first + Duration::from_secs(30));

        // The original deadline passes without a check.
        tokio::time::sleep(Duration::from_secs(45)).await;
        assert!(!timer.retest_pending());
        assert_eq!(host.stops.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_clears_retest_pending() {
        let timer = timer();
        timer.start(Arc::new(CountingHost::default()));
        tokio::time::sleep(Duration::from_secs(61)).await;
        assert!(timer.retest_pending());

        timer.cancel();
        assert!(!timer.retest_pending());
        assert_eq!(timer.state(), TimerState::Stopped);
    }
}
