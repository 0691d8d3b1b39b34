//! The race session: master clock, runner store and target pace behind one
//! owner. Every mutation the UI can trigger goes through here so that clock
//! readings and split composition happen in the same step.

use std::time::Instant;

use tracing::info;

use crate::clock::Clock;
use crate::error::{RaceError, Result};
use crate::format::parse_target_pace;
use crate::persist::Snapshot;
use crate::runner::{RunnerId, RunnerStore, Split, SplitId};
use crate::splits::{FinishOutcome, DEFAULT_FINISH_THRESHOLD_MS};
use crate::transfer;

/// Notifications raised by the session itself rather than by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Every runner finished while the clock was running; it is now paused.
    AllFinished,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetPace {
    pub raw: String,
    pub ms: u64,
}

impl TargetPace {
    pub fn parse(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            ms: parse_target_pace(raw),
        }
    }
}

/// Mutations that destroy recorded data and need the user's go-ahead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destructive {
    ResetAll,
    RemoveRunner(RunnerId),
    DeleteSplit { runner: RunnerId, split: SplitId },
    DeleteAllRunners,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub title: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Review {
    /// Nothing would be lost; apply straight away.
    Immediate,
    Confirm(Prompt),
}

fn confirm(title: &str, message: impl Into<String>) -> Review {
    Review::Confirm(Prompt {
        title: title.to_string(),
        message: message.into(),
    })
}

#[derive(Debug, Clone)]
pub struct RaceSession {
    clock: Clock,
    store: RunnerStore,
    target: TargetPace,
    finish_threshold_ms: u64,
    completion_latched: bool,
    events: Vec<SessionEvent>,
}

impl Default for RaceSession {
    fn default() -> Self {
        Self::new()
    }
}

impl RaceSession {
    pub fn new() -> Self {
        Self::with_store(RunnerStore::with_default_runner())
    }

    pub fn with_store(store: RunnerStore) -> Self {
        Self {
            clock: Clock::new(),
            store,
            target: TargetPace::default(),
            finish_threshold_ms: DEFAULT_FINISH_THRESHOLD_MS,
            completion_latched: false,
            events: Vec::new(),
        }
    }

    /// Rebuilds a session from persisted values. The clock comes back paused.
    pub fn restore(snapshot: Snapshot) -> Self {
        let mut session = Self::with_store(snapshot.runners);
        session.clock = Clock::restored(snapshot.elapsed_ms);
        session.target = TargetPace::parse(&snapshot.target_pace);
        session
    }

    pub fn with_finish_threshold(mut self, threshold_ms: u64) -> Self {
        self.finish_threshold_ms = threshold_ms;
        self
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            runners: self.store.clone(),
            elapsed_ms: self.clock.elapsed(),
            target_pace: self.target.raw.clone(),
        }
    }

    pub fn store(&self) -> &RunnerStore {
        &self.store
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn elapsed(&self) -> u64 {
        self.clock.elapsed()
    }

    pub fn is_running(&self) -> bool {
        self.clock.is_running()
    }

    pub fn target_pace(&self) -> &TargetPace {
        &self.target
    }

    pub fn set_target_pace(&mut self, raw: &str) {
        self.target = TargetPace::parse(raw);
    }

    pub fn finish_threshold_ms(&self) -> u64 {
        self.finish_threshold_ms
    }

    /// Drains pending notifications.
    pub fn take_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn start_clock(&mut self, now: Instant) -> bool {
        self.clock.start(now)
    }

    pub fn pause_clock(&mut self, now: Instant) -> bool {
        self.clock.pause(now)
    }

    /// Start or pause; returns whether the clock is running afterwards.
    pub fn toggle_clock(&mut self, now: Instant) -> bool {
        if self.clock.is_running() {
            self.clock.pause(now);
        } else {
            self.clock.start(now);
        }
        self.clock.is_running()
    }

    pub fn tick(&mut self, now: Instant) -> u64 {
        self.clock.tick(now);
        self.check_completion(now);
        self.clock.elapsed()
    }

    fn check_completion(&mut self, now: Instant) {
        if self.clock.is_running() && !self.completion_latched && self.store.all_finished() {
            self.clock.pause(now);
            self.completion_latched = true;
            self.events.push(SessionEvent::AllFinished);
            info!(elapsed_ms = self.clock.elapsed(), "all runners finished, clock stopped");
        }
    }

    pub fn add_runner(&mut self) -> RunnerId {
        self.completion_latched = false;
        self.store.add_runner()
    }

    pub fn rename_runner(&mut self, id: RunnerId, name: &str) -> Result<()> {
        if self.clock.elapsed() > 0 {
            return Err(RaceError::NamesLocked);
        }
        self.store.rename(id, name)
    }

    pub fn import_names(&mut self, text: &str) -> Result<Vec<RunnerId>> {
        let ids = transfer::import_names(&mut self.store, text)?;
        self.completion_latched = false;
        Ok(ids)
    }

    pub fn record_split(&mut self, id: RunnerId, now: Instant) -> Result<Split> {
        if !self.clock.is_running() {
            return Err(RaceError::ClockNotRunning);
        }
        self.store.get(id)?;
        let at = self.clock.tick(now);
        self.store.record_split(id, at)
    }

    /// Allowed while running, or while paused with time on the clock.
    pub fn finish_runner(&mut self, id: RunnerId, now: Instant) -> Result<FinishOutcome> {
        if !self.clock.is_running() && self.clock.elapsed() == 0 {
            return Err(RaceError::ClockNotStarted);
        }
        let at = self.clock.tick(now);
        let outcome = self
            .store
            .finish_runner(id, at, self.finish_threshold_ms)?;
        self.check_completion(now);
        Ok(outcome)
    }

    /// Whether `action` needs confirmation, and what to ask.
    pub fn review(&self, action: &Destructive) -> Result<Review> {
        Ok(match *action {
            Destructive::ResetAll => {
                if self.clock.elapsed() == 0 && !self.store.has_splits() {
                    Review::Immediate
                } else {
                    confirm(
                        "Reset everything?",
                        "This clears the clock and every runner's laps. Continue?",
                    )
                }
            }
            Destructive::RemoveRunner(id) => {
                let runner = self.store.get(id)?;
                confirm(
                    "Remove runner?",
                    format!(
                        "{} and all of their laps will be removed permanently.",
                        runner.name
                    ),
                )
            }
            Destructive::DeleteSplit { runner, split } => {
                let owner = self.store.get(runner)?;
                let target = owner
                    .find_split(split)
                    .ok_or(RaceError::SplitNotFound { runner, split })?;
                confirm(
                    "Delete split?",
                    format!(
                        "Deleting lap {} of {} recalculates the following laps. Continue?",
                        target.index, owner.name
                    ),
                )
            }
            Destructive::DeleteAllRunners => confirm(
                "Remove all runners?",
                "Every runner is removed from the list. This cannot be undone. Continue?",
            ),
        })
    }

    /// Performs a reviewed destructive action.
    pub fn apply(&mut self, action: Destructive, now: Instant) -> Result<()> {
        match action {
            Destructive::ResetAll => {
                self.clock.pause(now);
                self.clock.reset(now);
                self.store.reset_session();
                self.completion_latched = false;
            }
            Destructive::RemoveRunner(id) => {
                self.store.remove(id)?;
            }
            Destructive::DeleteSplit { runner, split } => {
                self.store.delete_split(runner, split)?;
            }
            Destructive::DeleteAllRunners => self.store.clear(),
        }
        info!(?action, "destructive action applied");
        Ok(())
    }
}
