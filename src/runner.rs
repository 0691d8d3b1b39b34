//! Runner and split data model plus the ordered runner store.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RaceError, Result};

pub type RunnerId = u32;
pub type SplitId = u64;

/// One recorded lap event.
///
/// `index` and `lap` are derived from the position in the owning log and are
/// rewritten whenever the log changes; `total` never is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Split {
    pub id: SplitId,
    pub index: u32,
    pub total: u64,
    pub lap: u64,
    #[serde(default)]
    pub is_finish: bool,
}

/// A tracked participant.
///
/// Finished-ness is carried by `final_time` alone, so "finished" and "has a
/// final time" cannot disagree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RunnerRecord", into = "RunnerRecord")]
pub struct Runner {
    pub id: RunnerId,
    pub name: String,
    pub(crate) splits: Vec<Split>,
    pub(crate) final_time: Option<u64>,
    pub(crate) next_split_id: SplitId,
}

/// Persisted shape of a runner, with an explicit `finished` flag.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunnerRecord {
    id: RunnerId,
    name: String,
    #[serde(default)]
    splits: Vec<Split>,
    #[serde(default)]
    finished: bool,
    #[serde(default)]
    final_time: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    next_split_id: Option<SplitId>,
}

impl From<RunnerRecord> for Runner {
    fn from(record: RunnerRecord) -> Self {
        let mut splits = record.splits;
        splits.sort_by_key(|s| s.total);
        let next_split_id = splits
            .iter()
            .map(|s| s.id + 1)
            .chain(record.next_split_id)
            .max()
            .unwrap_or(1);
        let final_time = match (record.finished, record.final_time) {
            (true, Some(t)) => Some(t),
            _ => None,
        };

        let mut runner = Runner {
            id: record.id,
            name: record.name,
            splits,
            final_time,
            next_split_id,
        };
        runner.recompute();
        runner
    }
}

impl From<Runner> for RunnerRecord {
    fn from(runner: Runner) -> Self {
        RunnerRecord {
            id: runner.id,
            name: runner.name,
            splits: runner.splits,
            finished: runner.final_time.is_some(),
            final_time: runner.final_time,
            next_split_id: Some(runner.next_split_id),
        }
    }
}

impl Runner {
    pub fn new(id: RunnerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            splits: Vec::new(),
            final_time: None,
            next_split_id: 1,
        }
    }

    pub fn splits(&self) -> &[Split] {
        &self.splits
    }

    pub fn is_finished(&self) -> bool {
        self.final_time.is_some()
    }

    pub fn final_time(&self) -> Option<u64> {
        self.final_time
    }

    pub fn last_total(&self) -> u64 {
        self.splits.last().map_or(0, |s| s.total)
    }

    pub fn find_split(&self, split_id: SplitId) -> Option<&Split> {
        self.splits.iter().find(|s| s.id == split_id)
    }
}

pub fn default_name(id: RunnerId) -> String {
    format!("Runner {id}")
}

/// Ordered collection of runners. Order is insertion order and is what
/// "stable" means for ranking ties and grouped views.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunnerStore {
    runners: Vec<Runner>,
}

impl RunnerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The start-of-day store: a single default runner.
    pub fn with_default_runner() -> Self {
        let mut store = Self::new();
        store.add_runner();
        store
    }

    pub fn from_runners(runners: Vec<Runner>) -> Self {
        Self { runners }
    }

    pub fn runners(&self) -> &[Runner] {
        &self.runners
    }

    pub(crate) fn runners_mut(&mut self) -> std::slice::IterMut<'_, Runner> {
        self.runners.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.runners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runners.is_empty()
    }

    pub fn get(&self, id: RunnerId) -> Result<&Runner> {
        self.runners
            .iter()
            .find(|r| r.id == id)
            .ok_or(RaceError::RunnerNotFound(id))
    }

    pub fn get_mut(&mut self, id: RunnerId) -> Result<&mut Runner> {
        self.runners
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(RaceError::RunnerNotFound(id))
    }

    /// One more than the highest live id, or 1 for an empty store. Once the
    /// highest id is `RunnerId::MAX` the lowest unused id is handed out.
    pub fn next_id(&self) -> RunnerId {
        match self.runners.iter().map(|r| r.id).max() {
            None => 1,
            Some(max) => max.checked_add(1).unwrap_or_else(|| self.lowest_free_id()),
        }
    }

    fn lowest_free_id(&self) -> RunnerId {
        (1..=RunnerId::MAX)
            .find(|id| self.runners.iter().all(|r| r.id != *id))
            .unwrap_or(0)
    }

    pub fn add_runner(&mut self) -> RunnerId {
        let id = self.next_id();
        self.runners.push(Runner::new(id, default_name(id)));
        debug!(runner = id, "runner added");
        id
    }

    pub fn add_named(&mut self, name: &str) -> Result<RunnerId> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RaceError::EmptyName);
        }
        let id = self.next_id();
        self.runners.push(Runner::new(id, name));
        debug!(runner = id, name, "runner added");
        Ok(id)
    }

    pub fn rename(&mut self, id: RunnerId, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RaceError::EmptyName);
        }
        self.get_mut(id)?.name = name.to_string();
        Ok(())
    }

    pub fn remove(&mut self, id: RunnerId) -> Result<Runner> {
        let pos = self
            .runners
            .iter()
            .position(|r| r.id == id)
            .ok_or(RaceError::RunnerNotFound(id))?;
        debug!(runner = id, "runner removed");
        Ok(self.runners.remove(pos))
    }

    pub fn clear(&mut self) {
        debug!(count = self.runners.len(), "all runners removed");
        self.runners.clear();
    }

    pub fn all_finished(&self) -> bool {
        !self.runners.is_empty() && self.runners.iter().all(Runner::is_finished)
    }

    pub fn has_splits(&self) -> bool {
        self.runners.iter().any(|r| !r.splits.is_empty())
    }

    pub fn max_log_len(&self) -> usize {
        self.runners.iter().map(|r| r.splits.len()).max().unwrap_or(0)
    }
}
