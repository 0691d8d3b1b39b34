//! Read-side projections over the runner store: per-runner lap statistics,
//! best-lap and pace flags, the cross-runner lap series behind the chart and
//! the filtered/sorted split log.
//!
//! Everything here is a pure function of the store snapshot it is given.

use std::collections::HashMap;

use itertools::Itertools;

use crate::ranking::standings;
use crate::runner::{Runner, RunnerId, RunnerStore, Split};
use crate::util::{mean_ms, std_dev_ms};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LapStats {
    pub min_lap: u64,
    pub avg_lap: f64,
    pub std_dev: f64,
    pub lap_count: usize,
}

/// `None` for a runner without splits.
pub fn runner_stats(runner: &Runner) -> Option<LapStats> {
    let laps: Vec<u64> = runner.splits().iter().map(|s| s.lap).collect();
    let min_lap = *laps.iter().min()?;
    Some(LapStats {
        min_lap,
        avg_lap: mean_ms(&laps)?,
        std_dev: std_dev_ms(&laps)?,
        lap_count: laps.len(),
    })
}

pub fn stats_by_runner(store: &RunnerStore) -> HashMap<RunnerId, LapStats> {
    store
        .runners()
        .iter()
        .filter_map(|r| runner_stats(r).map(|s| (r.id, s)))
        .collect()
}

/// The finish lap is never a best lap, even when it is the shortest.
pub fn is_best_lap(split: &Split, stats: &LapStats) -> bool {
    !split.is_finish && split.lap == stats.min_lap
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Pace {
    #[strum(to_string = "on pace")]
    OnPace,
    #[strum(to_string = "off pace")]
    OffPace,
}

/// A target of 0 means no target. Finish laps are never classified.
pub fn classify_pace(split: &Split, target_ms: u64) -> Option<Pace> {
    if target_ms == 0 || split.is_finish {
        return None;
    }
    Some(if split.lap <= target_ms {
        Pace::OnPace
    } else {
        Pace::OffPace
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunnerFilter {
    #[default]
    All,
    Only(RunnerId),
}

impl RunnerFilter {
    pub fn admits(&self, id: RunnerId) -> bool {
        match self {
            RunnerFilter::All => true,
            RunnerFilter::Only(only) => *only == id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum_macros::Display)]
pub enum SortMode {
    /// by runner, then lap number
    #[default]
    Grouped,
    /// most recent split first
    Chronological,
}

impl SortMode {
    pub fn toggled(self) -> Self {
        match self {
            SortMode::Grouped => SortMode::Chronological,
            SortMode::Chronological => SortMode::Grouped,
        }
    }
}

/// One chart x-position: lap `lap` and every runner that has one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LapPoint {
    pub lap: u32,
    pub values: Vec<(RunnerId, u64)>,
}

impl LapPoint {
    pub fn value_for(&self, id: RunnerId) -> Option<u64> {
        self.values.iter().find(|(r, _)| *r == id).map(|&(_, v)| v)
    }
}

/// Lap durations indexed by lap number across runners. A runner without a
/// split at some lap contributes nothing there; that is a gap, not a zero.
pub fn lap_series(store: &RunnerStore, filter: RunnerFilter) -> Vec<LapPoint> {
    let runners: Vec<&Runner> = store
        .runners()
        .iter()
        .filter(|r| filter.admits(r.id))
        .collect();
    let max_laps = runners.iter().map(|r| r.splits().len()).max().unwrap_or(0);

    (1..=max_laps)
        .map(|lap| LapPoint {
            lap: lap as u32,
            values: runners
                .iter()
                .filter_map(|r| r.splits().get(lap - 1).map(|s| (r.id, s.lap)))
                .collect(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub runner_id: RunnerId,
    pub runner_name: String,
    pub rank: Option<usize>,
    pub split: Split,
    pub best_lap: bool,
    pub pace: Option<Pace>,
}

/// Every split of every admitted runner, flattened and sorted for display.
pub fn split_log(
    store: &RunnerStore,
    filter: RunnerFilter,
    sort: SortMode,
    target_ms: u64,
) -> Vec<LogEntry> {
    let ranks: HashMap<RunnerId, usize> = standings(store)
        .into_iter()
        .map(|s| (s.runner_id, s.rank))
        .collect();

    let entries = store
        .runners()
        .iter()
        .filter(|r| filter.admits(r.id))
        .flat_map(|runner| {
            let stats = runner_stats(runner);
            let rank = ranks.get(&runner.id).copied();
            runner.splits().iter().map(move |split| LogEntry {
                runner_id: runner.id,
                runner_name: runner.name.clone(),
                rank,
                split: split.clone(),
                best_lap: stats.as_ref().is_some_and(|st| is_best_lap(split, st)),
                pace: classify_pace(split, target_ms),
            })
        });

    match sort {
        SortMode::Grouped => entries
            .sorted_by_key(|e| (e.runner_id, e.split.index))
            .collect(),
        SortMode::Chronological => entries
            .sorted_by(|a, b| b.split.total.cmp(&a.split.total))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::splits::DEFAULT_FINISH_THRESHOLD_MS;

    fn split(lap: u64, is_finish: bool) -> Split {
        Split {
            id: 1,
            index: 1,
            total: lap,
            lap,
            is_finish,
        }
    }

    fn two_runner_store() -> RunnerStore {
        let mut store = RunnerStore::new();
        let a = store.add_runner();
        let b = store.add_runner();
        store.record_split(a, 10_000).unwrap();
        store.record_split(b, 12_000).unwrap();
        store.record_split(a, 19_000).unwrap();
        store.record_split(a, 30_000).unwrap();
        store.record_split(b, 25_000).unwrap();
        store
    }

    #[test]
    fn stats_for_runner_with_splits() {
        let mut runner = Runner::new(1, "A");
        runner.record_split(10_000);
        runner.record_split(18_000);
        runner.record_split(30_000);

        let stats = runner_stats(&runner).unwrap();
        assert_eq!(stats.min_lap, 8_000);
        assert_eq!(stats.avg_lap, 10_000.0);
        assert_eq!(stats.lap_count, 3);
        assert!(stats.std_dev > 0.0);
    }

    #[test]
    fn no_stats_without_splits() {
        let store = RunnerStore::with_default_runner();
        assert!(runner_stats(&store.runners()[0]).is_none());
        assert!(stats_by_runner(&store).is_empty());
    }

    #[test]
    fn average_includes_the_finish_lap() {
        let mut runner = Runner::new(1, "A");
        runner.record_split(10_000);
        runner.finish(14_000, DEFAULT_FINISH_THRESHOLD_MS).unwrap();

        let stats = runner_stats(&runner).unwrap();
        assert_eq!(stats.min_lap, 4_000);
        assert_eq!(stats.avg_lap, 7_000.0);
    }

    #[test]
    fn finish_lap_is_never_best() {
        let mut runner = Runner::new(1, "A");
        runner.record_split(10_000);
        runner.finish(14_000, DEFAULT_FINISH_THRESHOLD_MS).unwrap();
        let stats = runner_stats(&runner).unwrap();

        let flags: Vec<bool> = runner
            .splits()
            .iter()
            .map(|s| is_best_lap(s, &stats))
            .collect();
        assert_eq!(flags, vec![false, false]);
    }

    #[test]
    fn equal_minimum_laps_are_all_best() {
        let mut runner = Runner::new(1, "A");
        runner.record_split(5_000);
        runner.record_split(12_000);
        runner.record_split(17_000);
        let stats = runner_stats(&runner).unwrap();

        let flags: Vec<bool> = runner
            .splits()
            .iter()
            .map(|s| is_best_lap(s, &stats))
            .collect();
        assert_eq!(flags, vec![true, false, true]);
    }

    #[test]
    fn pace_classification() {
        let target = crate::format::parse_target_pace("01:30");
        assert_eq!(target, 90_000);
        assert_eq!(classify_pace(&split(85_000, false), target), Some(Pace::OnPace));
        assert_eq!(classify_pace(&split(90_000, false), target), Some(Pace::OnPace));
        assert_eq!(classify_pace(&split(95_000, false), target), Some(Pace::OffPace));
        assert_eq!(classify_pace(&split(85_000, true), target), None);
        assert_eq!(classify_pace(&split(85_000, false), 0), None);
    }

    #[test]
    fn lap_series_leaves_gaps_for_short_logs() {
        let store = two_runner_store();
        let series = lap_series(&store, RunnerFilter::All);

        assert_eq!(series.len(), 3);
        assert_eq!(series[0].values, vec![(1, 10_000), (2, 12_000)]);
        assert_eq!(series[1].values, vec![(1, 9_000), (2, 13_000)]);
        assert_eq!(series[2].values, vec![(1, 11_000)]);
        assert_eq!(series[2].value_for(2), None);
    }

    #[test]
    fn lap_series_respects_filter() {
        let store = two_runner_store();
        let series = lap_series(&store, RunnerFilter::Only(2));
        assert_eq!(series.len(), 2);
        assert!(series.iter().all(|p| p.values.len() == 1 && p.values[0].0 == 2));
    }

    #[test]
    fn lap_series_is_empty_without_splits() {
        let store = RunnerStore::with_default_runner();
        assert!(lap_series(&store, RunnerFilter::All).is_empty());
    }

    #[test]
    fn grouped_log_orders_by_runner_then_lap() {
        let store = two_runner_store();
        let log = split_log(&store, RunnerFilter::All, SortMode::Grouped, 0);

        let order: Vec<(RunnerId, u32)> =
            log.iter().map(|e| (e.runner_id, e.split.index)).collect();
        assert_eq!(order, vec![(1, 1), (1, 2), (1, 3), (2, 1), (2, 2)]);
    }

    #[test]
    fn chronological_log_is_most_recent_first() {
        let store = two_runner_store();
        let log = split_log(&store, RunnerFilter::All, SortMode::Chronological, 0);

        let totals: Vec<u64> = log.iter().map(|e| e.split.total).collect();
        assert_eq!(totals, vec![30_000, 25_000, 19_000, 12_000, 10_000]);
    }

    #[test]
    fn filtered_log_keeps_sequence_indices() {
        let store = two_runner_store();
        let log = split_log(&store, RunnerFilter::Only(2), SortMode::Chronological, 0);

        let view: Vec<(RunnerId, u32)> = log.iter().map(|e| (e.runner_id, e.split.index)).collect();
        assert_eq!(view, vec![(2, 2), (2, 1)]);
        assert_eq!(store.get(2).unwrap().splits()[0].index, 1);
    }

    #[test]
    fn log_entries_carry_rank_best_and_pace() {
        let mut store = two_runner_store();
        store
            .finish_runner(2, 40_000, DEFAULT_FINISH_THRESHOLD_MS)
            .unwrap();
        let log = split_log(&store, RunnerFilter::All, SortMode::Grouped, 10_000);

        let a_first = &log[0];
        assert_eq!(a_first.rank, None);
        assert_eq!(a_first.pace, Some(Pace::OnPace));

        let a_second = &log[1];
        assert!(a_second.best_lap);

        let b_finish = log.last().unwrap();
        assert_eq!(b_finish.runner_name, "Runner 2");
        assert_eq!(b_finish.rank, Some(1));
        assert!(b_finish.split.is_finish);
        assert_eq!(b_finish.pace, None);
    }

    #[test]
    fn sort_mode_toggles() {
        assert_eq!(SortMode::Grouped.toggled(), SortMode::Chronological);
        assert_eq!(SortMode::Chronological.toggled(), SortMode::Grouped);
        assert_eq!(SortMode::default().to_string(), "Grouped");
    }
}
