//! Split engine: append, finish, delete-with-recompute and session reset.
//!
//! These operate on runners and the store only. Clock preconditions (is it
//! running, has it started) are checked by [`crate::session::RaceSession`]
//! before it hands a reading down here.

use tracing::debug;

use crate::error::{RaceError, Result};
use crate::runner::{Runner, RunnerId, RunnerStore, Split, SplitId};

/// Laps at or below this many ms are folded into the previous split on finish.
pub const DEFAULT_FINISH_THRESHOLD_MS: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishOutcome {
    /// A new split flagged as the finish was appended.
    Appended,
    /// The existing last split was flagged as the finish.
    MarkedLast,
    /// Nothing to flag: no splits and a near-zero final lap.
    NoSplit,
}

impl Runner {
    pub fn record_split(&mut self, at_ms: u64) -> &Split {
        self.push_split(at_ms, false)
    }

    fn push_split(&mut self, at_ms: u64, is_finish: bool) -> &Split {
        let last = self.last_total();
        let total = at_ms.max(last);
        let split = Split {
            id: self.next_split_id,
            index: self.splits.len() as u32 + 1,
            total,
            lap: total - last,
            is_finish,
        };
        self.next_split_id += 1;
        self.splits.push(split);
        &self.splits[self.splits.len() - 1]
    }

    pub fn finish(&mut self, at_ms: u64, threshold_ms: u64) -> Result<FinishOutcome> {
        if self.is_finished() {
            return Err(RaceError::AlreadyFinished(self.id));
        }

        let lap = at_ms.saturating_sub(self.last_total());
        let outcome = if lap > threshold_ms {
            self.push_split(at_ms, true);
            FinishOutcome::Appended
        } else if let Some(last) = self.splits.last_mut() {
            last.is_finish = true;
            FinishOutcome::MarkedLast
        } else {
            FinishOutcome::NoSplit
        };

        self.final_time = Some(at_ms);
        Ok(outcome)
    }

    /// Removes one split and rewrites `index`/`lap` of everything left.
    /// Totals and the finish state are untouched.
    pub fn delete_split(&mut self, split_id: SplitId) -> Result<Split> {
        let pos = self
            .splits
            .iter()
            .position(|s| s.id == split_id)
            .ok_or(RaceError::SplitNotFound {
                runner: self.id,
                split: split_id,
            })?;
        let removed = self.splits.remove(pos);
        self.recompute();
        Ok(removed)
    }

    pub(crate) fn recompute(&mut self) {
        let mut prev_total = 0;
        for (idx, split) in self.splits.iter_mut().enumerate() {
            split.index = idx as u32 + 1;
            split.lap = split.total.saturating_sub(prev_total);
            prev_total = split.total;
        }
    }

    pub fn reset(&mut self) {
        self.splits.clear();
        self.final_time = None;
    }
}

impl RunnerStore {
    pub fn record_split(&mut self, id: RunnerId, at_ms: u64) -> Result<Split> {
        let split = self.get_mut(id)?.record_split(at_ms).clone();
        debug!(runner = id, index = split.index, total = split.total, lap = split.lap, "split recorded");
        Ok(split)
    }

    pub fn finish_runner(
        &mut self,
        id: RunnerId,
        at_ms: u64,
        threshold_ms: u64,
    ) -> Result<FinishOutcome> {
        let outcome = self.get_mut(id)?.finish(at_ms, threshold_ms)?;
        debug!(runner = id, final_time = at_ms, ?outcome, "runner finished");
        Ok(outcome)
    }

    pub fn delete_split(&mut self, id: RunnerId, split_id: SplitId) -> Result<Split> {
        let removed = self.get_mut(id)?.delete_split(split_id)?;
        debug!(runner = id, split = split_id, "split deleted");
        Ok(removed)
    }

    /// Clears every runner's log and finish state; the runners stay.
    pub fn reset_session(&mut self) {
        for runner in self.runners_mut() {
            runner.reset();
        }
        debug!("session reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn shape(runner: &Runner) -> Vec<(u32, u64, u64, bool)> {
        runner
            .splits()
            .iter()
            .map(|s| (s.index, s.total, s.lap, s.is_finish))
            .collect()
    }

    fn assert_consistent(runner: &Runner) {
        let mut prev = 0;
        for (i, split) in runner.splits().iter().enumerate() {
            assert_eq!(split.index as usize, i + 1);
            assert!(split.total >= prev);
            assert_eq!(split.lap, split.total - prev);
            prev = split.total;
        }
    }

    #[test]
    fn record_split_computes_lap_from_previous_total() {
        let mut runner = Runner::new(1, "A");
        runner.record_split(12_000);
        runner.record_split(20_000);

        assert_eq!(
            shape(&runner),
            vec![(1, 12_000, 12_000, false), (2, 20_000, 8_000, false)]
        );
    }

    #[test]
    fn deleting_first_split_recomputes_the_rest() {
        let mut runner = Runner::new(1, "A");
        let first = runner.record_split(12_000).id;
        runner.record_split(20_000);

        runner.delete_split(first).unwrap();
        assert_eq!(shape(&runner), vec![(1, 20_000, 20_000, false)]);
    }

    #[test]
    fn deleting_a_middle_split_keeps_totals() {
        let mut runner = Runner::new(1, "A");
        runner.record_split(10_000);
        let middle = runner.record_split(25_000).id;
        runner.record_split(31_000);
        runner.record_split(40_000);

        runner.delete_split(middle).unwrap();
        assert_eq!(
            shape(&runner),
            vec![
                (1, 10_000, 10_000, false),
                (2, 31_000, 21_000, false),
                (3, 40_000, 9_000, false)
            ]
        );
        assert_consistent(&runner);
    }

    #[test]
    fn split_ids_are_not_reused_after_delete() {
        let mut runner = Runner::new(1, "A");
        let a = runner.record_split(1_000).id;
        let b = runner.record_split(2_000).id;
        runner.delete_split(b).unwrap();
        let c = runner.record_split(3_000).id;

        assert_ne!(b, c);
        assert!(c > a);
    }

    #[test]
    fn delete_unknown_split_is_not_found() {
        let mut runner = Runner::new(4, "A");
        runner.record_split(1_000);
        assert_matches!(
            runner.delete_split(99),
            Err(RaceError::SplitNotFound { runner: 4, split: 99 })
        );
        assert_eq!(runner.splits().len(), 1);
    }

    #[test]
    fn finish_appends_when_final_lap_is_long_enough() {
        let mut runner = Runner::new(1, "A");
        runner.record_split(30_000);

        let outcome = runner.finish(61_000, DEFAULT_FINISH_THRESHOLD_MS).unwrap();
        assert_eq!(outcome, FinishOutcome::Appended);
        assert_eq!(
            shape(&runner),
            vec![(1, 30_000, 30_000, false), (2, 61_000, 31_000, true)]
        );
        assert_eq!(runner.final_time(), Some(61_000));
    }

    #[test]
    fn finish_marks_last_split_for_micro_laps() {
        let mut runner = Runner::new(1, "A");
        runner.record_split(30_000);

        let outcome = runner.finish(30_080, DEFAULT_FINISH_THRESHOLD_MS).unwrap();
        assert_eq!(outcome, FinishOutcome::MarkedLast);
        assert_eq!(shape(&runner), vec![(1, 30_000, 30_000, true)]);
        assert_eq!(runner.final_time(), Some(30_080));
    }

    #[test]
    fn finish_at_exact_threshold_does_not_append() {
        let mut runner = Runner::new(1, "A");
        runner.record_split(1_000);
        let outcome = runner.finish(1_100, 100).unwrap();
        assert_eq!(outcome, FinishOutcome::MarkedLast);
    }

    #[test]
    fn finish_without_splits_and_tiny_lap_adds_nothing() {
        let mut runner = Runner::new(1, "A");
        let outcome = runner.finish(50, DEFAULT_FINISH_THRESHOLD_MS).unwrap();
        assert_eq!(outcome, FinishOutcome::NoSplit);
        assert!(runner.splits().is_empty());
        assert!(runner.is_finished());
    }

    #[test]
    fn finishing_twice_is_refused_without_changes() {
        let mut runner = Runner::new(2, "A");
        runner.finish(5_000, DEFAULT_FINISH_THRESHOLD_MS).unwrap();
        let before = runner.clone();

        assert_matches!(
            runner.finish(9_000, DEFAULT_FINISH_THRESHOLD_MS),
            Err(RaceError::AlreadyFinished(2))
        );
        assert_eq!(runner, before);
    }

    #[test]
    fn deleting_the_finish_split_keeps_final_time() {
        let mut runner = Runner::new(1, "A");
        runner.record_split(10_000);
        runner.finish(20_000, DEFAULT_FINISH_THRESHOLD_MS).unwrap();
        let finish_id = runner.splits()[1].id;

        runner.delete_split(finish_id).unwrap();
        assert!(runner.is_finished());
        assert_eq!(runner.final_time(), Some(20_000));
        assert_consistent(&runner);
    }

    #[test]
    fn store_operations_report_unknown_runners() {
        let mut store = RunnerStore::with_default_runner();
        assert_matches!(store.record_split(8, 1_000), Err(RaceError::RunnerNotFound(8)));
        assert_matches!(
            store.finish_runner(8, 1_000, DEFAULT_FINISH_THRESHOLD_MS),
            Err(RaceError::RunnerNotFound(8))
        );
        assert_matches!(store.delete_split(8, 1), Err(RaceError::RunnerNotFound(8)));
    }

    #[test]
    fn reset_session_keeps_runners_but_clears_state() {
        let mut store = RunnerStore::new();
        let a = store.add_runner();
        let b = store.add_runner();
        store.record_split(a, 4_000).unwrap();
        store.finish_runner(b, 9_000, DEFAULT_FINISH_THRESHOLD_MS).unwrap();

        store.reset_session();
        assert_eq!(store.len(), 2);
        assert!(store
            .runners()
            .iter()
            .all(|r| r.splits().is_empty() && !r.is_finished() && r.final_time().is_none()));
    }

    #[test]
    fn mixed_operation_sequence_keeps_logs_consistent() {
        let mut runner = Runner::new(1, "A");
        let mut ids = Vec::new();
        for t in [3_000, 7_500, 7_500, 12_000, 19_250, 25_000] {
            ids.push(runner.record_split(t).id);
            assert_consistent(&runner);
        }
        for id in [ids[2], ids[0], ids[5]] {
            runner.delete_split(id).unwrap();
            assert_consistent(&runner);
        }
        runner.finish(30_000, DEFAULT_FINISH_THRESHOLD_MS).unwrap();
        assert_consistent(&runner);

        let totals: Vec<u64> = runner.splits().iter().map(|s| s.total).collect();
        assert_eq!(totals, vec![7_500, 12_000, 19_250, 30_000]);
    }
}
