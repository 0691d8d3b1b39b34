//! Finish order, derived from the store on every call and never cached.

use std::fmt;

use itertools::Itertools;

use crate::runner::{RunnerId, RunnerStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Standing {
    pub runner_id: RunnerId,
    pub rank: usize,
    pub final_time: u64,
}

impl Standing {
    pub fn label(&self) -> RankLabel {
        RankLabel(self.rank)
    }
}

/// Display form of a rank: the podium gets names, everyone else a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankLabel(pub usize);

impl fmt::Display for RankLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            1 => write!(f, "1st Place"),
            2 => write!(f, "2nd Place"),
            3 => write!(f, "3rd Place"),
            n => write!(f, "Position {n}"),
        }
    }
}

/// Finished runners ordered by final time. Equal times keep store order.
pub fn standings(store: &RunnerStore) -> Vec<Standing> {
    store
        .runners()
        .iter()
        .filter_map(|r| r.final_time().map(|t| (r.id, t)))
        .sorted_by_key(|&(_, t)| t)
        .enumerate()
        .map(|(idx, (runner_id, final_time))| Standing {
            runner_id,
            rank: idx + 1,
            final_time,
        })
        .collect()
}

pub fn rank_of(store: &RunnerStore, id: RunnerId) -> Option<Standing> {
    standings(store).into_iter().find(|s| s.runner_id == id)
}
