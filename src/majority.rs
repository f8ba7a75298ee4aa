//! Majority vote over a stream of small counts.
//!
//! Per-frame QR counts flicker as codes drift in and out of focus. The
//! tracker keeps the most recent `quorum` values and reports the value seen
//! in more than half of them, so the count a user is told about only changes
//! once the new count has held for a while.

use serde::Serialize;
use std::collections::VecDeque;

/// Outcome of one vote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Vote {
    /// Fewer than `quorum` values registered since the last clear
    NoQuorum,
    /// No value holds a strict majority of the recent values
    NoMajority,
    /// The majority value
    Value(u32),
}

/// Tracks recent small non-negative values and votes on them
#[derive(Debug, Clone)]
pub struct MajorityTracker {
    quorum: usize,
    max_value: u32,
    keep_count: usize,
    recent: VecDeque<u32>,
    tallies: Vec<usize>,
    history: VecDeque<Vote>,
}

impl MajorityTracker {
    /// Vote over the last `quorum` values in `0..=max_value`, remembering
    /// the last `keep_count` votes.
    pub fn new(quorum: usize, max_value: u32, keep_count: usize) -> Self {
        let quorum = quorum.max(1);
        Self {
            quorum,
            max_value,
            keep_count,
            recent: VecDeque::with_capacity(quorum),
            tallies: vec![0; max_value as usize + 1],
            history: VecDeque::with_capacity(keep_count),
        }
    }

    /// Votes needed before a value is reported
    pub fn quorum(&self) -> usize {
        self.quorum
    }

    /// Largest value tracked; larger pushes clamp to it
    pub fn max_value(&self) -> u32 {
        self.max_value
    }

    /// Length of the retained history
    pub fn keep_count(&self) -> usize {
        self.keep_count
    }

    /// Forget all values and votes
    pub fn clear(&mut self) {
        self.recent.clear();
        self.tallies.fill(0);
        self.history.clear();
    }

    /// Register a new value and record the resulting vote.
    ///
    /// Values above `max_value` count as `max_value`.
    pub fn push(&mut self, value: u32) -> Vote {
        let value = value.min(self.max_value);
        if self.recent.len() == self.quorum {
            let old = self.recent.pop_front().unwrap_or(value);
            self.tallies[old as usize] = self.tallies[old as usize].saturating_sub(1);
        }
        self.recent.push_back(value);
        self.tallies[value as usize] += 1;

        let vote = self.vote();
        if self.keep_count > 0 {
            if self.history.len() == self.keep_count {
                self.history.pop_back();
            }
            self.history.push_front(vote);
        }
        vote
    }

    /// Majority of the most recent `quorum` values
    pub fn vote(&self) -> Vote {
        if self.recent.len() < self.quorum {
            return Vote::NoQuorum;
        }
        self.tallies
            .iter()
            .position(|&n| 2 * n > self.quorum)
            .map_or(Vote::NoMajority, |v| Vote::Value(v as u32))
    }

    /// Recorded votes, most recent first
    pub fn votes(&self) -> impl Iterator<Item = Vote> + '_ {
        self.history.iter().copied()
    }
}
