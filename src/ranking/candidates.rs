//! Ranked candidate list with a forward-only cursor.
//!
//! Fallback wants to know "who is next" without ever re-ranking
//! mid-deployment, so the list is immutable once built and the cursor only
//! advances. Both serialize, which is what lets a different process pick up
//! a deployment after a fallback and continue from the same position.

use serde::{Deserialize, Serialize};

use super::score::RankBreakdown;
use super::sources::ProviderMetrics;

/// One provider with its computed rank and the data behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub provider: String,
    /// Lower is better; ties keep first-seen order
    pub rank: f64,
    pub breakdown: RankBreakdown,
    /// Monitoring snapshot the rank was computed from
    pub metrics: ProviderMetrics,
}

/// Immutable ranked candidates plus the attempt cursor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateList {
    candidates: Vec<RankedCandidate>,
    cursor: usize,
}

impl CandidateList {
    /// Sort candidates by rank (stable, so equal ranks keep their
    /// first-seen order) and start the cursor before the first entry.
    pub fn ranked(mut candidates: Vec<RankedCandidate>) -> Self {
        candidates.sort_by(|a, b| a.rank.total_cmp(&b.rank));
        Self {
            candidates,
            cursor: 0,
        }
    }

    /// Whether an untried candidate remains.
    pub fn has_next(&self) -> bool {
        self.cursor < self.candidates.len()
    }

    /// Advance the cursor and return the next candidate, if any.
    pub fn next(&mut self) -> Option<&RankedCandidate> {
        if self.cursor >= self.candidates.len() {
            return None;
        }
        let candidate = &self.candidates[self.cursor];
        self.cursor += 1;
        Some(candidate)
    }

    /// The candidate the cursor last yielded.
    pub fn current(&self) -> Option<&RankedCandidate> {
        if self.cursor == 0 {
            None
        } else {
            self.candidates.get(self.cursor - 1)
        }
    }

    /// Whether `current()` would return a candidate.
    pub fn has_current(&self) -> bool {
        self.cursor > 0
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Candidates not yet yielded.
    pub fn remaining(&self) -> usize {
        self.candidates.len() - self.cursor
    }

    /// Candidates already consumed, the current one included.
    pub fn attempts_consumed(&self) -> usize {
        self.cursor
    }

    /// Full ranked order, independent of the cursor.
    pub fn candidates(&self) -> &[RankedCandidate] {
        &self.candidates
    }
}
