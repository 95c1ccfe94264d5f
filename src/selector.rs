//! Reviewer selection.
//!
//! Pure decision logic: given the eligible candidates, pick reviewers
//! uniformly at random. The random source is always supplied by the
//! caller so tests can seed it.

use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

/// Number of reviewers assigned when a pull request is created.
pub const DEFAULT_REVIEWERS_PER_PR: usize = 2;

/// Reviewer assignment policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssignmentPolicy {
    /// Target reviewer count at creation. Fewer are assigned when the
    /// team does not have enough eligible members.
    pub reviewers_per_pr: usize,
}

impl Default for AssignmentPolicy {
    fn default() -> Self {
        Self {
            reviewers_per_pr: DEFAULT_REVIEWERS_PER_PR,
        }
    }
}

/// Pick up to `desired` distinct reviewers from `candidates`.
///
/// Returns every candidate when there are no more than `desired` of them,
/// otherwise a uniformly random subset of exactly `desired`.
pub fn select_reviewers<R: Rng + ?Sized>(
    candidates: &[String],
    desired: usize,
    rng: &mut R,
) -> Vec<String> {
    let distinct = dedup(candidates);
    if distinct.len() <= desired {
        return distinct;
    }
    distinct.choose_multiple(rng, desired).cloned().collect()
}

/// Pick a single replacement reviewer, if any candidate exists.
pub fn pick_replacement<R: Rng + ?Sized>(candidates: &[String], rng: &mut R) -> Option<String> {
    candidates.choose(rng).cloned()
}

/// Drop every candidate listed in `excluded`.
pub fn exclude(candidates: Vec<String>, excluded: &[String]) -> Vec<String> {
    let excluded: HashSet<&str> = excluded.iter().map(String::as_str).collect();
    candidates
        .into_iter()
        .filter(|c| !excluded.contains(c.as_str()))
        .collect()
}

fn dedup(candidates: &[String]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(candidates.len());
    candidates
        .iter()
        .filter(|c| seen.insert(c.as_str()))
        .cloned()
        .collect()
}
