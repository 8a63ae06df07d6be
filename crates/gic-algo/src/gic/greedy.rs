//! Greedy local search for worst-case line polarities.
//!
//! The objective is the total absolute transformer GIC `Σₓ |(HLE · p)ₓ|` for
//! a polarity vector `p ∈ {±1}^lines`. A move flips every line of one flip
//! group (a row of the flip matrix). Each search starts from one distinct
//! transformer sign pattern (a row of signH, zeros read as +1) and takes the
//! best improving move until none is left.
//!
//! The search is local: different seeds may stop at different maxima.
//!
//! Flip groups are the signH equivalence groups of [`GicCorners`]: lines
//! whose transformer sign patterns are identical or exactly negated. They
//! stand in for a magnitude-ordering rule that groups lines whose sorted
//! |HLE| columns tie. Such ties between lines that share a sign pattern land
//! in one signH group, so every tie group is inside a flip group. Lines with
//! equal magnitudes but different sign patterns stay separate moves. With
//! no ordering pass, greedy moves and corners range over the same
//! per-group polarities.

use super::corners::GicCorners;
use crate::config::GreedyConfig;
use faer::{Mat, MatRef};
use gic_core::GicResult;
use std::collections::HashSet;
use tracing::{debug, info};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// One accepted state of a local search.
#[derive(Debug, Clone, PartialEq)]
pub struct GreedyStep {
    /// Moves taken so far (0 for the seed itself)
    pub step: usize,
    pub loss: f64,
    pub polarity: Vec<f64>,
}

/// Iterator over the accepted states of one local search. Losses are
/// non-decreasing.
pub struct LocalMaxHistory<'a> {
    hle: MatRef<'a, f64>,
    groups: &'a [Vec<usize>],
    config: GreedyConfig,
    polarity: Vec<f64>,
    response: Vec<f64>,
    loss: f64,
    step: usize,
    visited: HashSet<Vec<bool>>,
    started: bool,
    finished: bool,
}

fn total_loss(response: &[f64]) -> f64 {
    response.iter().map(|v| v.abs()).sum()
}

fn signature(polarity: &[f64]) -> Vec<bool> {
    polarity.iter().map(|&p| p > 0.0).collect()
}

impl<'a> LocalMaxHistory<'a> {
    pub fn new(
        hle: MatRef<'a, f64>,
        groups: &'a [Vec<usize>],
        seed: &[f64],
        config: &GreedyConfig,
    ) -> Self {
        let polarity: Vec<f64> = seed.iter().map(|&s| if s < 0.0 { -1.0 } else { 1.0 }).collect();
        let response: Vec<f64> = (0..hle.nrows())
            .map(|x| (0..hle.ncols()).map(|l| hle.read(x, l) * polarity[l]).sum())
            .collect();
        let loss = total_loss(&response);
        let mut visited = HashSet::new();
        visited.insert(signature(&polarity));
        Self {
            hle,
            groups,
            config: config.clone(),
            polarity,
            response,
            loss,
            step: 0,
            visited,
            started: false,
            finished: false,
        }
    }

    /// The state the search currently sits in.
    pub fn current(&self) -> GreedyStep {
        GreedyStep {
            step: self.step,
            loss: self.loss,
            polarity: self.polarity.clone(),
        }
    }

    /// Response after flipping group `g`.
    fn flipped_response(&self, g: usize) -> Vec<f64> {
        let mut out = self.response.clone();
        for &l in &self.groups[g] {
            let p = self.polarity[l];
            for (x, r) in out.iter_mut().enumerate() {
                *r -= 2.0 * self.hle.read(x, l) * p;
            }
        }
        out
    }

    fn flipped_signature(&self, g: usize) -> Vec<bool> {
        let mut sig = signature(&self.polarity);
        for &l in &self.groups[g] {
            sig[l] = !sig[l];
        }
        sig
    }

    /// Best strictly improving move, or with ties accepted the first
    /// equal-loss move into an unvisited state.
    fn choose_move(&self) -> Option<(usize, Vec<f64>, f64)> {
        let threshold = 1e-12 * self.loss.max(1.0);
        let mut best: Option<(usize, Vec<f64>, f64)> = None;
        let mut tie: Option<(usize, Vec<f64>, f64)> = None;

        for g in 0..self.groups.len() {
            let response = self.flipped_response(g);
            let loss = total_loss(&response);
            if loss > self.loss + threshold {
                if best.as_ref().map_or(true, |(_, _, b)| loss > *b) {
                    best = Some((g, response, loss));
                }
            } else if self.config.accept_ties
                && tie.is_none()
                && loss >= self.loss
                && !self.visited.contains(&self.flipped_signature(g))
            {
                tie = Some((g, response, loss));
            }
        }
        best.or(tie)
    }
}

impl Iterator for LocalMaxHistory<'_> {
    type Item = GreedyStep;

    fn next(&mut self) -> Option<GreedyStep> {
        if !self.started {
            self.started = true;
            return Some(self.current());
        }
        if self.finished || self.step >= self.config.max_steps {
            return None;
        }
        let Some((g, response, loss)) = self.choose_move() else {
            self.finished = true;
            return None;
        };
        for &l in &self.groups[g] {
            self.polarity[l] = -self.polarity[l];
        }
        self.response = response;
        self.loss = loss;
        self.step += 1;
        self.visited.insert(signature(&self.polarity));
        Some(self.current())
    }
}

/// Every accepted state of a search from `seed`.
pub fn find_local_max_hist<'a>(
    hle: MatRef<'a, f64>,
    groups: &'a [Vec<usize>],
    seed: &[f64],
    config: &GreedyConfig,
) -> LocalMaxHistory<'a> {
    LocalMaxHistory::new(hle, groups, seed, config)
}

/// The local maximum reached from `seed`.
pub fn find_local_max(
    hle: MatRef<'_, f64>,
    groups: &[Vec<usize>],
    seed: &[f64],
    config: &GreedyConfig,
) -> GreedyStep {
    let history = find_local_max_hist(hle, groups, seed, config);
    let start = history.current();
    history.last().unwrap_or(start)
}

/// Flip matrix (groups × lines): row `g` marks the lines flipped together.
pub fn flip_matrix(groups: &[Vec<usize>], n_lines: usize) -> Mat<f64> {
    let mut m = Mat::zeros(groups.len(), n_lines);
    for (g, members) in groups.iter().enumerate() {
        for &l in members {
            m.write(g, l, 1.0);
        }
    }
    m
}

/// Distinct rows of signH in order of first appearance.
pub fn unique_sign_rows(sign_h: MatRef<'_, f64>) -> Vec<Vec<f64>> {
    let mut seen = HashSet::new();
    let mut rows = Vec::new();
    for x in 0..sign_h.nrows() {
        let row: Vec<f64> = (0..sign_h.ncols()).map(|l| sign_h.read(x, l)).collect();
        let key: Vec<i8> = row.iter().map(|v| v.signum() as i8 * (*v != 0.0) as i8).collect();
        if seen.insert(key) {
            rows.push(row);
        }
    }
    rows
}

/// Per-seed results of [`GicCorners::greedy_search`].
#[derive(Debug, Clone)]
pub struct GreedyOutcome {
    /// Best total loss per seed
    pub losses: Vec<f64>,
    /// Polarity vectors, lines × seeds
    pub polarities: Mat<f64>,
    pub seeds: Vec<Vec<f64>>,
    /// Moves taken per seed
    pub steps: Vec<usize>,
}

impl GreedyOutcome {
    /// Index and loss of the best seed.
    pub fn best(&self) -> Option<(usize, f64)> {
        self.losses
            .iter()
            .copied()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(&b.1))
    }
}

impl GicCorners {
    /// Flip groups as a matrix, built on first call.
    pub fn flip_matrix(&mut self) -> GicResult<&Mat<f64>> {
        let (groups, n_lines) = (&self.groups, self.h.ncols());
        self.flip_matrix
            .get_or_try_build(|| Ok(flip_matrix(groups, n_lines)))
    }

    /// Run one local search per distinct signH row.
    pub fn greedy_search(&mut self, verbose: bool) -> GicResult<GreedyOutcome> {
        let flips = self.flip_matrix()?;
        let groups: Vec<Vec<usize>> = (0..flips.nrows())
            .map(|g| (0..flips.ncols()).filter(|&l| flips.read(g, l) != 0.0).collect())
            .collect();

        let seeds = unique_sign_rows(self.sign_h.as_ref());
        let hle = self.hle.as_ref();
        let config = &self.config.greedy;
        let run = |seed: &Vec<f64>| find_local_max(hle, &groups, seed, config);

        #[cfg(feature = "rayon")]
        let results: Vec<GreedyStep> = seeds.par_iter().map(run).collect();
        #[cfg(not(feature = "rayon"))]
        let results: Vec<GreedyStep> = seeds.iter().map(run).collect();

        if verbose {
            for (i, r) in results.iter().enumerate() {
                info!(seed = i, loss = r.loss, steps = r.step, "local maximum");
            }
        }

        let n_lines = self.h.ncols();
        let polarities = Mat::from_fn(n_lines, results.len(), |l, s| results[s].polarity[l]);
        let outcome = GreedyOutcome {
            losses: results.iter().map(|r| r.loss).collect(),
            steps: results.iter().map(|r| r.step).collect(),
            polarities,
            seeds,
        };
        if let Some((seed, loss)) = outcome.best() {
            if verbose {
                info!(seeds = outcome.losses.len(), best_seed = seed, loss, "greedy search finished");
            } else {
                debug!(seeds = outcome.losses.len(), loss, "greedy search finished");
            }
        }
        Ok(outcome)
    }
}
