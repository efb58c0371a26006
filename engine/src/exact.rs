//! Exact evaluation by enumerating every reachable pool outcome.
//!
//! The pipeline is run once per path. [`Enumerator`] answers each pool roll
//! from a recorded choice list, then advances the list like an odometer, so
//! every combination of pool outcomes the pipeline can ask for is visited
//! exactly once with its multinomial weight.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::aggregate::{AggregateStatistics, Evaluator, Source, Tally};
use crate::dice::{AttackColor, AttackFaces, DefenseColor, DefenseFaces, DiceSource};
use crate::error::EngineError;
use crate::pipeline::resolve_attack;
use crate::profile::AttackContext;

pub const DEFAULT_MAX_PATHS: u64 = 2_000_000;

fn binomial(n: u32, k: u32) -> f64 {
    let k = k.min(n - k);
    (0..k).fold(1.0, |acc, i| acc * f64::from(n - i) / f64::from(i + 1))
}

/// Probability of a particular face split for `counts.iter().sum()` dice.
fn multinomial(weights: &[u32], sides: u32, counts: &[u32]) -> f64 {
    let mut remaining: u32 = counts.iter().sum();
    let mut p = 1.0;
    for (&w, &k) in weights.iter().zip(counts) {
        p *= binomial(remaining, k) * (f64::from(w) / f64::from(sides)).powi(k as i32);
        remaining -= k;
    }
    p
}

pub fn attack_outcomes(color: AttackColor, n: u32) -> Vec<(AttackFaces, f64)> {
    let weights = color.faces();
    let sides: u32 = weights.iter().sum();
    let mut out = Vec::new();
    for blank in 0..=n {
        for hit in 0..=n - blank {
            for crit in 0..=n - blank - hit {
                let surge = n - blank - hit - crit;
                let faces = AttackFaces { blank, hit, crit, surge };
                let p = multinomial(&weights, sides, &[blank, hit, crit, surge]);
                out.push((faces, p));
            }
        }
    }
    out
}

pub fn defense_outcomes(color: DefenseColor, n: u32) -> Vec<(DefenseFaces, f64)> {
    let weights = color.faces();
    let sides: u32 = weights.iter().sum();
    let mut out = Vec::new();
    for blank in 0..=n {
        for block in 0..=n - blank {
            let surge = n - blank - block;
            let faces = DefenseFaces { blank, block, surge };
            let p = multinomial(&weights, sides, &[blank, block, surge]);
            out.push((faces, p));
        }
    }
    out
}

/// Branch point on the current path: (chosen outcome, number of outcomes).
type Branch = (usize, usize);

#[derive(Debug, Default)]
pub struct Enumerator {
    path: Vec<Branch>,
    cursor: usize,
    weight: f64,
    attack_cache: HashMap<(AttackColor, u32), Vec<(AttackFaces, f64)>>,
    defense_cache: HashMap<(DefenseColor, u32), Vec<(DefenseFaces, f64)>>,
}

impl Enumerator {
    pub fn new() -> Self {
        Self {
            weight: 1.0,
            ..Self::default()
        }
    }

    /// Reset for a replay of the current path.
    pub fn begin(&mut self) {
        self.cursor = 0;
        self.weight = 1.0;
    }

    /// Probability of the path just replayed.
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Move to the next unvisited path; false once all are done.
    pub fn advance(&mut self) -> bool {
        while let Some((choice, width)) = self.path.pop() {
            if choice + 1 < width {
                self.path.push((choice + 1, width));
                return true;
            }
        }
        false
    }

    fn draw(&mut self, width: usize) -> usize {
        let choice = match self.path.get(self.cursor) {
            Some(&(choice, _)) => choice,
            None => {
                self.path.push((0, width));
                0
            }
        };
        self.cursor += 1;
        choice
    }
}

impl DiceSource for Enumerator {
    fn roll_attack(&mut self, color: AttackColor, n: u32) -> AttackFaces {
        if n == 0 {
            return AttackFaces::default();
        }
        let width = self
            .attack_cache
            .entry((color, n))
            .or_insert_with(|| attack_outcomes(color, n))
            .len();
        let choice = self.draw(width);
        let Some(&(faces, p)) = self.attack_cache.get(&(color, n)).and_then(|o| o.get(choice))
        else {
            return AttackFaces::default();
        };
        self.weight *= p;
        faces
    }

    fn roll_defense(&mut self, color: DefenseColor, n: u32) -> DefenseFaces {
        if n == 0 {
            return DefenseFaces::default();
        }
        let width = self
            .defense_cache
            .entry((color, n))
            .or_insert_with(|| defense_outcomes(color, n))
            .len();
        let choice = self.draw(width);
        let Some(&(faces, p)) = self.defense_cache.get(&(color, n)).and_then(|o| o.get(choice))
        else {
            return DefenseFaces::default();
        };
        self.weight *= p;
        faces
    }
}

/// Walks the full outcome tree. Fails with `EnumerationLimit` past `max_paths`.
#[derive(Debug, Clone, Copy)]
pub struct ExactEvaluator {
    pub max_paths: u64,
}

impl Default for ExactEvaluator {
    fn default() -> Self {
        Self {
            max_paths: DEFAULT_MAX_PATHS,
        }
    }
}

impl ExactEvaluator {
    pub fn run(&self, ctx: &AttackContext) -> Result<(Tally, u64), EngineError> {
        let mut walker = Enumerator::new();
        let mut tally = Tally::default();
        let mut paths: u64 = 0;
        loop {
            walker.begin();
            let outcome = resolve_attack(ctx, &mut walker);
            paths += 1;
            if paths > self.max_paths {
                info!(limit = self.max_paths, "enumeration limit reached");
                return Err(EngineError::EnumerationLimit {
                    limit: self.max_paths,
                });
            }
            tally.record(&outcome, walker.weight());
            if !walker.advance() {
                break;
            }
        }
        debug!(paths, mass = tally.weight, "enumeration complete");
        Ok((tally, paths))
    }
}

impl Evaluator for ExactEvaluator {
    fn evaluate(&self, ctx: &AttackContext) -> Result<AggregateStatistics, EngineError> {
        let (tally, paths) = self.run(ctx)?;
        Ok(tally.statistics(ctx, Source::Exact { paths }))
    }
}
