use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::info_span;

use crate::error::EngineError;
use crate::exact::ExactEvaluator;
use crate::pipeline::TrialOutcome;
use crate::profile::AttackContext;
use crate::sample::Sampler;

pub const DEFAULT_ITERATIONS: u32 = 20_000;

/// Weighted wound counts: `weights[x]` is the mass at `x` wounds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Histogram {
    weights: Vec<f64>,
}

impl Histogram {
    pub fn add(&mut self, wounds: u32, weight: f64) {
        let idx = wounds as usize;
        if self.weights.len() <= idx {
            self.weights.resize(idx + 1, 0.0);
        }
        self.weights[idx] += weight;
    }

    /// Elementwise sum.
    pub fn merge(mut self, other: Histogram) -> Histogram {
        if self.weights.len() < other.weights.len() {
            self.weights.resize(other.weights.len(), 0.0);
        }
        for (mine, theirs) in self.weights.iter_mut().zip(other.weights) {
            *mine += theirs;
        }
        self
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn total(&self) -> f64 {
        self.weights.iter().sum()
    }

    pub fn stats(&self) -> ChannelStats {
        let total = self.total();
        if total <= 0.0 {
            return ChannelStats::default();
        }
        let support: Vec<usize> = (0..self.weights.len())
            .filter(|&x| self.weights[x] > 0.0)
            .collect();
        let (Some(&min), Some(&max)) = (support.first(), support.last()) else {
            return ChannelStats::default();
        };

        let pmf: Vec<f64> = self.weights[..=max].iter().map(|w| w / total).collect();
        let mean: f64 = pmf.iter().enumerate().map(|(x, p)| x as f64 * p).sum();
        let variance: f64 = pmf
            .iter()
            .enumerate()
            .map(|(x, p)| (x as f64 - mean).powi(2) * p)
            .sum();

        let mut at_least = vec![0.0; pmf.len()];
        let mut tail = 0.0;
        for x in (0..pmf.len()).rev() {
            tail += pmf[x];
            at_least[x] = tail.min(1.0);
        }

        let mut cumulative = 0.0;
        let mut median = max;
        for (x, p) in pmf.iter().enumerate() {
            cumulative += p;
            if cumulative >= 0.5 - 1e-12 {
                median = x;
                break;
            }
        }

        let mut mode = min;
        for (x, p) in pmf.iter().enumerate() {
            if *p > pmf[mode] {
                mode = x;
            }
        }

        ChannelStats {
            mean,
            median: median as u32,
            mode: mode as u32,
            min: min as u32,
            max: max as u32,
            std_dev: variance.max(0.0).sqrt(),
            pmf,
            at_least,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Defender,
    Guardian,
    Reflection,
    Secondary,
}

impl Channel {
    pub const ALL: [Channel; 4] = [
        Self::Defender,
        Self::Guardian,
        Self::Reflection,
        Self::Secondary,
    ];
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChannelStats {
    pub mean: f64,
    pub median: u32,
    pub mode: u32,
    pub min: u32,
    pub max: u32,
    pub std_dev: f64,
    pub pmf: Vec<f64>,
    /// `at_least[x]` = P(wounds >= x).
    pub at_least: Vec<f64>,
}

/// Running per-channel histograms. Merging is elementwise addition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tally {
    pub defender: Histogram,
    pub guardian: Histogram,
    pub reflection: Histogram,
    pub secondary: Histogram,
    pub suppressed: f64,
    pub weight: f64,
}

impl Tally {
    pub fn record(&mut self, outcome: &TrialOutcome, weight: f64) {
        self.defender.add(outcome.wounds_to_defender, weight);
        self.guardian.add(outcome.wounds_to_guardian, weight);
        self.reflection.add(outcome.reflection_wounds, weight);
        self.secondary.add(outcome.secondary_wounds, weight);
        if outcome.defender_suppressed {
            self.suppressed += weight;
        }
        self.weight += weight;
    }

    pub fn merge(self, other: Tally) -> Tally {
        Tally {
            defender: self.defender.merge(other.defender),
            guardian: self.guardian.merge(other.guardian),
            reflection: self.reflection.merge(other.reflection),
            secondary: self.secondary.merge(other.secondary),
            suppressed: self.suppressed + other.suppressed,
            weight: self.weight + other.weight,
        }
    }

    fn histogram(&self, channel: Channel) -> &Histogram {
        match channel {
            Channel::Defender => &self.defender,
            Channel::Guardian => &self.guardian,
            Channel::Reflection => &self.reflection,
            Channel::Secondary => &self.secondary,
        }
    }

    pub fn statistics(&self, ctx: &AttackContext, source: Source) -> AggregateStatistics {
        let channels: IndexMap<Channel, ChannelStats> = Channel::ALL
            .into_iter()
            .map(|c| (c, self.histogram(c).stats()))
            .collect();
        let suppression_chance = if self.weight > 0.0 {
            self.suppressed / self.weight
        } else {
            0.0
        };
        let mean = channels
            .get(&Channel::Defender)
            .map(|s| s.mean)
            .unwrap_or(0.0);
        AggregateStatistics {
            source,
            efficiency: Efficiency::compute(mean, ctx),
            channels,
            suppression_chance,
        }
    }
}

/// Where the numbers came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Source {
    Sampled { iterations: u32, seed: u64 },
    Exact { paths: u64 },
}

/// Point-efficiency ratios. `NaN` whenever a denominator is zero or a cost is missing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Efficiency {
    pub wounds_per_point: f64,
    pub points_per_wound: f64,
    /// Defender points destroyed per attacker point spent.
    pub value_ratio: f64,
}

fn ratio(num: f64, den: f64) -> f64 {
    if den == 0.0 { f64::NAN } else { num / den }
}

impl Efficiency {
    pub fn compute(mean_wounds: f64, ctx: &AttackContext) -> Self {
        let attacker = ctx.attacker_points.map_or(f64::NAN, f64::from);
        let defender = ctx.defender_points.map_or(f64::NAN, f64::from);
        let health = ctx.defender.health().map_or(0.0, f64::from);
        let per_wound = ratio(defender, health);
        Self {
            wounds_per_point: ratio(mean_wounds, attacker),
            points_per_wound: ratio(attacker, mean_wounds),
            value_ratio: ratio(mean_wounds * per_wound, attacker),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateStatistics {
    pub source: Source,
    pub channels: IndexMap<Channel, ChannelStats>,
    pub suppression_chance: f64,
    pub efficiency: Efficiency,
}

impl AggregateStatistics {
    pub fn channel(&self, channel: Channel) -> Option<&ChannelStats> {
        self.channels.get(&channel)
    }

    pub fn mean_wounds(&self) -> f64 {
        self.channel(Channel::Defender).map_or(0.0, |s| s.mean)
    }
}

/// A way of turning a context into statistics.
pub trait Evaluator {
    fn evaluate(&self, ctx: &AttackContext) -> Result<AggregateStatistics, EngineError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Sample,
    Exact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluateOptions {
    pub mode: Mode,
    pub iterations: Option<u32>,
    pub seed: Option<u64>,
    /// Sampling threads; 0 uses every core.
    pub workers: usize,
    pub max_paths: Option<u64>,
}

/// Evaluate with whichever strategy the options select.
pub fn evaluate(
    ctx: &AttackContext,
    options: &EvaluateOptions,
) -> Result<AggregateStatistics, EngineError> {
    let _span = info_span!("evaluate", mode = ?options.mode).entered();
    match options.mode {
        Mode::Sample => {
            let iterations = options.iterations.unwrap_or(DEFAULT_ITERATIONS);
            if iterations == 0 {
                return Err(EngineError::InvalidOptions(
                    "iterations must be at least 1".to_string(),
                ));
            }
            let seed = options.seed.unwrap_or_else(rand::random);
            Sampler::new(iterations, seed)
                .with_workers(options.workers)
                .evaluate(ctx)
        }
        Mode::Exact => {
            let mut exact = ExactEvaluator::default();
            if let Some(limit) = options.max_paths {
                exact.max_paths = limit;
            }
            exact.evaluate(ctx)
        }
    }
}
