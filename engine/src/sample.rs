//! Seeded Monte Carlo sampling over rayon.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::ThreadPool;
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::Dice;
use crate::aggregate::{AggregateStatistics, Evaluator, Source, Tally};
use crate::error::EngineError;
use crate::pipeline::resolve_attack;
use crate::profile::AttackContext;

pub const DEFAULT_CHUNK_SIZE: u32 = 4_096;

/// Shared flag checked between chunks.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Runs `iterations` independent trials. Trial `i` rolls with
/// `Dice::from_seed(seed.wrapping_add(i))`, so the tally does not depend
/// on worker count or chunk size.
#[derive(Debug, Clone)]
pub struct Sampler {
    pub iterations: u32,
    pub seed: u64,
    pub chunk_size: u32,
    /// 0 uses the global rayon pool.
    pub workers: usize,
    pub cancel: CancelToken,
}

impl Sampler {
    pub fn new(iterations: u32, seed: u64) -> Self {
        Self {
            iterations,
            seed,
            chunk_size: DEFAULT_CHUNK_SIZE,
            workers: 0,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: u32) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    fn pool(&self) -> Result<Option<ThreadPool>, EngineError> {
        if self.workers == 0 {
            return Ok(None);
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("sampler-{i}"))
            .build()?;
        Ok(Some(pool))
    }

    fn sample_chunk(&self, ctx: &AttackContext, start: u32, end: u32) -> Tally {
        (start..end)
            .into_par_iter()
            .fold(Tally::default, |mut tally, i| {
                let mut dice = Dice::from_seed(self.seed.wrapping_add(u64::from(i)));
                tally.record(&resolve_attack(ctx, &mut dice), 1.0);
                tally
            })
            .reduce(Tally::default, Tally::merge)
    }

    /// Sample every trial, calling `progress(done, total)` after each chunk.
    pub fn run_with_progress(
        &self,
        ctx: &AttackContext,
        mut progress: impl FnMut(u32, u32),
    ) -> Result<Tally, EngineError> {
        if self.iterations == 0 {
            return Err(EngineError::InvalidOptions(
                "iterations must be at least 1".to_string(),
            ));
        }
        let pool = self.pool()?;
        let chunk = self.chunk_size.max(1);
        let total = self.iterations;
        info!(iterations = total, seed = self.seed, workers = self.workers, "sampling");

        let mut tally = Tally::default();
        let mut done = 0;
        while done < total {
            if self.cancel.is_cancelled() {
                info!(done, total, "sampling cancelled");
                return Err(EngineError::Cancelled);
            }
            let end = done.saturating_add(chunk).min(total);
            let part = match &pool {
                Some(pool) => pool.install(|| self.sample_chunk(ctx, done, end)),
                None => self.sample_chunk(ctx, done, end),
            };
            tally = tally.merge(part);
            done = end;
            debug!(done, total, "chunk sampled");
            progress(done, total);
        }
        Ok(tally)
    }

    pub fn run(&self, ctx: &AttackContext) -> Result<Tally, EngineError> {
        self.run_with_progress(ctx, |_, _| {})
    }
}

impl Evaluator for Sampler {
    fn evaluate(&self, ctx: &AttackContext) -> Result<AggregateStatistics, EngineError> {
        let tally = self.run(ctx)?;
        Ok(tally.statistics(
            ctx,
            Source::Sampled {
                iterations: self.iterations,
                seed: self.seed,
            },
        ))
    }
}
