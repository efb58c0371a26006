//! Attack resolution for miniatures wargame dice combat.
//!
//! [`resolve_attack`] runs one attack through the ordered pipeline against any
//! [`DiceSource`]; [`evaluate`] aggregates many of them, either by seeded
//! sampling or by exact enumeration of pool outcomes.

pub mod aggregate;
pub mod catalog;
pub mod config;
pub mod cover;
pub mod dice;
pub mod error;
pub mod exact;
pub mod pipeline;
pub mod profile;
pub mod sample;

pub use aggregate::{
    AggregateStatistics, Channel, ChannelStats, Efficiency, EvaluateOptions, Evaluator, Mode,
    Source, Tally, evaluate,
};
pub use config::{ContextFormat, parse_context};
pub use cover::determine_cover_value;
pub use dice::{
    AttackColor, AttackFace, DefenseColor, DefenseFace, Dice, DiceSource, DieShifts, ScriptedDice,
};
pub use error::EngineError;
pub use exact::ExactEvaluator;
pub use pipeline::{TrialOutcome, resolve_attack, step_names};
pub use profile::{
    AttackContext, AttackSurge, AttackType, AttackerProfile, CoverCategory, DefenderProfile,
    DefenseSurge, GuardianProfile, RerollStrategy,
};
pub use sample::{CancelToken, Sampler};
