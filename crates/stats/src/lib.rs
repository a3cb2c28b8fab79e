//! Pairwise campaign significance testing: Welch's t-test over per-day
//! metric samples, one result per campaign pair per metric.

pub mod significance;
pub mod welch;

pub use significance::{
    pairwise_test, run_batch, PairResult, SignificanceReport, SkipReason, SkippedPair,
};
pub use welch::{welch_t_test, WelchTest};
