//! Backend Fusion
//!
//! Scorers run once per backend; this module merges their outputs.

pub mod result_combiner;

pub use result_combiner::{BackendWeights, ResultCombiner};
