//! Leakage-free pre-contest features for two-sided combat-sport bouts.
//!
//! Raw contest and per-participant stat tables go in; one wide row per
//! contest comes out, holding each side's form as it stood before the bout.

pub mod attributes;
pub mod config;
pub mod derived;
pub mod error;
pub mod export;
pub mod form;
pub mod logging;
pub mod mirror;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod rates;
pub mod rolling;
pub mod store;
pub mod timeline;
pub mod wide;

pub use error::{PipelineError, PipelineResult};
pub use pipeline::{PipelineOutput, PipelineReport, build_feature_table, run};
