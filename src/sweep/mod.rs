//! Sweep orchestration
//!
//! This module contains the control loop that walks every enabled
//! (keyword, provider) pair, dedups observed results against the stores,
//! settles liveness verdicts, and contains failures so one poisoned pair can
//! never stall the whole sweep.

mod failure;
mod orchestrator;

pub use failure::FailureTracker;
pub use orchestrator::{build_adapters, Orchestrator, PairOutcome, RunOutcome, RunSummary};
