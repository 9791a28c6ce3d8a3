//! Unattended multi-page survey navigation.
//!
//! The core is a bounded automaton: wait, snapshot the page, classify it,
//! dispatch a per-page answer strategy, advance, repeat until the survey
//! reports completion or the retry budget runs out. It is harness-agnostic:
//! anything able to produce a [`page::PageSnapshot`] and activate elements
//! through [`page::PageDriver`] can drive it, whether that is an in-page
//! script surface or a remote-controlled browser.

pub mod classify;
pub mod config;
pub mod error;
pub mod generators;
pub mod page;
pub mod runner;
pub mod script;
pub mod strategy;

pub use classify::{PageType, classify};
pub use config::{OrderMode, RatingMode, RunConfig};
pub use error::AutomatonError;
pub use page::{PageDriver, PageSnapshot};
pub use runner::{
    BatchReport, CompletionSignal, LoopOptions, Outcome, Playbook, RunReport, run, run_batch,
    run_with_rng,
};
