//! Batch flows built from the inbox, fetch, storage and summarize stages.

mod dedup;
mod distill;
mod import;
mod outcome;

pub use dedup::NameDedup;
pub use distill::{DistillReport, DistillRunner};
pub use import::{ImportReport, ImportRunner};
pub use outcome::{CandidateOutcome, DistillOutcome};
