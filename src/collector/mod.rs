//! Collector loop.
//!
//! A single background task drives every poll, so classification, gauge
//! writes and label reconciliation never run concurrently. Each cycle moves
//! through [`CyclePhase`]s:
//!
//! ```text
//! Idle → Fetching → Processing → Publishing → Idle
//!          │ no devices                        ↑
//!          └───────────────────────────────────┘
//! ```
//!
//! An empty or failed fetch only updates the scrape-status gauges. A failed
//! transient API call must not wipe every series.

mod cycle;
mod task;

pub use cycle::{Collector, CycleOutcome, CyclePhase, CycleSummary, MAX_REAUTH_RETRIES};
pub use task::CollectorHandle;
