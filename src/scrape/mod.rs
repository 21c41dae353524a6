//! Staged fetch pipeline for the fund datasets

pub mod orchestrator;
pub mod queue;
pub mod report;

pub use orchestrator::{FundContext, FundScraper};
pub use queue::{FetchQueue, QueueError, QueueState};
pub use report::{ScrapeReport, StageStats};
