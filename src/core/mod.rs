//! Core types and abstractions shared across the pipeline

pub mod asset;
pub mod fetch;
pub mod log;
pub mod model;

// Re-export main types for cleaner imports
pub use asset::AssetClass;
pub use fetch::{FetchError, Fetcher};
pub use model::{
    BondPosition, CountryBreakdown, DistributionEvent, DividendHistoryEntry, FundDistribution,
    FundHolding, FundOverview, FundSummary, SectorBreakdown, StockPosition,
};
