//! Canonical records persisted by the pipeline
//!
//! Every record is an independent top-level document. Bookkeeping fields
//! (`createdAt`, `modifiedAt`, `schema`, flags) are stamped by the store, not
//! carried here.

use crate::core::asset::AssetClass;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundSummary {
    pub ticker: String,
    pub port_id: String,
    pub name: String,
    /// Raw asset code as reported by the fund list; unknown codes are kept.
    pub asset_code: String,
    pub currency: String,
    pub issue_type: String,
    pub product_type: String,
    pub management_fee: f64,
    pub mer_fee: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundOverview {
    pub port_id: String,
    pub ticker: String,
    pub asset_class: String,
    pub strategy: String,
    pub dividend_schedule: String,
    pub name: String,
    pub currency: String,
    pub isin: String,
    pub sedol: String,
    pub total_assets: f64,
    #[serde(rename = "yield12Month")]
    pub yield_12_month: f64,
    pub price: f64,
    pub management_fee: f64,
    pub mer_fee: f64,
    pub dist_yield: f64,
    pub allocation_stock: f64,
    pub allocation_bond: f64,
    pub allocation_cash: f64,
    pub sectors: Vec<SectorBreakdown>,
    pub countries: Vec<CountryBreakdown>,
    pub dividend_history: Vec<DividendHistoryEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectorBreakdown {
    pub sector_code: String,
    pub sector_name: String,
    pub sector_type: String,
    pub fund_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryBreakdown {
    pub country_code: String,
    pub country_name: String,
    pub fund_mkt_percent: f64,
    pub fund_tna_percent: f64,
    pub holding_stat_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DividendHistoryEntry {
    pub amount: f64,
    pub currency_code: String,
    pub as_of_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundHolding {
    pub port_id: String,
    pub ticker: String,
    pub asset_code: AssetClass,
    pub bond_holding: Vec<BondPosition>,
    pub stock_holding: Vec<StockPosition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BondPosition {
    pub face_amount: f64,
    pub market_value: f64,
    pub market_val_percent: f64,
    pub rate: f64,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockPosition {
    pub symbol: String,
    pub market_value: f64,
    pub market_val_percent: f64,
    pub shares: f64,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundDistribution {
    pub port_id: String,
    pub ticker: String,
    pub distribution_histories: Vec<DistributionEvent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub distribution_amount: f64,
    pub ex_dividend_date: Option<DateTime<Utc>>,
    pub record_date: Option<DateTime<Utc>>,
    pub payable_date: Option<DateTime<Utc>>,
    pub dist_desc: String,
    pub dist_code: String,
}
