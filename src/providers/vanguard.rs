//! Vanguard Canada dataset endpoints and their payload shapes
//!
//! Payload types mirror the provider JSON loosely: every field is optional and
//! numeric values are captured as raw text so the normalizer decides how to
//! treat values that fail to parse.

use crate::core::AssetClass;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;

const DATASETS_PATH: &str = "/rs/gre/gra/1.7.0/datasets";

/// Builds request URLs for every scrape stage.
#[derive(Debug, Clone)]
pub struct Endpoints {
    base_url: String,
    issue_type: String,
}

impl Endpoints {
    pub fn new(base_url: &str, issue_type: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            issue_type: issue_type.to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn fund_list_url(&self) -> String {
        format!(
            "{}{}/caw-indv-listview-data-en.json",
            self.base_url, DATASETS_PATH
        )
    }

    pub fn overview_url(&self, port_id: &str) -> String {
        format!(
            "{}{}/caw-indv-overview-data-etf.json?vars=portId:{port_id},lang:en&path=[portId={port_id}][0]",
            self.base_url, DATASETS_PATH
        )
    }

    pub fn holding_url(&self, port_id: &str, asset_class: AssetClass) -> String {
        format!(
            "{}{}/{}.json?vars=portId:{},issueType:{}",
            self.base_url,
            DATASETS_PATH,
            asset_class.holding_dataset(),
            port_id,
            self.issue_type
        )
    }

    pub fn distribution_url(&self, port_id: &str) -> String {
        format!(
            "{}{}/caw-indv-price-distribution.json?vars=portId:{},issueType:{}",
            self.base_url, DATASETS_PATH, port_id, self.issue_type
        )
    }
}

/// Accepts a JSON string or number and keeps it as text.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(other) => Some(other.to_string()),
    })
}

#[derive(Debug, Default, Deserialize)]
pub struct FundListPayload {
    #[serde(rename = "fundData", default)]
    pub funds: BTreeMap<String, RawFund>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct RawFund {
    #[serde(rename = "TICKER", deserialize_with = "lenient_text")]
    pub ticker: Option<String>,
    #[serde(rename = "assetCode", deserialize_with = "lenient_text")]
    pub asset_code: Option<String>,
    #[serde(rename = "parentLongName", deserialize_with = "lenient_text")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub currency: Option<String>,
    #[serde(rename = "issueTypeCode", deserialize_with = "lenient_text")]
    pub issue_type_code: Option<String>,
    #[serde(rename = "portId", deserialize_with = "lenient_text")]
    pub port_id: Option<String>,
    #[serde(rename = "productType", deserialize_with = "lenient_text")]
    pub product_type: Option<String>,
    #[serde(rename = "managementFee", deserialize_with = "lenient_text")]
    pub management_fee: Option<String>,
    #[serde(rename = "merValue", deserialize_with = "lenient_text")]
    pub mer_value: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawOverview {
    #[serde(deserialize_with = "lenient_text")]
    pub port_id: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub asset_class: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub strategy: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub total_assets: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub dividend_schedule: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub short_name: Option<String>,
    #[serde(rename = "yield12Month", deserialize_with = "lenient_text")]
    pub yield_12_month: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub price: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub base_currency: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub management_fee: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub mer_value: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub dist_yield: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub allocation_stock: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub allocation_bond: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub allocation_cash: Option<String>,
    pub fund_codes_data: Option<RawFundCodes>,
    pub sector_weighting: Vec<RawSectorWeighting>,
    pub country_exposure: Vec<RawCountryExposure>,
    pub dist_history: Vec<RawDividend>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawFundCodes {
    #[serde(deserialize_with = "lenient_text")]
    pub isin: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub sedol: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub exchange_ticker: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawSectorWeighting {
    #[serde(deserialize_with = "lenient_text")]
    pub fund_percent: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub benchmark_percent: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub long_name: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub sector_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawCountryExposure {
    #[serde(deserialize_with = "lenient_text")]
    pub country_name: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub fund_mkt_percent: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub fund_tna_percent: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub holding_stat_code: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawDividend {
    #[serde(deserialize_with = "lenient_text")]
    pub amount: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub currency_code: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub as_of_date: Option<String>,
}

/// Holding response for any asset class; only the wrapper matching the
/// requested class is read.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HoldingPayload {
    pub bond_holding: Vec<HoldingWrapper>,
    pub equity_holding: Vec<HoldingWrapper>,
    pub balanced_holding: Vec<HoldingWrapper>,
}

impl HoldingPayload {
    pub fn wrappers(&self, asset_class: AssetClass) -> &[HoldingWrapper] {
        match asset_class {
            AssetClass::Bond => &self.bond_holding,
            AssetClass::Equity => &self.equity_holding,
            AssetClass::Balanced => &self.balanced_holding,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HoldingWrapper {
    pub sector_weight_bond: Vec<RawBond>,
    pub sector_weight_stock: Vec<RawStock>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawBond {
    #[serde(deserialize_with = "lenient_text")]
    pub face_amount: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub market_val_percent: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub market_value: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub rate: Option<String>,
    #[serde(rename = "type", deserialize_with = "lenient_text")]
    pub kind: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawStock {
    #[serde(deserialize_with = "lenient_text")]
    pub symbol: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub market_val_percent: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub market_value: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub shares: Option<String>,
    #[serde(rename = "type", deserialize_with = "lenient_text")]
    pub kind: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DistributionPayload {
    #[serde(rename = "distributions", default)]
    pub details: RawDistributionDetails,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawDistributionDetails {
    #[serde(deserialize_with = "lenient_text")]
    pub port_id: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub ticker: Option<String>,
    #[serde(rename = "fundDistributionList")]
    pub events: Vec<RawDistributionEvent>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawDistributionEvent {
    #[serde(rename = "type", deserialize_with = "lenient_text")]
    pub kind: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub distribution_amount: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub ex_dividend_date: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub record_date: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub payable_date: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub dist_desc: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub dist_code: Option<String>,
}
