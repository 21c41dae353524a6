//! Lossy mapping from provider payloads to canonical records
//!
//! Normalization never fails a record. Values that cannot be interpreted are
//! replaced by a default (`0.0`, `None`, or the [`lookup::OTHER_CODE`]
//! sentinel) and reported through [`Diagnostics`], which also logs each
//! problem as a warning.

pub mod lookup;

use crate::core::{
    AssetClass, BondPosition, CountryBreakdown, DistributionEvent, DividendHistoryEntry,
    FundDistribution, FundHolding, FundOverview, FundSummary, SectorBreakdown, StockPosition,
};
use crate::providers::vanguard::{
    DistributionPayload, HoldingPayload, HoldingWrapper, RawBond, RawCountryExposure,
    RawDividend, RawFund, RawOverview, RawSectorWeighting, RawStock,
};
use chrono::{DateTime, NaiveTime, Utc};
use lookup::{LookupTables, OTHER_CODE};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    InvalidNumber,
    InvalidDate,
    UnknownSector,
    UnknownCountry,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldWarning {
    pub kind: WarningKind,
    pub field: String,
    pub raw: String,
}

/// Collects the non-fatal problems met while normalizing one payload.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<FieldWarning>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&mut self, kind: WarningKind, field: &str, raw: &str) {
        match kind {
            WarningKind::InvalidNumber => warn!(field, raw, "Failed to parse number, using 0"),
            WarningKind::InvalidDate => warn!(field, raw, "Failed to parse date, leaving it empty"),
            WarningKind::UnknownSector | WarningKind::UnknownCountry => {
                warn!(field, raw, code = OTHER_CODE, "No code for name, using sentinel")
            }
        }
        self.warnings.push(FieldWarning {
            kind,
            field: field.to_string(),
            raw: raw.to_string(),
        });
    }

    pub fn warnings(&self) -> &[FieldWarning] {
        &self.warnings
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }
}

fn text(value: &Option<String>) -> String {
    value.as_deref().map(str::trim).unwrap_or_default().to_string()
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|v| v.trim().is_empty())
}

/// Parses a numeric string. Absent or blank input is `0.0` without a warning;
/// anything else that is not a finite number is `0.0` with one warning.
pub fn parse_decimal(field: &str, raw: &Option<String>, diagnostics: &mut Diagnostics) -> f64 {
    let Some(value) = raw.as_deref().map(str::trim).filter(|v| !v.is_empty()) else {
        return 0.0;
    };
    match value.parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => {
            diagnostics.record(WarningKind::InvalidNumber, field, value);
            0.0
        }
    }
}

/// Parses an RFC 3339 timestamp and keeps only its calendar day, stamped at
/// midnight UTC. The day is the one written in the timestamp, before any
/// offset conversion.
pub fn parse_day(
    field: &str,
    raw: &Option<String>,
    diagnostics: &mut Diagnostics,
) -> Option<DateTime<Utc>> {
    let value = raw.as_deref().map(str::trim).filter(|v| !v.is_empty())?;
    match DateTime::parse_from_rfc3339(value) {
        Ok(ts) => Some(ts.date_naive().and_time(NaiveTime::MIN).and_utc()),
        Err(_) => {
            diagnostics.record(WarningKind::InvalidDate, field, value);
            None
        }
    }
}

/// Appends the exchange suffix to a provider ticker. Empty stays empty.
pub fn rewrite_ticker(ticker: &str, suffix: &str) -> String {
    if ticker.is_empty() {
        return String::new();
    }
    format!("{ticker}{suffix}")
}

pub struct Normalizer {
    lookups: Arc<LookupTables>,
    ticker_suffix: String,
}

impl Normalizer {
    pub fn new(lookups: Arc<LookupTables>, ticker_suffix: &str) -> Self {
        Self {
            lookups,
            ticker_suffix: ticker_suffix.to_string(),
        }
    }

    pub fn ticker(&self, ticker: &str) -> String {
        rewrite_ticker(ticker, &self.ticker_suffix)
    }

    /// Maps one fund-list entry. Entries without a ticker yield `None`.
    pub fn fund_summary(
        &self,
        port_id: &str,
        raw: &RawFund,
        diagnostics: &mut Diagnostics,
    ) -> Option<FundSummary> {
        if is_blank(&raw.ticker) {
            return None;
        }
        let port_id = if is_blank(&raw.port_id) {
            port_id.to_string()
        } else {
            text(&raw.port_id)
        };

        Some(FundSummary {
            ticker: self.ticker(&text(&raw.ticker)),
            port_id,
            name: text(&raw.name),
            asset_code: text(&raw.asset_code),
            currency: text(&raw.currency),
            issue_type: text(&raw.issue_type_code),
            product_type: text(&raw.product_type),
            management_fee: parse_decimal("fund.managementFee", &raw.management_fee, diagnostics),
            mer_fee: parse_decimal("fund.merValue", &raw.mer_value, diagnostics),
        })
    }

    pub fn overview(&self, raw: &RawOverview, diagnostics: &mut Diagnostics) -> FundOverview {
        let (isin, sedol, exchange_ticker) = raw
            .fund_codes_data
            .as_ref()
            .map(|codes| {
                (
                    text(&codes.isin),
                    text(&codes.sedol),
                    text(&codes.exchange_ticker),
                )
            })
            .unwrap_or_default();

        FundOverview {
            port_id: text(&raw.port_id),
            ticker: self.ticker(&exchange_ticker),
            asset_class: text(&raw.asset_class),
            strategy: text(&raw.strategy),
            dividend_schedule: text(&raw.dividend_schedule),
            name: text(&raw.short_name),
            currency: text(&raw.base_currency),
            isin,
            sedol,
            total_assets: parse_decimal("overview.totalAssets", &raw.total_assets, diagnostics),
            yield_12_month: parse_decimal(
                "overview.yield12Month",
                &raw.yield_12_month,
                diagnostics,
            ),
            price: parse_decimal("overview.price", &raw.price, diagnostics),
            management_fee: parse_decimal(
                "overview.managementFee",
                &raw.management_fee,
                diagnostics,
            ),
            mer_fee: parse_decimal("overview.merValue", &raw.mer_value, diagnostics),
            dist_yield: parse_decimal("overview.distYield", &raw.dist_yield, diagnostics),
            allocation_stock: parse_decimal(
                "overview.allocationStock",
                &raw.allocation_stock,
                diagnostics,
            ),
            allocation_bond: parse_decimal(
                "overview.allocationBond",
                &raw.allocation_bond,
                diagnostics,
            ),
            allocation_cash: parse_decimal(
                "overview.allocationCash",
                &raw.allocation_cash,
                diagnostics,
            ),
            sectors: raw
                .sector_weighting
                .iter()
                .filter_map(|s| self.sector(s, diagnostics))
                .collect(),
            countries: raw
                .country_exposure
                .iter()
                .filter_map(|c| self.country(c, diagnostics))
                .collect(),
            dividend_history: raw
                .dist_history
                .iter()
                .filter_map(|d| Self::dividend(d, diagnostics))
                .collect(),
        }
    }

    fn sector(
        &self,
        raw: &RawSectorWeighting,
        diagnostics: &mut Diagnostics,
    ) -> Option<SectorBreakdown> {
        let fund_percent = if is_blank(&raw.fund_percent) {
            parse_decimal(
                "sectorWeighting.benchmarkPercent",
                &raw.benchmark_percent,
                diagnostics,
            )
        } else {
            parse_decimal("sectorWeighting.fundPercent", &raw.fund_percent, diagnostics)
        };

        let sector_name = text(&raw.long_name);
        if fund_percent == 0.0 {
            debug!(sector = %sector_name, "Dropping sector with zero weight");
            return None;
        }

        let sector_code = match self.lookups.sector_code(&sector_name) {
            Some(code) => code.to_string(),
            None => {
                diagnostics.record(
                    WarningKind::UnknownSector,
                    "sectorWeighting.longName",
                    &sector_name,
                );
                OTHER_CODE.to_string()
            }
        };

        Some(SectorBreakdown {
            sector_code,
            sector_name,
            sector_type: text(&raw.sector_type),
            fund_percent,
        })
    }

    fn country(
        &self,
        raw: &RawCountryExposure,
        diagnostics: &mut Diagnostics,
    ) -> Option<CountryBreakdown> {
        let country_name = text(&raw.country_name);
        let fund_mkt_percent = parse_decimal(
            "countryExposure.fundMktPercent",
            &raw.fund_mkt_percent,
            diagnostics,
        );
        if !is_blank(&raw.fund_mkt_percent) && fund_mkt_percent == 0.0 {
            debug!(country = %country_name, "Dropping country with zero weight");
            return None;
        }

        let country_code = match self.lookups.country_code(&country_name) {
            Some(code) => code.to_string(),
            None => {
                diagnostics.record(
                    WarningKind::UnknownCountry,
                    "countryExposure.countryName",
                    &country_name,
                );
                OTHER_CODE.to_string()
            }
        };

        Some(CountryBreakdown {
            country_code,
            country_name,
            fund_mkt_percent,
            fund_tna_percent: parse_decimal(
                "countryExposure.fundTnaPercent",
                &raw.fund_tna_percent,
                diagnostics,
            ),
            holding_stat_code: text(&raw.holding_stat_code),
        })
    }

    fn dividend(raw: &RawDividend, diagnostics: &mut Diagnostics) -> Option<DividendHistoryEntry> {
        let amount = parse_decimal("distHistory.amount", &raw.amount, diagnostics);
        if amount == 0.0 {
            return None;
        }

        Some(DividendHistoryEntry {
            amount,
            currency_code: text(&raw.currency_code),
            as_of_date: parse_day("distHistory.asOfDate", &raw.as_of_date, diagnostics),
        })
    }

    /// Builds the holding record for one fund. Only the first wrapper of the
    /// asset class is read; an empty wrapper list yields empty positions.
    pub fn holding(
        &self,
        port_id: &str,
        ticker: &str,
        asset_class: AssetClass,
        payload: &HoldingPayload,
        diagnostics: &mut Diagnostics,
    ) -> FundHolding {
        let wrappers = payload.wrappers(asset_class);
        if wrappers.len() > 1 {
            debug!(
                port_id,
                count = wrappers.len(),
                "Ignoring extra holding wrappers"
            );
        }

        let (bond_holding, stock_holding) = match wrappers.first() {
            Some(wrapper) => Self::positions(asset_class, wrapper, diagnostics),
            None => (Vec::new(), Vec::new()),
        };

        FundHolding {
            port_id: port_id.to_string(),
            ticker: self.ticker(ticker),
            asset_code: asset_class,
            bond_holding,
            stock_holding,
        }
    }

    fn positions(
        asset_class: AssetClass,
        wrapper: &HoldingWrapper,
        diagnostics: &mut Diagnostics,
    ) -> (Vec<BondPosition>, Vec<StockPosition>) {
        match asset_class {
            AssetClass::Bond => (
                wrapper
                    .sector_weight_bond
                    .iter()
                    .map(|b| Self::bond(b, Some("BOND"), diagnostics))
                    .collect(),
                Vec::new(),
            ),
            AssetClass::Equity => (
                Vec::new(),
                wrapper
                    .sector_weight_stock
                    .iter()
                    .map(|s| Self::stock(s, Some("STOCK"), diagnostics))
                    .collect(),
            ),
            AssetClass::Balanced => (
                wrapper
                    .sector_weight_bond
                    .iter()
                    .map(|b| Self::bond(b, None, diagnostics))
                    .collect(),
                wrapper
                    .sector_weight_stock
                    .iter()
                    .map(|s| Self::stock(s, None, diagnostics))
                    .collect(),
            ),
        }
    }

    /// `kind` overrides the source type tag when given.
    fn bond(raw: &RawBond, kind: Option<&str>, diagnostics: &mut Diagnostics) -> BondPosition {
        BondPosition {
            face_amount: parse_decimal("sectorWeightBond.faceAmount", &raw.face_amount, diagnostics),
            market_value: parse_decimal(
                "sectorWeightBond.marketValue",
                &raw.market_value,
                diagnostics,
            ),
            market_val_percent: parse_decimal(
                "sectorWeightBond.marketValPercent",
                &raw.market_val_percent,
                diagnostics,
            ),
            rate: parse_decimal("sectorWeightBond.rate", &raw.rate, diagnostics),
            kind: kind.map_or_else(|| text(&raw.kind), str::to_string),
        }
    }

    fn stock(raw: &RawStock, kind: Option<&str>, diagnostics: &mut Diagnostics) -> StockPosition {
        StockPosition {
            symbol: text(&raw.symbol),
            market_value: parse_decimal(
                "sectorWeightStock.marketValue",
                &raw.market_value,
                diagnostics,
            ),
            market_val_percent: parse_decimal(
                "sectorWeightStock.marketValPercent",
                &raw.market_val_percent,
                diagnostics,
            ),
            shares: parse_decimal("sectorWeightStock.shares", &raw.shares, diagnostics),
            kind: kind.map_or_else(|| text(&raw.kind), str::to_string),
        }
    }

    /// Port id and ticker come from the request that fetched the payload; the
    /// payload's own values are only a fallback.
    pub fn distribution(
        &self,
        port_id: &str,
        ticker: &str,
        payload: &DistributionPayload,
        diagnostics: &mut Diagnostics,
    ) -> FundDistribution {
        let details = &payload.details;
        let port_id = if port_id.is_empty() {
            text(&details.port_id)
        } else {
            port_id.to_string()
        };
        let ticker = if ticker.is_empty() {
            text(&details.ticker)
        } else {
            ticker.to_string()
        };

        FundDistribution {
            port_id,
            ticker: self.ticker(&ticker),
            distribution_histories: details
                .events
                .iter()
                .map(|e| DistributionEvent {
                    kind: text(&e.kind),
                    distribution_amount: parse_decimal(
                        "distribution.distributionAmount",
                        &e.distribution_amount,
                        diagnostics,
                    ),
                    ex_dividend_date: parse_day(
                        "distribution.exDividendDate",
                        &e.ex_dividend_date,
                        diagnostics,
                    ),
                    record_date: parse_day("distribution.recordDate", &e.record_date, diagnostics),
                    payable_date: parse_day(
                        "distribution.payableDate",
                        &e.payable_date,
                        diagnostics,
                    ),
                    dist_desc: text(&e.dist_desc),
                    dist_code: text(&e.dist_code),
                })
                .collect(),
        }
    }
}
