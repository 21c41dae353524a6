use crate::config::ScraperConfig;
use crate::core::{AssetClass, Fetcher};
use crate::normalize::{Diagnostics, Normalizer};
use crate::providers::Endpoints;
use crate::providers::vanguard::{
    DistributionPayload, FundListPayload, HoldingPayload, RawOverview,
};
use crate::scrape::queue::FetchQueue;
use crate::scrape::report::ScrapeReport;
use crate::store::RecordWriter;
use anyhow::{Context, Result};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Identity of the fund a dependent request was issued for.
///
/// `ticker` is the provider ticker before the exchange suffix is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FundContext {
    pub port_id: String,
    pub ticker: String,
    pub asset_class: Option<AssetClass>,
}

struct Inner {
    normalizer: Normalizer,
    writer: Arc<dyn RecordWriter>,
    endpoints: Endpoints,
    fund_list: FetchQueue,
    overview: FetchQueue,
    holding: FetchQueue,
    distribution: FetchQueue,
}

/// Drives one scrape cycle: the fund list seeds overview, holding and
/// distribution requests for every fund it names.
pub struct FundScraper {
    inner: Arc<Inner>,
}

impl FundScraper {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        writer: Arc<dyn RecordWriter>,
        normalizer: Normalizer,
        endpoints: Endpoints,
        settings: &ScraperConfig,
    ) -> Self {
        let queue = |stage: &'static str| FetchQueue::new(stage, Arc::clone(&fetcher), settings);
        Self {
            inner: Arc::new(Inner {
                normalizer,
                writer,
                endpoints,
                fund_list: queue("fund_list"),
                overview: queue("overview"),
                holding: queue("holding"),
                distribution: queue("distribution"),
            }),
        }
    }

    /// Fetches the fund list and waits until every stage has drained.
    pub async fn run(&self) -> ScrapeReport {
        let started = Instant::now();
        let inner = &self.inner;
        for queue in inner.queues() {
            queue.open();
        }

        let url = inner.endpoints.fund_list_url();
        info!(url = %url, "Starting scrape");
        let this = Arc::clone(inner);
        if let Err(e) = inner.fund_list.submit(url, (), move |_, body| async move {
            this.handle_fund_list(body).await
        }) {
            error!(error = %e, "Failed to queue fund list request");
        }

        // Each stage only feeds the stages after it, so draining in order
        // leaves nothing behind.
        for queue in inner.queues() {
            queue.wait().await;
            queue.close();
            debug!(stage = queue.stage(), "Stage drained");
        }

        let report = ScrapeReport {
            fund_list: inner.fund_list.counters().snapshot(),
            overview: inner.overview.counters().snapshot(),
            holding: inner.holding.counters().snapshot(),
            distribution: inner.distribution.counters().snapshot(),
            elapsed: started.elapsed(),
        };
        info!(
            failures = report.total_failures(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Scrape finished"
        );
        report
    }

    /// Stores every listed fund and queues dependent requests for each one
    /// that was stored. Returns the number of funds fanned out.
    pub async fn on_fund_list_response(&self, body: &[u8]) -> Result<usize> {
        self.inner.on_fund_list(body).await
    }

    /// Waits for every stage to go idle without closing or reseeding it.
    #[cfg(test)]
    async fn drain(&self) {
        for queue in self.inner.queues() {
            queue.wait().await;
        }
    }

    pub async fn on_overview_response(&self, context: &FundContext, body: &[u8]) -> Result<()> {
        self.inner.on_overview(context, body).await
    }

    pub async fn on_holding_response(&self, context: &FundContext, body: &[u8]) -> Result<()> {
        self.inner.on_holding(context, body).await
    }

    pub async fn on_distribution_response(
        &self,
        context: &FundContext,
        body: &[u8],
    ) -> Result<()> {
        self.inner.on_distribution(context, body).await
    }
}

impl Inner {
    fn queues(&self) -> [&FetchQueue; 4] {
        [
            &self.fund_list,
            &self.overview,
            &self.holding,
            &self.distribution,
        ]
    }

    async fn handle_fund_list(self: Arc<Self>, body: Vec<u8>) {
        match self.on_fund_list(&body).await {
            Ok(count) => info!(funds = count, "Fund list processed"),
            Err(e) => {
                error!(error = %e, "Failed to process fund list");
                self.fund_list.counters().record_skipped();
            }
        }
    }

    async fn on_fund_list(self: &Arc<Self>, body: &[u8]) -> Result<usize> {
        let payload: FundListPayload =
            serde_json::from_slice(body).context("Failed to decode fund list")?;
        let counters = self.fund_list.counters();
        let mut diagnostics = Diagnostics::new();

        let mut funds = Vec::with_capacity(payload.funds.len());
        for (port_id, raw) in &payload.funds {
            match self.normalizer.fund_summary(port_id, raw, &mut diagnostics) {
                Some(summary) => funds.push((port_id, summary, raw)),
                None => debug!(port_id = %port_id, "Skipping fund without ticker"),
            }
        }
        counters.record_warnings(diagnostics.len());

        let results = join_all(
            funds
                .iter()
                .map(|(_, summary, _)| self.writer.upsert_fund(summary)),
        )
        .await;

        let mut fanned_out = 0;
        for ((port_id, summary, raw), result) in funds.iter().zip(results) {
            if let Err(e) = result {
                error!(
                    ticker = %summary.ticker,
                    error = %format!("{e:#}"),
                    "Failed to store fund, not requesting its details"
                );
                counters.record_skipped();
                continue;
            }
            counters.record_persisted();

            let asset_class = summary.asset_code.parse::<AssetClass>().ok();
            if asset_class.is_none() {
                warn!(
                    port_id = %port_id,
                    asset_code = %summary.asset_code,
                    "Unknown asset class, not requesting holdings"
                );
            }
            // Requests are addressed by the fund-list key, whatever the
            // entry's own portId says.
            self.fan_out(FundContext {
                port_id: port_id.to_string(),
                ticker: raw.ticker.as_deref().unwrap_or_default().trim().to_string(),
                asset_class,
            });
            fanned_out += 1;
        }

        Ok(fanned_out)
    }

    fn fan_out(self: &Arc<Self>, context: FundContext) {
        let this = Arc::clone(self);
        let url = self.endpoints.overview_url(&context.port_id);
        if let Err(e) = self.overview.submit(url, context.clone(), move |ctx, body| async move {
            let result = this.on_overview(&ctx, &body).await;
            Self::settle(&this.overview, &ctx, result);
        }) {
            warn!(port_id = %context.port_id, error = %e, "Dropped overview request");
        }

        if let Some(asset_class) = context.asset_class {
            let this = Arc::clone(self);
            let url = self.endpoints.holding_url(&context.port_id, asset_class);
            if let Err(e) = self.holding.submit(url, context.clone(), move |ctx, body| async move {
                let result = this.on_holding(&ctx, &body).await;
                Self::settle(&this.holding, &ctx, result);
            }) {
                warn!(port_id = %context.port_id, error = %e, "Dropped holding request");
            }
        }

        let this = Arc::clone(self);
        let url = self.endpoints.distribution_url(&context.port_id);
        let port_id = context.port_id.clone();
        if let Err(e) = self.distribution.submit(url, context, move |ctx, body| async move {
            let result = this.on_distribution(&ctx, &body).await;
            Self::settle(&this.distribution, &ctx, result);
        }) {
            warn!(port_id = %port_id, error = %e, "Dropped distribution request");
        }
    }

    fn settle(queue: &FetchQueue, context: &FundContext, result: Result<()>) {
        match result {
            Ok(()) => queue.counters().record_persisted(),
            Err(e) => {
                error!(
                    stage = queue.stage(),
                    port_id = %context.port_id,
                    error = %format!("{e:#}"),
                    "Record skipped"
                );
                queue.counters().record_skipped();
            }
        }
    }

    async fn on_overview(&self, context: &FundContext, body: &[u8]) -> Result<()> {
        let raw: RawOverview = serde_json::from_slice(body)
            .with_context(|| format!("Failed to decode overview for {}", context.port_id))?;
        let mut diagnostics = Diagnostics::new();
        let mut overview = self.normalizer.overview(&raw, &mut diagnostics);
        if overview.port_id.is_empty() {
            overview.port_id = context.port_id.clone();
        }
        self.overview.counters().record_warnings(diagnostics.len());

        self.writer.upsert_overview(&overview).await?;
        Ok(())
    }

    async fn on_holding(&self, context: &FundContext, body: &[u8]) -> Result<()> {
        let asset_class = context
            .asset_class
            .with_context(|| format!("No asset class for holding of {}", context.port_id))?;
        let payload: HoldingPayload = serde_json::from_slice(body)
            .with_context(|| format!("Failed to decode holding for {}", context.port_id))?;
        let mut diagnostics = Diagnostics::new();
        let holding = self.normalizer.holding(
            &context.port_id,
            &context.ticker,
            asset_class,
            &payload,
            &mut diagnostics,
        );
        self.holding.counters().record_warnings(diagnostics.len());

        self.writer.upsert_holding(&holding).await?;
        Ok(())
    }

    async fn on_distribution(&self, context: &FundContext, body: &[u8]) -> Result<()> {
        let payload: DistributionPayload = serde_json::from_slice(body)
            .with_context(|| format!("Failed to decode distribution for {}", context.port_id))?;
        let mut diagnostics = Diagnostics::new();
        let distribution = self.normalizer.distribution(
            &context.port_id,
            &context.ticker,
            &payload,
            &mut diagnostics,
        );
        self.distribution
            .counters()
            .record_warnings(diagnostics.len());

        self.writer.upsert_distribution(&distribution).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CollectionsConfig;
    use crate::core::{FetchError, FundDistribution, FundHolding, FundOverview, FundSummary};
    use crate::normalize::lookup::LookupTables;
    use crate::store::{
        DocumentStore, Filter, FundRepository, MemoryDocumentStore, UpsertOutcome,
    };
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    const FUND_LIST: &str = r#"{
        "fundData": {
            "9563": {"TICKER": "VAB", "assetCode": "BOND", "portId": "9563", "managementFee": "0.08"},
            "9564": {"TICKER": "VSB", "assetCode": "BOND", "portId": "9564", "managementFee": "0.10"},
            "9559": {"TICKER": "VCN", "assetCode": "EQUITY", "portId": "9559", "managementFee": "0.05"}
        }
    }"#;

    /// Serves canned bodies by dataset name and records every URL requested.
    struct CannedFetcher {
        fund_list: String,
        failing: Vec<String>,
        requests: Mutex<Vec<String>>,
    }

    impl CannedFetcher {
        fn new(fund_list: &str) -> Self {
            Self {
                fund_list: fund_list.to_string(),
                failing: Vec::new(),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn failing_on(mut self, fragment: &str) -> Self {
            self.failing.push(fragment.to_string());
            self
        }

        fn requests_matching(&self, fragment: &str) -> Vec<String> {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .filter(|u| u.contains(fragment))
                .cloned()
                .collect()
        }
    }

    #[async_trait]
    impl Fetcher for CannedFetcher {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
            self.requests.lock().unwrap().push(url.to_string());
            if self.failing.iter().any(|f| url.contains(f.as_str())) {
                return Err(FetchError::Status {
                    status: 500,
                    url: url.to_string(),
                });
            }

            let body = if url.contains("listview") {
                self.fund_list.clone()
            } else if url.contains("overview") {
                let port_id = url
                    .split("portId:")
                    .nth(1)
                    .and_then(|s| s.split(',').next())
                    .unwrap_or_default();
                json!({
                    "portId": port_id,
                    "totalAssets": "1000.5",
                    "countryExposure": [
                        {"countryName": "Canada", "fundMktPercent": "99.1"},
                        {"countryName": "Japan", "fundMktPercent": "0"}
                    ]
                })
                .to_string()
            } else if url.contains("holding-details-bond") {
                r#"{"bondHolding": [{"sectorWeightBond": [{"faceAmount": 10, "marketValPercent": "1.5"}]}]}"#
                    .to_string()
            } else if url.contains("holding-details-equity") {
                r#"{"equityHolding": [{"sectorWeightStock": [{"symbol": "RY", "shares": 3}]}]}"#
                    .to_string()
            } else if url.contains("price-distribution") {
                r#"{"distributions": {"fundDistributionList": [{"type": "Income", "distributionAmount": "0.05"}]}}"#
                    .to_string()
            } else {
                return Err(FetchError::Status {
                    status: 404,
                    url: url.to_string(),
                });
            };
            Ok(body.into_bytes())
        }
    }

    fn settings() -> ScraperConfig {
        ScraperConfig {
            parallelism: 2,
            min_delay_ms: 0,
            max_delay_ms: 0,
            timeout_secs: 5,
        }
    }

    fn scraper(fetcher: Arc<CannedFetcher>, store: Arc<MemoryDocumentStore>) -> FundScraper {
        let repository = FundRepository::new(store, CollectionsConfig::default(), "1");
        FundScraper::new(
            fetcher,
            Arc::new(repository),
            Normalizer::new(Arc::new(LookupTables::builtin()), ".TO"),
            Endpoints::new("https://api.vanguard.com", "F"),
            &settings(),
        )
    }

    #[tokio::test]
    async fn test_fan_out_per_asset_class() {
        let fetcher = Arc::new(CannedFetcher::new(FUND_LIST));
        let store = Arc::new(MemoryDocumentStore::new());

        let report = scraper(fetcher.clone(), store.clone()).run().await;

        let bond = fetcher.requests_matching("holding-details-bond");
        let equity = fetcher.requests_matching("holding-details-equity");
        assert_eq!(bond.len(), 2);
        assert_eq!(equity.len(), 1);
        assert!(bond.iter().any(|u| u.contains("portId:9563,issueType:F")));
        assert!(bond.iter().any(|u| u.contains("portId:9564,issueType:F")));
        assert!(equity[0].contains("portId:9559,issueType:F"));
        assert_eq!(fetcher.requests_matching("overview-data").len(), 3);
        assert_eq!(fetcher.requests_matching("price-distribution").len(), 3);
        assert_eq!(fetcher.requests_matching("listview").len(), 1);

        assert_eq!(report.fund_list.persisted, 3);
        assert_eq!(report.overview.persisted, 3);
        assert_eq!(report.holding.persisted, 3);
        assert_eq!(report.distribution.persisted, 3);
        assert_eq!(report.total_failures(), 0);

        assert_eq!(store.count("vanguard_fund_list").await, 3);
        assert_eq!(store.count("vanguard_fund_holding").await, 3);

        let holding = store
            .find_one("vanguard_fund_holding", &Filter::new("ticker", "VCN.TO"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(holding["portId"], json!("9559"));
        assert_eq!(holding["assetCode"], json!("EQUITY"));
        assert_eq!(holding["stockHolding"][0]["type"], json!("STOCK"));

        let distribution = store
            .find_one("vanguard_fund_distribution", &Filter::new("portId", "9564"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(distribution["ticker"], json!("VSB.TO"));

        let overview = store
            .find_one("vanguard_fund_overview", &Filter::new("portId", "9563"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(overview["countries"].as_array().unwrap().len(), 1);
        assert_eq!(overview["countries"][0]["countryCode"], json!("CAN"));
    }

    #[tokio::test]
    async fn test_fetch_failure_does_not_abort_siblings() {
        let fetcher =
            Arc::new(CannedFetcher::new(FUND_LIST).failing_on("overview-data-etf.json?vars=portId:9563,"));
        let store = Arc::new(MemoryDocumentStore::new());

        let report = scraper(fetcher.clone(), store.clone()).run().await;

        assert_eq!(report.overview.requested, 3);
        assert_eq!(report.overview.fetch_failed, 1);
        assert_eq!(report.overview.persisted, 2);
        assert_eq!(report.holding.persisted, 3);
        assert_eq!(report.distribution.persisted, 3);
        assert_eq!(store.count("vanguard_fund_overview").await, 2);
        assert_eq!(fetcher.requests_matching("portId:9563,lang").len(), 1);
    }

    #[tokio::test]
    async fn test_failed_fund_list_ends_run() {
        let fetcher = Arc::new(CannedFetcher::new(FUND_LIST).failing_on("listview"));
        let store = Arc::new(MemoryDocumentStore::new());

        let report = scraper(fetcher.clone(), store.clone()).run().await;

        assert_eq!(report.fund_list.fetch_failed, 1);
        assert_eq!(report.overview.requested, 0);
        assert_eq!(fetcher.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_asset_class_skips_holding_request() {
        let fetcher = Arc::new(CannedFetcher::new(
            r#"{"fundData": {
                "1111": {"TICKER": "VMM", "assetCode": "MONEY_MARKET", "portId": "1111"},
                "2222": {"TICKER": " ", "assetCode": "BOND", "portId": "2222"}
            }}"#,
        ));
        let store = Arc::new(MemoryDocumentStore::new());

        let report = scraper(fetcher.clone(), store.clone()).run().await;

        assert!(fetcher.requests_matching("holding-details").is_empty());
        assert_eq!(fetcher.requests_matching("overview-data").len(), 1);
        assert_eq!(fetcher.requests_matching("price-distribution").len(), 1);
        assert_eq!(report.holding.requested, 0);
        assert_eq!(store.count("vanguard_fund_list").await, 1);
        assert!(
            store
                .find_one("vanguard_fund_list", &Filter::new("ticker", "VMM.TO"))
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_balanced_holding_response_stores_both_lists() {
        let store = Arc::new(MemoryDocumentStore::new());
        let scraper = scraper(Arc::new(CannedFetcher::new("{}")), store.clone());
        let context = FundContext {
            port_id: "8350".to_string(),
            ticker: "VBAL".to_string(),
            asset_class: Some(AssetClass::Balanced),
        };
        let body = br#"{"balancedHolding": [{
            "sectorWeightStock": [{"symbol": "VUN", "type": "ETF"}],
            "sectorWeightBond": [{"rate": "1.0", "type": "ETF"}]
        }]}"#;

        scraper.on_holding_response(&context, body).await.unwrap();

        assert_eq!(store.count("vanguard_fund_holding").await, 1);
        let doc = store
            .find_one("vanguard_fund_holding", &Filter::new("ticker", "VBAL.TO"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc["stockHolding"].as_array().unwrap().len(), 1);
        assert_eq!(doc["bondHolding"].as_array().unwrap().len(), 1);
        assert_eq!(doc["bondHolding"][0]["type"], json!("ETF"));
    }

    #[tokio::test]
    async fn test_decode_failure_skips_record() {
        let store = Arc::new(MemoryDocumentStore::new());
        let scraper = scraper(Arc::new(CannedFetcher::new("{}")), store.clone());
        let context = FundContext {
            port_id: "9563".to_string(),
            ticker: "VAB".to_string(),
            asset_class: Some(AssetClass::Bond),
        };

        let err = scraper
            .on_distribution_response(&context, b"<html>oops</html>")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to decode distribution"));
        assert_eq!(store.count("vanguard_fund_distribution").await, 0);
    }

    #[tokio::test]
    async fn test_fund_list_response_counts_fan_out() {
        let fetcher = Arc::new(CannedFetcher::new(FUND_LIST));
        let store = Arc::new(MemoryDocumentStore::new());
        let scraper = scraper(fetcher.clone(), store.clone());

        let count = scraper
            .on_fund_list_response(FUND_LIST.as_bytes())
            .await
            .unwrap();
        assert_eq!(count, 3);
        assert_eq!(store.count("vanguard_fund_list").await, 3);

        scraper.drain().await;
        assert_eq!(fetcher.requests_matching("listview").len(), 0);
        assert_eq!(fetcher.requests_matching("overview-data").len(), 3);
        assert_eq!(fetcher.requests_matching("holding-details-bond").len(), 2);
        assert_eq!(fetcher.requests_matching("holding-details-equity").len(), 1);
        assert_eq!(fetcher.requests_matching("price-distribution").len(), 3);
        assert_eq!(store.count("vanguard_fund_overview").await, 3);
        assert_eq!(store.count("vanguard_fund_holding").await, 3);
        assert_eq!(store.count("vanguard_fund_distribution").await, 3);
    }

    /// Stores nothing for the fund list, everything else succeeds.
    struct RejectingFundWriter;

    #[async_trait]
    impl RecordWriter for RejectingFundWriter {
        async fn upsert_fund(&self, fund: &FundSummary) -> Result<UpsertOutcome> {
            anyhow::bail!("store unavailable for {}", fund.ticker)
        }

        async fn upsert_overview(&self, _: &FundOverview) -> Result<UpsertOutcome> {
            Ok(UpsertOutcome { inserted: true })
        }

        async fn upsert_holding(&self, _: &FundHolding) -> Result<UpsertOutcome> {
            Ok(UpsertOutcome { inserted: true })
        }

        async fn upsert_distribution(&self, _: &FundDistribution) -> Result<UpsertOutcome> {
            Ok(UpsertOutcome { inserted: true })
        }
    }

    #[tokio::test]
    async fn test_unstored_fund_is_not_fanned_out() {
        let fetcher = Arc::new(CannedFetcher::new(FUND_LIST));
        let scraper = FundScraper::new(
            fetcher.clone(),
            Arc::new(RejectingFundWriter),
            Normalizer::new(Arc::new(LookupTables::builtin()), ".TO"),
            Endpoints::new("https://api.vanguard.com", "F"),
            &settings(),
        );

        let report = scraper.run().await;

        assert_eq!(fetcher.requests.lock().unwrap().len(), 1);
        assert_eq!(report.fund_list.persisted, 0);
        assert_eq!(report.fund_list.skipped, 3);
        assert_eq!(report.overview.requested, 0);
        assert_eq!(report.holding.requested, 0);
        assert_eq!(report.distribution.requested, 0);
    }

    #[tokio::test]
    async fn test_dependent_requests_use_fund_list_key() {
        let fetcher = Arc::new(CannedFetcher::new(
            r#"{"fundData": {
                "9563": {"TICKER": "VAB", "assetCode": "BOND", "portId": "1111"}
            }}"#,
        ));
        let store = Arc::new(MemoryDocumentStore::new());

        scraper(fetcher.clone(), store.clone()).run().await;

        assert_eq!(fetcher.requests_matching("portId:9563,").len(), 3);
        assert!(fetcher.requests_matching("portId:1111").is_empty());
        let distribution = store
            .find_one("vanguard_fund_distribution", &Filter::new("portId", "9563"))
            .await
            .unwrap();
        assert!(distribution.is_some());
    }
}
