pub mod cli;
pub mod config;
pub mod core;
pub mod normalize;
pub mod providers;
pub mod scrape;
pub mod store;

use crate::config::AppConfig;
use crate::normalize::{Normalizer, lookup::LookupTables};
use crate::providers::{Endpoints, HttpFetcher};
use crate::scrape::{FundScraper, ScrapeReport};
use crate::store::{DocumentStore, FjallDocumentStore, FundRepository};
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info};

pub enum AppCommand {
    Scrape,
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("fundscrape starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    match command {
        AppCommand::Scrape => {
            let data_path = config.data_path()?;
            let store = Arc::new(FjallDocumentStore::open(&data_path)?);
            let report = scrape(&config, store).await?;
            println!("{}", report.display_as_table());
        }
    }

    Ok(())
}

/// Runs one full scrape cycle against `store`.
pub async fn scrape(config: &AppConfig, store: Arc<dyn DocumentStore>) -> Result<ScrapeReport> {
    let provider = &config.provider;
    let endpoints = Endpoints::new(&provider.base_url, &provider.issue_type);
    let fetcher = HttpFetcher::new(
        config.scraper.timeout(),
        &provider.allowed_domains,
        endpoints.base_url(),
    )?;
    let repository = FundRepository::new(
        store,
        config.store.collections.clone(),
        &config.store.schema_version,
    );
    let normalizer = Normalizer::new(Arc::new(LookupTables::builtin()), &provider.ticker_suffix);

    let scraper = FundScraper::new(
        Arc::new(fetcher),
        Arc::new(repository),
        normalizer,
        endpoints,
        &config.scraper,
    );
    Ok(scraper.run().await)
}
