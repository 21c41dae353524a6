use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    pub allowed_domains: Vec<String>,
    pub issue_type: String,
    pub ticker_suffix: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig {
            base_url: "https://api.vanguard.com".to_string(),
            allowed_domains: vec!["api.vanguard.com".to_string()],
            issue_type: "F".to_string(),
            ticker_suffix: ".TO".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ScraperConfig {
    /// Requests in flight per stage
    pub parallelism: usize,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    pub timeout_secs: u64,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        ScraperConfig {
            parallelism: 2,
            min_delay_ms: 2000,
            max_delay_ms: 5000,
            timeout_secs: 30,
        }
    }
}

impl ScraperConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct CollectionsConfig {
    pub fund: String,
    pub overview: String,
    pub holding: String,
    pub distribution: String,
}

impl Default for CollectionsConfig {
    fn default() -> Self {
        CollectionsConfig {
            fund: "vanguard_fund_list".to_string(),
            overview: "vanguard_fund_overview".to_string(),
            holding: "vanguard_fund_holding".to_string(),
            distribution: "vanguard_fund_distribution".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    pub data_path: Option<String>,
    pub schema_version: String,
    pub collections: CollectionsConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            data_path: None,
            schema_version: "1".to_string(),
            collections: CollectionsConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub provider: ProviderConfig,
    pub scraper: ScraperConfig,
    pub store: StoreConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("ca", "fundscrape", "fundscrape")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.store.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("ca", "fundscrape", "fundscrape")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().join("store"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        config.validate()?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.scraper.parallelism == 0 {
            anyhow::bail!("scraper.parallelism must be at least 1");
        }
        if self.scraper.min_delay_ms > self.scraper.max_delay_ms {
            anyhow::bail!(
                "scraper.min_delay_ms ({}) is greater than scraper.max_delay_ms ({})",
                self.scraper.min_delay_ms,
                self.scraper.max_delay_ms
            );
        }
        Ok(())
    }
}
