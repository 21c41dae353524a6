//! Asset class discriminator shared by the URL builder and the normalizer

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AssetClass {
    Bond,
    Equity,
    Balanced,
}

impl AssetClass {
    pub fn code(&self) -> &'static str {
        match self {
            AssetClass::Bond => "BOND",
            AssetClass::Equity => "EQUITY",
            AssetClass::Balanced => "BALANCED",
        }
    }

    /// Dataset name of the holding endpoint for this asset class.
    pub fn holding_dataset(&self) -> &'static str {
        match self {
            AssetClass::Bond => "caw-indv-holding-details-bond",
            AssetClass::Equity => "caw-indv-holding-details-equity",
            AssetClass::Balanced => "caw-indv-holding-details-balanced",
        }
    }
}

impl Display for AssetClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for AssetClass {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BOND" => Ok(AssetClass::Bond),
            "EQUITY" => Ok(AssetClass::Equity),
            "BALANCED" => Ok(AssetClass::Balanced),
            _ => Err(anyhow::anyhow!("Unsupported asset class: {}", s)),
        }
    }
}
