use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Print vendors this service knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Prodigi,
    Lulu,
    Peecho,
}

/// Whether an adapter exists for a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderStatus {
    Active,
    NotImplemented,
}

impl fmt::Display for ProviderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderStatus::Active => write!(f, "active"),
            ProviderStatus::NotImplemented => write!(f, "not_implemented"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown print provider: {0}")]
pub struct UnknownProvider(pub String);

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::Prodigi, Provider::Lulu, Provider::Peecho];

    /// Stable lowercase identifier used in URLs and config keys
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Prodigi => "prodigi",
            Provider::Lulu => "lulu",
            Provider::Peecho => "peecho",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::Prodigi => "Prodigi",
            Provider::Lulu => "Lulu Direct",
            Provider::Peecho => "Peecho",
        }
    }

    /// Whether this service ships an adapter for the provider
    pub fn status(&self) -> ProviderStatus {
        match self {
            Provider::Prodigi | Provider::Lulu => ProviderStatus::Active,
            Provider::Peecho => ProviderStatus::NotImplemented,
        }
    }

    /// Prefix for this provider's environment variables
    pub fn env_prefix(&self) -> &'static str {
        match self {
            Provider::Prodigi => "PRODIGI",
            Provider::Lulu => "LULU",
            Provider::Peecho => "PEECHO",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Provider::ALL
            .into_iter()
            .find(|p| p.as_str() == normalized)
            .ok_or_else(|| UnknownProvider(s.to_string()))
    }
}
