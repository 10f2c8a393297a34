//! Provider environments

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Deployment of the provider's broker and API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    #[default]
    Staging,
    Production,
    ProductionGlobal,
    Replay,
}

impl Environment {
    pub fn broker_host(&self) -> &'static str {
        match self {
            Environment::Staging => "stgmq.betradar.com",
            Environment::Production => "mq.betradar.com",
            Environment::ProductionGlobal => "global.mq.betradar.com",
            Environment::Replay => "replaymq.betradar.com",
        }
    }

    /// API base URL, without trailing slash
    pub fn api_url(&self) -> &'static str {
        match self {
            Environment::Staging | Environment::Replay => "https://stgapi.betradar.com",
            Environment::Production => "https://api.betradar.com",
            Environment::ProductionGlobal => "https://global.api.betradar.com",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Staging => "staging",
            Environment::Production => "production",
            Environment::ProductionGlobal => "production_global",
            Environment::Replay => "replay",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "staging" => Ok(Environment::Staging),
            "production" => Ok(Environment::Production),
            "production_global" | "global" => Ok(Environment::ProductionGlobal),
            "replay" => Ok(Environment::Replay),
            other => Err(format!("unknown environment {:?}", other)),
        }
    }
}
