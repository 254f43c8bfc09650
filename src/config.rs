use crate::api::score_feed::DEFAULT_HOST;
use crate::error::ConfigError;
use std::path::PathBuf;

const DEFAULT_DATA_PATH: &str = "data/ledger.json";
const DEFAULT_FINISHED_STATUSES: &str = "Finished,Final/OT";

/// Runtime settings, read from the environment (and `.env`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// JSON file holding the ledger
    pub data_path: PathBuf,
    pub scores_api_host: String,
    pub scores_api_key: Option<String>,
    /// Feed status strings that mean a game is over
    pub finished_statuses: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build from any variable lookup
    pub fn from_vars<F: Fn(&str) -> Option<String>>(var: F) -> Result<Self, ConfigError> {
        let non_empty = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        let finished_statuses: Vec<String> = non_empty("FINISHED_STATUSES")
            .unwrap_or_else(|| DEFAULT_FINISHED_STATUSES.to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if finished_statuses.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "FINISHED_STATUSES",
                reason: "needs at least one status".to_string(),
            });
        }

        Ok(Self {
            data_path: non_empty("BETBOOK_DATA")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_PATH)),
            scores_api_host: non_empty("SCORES_API_HOST")
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            scores_api_key: non_empty("SCORES_API_KEY"),
            finished_statuses,
        })
    }

    /// The score feed key; only needed when syncing
    pub fn scores_api_key(&self) -> Result<&str, ConfigError> {
        self.scores_api_key
            .as_deref()
            .ok_or(ConfigError::Missing("SCORES_API_KEY"))
    }
}
