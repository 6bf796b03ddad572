use std::path::{Path, PathBuf};

use report::ReportConfig;
use serde::Deserialize;

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub history_db: Option<PathBuf>,
    pub default_limit: Option<u32>,
}

impl Config {
    pub fn default_path() -> PathBuf {
        let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        config_dir.join("safari-visits").join("config.toml")
    }

    pub fn load_from(config_path: &Path) -> anyhow::Result<Self> {
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(config_path).map_err(|e| {
            anyhow::anyhow!(
                "failed to read config file at {}: {}",
                config_path.display(),
                e
            )
        })?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("failed to parse config file: {}", e))?;

        if config.default_limit == Some(0) {
            anyhow::bail!("default_limit in {} must be at least 1", config_path.display());
        }

        Ok(config)
    }

    pub fn report_config(&self) -> ReportConfig {
        let mut report = ReportConfig::default();
        if let Some(limit) = self.default_limit {
            report.default_limit = limit;
        }
        report
    }

    /// `--db` wins over the config file, which wins over Safari's own location.
    pub fn history_db(&self, flag: Option<PathBuf>) -> anyhow::Result<PathBuf> {
        match flag.or_else(|| self.history_db.clone()) {
            Some(path) => Ok(path),
            None => store_sqlite::default_history_path(),
        }
    }
}
