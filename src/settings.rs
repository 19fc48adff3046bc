//! Runtime settings, read from an optional `sqlshape.{toml,json,yaml}` file
//! and overridden by `SQLSHAPE_*` environment variables.

// config lets you read a separate config file
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::Result;

pub const DEFAULT_CONFIG_FILE: &str = "sqlshape";
pub const ENV_PREFIX: &str = "SQLSHAPE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    /// Start with every contract attached.
    pub instrument: bool,
    /// Filter directive handed to the log subscriber when `RUST_LOG` is unset.
    pub log_filter: String,
    pub report: ReportFormat,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            instrument: false,
            log_filter: "sqlshape=info".into(),
            report: ReportFormat::Text,
        }
    }
}

impl Settings {
    /// Loads settings from `path` (without extension, any format config
    /// understands), falling back to `sqlshape` in the working directory. A
    /// missing file is not an error.
    pub fn load(path: Option<&str>) -> Result<Settings> {
        let defaults = Settings::default();
        let settings = Config::builder()
            .set_default("instrument", defaults.instrument)?
            .set_default("log_filter", defaults.log_filter)?
            .set_default("report", "text")?
            .add_source(File::with_name(path.unwrap_or(DEFAULT_CONFIG_FILE)).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}
