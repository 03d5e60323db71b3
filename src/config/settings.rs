use config::{Config, Environment, File};
use serde::Deserialize;
use std::env;

use crate::utils::error::Result;

#[derive(Debug, Deserialize, Clone)]
pub struct Profile {
    /// Agent used when a profile names an agent the registry does not know
    #[serde(default = "default_agent_name")]
    pub default_agent_name: String,
    /// Number of domains shown in the operator listing before it is cut with " ..."
    #[serde(default = "default_domain_listing_length")]
    pub domain_listing_length: usize,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            default_agent_name: default_agent_name(),
            domain_listing_length: default_domain_listing_length(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Evaluation {
    /// Log every rejected candidate at info level instead of debug
    #[serde(default)]
    pub log_rejections: bool,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct PolicyConfig {
    #[serde(default)]
    pub profile: Profile,
    #[serde(default)]
    pub evaluation: Evaluation,
}

fn default_agent_name() -> String {
    "FortaiBot".to_string()
}

fn default_domain_listing_length() -> usize {
    40
}

impl PolicyConfig {
    /// Layered settings: `default`, the `RUN_MODE` file and `local` from
    /// `CONFIG_DIR`, then `APP_` variables (`APP_PROFILE__DEFAULT_AGENT_NAME`).
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();
        let config_dir = env::var("CONFIG_DIR").unwrap_or_else(|_| "./config".into());
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let layered = ["default", run_mode.as_str(), "local"]
            .iter()
            .fold(Config::builder(), |builder, layer| {
                builder.add_source(File::with_name(&format!("{}/{}", config_dir, layer)).required(false))
            })
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        Ok(layered.try_deserialize()?)
    }
}
