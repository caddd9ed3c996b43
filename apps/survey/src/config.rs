use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use config::{Config, Environment, File, FileFormat};
use flow::{AssistedGate, FormLayout, DEFAULT_TICK_INTERVAL};
use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_CONFIG_FILE: &str = "survey.toml";
pub const ENV_PREFIX: &str = "SURVEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub form_endpoint: Option<String>,
    pub catalog_path: Option<PathBuf>,
    pub assisted_gate: AssistedGate,
    pub pre_survey_url: Option<String>,
    pub tick_interval_ms: u64,
    pub submit_timeout_secs: u64,
    pub log_filter: String,
    pub form_layout: Option<FormLayout>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            form_endpoint: None,
            catalog_path: None,
            assisted_gate: AssistedGate::default(),
            pre_survey_url: None,
            tick_interval_ms: DEFAULT_TICK_INTERVAL.as_millis() as u64,
            submit_timeout_secs: 5,
            log_filter: "info".into(),
            form_layout: None,
        }
    }
}

impl Settings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn submit_timeout(&self) -> Duration {
        Duration::from_secs(self.submit_timeout_secs)
    }

    pub fn endpoint(&self) -> anyhow::Result<Option<Url>> {
        self.form_endpoint
            .as_deref()
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
            .map(|raw| Url::parse(raw).with_context(|| format!("invalid form endpoint '{raw}'")))
            .transpose()
    }

    pub fn layout_for(&self, task_count: usize) -> FormLayout {
        self.form_layout
            .clone()
            .unwrap_or_else(|| FormLayout::symbolic(task_count))
    }
}

pub fn load_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    build_settings(path, None)
}

fn build_settings(
    path: Option<&Path>,
    env_override: Option<HashMap<String, String>>,
) -> anyhow::Result<Settings> {
    let file = match path {
        Some(path) => File::from(path).format(FileFormat::Toml).required(true),
        None => File::new(DEFAULT_CONFIG_FILE, FileFormat::Toml).required(false),
    };

    let environment = Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .source(env_override);

    Config::builder()
        .add_source(file)
        .add_source(environment)
        .build()
        .context("failed to read survey configuration")?
        .try_deserialize::<Settings>()
        .context("invalid survey configuration")
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
