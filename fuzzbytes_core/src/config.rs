use crate::byte_source::SeedMode;
use serde::Deserialize;
use std::path::Path;

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    #[serde(default)]
    pub seed_mode: SeedMode,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Settings for replaying a blob through a fixed accessor plan.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct DecodeSettings {
    /// Accessor tokens, e.g. `["int64", "bool", "text:4"]`.
    #[serde(default = "default_plan")]
    pub plan: Vec<String>,
    #[serde(default)]
    pub output: OutputFormat,
}

pub fn default_plan() -> Vec<String> {
    vec!["int64".to_string()]
}

impl Default for DecodeSettings {
    fn default() -> Self {
        Self {
            plan: default_plan(),
            output: OutputFormat::default(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct FuzzBytesConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub decode: Option<DecodeSettings>,
}

impl FuzzBytesConfig {
    pub fn load_from_file(path: &Path) -> Result<Self, anyhow::Error> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file at {:?}: {}", path, e))?;

        Self::from_toml_str(&content).map_err(|e| {
            anyhow::anyhow!("Failed to parse TOML from config file {:?}: {}", path, e)
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}
