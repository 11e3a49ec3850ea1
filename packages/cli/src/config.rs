use footnote_editor::EditorConfig;
use footnote_model::{IdSource, SequentialIds, UuidIds};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_CONFIG_NAME: &str = "footnotes.config.json";

/// footnotes.config.json
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Pipeline settings
    #[serde(default)]
    pub editor: EditorConfig,

    /// Seed for deterministic ids (`seed-1`, `seed-2`, ...); random UUIDs
    /// when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_seed: Option<String>,

    /// Write compact JSON instead of pretty-printed
    #[serde(default)]
    pub compact: bool,
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &str) -> anyhow::Result<Self> {
        let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn id_source(&self) -> Box<dyn IdSource> {
        match &self.id_seed {
            Some(seed) => Box::new(SequentialIds::new(seed.clone())),
            None => Box::new(UuidIds),
        }
    }
}
