use anyhow::{anyhow, Context};
use kir_binary::{ByteOrder, WriterConfig};
use kir_expander::{parse_constant, ExpandOptions, Value};
use kir_model::Limits;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_NAME: &str = "kir.config.json";

/// Project configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Directory searched for .kry files
    #[serde(default = "default_src_dir")]
    pub src_dir: String,

    /// Where compiled .kirb files are written
    #[serde(default = "default_out_dir")]
    pub out_dir: String,

    #[serde(default)]
    pub byte_order: ByteOrder,

    #[serde(default)]
    pub limits: Limits,

    /// Compile-time constants available to every file
    #[serde(default)]
    pub constants: BTreeMap<String, serde_json::Value>,

    /// Embed the reactive manifest in compiled output
    #[serde(default = "default_manifest")]
    pub manifest: bool,
}

fn default_src_dir() -> String {
    "src".to_string()
}

fn default_out_dir() -> String {
    "dist".to_string()
}

fn default_manifest() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            src_dir: default_src_dir(),
            out_dir: default_out_dir(),
            byte_order: ByteOrder::default(),
            limits: Limits::default(),
            constants: BTreeMap::new(),
            manifest: default_manifest(),
        }
    }
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &Path) -> anyhow::Result<Self> {
        let config_path = cwd.join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            serde_json::from_str(&content)
                .with_context(|| format!("invalid {}", config_path.display()))
        } else {
            // Return default config if none exists
            Ok(Config::default())
        }
    }

    pub fn src_dir(&self, cwd: &Path) -> PathBuf {
        cwd.join(&self.src_dir)
    }

    pub fn out_dir(&self, cwd: &Path) -> PathBuf {
        cwd.join(&self.out_dir)
    }

    pub fn writer_config(&self) -> WriterConfig {
        WriterConfig {
            byte_order: self.byte_order,
            limits: self.limits,
            ..WriterConfig::default()
        }
    }

    /// Expansion options for one file. `defines` override configured constants.
    pub fn expand_options(&self, file_name: &str, defines: &[(String, Value)]) -> ExpandOptions {
        let mut constants: BTreeMap<String, Value> = self
            .constants
            .iter()
            .map(|(name, json)| (name.clone(), Value::from_json(json)))
            .collect();
        constants.extend(defines.iter().cloned());

        ExpandOptions {
            file_name: file_name.to_string(),
            limits: self.limits,
            constants,
        }
    }
}

/// Parse a `--define name=value` flag.
pub fn parse_define(text: &str) -> anyhow::Result<(String, Value)> {
    let (name, value) = text
        .split_once('=')
        .ok_or_else(|| anyhow!("expected name=value, got '{}'", text))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(anyhow!("constant name is empty in '{}'", text));
    }
    let value = parse_constant(value.trim()).with_context(|| format!("invalid value for '{}'", name))?;
    Ok((name.to_string(), value))
}
