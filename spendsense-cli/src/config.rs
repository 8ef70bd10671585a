use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::state::ensure_spendsense_home;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub extraction: ExtractionSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionSection {
    /// Extraction function endpoint. Structured documents decode in-process
    /// when unset.
    pub extractor_url: Option<String>,
    /// Recognition language for image statements.
    pub ocr_language: String,
    /// Caller-side timeout on one extraction round trip.
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            extraction: ExtractionSection {
                extractor_url: None,
                ocr_language: "eng".to_string(),
                timeout_secs: 30,
            },
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_spendsense_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    let p = config_path()?;
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    Ok(toml::from_str(&s).context("parse config.toml")?)
}
