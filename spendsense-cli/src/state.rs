use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

pub fn spendsense_home() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".spendsense"))
}

pub fn ensure_spendsense_home() -> Result<PathBuf> {
    let dir = spendsense_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

pub fn statements_path() -> Result<PathBuf> {
    Ok(ensure_spendsense_home()?.join("statements.json"))
}
