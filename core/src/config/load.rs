use std::path::{Path, PathBuf};

use super::types::AppConfig;

/// Get the default tapline data directory: ~/.tapline
pub fn get_tapline_data_dir() -> anyhow::Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(PathBuf::from(home).join(".tapline"))
}

pub fn load_from_path(path: &Path) -> anyhow::Result<AppConfig> {
    let s = std::fs::read_to_string(path)?;
    let cfg = toml::from_str::<AppConfig>(&s)
        .map_err(|e| anyhow::anyhow!("{}: {}", path.display(), e))?;
    Ok(cfg)
}

pub fn load_default() -> anyhow::Result<AppConfig> {
    // Priority 1: ~/.tapline/config.toml
    let user_config = get_tapline_data_dir().ok().map(|d| d.join("config.toml"));

    // Priority 2: ./tapline.toml
    let local_config = Path::new("tapline.toml");

    let mut cfg = match user_config {
        Some(p) if p.exists() => load_from_path(&p)?,
        _ if local_config.exists() => load_from_path(local_config)?,
        _ => AppConfig::default(),
    };

    apply_env_overrides(&mut cfg, |k| std::env::var(k).ok());
    Ok(cfg)
}

fn apply_env_overrides(cfg: &mut AppConfig, get: impl Fn(&str) -> Option<String>) {
    if let Some(v) = get("TAPLINE_SHELL") {
        if !v.trim().is_empty() {
            cfg.runner.shell = v;
        }
    }
    if let Some(v) = get("TAPLINE_LOG_LEVEL") {
        if !v.trim().is_empty() {
            cfg.logging.level = v;
        }
    }
}
