use std::path::{Path, PathBuf};

use super::types::{AppConfig, StoreProvider};

pub const STORE_FILE_NAME: &str = "SystemMode.txt";

/// Get the default sysmode data directory: `$SYSMODE_HOME` or `~/.sysmode`
pub fn get_sysmode_data_dir() -> anyhow::Result<PathBuf> {
    if let Ok(v) = std::env::var("SYSMODE_HOME") {
        if !v.trim().is_empty() {
            return Ok(PathBuf::from(v));
        }
    }
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(PathBuf::from(home).join(".sysmode"))
}

pub fn load_default() -> anyhow::Result<AppConfig> {
    // Priority 1: <data dir>/config.toml (highest)
    let data_dir = get_sysmode_data_dir()?;
    let home_config = data_dir.join("config.toml");

    // Priority 2: ./config.toml (current directory)
    let local_config = Path::new("config.toml");

    let mut cfg = if home_config.exists() {
        load_from(&home_config)?
    } else if local_config.exists() {
        load_from(local_config)?
    } else {
        AppConfig::default()
    };

    fill_store_path(&mut cfg, &data_dir);

    // Environment variable overrides (Priority 0: highest)
    apply_env_overrides(&mut cfg, |key| std::env::var(key).ok())?;

    Ok(cfg)
}

pub fn load_from(path: &Path) -> anyhow::Result<AppConfig> {
    let s = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("read {} failed: {e}", path.display()))?;
    let cfg = toml::from_str::<AppConfig>(&s)
        .map_err(|e| anyhow::anyhow!("parse {} failed: {e}", path.display()))?;
    Ok(cfg)
}

/// Points an unset file store at `<data_dir>/SystemMode.txt`.
pub fn fill_store_path(cfg: &mut AppConfig, data_dir: &Path) {
    if let StoreProvider::File(ref mut file_cfg) = cfg.store.provider {
        if file_cfg.path.trim().is_empty() {
            file_cfg.path = data_dir.join(STORE_FILE_NAME).to_string_lossy().to_string();
        }
    }
}

pub fn apply_env_overrides<F>(cfg: &mut AppConfig, lookup: F) -> anyhow::Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = get("SYSMODE_STORE_PATH") {
        if let StoreProvider::File(ref mut file_cfg) = cfg.store.provider {
            file_cfg.path = v;
        }
    }
    if let Some(v) = get("SYSMODE_CATCH_UP") {
        cfg.manager.catch_up = v.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    }
    if let Some(v) = get("SYSMODE_RESTORE_CLIENTS") {
        cfg.manager.restore_clients = v.eq_ignore_ascii_case("true") || v == "1";
    }
    if let Some(v) = get("SYSMODE_LOG_LEVEL") {
        cfg.logging.level = v;
    }
    Ok(())
}
