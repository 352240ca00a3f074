pub mod schema;

pub use schema::{AgentConfig, BackendKind, DecisionFormat};

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Environment variables that override the file.
pub const ENV_API_KEY: &str = "TOOL_AGENT_API_KEY";
pub const ENV_API_BASE: &str = "TOOL_AGENT_API_BASE";
pub const ENV_MODEL: &str = "TOOL_AGENT_MODEL";

/// Default agent home directory (~/.tool-agent).
pub fn default_home_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|d| d.home_dir().join(".tool-agent"))
        .unwrap_or_else(|| PathBuf::from(".tool-agent"))
}

/// Default config file location.
pub fn default_config_path() -> PathBuf {
    default_home_dir().join("agent.toml")
}

/// Expand `~` in a user-supplied path.
pub fn resolve_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}

/// Load config from the given path, or return defaults.
pub fn load_config(path: &Path) -> Result<AgentConfig> {
    if path.exists() {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: AgentConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config {} (TOML)", path.display()))?;
        Ok(config)
    } else {
        Ok(AgentConfig::default())
    }
}

/// Save config to the given path (TOML format).
pub fn save_config(config: &AgentConfig, path: &Path) -> Result<()> {
    let contents = toml::to_string_pretty(config).context("Failed to serialize config")?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents).context("Failed to write config file")?;
    Ok(())
}

/// Apply overrides from a variable lookup (normally the process environment).
pub fn apply_overrides<F>(config: &mut AgentConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(key) = non_empty(ENV_API_KEY) {
        config.api_key = key;
    }
    if let Some(base) = non_empty(ENV_API_BASE) {
        config.api_base = base;
    }
    if let Some(model) = non_empty(ENV_MODEL) {
        config.model = model;
    }
}

/// Load the file at `path`, then apply environment overrides.
pub fn load_with_env(path: &Path) -> Result<AgentConfig> {
    let mut config = load_config(path)?;
    apply_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}
