//! Optional config file loading. Search order: ./epcscrape.toml, then
//! $XDG_CONFIG_HOME/epcscrape/config.toml (or ~/.config/epcscrape/config.toml).

use serde::Deserialize;
use std::path::PathBuf;

/// Config file contents. All fields optional; only present keys override defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct Config {
    /// Listing base URL; pages are `{base_url}?page={n}`.
    pub base_url: Option<String>,
    /// Directory for the output file when -o is not set. Without it, output goes to stdout.
    pub output_dir: Option<PathBuf>,
    /// HTTP User-Agent header.
    pub user_agent: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Pause after opening a listing page (default 2).
    pub navigation_delay_secs: Option<u64>,
    /// Pause after opening a detail page (default 3).
    pub detail_delay_secs: Option<u64>,
    /// How long to wait for the consent button to become clickable (default 5).
    pub consent_wait_secs: Option<u64>,
    /// How long to wait for the listing container (default 20).
    pub container_wait_secs: Option<u64>,
    /// Interval between checks during a wait, in milliseconds (default 1000).
    pub poll_millis: Option<u64>,
    pub max_documents: Option<usize>,
    /// Detail pages without text: skip (default) or fail.
    pub missing_text: Option<String>,
    /// Listing rows without a date: sentinel (default) or skip.
    pub missing_date: Option<String>,
}

/// Search order: (1) ./epcscrape.toml, (2) $XDG_CONFIG_HOME/epcscrape/config.toml.
/// Missing file returns Ok(None). Invalid TOML or I/O error reading a present file returns Err.
pub fn load_config() -> Result<Option<Config>, String> {
    let cwd = std::env::current_dir()
        .map_err(|e| format!("Cannot determine current directory: {}", e))?;
    let mut paths = vec![cwd.join("epcscrape.toml")];
    if let Some(d) = dirs::config_dir() {
        paths.push(d.join("epcscrape").join("config.toml"));
    }
    for path in &paths {
        if path.exists() {
            let s = std::fs::read_to_string(path)
                .map_err(|e| format!("Cannot read config {}: {}", path.display(), e))?;
            let config: Config = toml::from_str(&s)
                .map_err(|e| format!("Invalid config {}: {}", path.display(), e))?;
            tracing::debug!(path = %path.display(), "Loaded config");
            return Ok(Some(config));
        }
    }
    Ok(None)
}
