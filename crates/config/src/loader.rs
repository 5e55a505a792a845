use std::{
    path::{Path, PathBuf},
    sync::Mutex,
};

use tracing::{debug, warn};

use crate::schema::HubgateConfig;

const CONFIG_FILENAME: &str = "hubgate.toml";

/// Override for the config directory, set via `set_config_dir()`.
static CONFIG_DIR_OVERRIDE: Mutex<Option<PathBuf>> = Mutex::new(None);

/// Set a custom config directory. When set, discovery only looks in this
/// directory (project-local and user-global paths are skipped). Each
/// call replaces the previous override.
pub fn set_config_dir(path: PathBuf) {
    if let Ok(mut dir) = CONFIG_DIR_OVERRIDE.lock() {
        *dir = Some(path);
    }
}

fn config_dir_override() -> Option<PathBuf> {
    CONFIG_DIR_OVERRIDE.lock().ok().and_then(|dir| dir.clone())
}

/// Load config from the given TOML file.
pub fn load_config(path: &Path) -> anyhow::Result<HubgateConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    Ok(toml::from_str(&raw)?)
}

/// Discover and load config, then apply environment overrides.
///
/// Search order:
/// 1. `./hubgate.toml` (project-local)
/// 2. `~/.config/hubgate/hubgate.toml` (user-global)
///
/// Falls back to defaults when no file is found or the file fails to
/// parse; `HUBGATE_*` environment variables are applied on top either
/// way.
pub fn discover_and_load() -> HubgateConfig {
    let mut config = match find_config_file() {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            match load_config(&path) {
                Ok(cfg) => cfg,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
                    HubgateConfig::default()
                },
            }
        },
        None => {
            debug!("no config file found, using defaults");
            HubgateConfig::default()
        },
    };
    apply_overrides(&mut config, |name| std::env::var(name).ok());
    config
}

fn find_config_file() -> Option<PathBuf> {
    if let Some(dir) = config_dir_override() {
        let p = dir.join(CONFIG_FILENAME);
        // Override is set — don't fall through to other locations.
        return p.exists().then_some(p);
    }

    let local = PathBuf::from(CONFIG_FILENAME);
    if local.exists() {
        return Some(local);
    }

    if let Some(dir) = home_dir().map(|h| h.join(".config").join("hubgate")) {
        let p = dir.join(CONFIG_FILENAME);
        if p.exists() {
            return Some(p);
        }
    }

    None
}

fn home_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf())
}

/// Apply `HUBGATE_*` overrides on top of `config`. The lookup is
/// injected so tests don't have to mutate the process environment.
fn apply_overrides(config: &mut HubgateConfig, get: impl Fn(&str) -> Option<String>) {
    if let Some(url) = get("HUBGATE_HUB_API_URL") {
        config.hub.api_url = url;
    }
    if let Some(secs) = parsed(&get, "HUBGATE_HUB_CONNECT_TIMEOUT") {
        config.hub.connect_timeout_secs = secs;
    }
    if let Some(secs) = parsed(&get, "HUBGATE_HUB_REQUEST_TIMEOUT") {
        config.hub.request_timeout_secs = secs;
    }
    if let Some(bind) = get("HUBGATE_BIND") {
        config.server.bind = bind;
    }
    if let Some(port) = parsed(&get, "HUBGATE_PORT") {
        config.server.port = port as u16;
    }
}

fn parsed(get: impl Fn(&str) -> Option<String>, name: &str) -> Option<u64> {
    let raw = get(name)?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(var = name, value = %raw, "ignoring non-numeric override");
            None
        },
    }
}
