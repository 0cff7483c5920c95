//! Layered TOML configuration.
//!
//! Layers, lowest priority first, each overlaying the previous one:
//! built-in defaults, `<config_dir>/tnav/config.toml`, `./.tnav.toml`,
//! `$TNAV_CONFIG`, the file given with `--config`, and finally CLI flags.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::fs::watcher::{DEFAULT_DEBOUNCE_MS, DEFAULT_IGNORE_PATTERNS};

/// Default `tracing` filter.
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory opened when no path argument is given.
    pub default_path: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    pub dirs_first: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    pub enabled: Option<bool>,
    pub debounce_ms: Option<u64>,
    /// Path components whose changes are never reported.
    pub ignore: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `tracing` filter directive, e.g. "info" or "tnav=debug".
    pub level: Option<String>,
    pub file: Option<PathBuf>,
}

/// Merged configuration. Every leaf is optional so that a partial layer
/// only replaces what it actually sets.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub tree: TreeConfig,
    pub watcher: WatcherConfig,
    pub log: LogConfig,
}

fn overlay<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

/// Config files consulted on every start, lowest priority first.
fn search_path() -> Vec<PathBuf> {
    let global = dirs::config_dir().map(|dir| dir.join("tnav").join("config.toml"));
    let local = std::env::current_dir()
        .ok()
        .map(|cwd| cwd.join(".tnav.toml"));
    let from_env = std::env::var_os("TNAV_CONFIG").map(PathBuf::from);
    [global, local, from_env].into_iter().flatten().collect()
}

/// Parse one config file. Missing files are silently skipped; broken ones
/// are reported on stderr and skipped, since logging is not up yet.
fn read_config(path: &Path) -> Option<AppConfig> {
    let text = std::fs::read_to_string(path).ok()?;
    toml::from_str(&text)
        .inspect_err(|e| eprintln!("tnav: ignoring {}: {}", path.display(), e))
        .ok()
}

impl AppConfig {
    /// Overlay `top` onto `self`; values set in `top` win.
    pub fn layer(&mut self, top: AppConfig) {
        overlay(&mut self.general.default_path, top.general.default_path);
        overlay(&mut self.tree.dirs_first, top.tree.dirs_first);
        overlay(&mut self.watcher.enabled, top.watcher.enabled);
        overlay(&mut self.watcher.debounce_ms, top.watcher.debounce_ms);
        overlay(&mut self.watcher.ignore, top.watcher.ignore);
        overlay(&mut self.log.level, top.log.level);
        overlay(&mut self.log.file, top.log.file);
    }

    /// Build the effective configuration from every layer.
    pub fn load(explicit: Option<&Path>, flags: AppConfig) -> AppConfig {
        let mut config = AppConfig::default();
        let files = search_path().into_iter().chain(explicit.map(Path::to_path_buf));
        for layer in files.filter_map(|path| read_config(&path)) {
            config.layer(layer);
        }
        config.layer(flags);
        config
    }

    pub fn dirs_first(&self) -> bool {
        self.tree.dirs_first.unwrap_or(false)
    }

    pub fn watcher_enabled(&self) -> bool {
        self.watcher.enabled.unwrap_or(true)
    }

    pub fn debounce_ms(&self) -> u64 {
        self.watcher.debounce_ms.unwrap_or(DEFAULT_DEBOUNCE_MS)
    }

    pub fn ignore_patterns(&self) -> Vec<String> {
        self.watcher.ignore.clone().unwrap_or_else(|| {
            DEFAULT_IGNORE_PATTERNS
                .iter()
                .map(|s| s.to_string())
                .collect()
        })
    }

    pub fn log_level(&self) -> &str {
        self.log.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    /// Configured log file, else `<state or cache dir>/tnav/tnav.log`.
    pub fn log_file(&self) -> Option<PathBuf> {
        self.log.file.clone().or_else(|| {
            dirs::state_dir()
                .or_else(dirs::cache_dir)
                .map(|dir| dir.join("tnav").join("tnav.log"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(text: &str) -> AppConfig {
        toml::from_str(text).expect("valid toml")
    }

    #[test]
    fn defaults_without_any_file() {
        let cfg = AppConfig::default();
        assert!(!cfg.dirs_first());
        assert!(cfg.watcher_enabled());
        assert_eq!(cfg.debounce_ms(), DEFAULT_DEBOUNCE_MS);
        assert_eq!(cfg.log_level(), "info");
        assert!(cfg.ignore_patterns().iter().any(|p| p == ".git"));
        assert!(cfg.general.default_path.is_none());
    }

    #[test]
    fn every_section_parses() {
        let cfg = parse(
            r#"
            [general]
            default_path = "/srv/data"

            [tree]
            dirs_first = true

            [watcher]
            enabled = false
            debounce_ms = 500
            ignore = ["build"]

            [log]
            level = "tnav=debug"
            file = "/tmp/tnav-test.log"
            "#,
        );
        assert_eq!(cfg.general.default_path.as_deref(), Some("/srv/data"));
        assert!(cfg.dirs_first());
        assert!(!cfg.watcher_enabled());
        assert_eq!(cfg.debounce_ms(), 500);
        assert_eq!(cfg.ignore_patterns(), ["build"]);
        assert_eq!(cfg.log_level(), "tnav=debug");
        assert_eq!(cfg.log_file(), Some(PathBuf::from("/tmp/tnav-test.log")));
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let cfg = parse("[tree]\ndirs_first = true\n");
        assert!(cfg.dirs_first());
        assert!(cfg.watcher_enabled());
        assert_eq!(cfg.debounce_ms(), DEFAULT_DEBOUNCE_MS);

        let empty = parse("");
        assert!(!empty.dirs_first());
    }

    #[test]
    fn layer_replaces_only_set_values() {
        let mut cfg = parse("[watcher]\nenabled = true\ndebounce_ms = 100\n");
        cfg.layer(parse("[watcher]\ndebounce_ms = 800\n"));
        assert!(cfg.watcher_enabled());
        assert_eq!(cfg.debounce_ms(), 800);

        cfg.layer(AppConfig::default());
        assert_eq!(cfg.debounce_ms(), 800);
    }

    #[test]
    fn read_config_skips_missing_and_broken_files() {
        let dir = TempDir::new().unwrap();
        assert!(read_config(&dir.path().join("absent.toml")).is_none());

        let broken = dir.path().join("broken.toml");
        std::fs::write(&broken, "this is { not valid toml").unwrap();
        assert!(read_config(&broken).is_none());

        let good = dir.path().join("good.toml");
        std::fs::write(&good, "[watcher]\ndebounce_ms = 75\n").unwrap();
        assert_eq!(read_config(&good).map(|c| c.debounce_ms()), Some(75));
    }

    #[test]
    fn flags_override_explicit_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[tree]\ndirs_first = true\n\n[log]\nlevel = \"debug\"\n").unwrap();

        let flags = AppConfig {
            log: LogConfig {
                level: Some("trace".into()),
                file: None,
            },
            ..Default::default()
        };
        let cfg = AppConfig::load(Some(&path), flags);
        assert_eq!(cfg.log_level(), "trace");
        assert!(cfg.dirs_first());
    }
}
