//! User configuration: configured language pairs, the default pair and the
//! data directory.
//!
//! Stored as pretty JSON at `~/.config/vocabmaster/config.json`. Older
//! installs kept it under `~/.local/share/vocabmaster/`; that file is copied
//! forward the first time the new location is missing.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use vocabmaster_storage::{write_atomic_bytes, DataLayout, LanguagePair};

const APP_NAME: &str = "vocabmaster";
const CONFIG_FILE_NAME: &str = "config.json";
const DEFAULT_DATA_DIR_NAME: &str = ".vocabmaster";

/// Overrides the directory holding `config.json`.
pub(crate) const VOCABMASTER_CONFIG_DIR_ENV: &str = "VOCABMASTER_CONFIG_DIR";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub default: Option<LanguagePair>,
    pub language_pairs: Vec<LanguagePair>,
    pub data_dir: Option<PathBuf>,
}

impl Config {
    /// Configured data directory, else `~/.vocabmaster`.
    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => dirs::home_dir()
                .map(|home| home.join(DEFAULT_DATA_DIR_NAME))
                .ok_or_else(|| anyhow!("could not determine the home directory")),
        }
    }

    pub fn layout(&self) -> Result<DataLayout> {
        Ok(DataLayout::new(self.data_dir()?))
    }

    pub fn has_pair(&self, pair: &LanguagePair) -> bool {
        self.language_pairs.contains(pair)
    }

    /// Register `pair`. The first pair ever added becomes the default.
    ///
    /// Returns `false` if the pair was already configured.
    pub fn add_pair(&mut self, pair: &LanguagePair, make_default: bool) -> bool {
        let added = if self.has_pair(pair) {
            false
        } else {
            self.language_pairs.push(pair.clone());
            true
        };
        if make_default || self.default.is_none() {
            self.default = Some(pair.clone());
        }
        added
    }

    /// Forget `pair`. Clears the default if it pointed there. Data files are
    /// left alone.
    pub fn remove_pair(&mut self, pair: &LanguagePair) -> bool {
        let before = self.language_pairs.len();
        self.language_pairs.retain(|p| p != pair);
        if self.default.as_ref() == Some(pair) {
            self.default = None;
        }
        self.language_pairs.len() != before
    }

    pub fn set_default(&mut self, pair: &LanguagePair) -> Result<()> {
        if !self.has_pair(pair) {
            return Err(anyhow!(
                "language pair {pair} is not configured; run `vocabmaster setup {} {}` first",
                pair.learn(),
                pair.mother()
            ));
        }
        self.default = Some(pair.clone());
        Ok(())
    }
}

/// Pick the pair a command operates on: the explicit `--pair` wins, then the
/// configured default.
pub fn resolve_pair(explicit: Option<&str>, config: &Config) -> Result<LanguagePair> {
    if let Some(raw) = explicit {
        return raw
            .parse::<LanguagePair>()
            .with_context(|| format!("invalid language pair {raw:?}"));
    }
    config.default.clone().ok_or_else(|| {
        anyhow!(
            "no default language pair; run `vocabmaster setup <learn> <mother>` \
             or pass --pair learn:mother"
        )
    })
}

// ============================================================================
// Locations
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPaths {
    pub config_file: PathBuf,
    /// Pre-XDG location, read once for migration.
    pub legacy_file: Option<PathBuf>,
}

impl ConfigPaths {
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            config_file: dir.as_ref().join(CONFIG_FILE_NAME),
            legacy_file: None,
        }
    }

    /// `$VOCABMASTER_CONFIG_DIR`, else `~/.config/vocabmaster`.
    pub fn discover() -> Result<Self> {
        if let Some(dir) = std::env::var_os(VOCABMASTER_CONFIG_DIR_ENV).filter(|v| !v.is_empty())
        {
            return Ok(Self::in_dir(PathBuf::from(dir)));
        }
        let home =
            dirs::home_dir().ok_or_else(|| anyhow!("could not determine the home directory"))?;
        Ok(Self {
            config_file: home.join(".config").join(APP_NAME).join(CONFIG_FILE_NAME),
            legacy_file: Some(
                home.join(".local")
                    .join("share")
                    .join(APP_NAME)
                    .join(CONFIG_FILE_NAME),
            ),
        })
    }
}

fn read_config(path: &Path) -> Result<Config> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    if text.trim().is_empty() {
        return Ok(Config::default());
    }
    serde_json::from_str(&text).with_context(|| format!("invalid config {}", path.display()))
}

/// Load the config, migrating the legacy file if needed. A missing file is an
/// empty config.
pub fn load(paths: &ConfigPaths) -> Result<Config> {
    if paths.config_file.is_file() {
        tracing::debug!(path = %paths.config_file.display(), "loading config");
        return read_config(&paths.config_file);
    }
    if let Some(legacy) = paths.legacy_file.as_deref().filter(|p| p.is_file()) {
        let config = read_config(legacy)?;
        save(paths, &config)?;
        tracing::info!(
            from = %legacy.display(),
            to = %paths.config_file.display(),
            "migrated legacy config"
        );
        return Ok(config);
    }
    Ok(Config::default())
}

pub fn save(paths: &ConfigPaths, config: &Config) -> Result<()> {
    let path = &paths.config_file;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let mut json = serde_json::to_string_pretty(config)?;
    json.push('\n');
    write_atomic_bytes(path, json.as_bytes())
        .with_context(|| format!("failed to write config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn pair(s: &str) -> LanguagePair {
        s.parse().unwrap()
    }

    #[test]
    fn test_explicit_pair_wins_over_default() {
        let mut config = Config::default();
        config.add_pair(&pair("english:french"), true);

        let resolved = resolve_pair(Some("Spanish:German"), &config).unwrap();
        assert_eq!(resolved, pair("spanish:german"));
    }

    #[test]
    fn test_default_pair_used_without_explicit() {
        let mut config = Config::default();
        config.add_pair(&pair("english:french"), false);
        assert_eq!(
            resolve_pair(None, &config).unwrap(),
            pair("english:french")
        );
    }

    #[test]
    fn test_resolve_without_default_points_at_setup() {
        let err = resolve_pair(None, &Config::default()).unwrap_err();
        assert!(err.to_string().contains("vocabmaster setup"));
    }

    #[test]
    fn test_resolve_rejects_traversal_names() {
        assert!(resolve_pair(Some("../etc:french"), &Config::default()).is_err());
        assert!(resolve_pair(Some("english"), &Config::default()).is_err());
    }

    #[test]
    fn test_first_pair_becomes_default() {
        let mut config = Config::default();
        assert!(config.add_pair(&pair("english:french"), false));
        assert!(config.add_pair(&pair("spanish:french"), false));
        assert!(!config.add_pair(&pair("spanish:french"), false));
        assert_eq!(config.default, Some(pair("english:french")));
        assert_eq!(config.language_pairs.len(), 2);
    }

    #[test]
    fn test_remove_default_pair_clears_default() {
        let mut config = Config::default();
        config.add_pair(&pair("english:french"), true);
        assert!(config.remove_pair(&pair("english:french")));
        assert!(config.default.is_none());
        assert!(!config.remove_pair(&pair("english:french")));
    }

    #[test]
    fn test_set_default_requires_configured_pair() {
        let mut config = Config::default();
        assert!(config.set_default(&pair("english:french")).is_err());
        config.add_pair(&pair("english:french"), false);
        config.add_pair(&pair("german:german"), false);
        config.set_default(&pair("german:german")).unwrap();
        assert_eq!(config.default, Some(pair("german:german")));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let paths = ConfigPaths::in_dir(dir.path().join("nested"));
        let mut config = Config::default();
        config.add_pair(&pair("english:french"), true);
        config.data_dir = Some(dir.path().join("data"));

        save(&paths, &config).unwrap();
        let text = fs::read_to_string(&paths.config_file).unwrap();
        assert!(text.contains("\"english:french\""));
        assert_eq!(load(&paths).unwrap(), config);
    }

    #[test]
    fn test_missing_config_is_empty() {
        let dir = tempdir().unwrap();
        let paths = ConfigPaths::in_dir(dir.path());
        assert_eq!(load(&paths).unwrap(), Config::default());
        assert!(!paths.config_file.exists());
    }

    #[test]
    fn test_legacy_config_is_migrated() {
        let dir = tempdir().unwrap();
        let legacy = dir.path().join("legacy").join(CONFIG_FILE_NAME);
        fs::create_dir_all(legacy.parent().unwrap()).unwrap();
        fs::write(
            &legacy,
            r#"{"default": "english:french", "language_pairs": ["english:french"]}"#,
        )
        .unwrap();
        let paths = ConfigPaths {
            config_file: dir.path().join("new").join(CONFIG_FILE_NAME),
            legacy_file: Some(legacy.clone()),
        };

        let config = load(&paths).unwrap();
        assert_eq!(config.default, Some(pair("english:french")));
        assert!(paths.config_file.is_file());
        assert!(legacy.is_file());
    }

    #[test]
    fn test_invalid_pair_in_config_is_reported() {
        let dir = tempdir().unwrap();
        let paths = ConfigPaths::in_dir(dir.path());
        fs::write(&paths.config_file, r#"{"language_pairs": ["../x:y"]}"#).unwrap();
        let err = load(&paths).unwrap_err();
        assert!(format!("{err:#}").contains("invalid config"));
    }

    #[test]
    fn test_data_dir_defaults_under_home() {
        let config = Config::default();
        if let Some(home) = dirs::home_dir() {
            assert_eq!(config.data_dir().unwrap(), home.join(".vocabmaster"));
        }
    }
}
