use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Root application configuration, loaded from `~/.config/readlog/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub goals: GoalConfig,
    pub recommendations: RecommendationConfig,
    pub timeline: TimelineConfig,
    pub storage: StorageConfig,
}

/// Reading targets used by the performance scorer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoalConfig {
    pub yearly_target: u32,
    /// Defaults to `ceil(yearly_target / 12)` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_target: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationConfig {
    pub max_recommendations: usize,
    pub exclude_read: bool,
    /// Snapshots retained per user by the behavior store.
    pub history_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    /// Offset applied to UTC timestamps before hour/weekday/month bucketing.
    pub utc_offset_minutes: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub database_path: String,
}

// ─── Defaults ──────────────────────────────────────────────

pub const DEFAULT_YEARLY_TARGET: u32 = 50;
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

impl Default for GoalConfig {
    fn default() -> Self {
        Self {
            yearly_target: DEFAULT_YEARLY_TARGET,
            monthly_target: None,
        }
    }
}

impl GoalConfig {
    pub fn new(yearly_target: u32) -> Self {
        Self {
            yearly_target,
            monthly_target: None,
        }
    }

    pub fn effective_monthly_target(&self) -> u32 {
        self.monthly_target
            .unwrap_or_else(|| self.yearly_target.div_ceil(12))
    }
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            max_recommendations: 5,
            exclude_read: true,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: 0,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("readlog");

        Self {
            database_path: data_dir.join("behavior.db").to_string_lossy().to_string(),
        }
    }
}

// ─── Load / Save ───────────────────────────────────────────

impl AppConfig {
    /// Standard config file path: `~/.config/readlog/config.toml`
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("READLOG_CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("readlog")
            .join("config.toml")
    }

    /// Load config from disk, falling back to defaults if file doesn't exist.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        Self::load_from(&path)
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to the standard path.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();
        self.save_to(&path)
    }

    /// Save config to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let toml_str = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_str)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        // Real-world offsets lie within UTC-12:00..UTC+14:00.
        if !(-12 * 60..=14 * 60).contains(&self.timeline.utc_offset_minutes) {
            return Err(crate::ReadlogError::ConfigError(format!(
                "timeline.utc_offset_minutes out of range: {}",
                self.timeline.utc_offset_minutes
            )));
        }
        if self.recommendations.history_limit == 0 {
            return Err(crate::ReadlogError::ConfigError(
                "recommendations.history_limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    // ─── Derived paths ─────────────────────────────────────

    /// Path to the SQLite behavior database.
    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.storage.database_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.goals.yearly_target, 50);
        assert_eq!(cfg.recommendations.max_recommendations, 5);
        assert_eq!(cfg.recommendations.history_limit, 50);
        assert!(cfg.validate().is_ok());
        assert!(!cfg.storage.database_path.is_empty());
    }

    #[test]
    fn test_monthly_target_defaults_to_yearly_over_twelve() {
        assert_eq!(GoalConfig::new(50).effective_monthly_target(), 5);
        assert_eq!(GoalConfig::new(24).effective_monthly_target(), 2);
        let explicit = GoalConfig {
            yearly_target: 50,
            monthly_target: Some(7),
        };
        assert_eq!(explicit.effective_monthly_target(), 7);
    }

    #[test]
    fn test_config_toml_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let mut cfg = AppConfig::default();
        cfg.goals.yearly_target = 24;
        cfg.timeline.utc_offset_minutes = 540;
        cfg.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.goals.yearly_target, 24);
        assert_eq!(loaded.timeline.utc_offset_minutes, 540);
        assert_eq!(loaded.storage.database_path, cfg.storage.database_path);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[goals]\nyearly_target = 12\n").unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.goals.yearly_target, 12);
        assert_eq!(loaded.goals.effective_monthly_target(), 1);
        assert!(loaded.recommendations.exclude_read);
    }

    #[test]
    fn test_out_of_range_offset_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[timeline]\nutc_offset_minutes = 2000\n").unwrap();

        assert!(AppConfig::load_from(&path).is_err());
    }

    #[test]
    fn test_load_nonexistent_returns_default() {
        let cfg = AppConfig::load_from(Path::new("/tmp/nonexistent_readlog_config.toml")).unwrap();
        assert_eq!(cfg.goals.yearly_target, 50);
    }
}
