use std::{fs, path::Path};

use anyhow::{Context, Result, bail};
use hangar_core::TransitionPolicy;
use serde::Deserialize;
use time::Duration;

const CONFIG_DIR: &str = ".hangar";
const CONFIG_FILE: &str = "config.toml";
/// Upper bound for `lifecycle.early_start_grace_minutes` (one year).
pub const MAX_EARLY_START_GRACE_MINUTES: i64 = 365 * 24 * 60;
/// Upper bound for `lifecycle.late_cancel_window_hours` (one year).
pub const MAX_LATE_CANCEL_WINDOW_HOURS: i64 = 365 * 24;

/// Top-level project configuration loaded from `.hangar/config.toml`.
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
pub struct ProjectConfig {
    /// Lifecycle guard tolerances.
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
    /// Rescheduling behaviour.
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

impl ProjectConfig {
    /// Load configuration from a working directory. A missing file yields defaults.
    ///
    /// # Errors
    /// Returns an error when the file cannot be read, parsed, or fails validation.
    pub fn from_workdir(workdir: impl AsRef<Path>) -> Result<Self> {
        let config_path = workdir.as_ref().join(CONFIG_DIR).join(CONFIG_FILE);
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&config_path)
            .with_context(|| format!("failed to read {}", config_path.display()))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("failed to load {}", config_path.display()))
    }

    /// Parse and validate configuration text.
    ///
    /// # Errors
    /// Returns an error when the TOML is malformed or values are out of range.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents).context("invalid configuration TOML")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let LifecycleConfig {
            early_start_grace_minutes: grace,
            late_cancel_window_hours: window,
        } = self.lifecycle;
        if !(0..=MAX_EARLY_START_GRACE_MINUTES).contains(&grace) {
            bail!(
                "lifecycle.early_start_grace_minutes must be between 0 and {MAX_EARLY_START_GRACE_MINUTES}, got {grace}"
            );
        }
        if !(0..=MAX_LATE_CANCEL_WINDOW_HOURS).contains(&window) {
            bail!(
                "lifecycle.late_cancel_window_hours must be between 0 and {MAX_LATE_CANCEL_WINDOW_HOURS}, got {window}"
            );
        }
        Ok(())
    }
}

/// `[lifecycle]` block.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Minutes before the planned start that work may begin.
    pub early_start_grace_minutes: i64,
    /// Hours after the planned start that cancellation needs no override.
    pub late_cancel_window_hours: i64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        let policy = TransitionPolicy::default();
        Self {
            early_start_grace_minutes: policy.early_start_grace.whole_minutes(),
            late_cancel_window_hours: policy.late_cancel_window.whole_hours(),
        }
    }
}

impl LifecycleConfig {
    /// Guard tolerances derived from this block. Values outside the accepted
    /// range are clamped to it.
    #[must_use]
    pub const fn policy(&self) -> TransitionPolicy {
        TransitionPolicy {
            early_start_grace: Duration::minutes(clamp(
                self.early_start_grace_minutes,
                MAX_EARLY_START_GRACE_MINUTES,
            )),
            late_cancel_window: Duration::hours(clamp(
                self.late_cancel_window_hours,
                MAX_LATE_CANCEL_WINDOW_HOURS,
            )),
        }
    }
}

const fn clamp(value: i64, max: i64) -> i64 {
    if value < 0 {
        0
    } else if value > max {
        max
    } else {
        value
    }
}

/// `[schedule]` block.
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ScheduleConfig {
    /// What happens to already shifted tasks when a cascade write fails.
    pub cascade_failure: CascadeFailure,
}

/// Policy for a cascade that fails part-way.
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CascadeFailure {
    /// Keep the shifts already written and record them in the change event.
    #[default]
    KeepApplied,
    /// Restore every task touched by the reschedule to its previous window.
    RollBack,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() -> Result<()> {
        let temp = TempDir::new()?;
        let config = ProjectConfig::from_workdir(temp.path())?;
        assert_eq!(config, ProjectConfig::default());
        assert_eq!(config.lifecycle.policy(), TransitionPolicy::default());
        assert_eq!(config.schedule.cascade_failure, CascadeFailure::KeepApplied);
        Ok(())
    }

    #[test]
    fn loads_overrides_from_config_dir() -> Result<()> {
        let temp = TempDir::new()?;
        let dir = temp.path().join(CONFIG_DIR);
        fs::create_dir_all(&dir)?;
        fs::write(
            dir.join(CONFIG_FILE),
            r#"
[lifecycle]
early_start_grace_minutes = 15

[schedule]
cascade_failure = "roll_back"
"#,
        )?;

        let config = ProjectConfig::from_workdir(temp.path())?;
        assert_eq!(config.lifecycle.early_start_grace_minutes, 15);
        assert_eq!(config.lifecycle.late_cancel_window_hours, 24);
        assert_eq!(config.lifecycle.policy().early_start_grace, Duration::minutes(15));
        assert_eq!(config.schedule.cascade_failure, CascadeFailure::RollBack);
        Ok(())
    }

    #[test]
    fn negative_windows_are_rejected() {
        let err = ProjectConfig::from_toml_str("[lifecycle]\nlate_cancel_window_hours = -1\n");
        assert!(err.is_err());
    }

    #[test]
    fn oversized_windows_are_rejected() {
        let huge_cancel = ProjectConfig::from_toml_str(
            "[lifecycle]\nlate_cancel_window_hours = 9223372036854775807\n",
        );
        assert!(huge_cancel.is_err());

        let huge_grace =
            ProjectConfig::from_toml_str("[lifecycle]\nearly_start_grace_minutes = 525601\n");
        assert!(huge_grace.is_err());

        let year = ProjectConfig::from_toml_str("[lifecycle]\nlate_cancel_window_hours = 8760\n");
        assert!(year.is_ok());
    }

    #[test]
    fn policy_clamps_unvalidated_values() {
        let config = LifecycleConfig {
            early_start_grace_minutes: i64::MAX,
            late_cancel_window_hours: i64::MIN,
        };
        let policy = config.policy();
        assert_eq!(
            policy.early_start_grace,
            Duration::minutes(MAX_EARLY_START_GRACE_MINUTES)
        );
        assert_eq!(policy.late_cancel_window, Duration::ZERO);
    }

    #[test]
    fn unknown_cascade_policy_is_rejected() {
        assert!(ProjectConfig::from_toml_str("[schedule]\ncascade_failure = \"maybe\"\n").is_err());
    }
}
