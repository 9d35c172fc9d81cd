//! Pull configuration loading via `ortho-config`.
//!
//! [`PullConfig`] merges defaults, a discovered `wp-sync.toml`, and
//! `WP_SYNC_*` environment variables. Command-line overrides are applied on
//! top through [`PullOverrides`], producing the [`PullOptions`] that stay
//! fixed for the rest of a run.

use std::ffi::OsString;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

/// Alias pulled from when none is named on the command line.
pub const DEFAULT_ALIAS: &str = "@production";

/// Default uploads directory of a standard WordPress layout.
pub const DEFAULT_UPLOAD_DIR: &str = "wp-content/uploads";

/// Uploads directory of a Bedrock layout, probed when the configured one is
/// absent.
pub const DEFAULT_FALLBACK_UPLOAD_DIR: &str = "web/app/uploads";

/// Settings for `wp-sync pull` loaded via `ortho-config`.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "WP_SYNC",
    discovery(
        app_name = "wp-sync",
        env_var = "WP_SYNC_CONFIG_PATH",
        config_file_name = "wp-sync.toml",
        dotfile_name = ".wp-sync.toml",
        project_file_name = "wp-sync.toml"
    )
)]
pub struct PullConfig {
    /// Path to the WP-CLI executable.
    #[ortho_config(default = "wp".to_owned())]
    pub wp_bin: String,
    /// Path to the `rsync` executable used for the uploads mirror.
    #[ortho_config(default = "rsync".to_owned())]
    pub rsync_bin: String,
    /// Alias used when the caller does not name one.
    #[ortho_config(default = DEFAULT_ALIAS.to_owned())]
    pub default_alias: String,
    /// Expected local home URL. When unset the `WP_HOME` constant of the
    /// local site is used.
    pub local_url: Option<String>,
    /// Directory receiving backups and fetched dumps.
    #[ortho_config(default = "backup".to_owned())]
    pub backup_dir: String,
    /// Plugins activated after the import.
    #[ortho_config(default = String::new())]
    pub plugins_activate: String,
    /// Plugins deactivated after the import.
    #[ortho_config(default = String::new())]
    pub plugins_deactivate: String,
    /// Uploads directory relative to the site root.
    #[ortho_config(default = DEFAULT_UPLOAD_DIR.to_owned())]
    pub upload_dir: String,
    /// Comma separated exclusion patterns for the uploads mirror.
    #[ortho_config(default = String::new())]
    pub exclude_dirs: String,
    /// Uploads directory probed when `upload_dir` does not exist locally.
    #[ortho_config(default = DEFAULT_FALLBACK_UPLOAD_DIR.to_owned())]
    pub fallback_upload_dir: String,
}

/// Errors raised while loading or validating pull configuration.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates that parsing or merging configuration layers failed.
    #[error("pull configuration parsing failed: {0}")]
    Parse(String),
    /// Raised when a required value is blank.
    #[error("missing {field}: set WP_SYNC_{env_suffix} or add {field} to wp-sync.toml", env_suffix = field.to_uppercase())]
    InvalidConfig {
        /// Configuration field that failed validation.
        field: String,
    },
}

impl PullConfig {
    /// Loads configuration from defaults, configuration files, and
    /// environment variables without parsing CLI arguments.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when merging sources fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([OsString::from("wp-sync")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Ensures required values are present after trimming whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidConfig`] naming the first blank field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::require_value(&self.wp_bin, "wp_bin")?;
        Self::require_value(&self.rsync_bin, "rsync_bin")?;
        Self::require_value(&self.default_alias, "default_alias")?;
        Self::require_value(&self.backup_dir, "backup_dir")?;
        Self::require_value(&self.upload_dir, "upload_dir")?;
        Ok(())
    }

    /// Applies command-line overrides and freezes the result for one run.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidConfig`] when the merged values fail
    /// validation.
    pub fn into_options(self, overrides: PullOverrides) -> Result<PullOptions, ConfigError> {
        let merged = Self {
            backup_dir: overrides.backup_dir.unwrap_or(self.backup_dir),
            plugins_activate: overrides.plugins_activate.unwrap_or(self.plugins_activate),
            plugins_deactivate: overrides
                .plugins_deactivate
                .unwrap_or(self.plugins_deactivate),
            upload_dir: overrides.upload_dir.unwrap_or(self.upload_dir),
            exclude_dirs: overrides.exclude_dirs.unwrap_or(self.exclude_dirs),
            local_url: overrides.local_url.or(self.local_url),
            ..self
        };
        merged.validate()?;

        Ok(PullOptions {
            wp_bin: merged.wp_bin,
            rsync_bin: merged.rsync_bin,
            default_alias: merged.default_alias,
            local_url: merged.local_url.filter(|url| !url.trim().is_empty()),
            backup_dir: merged.backup_dir,
            plugins_activate: plugin_list(&merged.plugins_activate),
            plugins_deactivate: plugin_list(&merged.plugins_deactivate),
            upload_dir: merged.upload_dir,
            fallback_upload_dir: merged.fallback_upload_dir,
            exclude_dirs: exclude_patterns(&merged.exclude_dirs),
        })
    }

    fn require_value(value: &str, field: &str) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::InvalidConfig {
                field: field.to_owned(),
            });
        }
        Ok(())
    }
}

/// Per-run overrides, typically parsed from the command line.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PullOverrides {
    /// Replaces [`PullConfig::backup_dir`].
    pub backup_dir: Option<String>,
    /// Replaces [`PullConfig::plugins_activate`].
    pub plugins_activate: Option<String>,
    /// Replaces [`PullConfig::plugins_deactivate`].
    pub plugins_deactivate: Option<String>,
    /// Replaces [`PullConfig::upload_dir`].
    pub upload_dir: Option<String>,
    /// Replaces [`PullConfig::exclude_dirs`].
    pub exclude_dirs: Option<String>,
    /// Replaces [`PullConfig::local_url`].
    pub local_url: Option<String>,
}

/// Options resolved once at the start of a pull.
///
/// Only the uploads directory may still change, through the fallback probe
/// performed before the pipeline starts.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PullOptions {
    /// WP-CLI executable.
    pub wp_bin: String,
    /// `rsync` executable.
    pub rsync_bin: String,
    /// Alias used when none is requested.
    pub default_alias: String,
    /// Expected local home URL, if configured.
    pub local_url: Option<String>,
    /// Backup directory relative to the site root.
    pub backup_dir: String,
    /// Normalised plugin names to activate.
    pub plugins_activate: Vec<String>,
    /// Normalised plugin names to deactivate.
    pub plugins_deactivate: Vec<String>,
    /// Uploads directory relative to the site root.
    pub upload_dir: String,
    /// Uploads directory probed when `upload_dir` is missing.
    pub fallback_upload_dir: String,
    /// Exclusion patterns passed to the uploads mirror.
    pub exclude_dirs: Vec<String>,
}

impl Default for PullOptions {
    fn default() -> Self {
        Self {
            wp_bin: String::from("wp"),
            rsync_bin: String::from("rsync"),
            default_alias: String::from(DEFAULT_ALIAS),
            local_url: None,
            backup_dir: String::from("backup"),
            plugins_activate: Vec::new(),
            plugins_deactivate: Vec::new(),
            upload_dir: String::from(DEFAULT_UPLOAD_DIR),
            fallback_upload_dir: String::from(DEFAULT_FALLBACK_UPLOAD_DIR),
            exclude_dirs: Vec::new(),
        }
    }
}

/// Splits a plugin list on commas and whitespace, dropping empty entries.
///
/// # Examples
///
/// ```
/// # use wp_sync::config::plugin_list;
/// assert_eq!(plugin_list("seo, cache"), vec!["seo", "cache"]);
/// assert!(plugin_list("  ").is_empty());
/// ```
#[must_use]
pub fn plugin_list(raw: &str) -> Vec<String> {
    raw.split(|ch: char| ch == ',' || ch.is_whitespace())
        .filter(|name| !name.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

/// Splits a comma separated exclusion list into discrete patterns.
///
/// # Examples
///
/// ```
/// # use wp_sync::config::exclude_patterns;
/// assert_eq!(exclude_patterns("cache,tmp"), vec!["cache", "tmp"]);
/// ```
#[must_use]
pub fn exclude_patterns(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|pattern| !pattern.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}
