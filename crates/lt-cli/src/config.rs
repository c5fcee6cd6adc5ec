//! Configuration loading and management.

use std::num::NonZeroU64;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use lt_core::TailSettings;
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// AWS region; falls back to `AWS_REGION` / `AWS_DEFAULT_REGION`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Custom `CloudWatch` Logs endpoint, e.g. `http://localhost:4566`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Prefix joined with a function name to form its log group.
    pub log_group_prefix: String,

    /// Delay between fetches, in milliseconds. Zero is rejected.
    pub poll_interval_ms: NonZeroU64,

    /// Re-check for a newer stream every this many fetches.
    pub rotation_check_every: NonZeroU64,

    /// Delay between attempts while the log group does not exist, in seconds.
    pub bootstrap_retry_secs: NonZeroU64,
}

impl Default for Config {
    fn default() -> Self {
        let settings = TailSettings::default();
        Self {
            region: None,
            endpoint: None,
            log_group_prefix: "/aws/lambda/".to_string(),
            poll_interval_ms: non_zero(
                u64::try_from(settings.poll_interval.as_millis()).unwrap_or(u64::MAX),
            ),
            rotation_check_every: settings.rotation_check_every,
            bootstrap_retry_secs: non_zero(settings.bootstrap_retry.as_secs()),
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (LAMBDA_TAIL_*)
        figment = figment.merge(Env::prefixed("LAMBDA_TAIL_"));

        figment.extract()
    }

    /// Engine timings derived from this configuration.
    pub const fn tail_settings(&self) -> TailSettings {
        TailSettings {
            poll_interval: Duration::from_millis(self.poll_interval_ms.get()),
            rotation_check_every: self.rotation_check_every,
            bootstrap_retry: Duration::from_secs(self.bootstrap_retry_secs.get()),
        }
    }

    /// Log group name for a Lambda function.
    pub fn log_group_for_function(&self, function_name: &str) -> String {
        format!("{}{function_name}", self.log_group_prefix)
    }
}

fn non_zero(value: u64) -> NonZeroU64 {
    NonZeroU64::new(value).unwrap_or(NonZeroU64::MIN)
}

/// Returns the platform-specific config directory for lambda-tail.
///
/// On Linux: `~/.config/lambda-tail`
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("lambda-tail"))
}
