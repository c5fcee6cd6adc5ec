//! Shared AWS profile files: `~/.aws/credentials` and `~/.aws/config`.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::CloudWatchError;

/// Profile keys that need a provider other than static keys.
const UNSUPPORTED_KEYS: [&str; 4] = ["role_arn", "sso_session", "sso_start_url", "credential_process"];

type Section = HashMap<String, String>;

/// Parsed contents of both profile files. Missing files parse as empty.
#[derive(Debug, Default, Clone)]
pub(crate) struct ProfileFiles {
    credentials: HashMap<String, Section>,
    config: HashMap<String, Section>,
}

/// Static keys found in a profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ProfileKeys {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

/// The selected profile: `AWS_PROFILE`, then `AWS_DEFAULT_PROFILE`, then `default`.
pub(crate) fn profile_name(lookup: &impl Fn(&str) -> Option<String>) -> String {
    lookup("AWS_PROFILE")
        .or_else(|| lookup("AWS_DEFAULT_PROFILE"))
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "default".to_string())
}

impl ProfileFiles {
    /// Reads the files named by `AWS_SHARED_CREDENTIALS_FILE` and
    /// `AWS_CONFIG_FILE`, defaulting to `~/.aws/credentials` and `~/.aws/config`.
    pub(crate) fn load(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, CloudWatchError> {
        let credentials = file_path(lookup, "AWS_SHARED_CREDENTIALS_FILE", "credentials");
        let config = file_path(lookup, "AWS_CONFIG_FILE", "config");

        Ok(Self::parse(
            &read_optional(credentials.as_deref())?,
            &read_optional(config.as_deref())?,
        ))
    }

    pub(crate) fn parse(credentials: &str, config: &str) -> Self {
        Self {
            credentials: parse_sections(credentials),
            config: parse_sections(config),
        }
    }

    /// Static keys for `profile`. The credentials file wins over the config file.
    pub(crate) fn keys(&self, profile: &str) -> Result<Option<ProfileKeys>, CloudWatchError> {
        let sections = [
            self.credentials.get(profile),
            self.config_section(profile),
        ];

        for section in sections.into_iter().flatten() {
            let value = |key: &str| {
                section
                    .get(key)
                    .filter(|value| !value.is_empty())
                    .cloned()
            };
            if let Some(access_key_id) = value("aws_access_key_id") {
                let secret_access_key = value("aws_secret_access_key").ok_or_else(|| {
                    CloudWatchError::MissingCredentials {
                        reason: format!("profile {profile} has no aws_secret_access_key"),
                    }
                })?;
                return Ok(Some(ProfileKeys {
                    access_key_id,
                    secret_access_key,
                    session_token: value("aws_session_token"),
                }));
            }
            if let Some(key) = UNSUPPORTED_KEYS.iter().find(|key| section.contains_key(**key)) {
                return Err(CloudWatchError::MissingCredentials {
                    reason: format!(
                        "profile {profile} uses {key}, which is not supported; \
                         export temporary keys as AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY"
                    ),
                });
            }
        }
        Ok(None)
    }

    /// The `region` of `profile` in the config file.
    pub(crate) fn region(&self, profile: &str) -> Option<String> {
        self.config_section(profile)?
            .get("region")
            .filter(|region| !region.is_empty())
            .cloned()
    }

    /// Config file sections are named `[profile NAME]`, except `[default]`.
    fn config_section(&self, profile: &str) -> Option<&Section> {
        let prefixed = self.config.get(&format!("profile {profile}"));
        if profile == "default" {
            self.config.get("default").or(prefixed)
        } else {
            prefixed
        }
    }
}

fn file_path(
    lookup: &impl Fn(&str) -> Option<String>,
    variable: &str,
    file_name: &str,
) -> Option<PathBuf> {
    lookup(variable)
        .filter(|path| !path.trim().is_empty())
        .map(PathBuf::from)
        .or_else(|| dirs::home_dir().map(|home| home.join(".aws").join(file_name)))
}

fn read_optional(path: Option<&Path>) -> Result<String, CloudWatchError> {
    let Some(path) = path else {
        return Ok(String::new());
    };
    match fs::read_to_string(path) {
        Ok(contents) => Ok(contents),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(String::new()),
        Err(source) => Err(CloudWatchError::ProfileFile {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Parses INI-style `[section]` / `key = value` lines. Indented lines belong
/// to nested settings and are skipped.
fn parse_sections(contents: &str) -> HashMap<String, Section> {
    let mut sections: HashMap<String, Section> = HashMap::new();
    let mut current: Option<String> = None;

    for line in contents.lines() {
        if line.starts_with([' ', '\t']) {
            continue;
        }
        let line = line.trim();
        if line.is_empty() || line.starts_with(['#', ';']) {
            continue;
        }
        if let Some(name) = line.strip_prefix('[').and_then(|rest| rest.strip_suffix(']')) {
            let name = name.split_whitespace().collect::<Vec<_>>().join(" ");
            sections.entry(name.clone()).or_default();
            current = Some(name);
        } else if let (Some(section), Some((key, value))) = (&current, line.split_once('=')) {
            if let Some(entries) = sections.get_mut(section) {
                entries.insert(key.trim().to_string(), value.trim().to_string());
            }
        }
    }
    sections
}
