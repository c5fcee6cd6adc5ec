//! AWS credentials and region lookup from the standard environment variables
//! and shared profile files.

use std::fmt;

use tracing::{debug, warn};

use crate::CloudWatchError;
use crate::profile::{ProfileFiles, profile_name};

/// Static AWS credentials.
///
/// `Debug` output redacts the secret key and session token.
#[derive(Clone)]
pub struct Credentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[REDACTED]")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl Credentials {
    /// Creates credentials, rejecting blank key material.
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Result<Self, CloudWatchError> {
        let access_key_id = access_key_id.into();
        let secret_access_key = secret_access_key.into();

        if access_key_id.trim().is_empty() {
            return Err(missing("access key ID cannot be empty"));
        }
        if secret_access_key.trim().is_empty() {
            return Err(missing("secret access key cannot be empty"));
        }

        Ok(Self {
            access_key_id,
            secret_access_key,
            session_token: session_token.filter(|token| !token.trim().is_empty()),
        })
    }

    /// Loads credentials, reading environment variables through `lookup`.
    ///
    /// `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY` and `AWS_SESSION_TOKEN` win.
    /// Otherwise the static keys of the selected profile (`AWS_PROFILE`, or
    /// `default`) are read from the shared credentials file, then the config file.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, CloudWatchError> {
        let env = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(access_key_id) = env("AWS_ACCESS_KEY_ID") {
            let secret_access_key = env("AWS_SECRET_ACCESS_KEY")
                .ok_or_else(|| missing("AWS_SECRET_ACCESS_KEY is not set"))?;
            return Self::new(access_key_id, secret_access_key, env("AWS_SESSION_TOKEN"));
        }

        let profile = profile_name(&lookup);
        let keys = ProfileFiles::load(&lookup)?.keys(&profile)?.ok_or_else(|| {
            missing(&format!(
                "AWS_ACCESS_KEY_ID is not set and profile {profile} has no static credentials"
            ))
        })?;
        debug!(%profile, "using credentials from shared profile");
        Self::new(keys.access_key_id, keys.secret_access_key, keys.session_token)
    }

    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    pub(crate) fn secret_access_key(&self) -> &str {
        &self.secret_access_key
    }

    pub(crate) fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }
}

/// Picks the region: `explicit` first, then `AWS_REGION`, then
/// `AWS_DEFAULT_REGION`, then the `region` of the selected profile.
pub fn resolve_region(
    explicit: Option<&str>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Option<String> {
    let non_blank = |region: &String| !region.trim().is_empty();
    explicit
        .map(str::to_string)
        .filter(non_blank)
        .or_else(|| lookup("AWS_REGION").filter(non_blank))
        .or_else(|| lookup("AWS_DEFAULT_REGION").filter(non_blank))
        .or_else(|| {
            let profile = profile_name(&lookup);
            match ProfileFiles::load(&lookup) {
                Ok(files) => files.region(&profile),
                Err(err) => {
                    warn!(error = %err, "ignoring unreadable AWS profile file");
                    None
                }
            }
        })
}

fn missing(reason: &str) -> CloudWatchError {
    CloudWatchError::MissingCredentials {
        reason: reason.to_string(),
    }
}
