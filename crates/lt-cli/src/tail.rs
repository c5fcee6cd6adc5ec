//! The tail command: wire the CloudWatch client into the engine and stream to stdout.

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use lt_cloudwatch::{Client, Credentials, resolve_region};
use lt_core::{LogSourceName, TailLoop, TokioSleeper};
use tokio_util::sync::CancellationToken;

use crate::cli::{Cli, Target};
use crate::config::Config;
use crate::console::ConsoleSink;

/// Maps the requested target to its log group name.
pub fn log_source(target: &Target, config: &Config) -> Result<LogSourceName> {
    let name = match target {
        Target::Function(function) => config.log_group_for_function(function.trim()),
        Target::LogGroup(group) => group.trim().to_string(),
    };
    let source = LogSourceName::new(name).context("log group name cannot be empty")?;
    if matches!(target, Target::Function(_)) && source.as_str() == config.log_group_prefix {
        anyhow::bail!("function name cannot be empty");
    }
    Ok(source)
}

/// Environment lookup with `--profile` standing in for `AWS_PROFILE`.
fn aws_lookup<'a>(
    profile: Option<&'a str>,
    env: impl Fn(&str) -> Option<String> + 'a,
) -> impl Fn(&str) -> Option<String> + 'a {
    move |key| match profile {
        Some(profile) if key == "AWS_PROFILE" => Some(profile.to_string()),
        _ => env(key),
    }
}

/// Builds a `CloudWatch` Logs client from flags, config and the AWS environment.
pub fn build_client(cli: &Cli, config: &Config) -> Result<Client> {
    let env = aws_lookup(cli.profile.as_deref(), |key| std::env::var(key).ok());
    let region = resolve_region(cli.region.as_deref().or(config.region.as_deref()), &env)
        .context("no AWS region configured; pass --region, set AWS_REGION or add it to the profile")?;
    let credentials = Credentials::from_lookup(&env).context("failed to load AWS credentials")?;

    let client = match cli.endpoint.as_deref().or(config.endpoint.as_deref()) {
        Some(endpoint) => Client::with_endpoint(credentials, &region, endpoint),
        None => Client::new(credentials, &region),
    }
    .context("failed to create CloudWatch Logs client")?;
    tracing::debug!(?client, "created CloudWatch Logs client");
    Ok(client)
}

/// Tails the selected log group until cancelled or a fatal error occurs.
pub async fn run<W: Write>(
    cli: &Cli,
    config: &Config,
    out: W,
    color: bool,
    cancel: CancellationToken,
) -> Result<()> {
    let target = cli
        .target()
        .context("either --function-name or --log-group is required")?;
    let source = log_source(&target, config)?;
    let client = build_client(cli, config)?;

    let mut sink = ConsoleSink::new(out, color);
    sink.streaming_started(&source)?;

    let tail = TailLoop::new(Arc::new(client), TokioSleeper, config.tail_settings(), cancel);
    tail.follow(&source, &mut sink)
        .await
        .with_context(|| format!("stopped tailing {source}"))?;

    tracing::debug!(%source, "tail finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn function_target_uses_configured_prefix() {
        let config = Config {
            log_group_prefix: "/custom/".to_string(),
            ..Config::default()
        };
        let source = log_source(&Target::Function("svc-a".to_string()), &config).unwrap();
        assert_eq!(source.as_str(), "/custom/svc-a");
    }

    #[test]
    fn log_group_target_is_used_verbatim() {
        let source = log_source(
            &Target::LogGroup(" /ecs/worker ".to_string()),
            &Config::default(),
        )
        .unwrap();
        assert_eq!(source.as_str(), "/ecs/worker");
    }

    #[test]
    fn profile_flag_overrides_aws_profile() {
        let env = |key: &str| (key == "AWS_PROFILE").then(|| "from-env".to_string());
        assert_eq!(aws_lookup(Some("dev"), env)("AWS_PROFILE").as_deref(), Some("dev"));
        assert_eq!(aws_lookup(None, env)("AWS_PROFILE").as_deref(), Some("from-env"));
        assert_eq!(aws_lookup(Some("dev"), env)("AWS_REGION"), None);
    }

    #[test]
    fn blank_targets_are_rejected() {
        let config = Config::default();
        let err = log_source(&Target::Function("  ".to_string()), &config).unwrap_err();
        assert!(err.to_string().contains("function name cannot be empty"));

        let err = log_source(&Target::LogGroup(String::new()), &config).unwrap_err();
        assert!(err.to_string().contains("log group name cannot be empty"));
    }
}
