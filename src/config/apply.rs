use std::time::Duration;

use clap::ArgMatches;
use clap::parser::ValueSource;

use crate::args::{PositiveU64, PositiveUsize, PushpollArgs};
use crate::error::{AppError, AppResult, ConfigError};

use super::types::{ConfigFile, DurationValue};

/// Applies configuration values to CLI arguments. Flags given on the
/// command line or through the environment win over the file.
///
/// # Errors
///
/// Returns an error when a config value is out of range.
pub fn apply_config(
    args: &mut PushpollArgs,
    matches: &ArgMatches,
    config: &ConfigFile,
) -> AppResult<()> {
    if !is_cli(matches, "base_url")
        && let Some(base_url) = config.base_url.clone()
    {
        args.base_url = base_url;
    }

    if !is_cli(matches, "ws_base_url")
        && let Some(ws_base_url) = config.ws_base_url.clone()
    {
        args.ws_base_url = Some(ws_base_url);
    }

    if !is_cli(matches, "kind")
        && let Some(kind) = config.kind
    {
        args.kind = kind;
    }

    if !is_cli(matches, "clients")
        && let Some(clients) = config.clients
    {
        args.clients = ensure_positive_usize(clients, "clients")?;
    }

    if !is_cli(matches, "poll_interval")
        && let Some(poll_interval) = config.poll_interval.as_ref()
    {
        args.poll_interval = Some(to_duration(poll_interval, "poll_interval")?);
    }

    if !is_cli(matches, "keepalive")
        && let Some(keepalive) = config.keepalive.as_ref()
    {
        args.keepalive = to_duration(keepalive, "keepalive")?;
    }

    if !is_cli(matches, "digits")
        && let Some(digits) = config.digits
    {
        args.digits = ensure_positive_u64(digits, "digits")?;
    }

    if !is_cli(matches, "document_path")
        && let Some(document_path) = config.document_path.clone()
    {
        args.document_path = Some(document_path);
    }

    if !is_cli(matches, "document_url")
        && let Some(document_url) = config.document_url.clone()
    {
        args.document_url = Some(document_url);
    }

    if !is_cli(matches, "keywords")
        && let Some(keywords) = config.keywords.as_ref()
    {
        args.keywords = keywords.to_keywords();
    }

    if !is_cli(matches, "render_interval")
        && let Some(render_interval) = config.render_interval.as_ref()
    {
        args.render_interval = to_duration(render_interval, "render_interval")?;
    }

    if !is_cli(matches, "max_duration")
        && let Some(max_duration) = config.max_duration.as_ref()
    {
        args.max_duration = Some(to_duration(max_duration, "max_duration")?);
    }

    if !is_cli(matches, "output")
        && let Some(output) = config.output
    {
        args.output = output;
    }

    if !is_cli(matches, "per_client")
        && let Some(per_client) = config.per_client
    {
        args.per_client = per_client;
    }

    if !is_cli(matches, "verbose")
        && let Some(verbose) = config.verbose
    {
        args.verbose = verbose;
    }

    if !is_cli(matches, "no_color")
        && let Some(no_color) = config.no_color
    {
        args.no_color = no_color;
    }

    Ok(())
}

fn is_cli(matches: &ArgMatches, name: &str) -> bool {
    matches!(
        matches.value_source(name),
        Some(ValueSource::CommandLine | ValueSource::EnvVariable)
    )
}

fn to_duration(value: &DurationValue, field: &'static str) -> AppResult<Duration> {
    value
        .to_duration()
        .map_err(|err| AppError::config(ConfigError::InvalidDuration { field, source: err }))
}

fn ensure_positive_u64(value: u64, field: &str) -> AppResult<PositiveU64> {
    PositiveU64::try_from(value).map_err(|err| {
        AppError::config(ConfigError::FieldMustBePositive {
            field: field.to_owned(),
            source: err,
        })
    })
}

fn ensure_positive_usize(value: usize, field: &str) -> AppResult<PositiveUsize> {
    PositiveUsize::try_from(value).map_err(|err| {
        AppError::config(ConfigError::FieldMustBePositive {
            field: field.to_owned(),
            source: err,
        })
    })
}
