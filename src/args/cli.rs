use clap::Parser;
use std::time::Duration;

use crate::error::ValidationError;
use crate::profile::{TaskKind, TaskParameters};

use super::parsers::{
    parse_duration_arg, parse_output_format, parse_positive_u64, parse_positive_usize,
    parse_task_kind,
};
use super::types::{OutputFormat, PositiveU64, PositiveUsize};

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000/api";

#[derive(Debug, Parser, Clone)]
#[clap(
    version,
    about = "Run one long task over WebSocket streaming and HTTP polling side by side, then compare latency, bytes and request counts.",
    next_help_heading = "Advanced Options"
)]
pub struct PushpollArgs {
    /// HTTP API base (task creation, status and result routes)
    #[arg(
        long = "base-url",
        env = "PUSHPOLL_BASE_URL",
        default_value = DEFAULT_BASE_URL,
        help_heading = "Common Options"
    )]
    pub base_url: String,

    /// WebSocket base; derived from --base-url when omitted
    #[arg(long = "ws-base-url", env = "PUSHPOLL_WS_BASE_URL")]
    pub ws_base_url: Option<String>,

    /// Task kind to run (compute-pi or document-analysis)
    #[arg(
        long,
        short = 'k',
        default_value = "compute-pi",
        value_parser = parse_task_kind,
        help_heading = "Common Options"
    )]
    pub kind: TaskKind,

    /// Simulated clients per delivery mode
    #[arg(
        long,
        short = 'c',
        default_value = "5",
        value_parser = parse_positive_usize,
        help_heading = "Common Options"
    )]
    pub clients: PositiveUsize,

    /// Polling period (supports ms/s/m/h); defaults per task kind
    #[arg(long = "poll-interval", value_parser = parse_duration_arg)]
    pub poll_interval: Option<Duration>,

    /// Heartbeat period on each socket (supports ms/s/m/h)
    #[arg(long, default_value = "1s", value_parser = parse_duration_arg)]
    pub keepalive: Duration,

    /// Digits of pi to compute
    #[arg(
        long,
        default_value = "500",
        value_parser = parse_positive_u64,
        help_heading = "Common Options"
    )]
    pub digits: PositiveU64,

    /// Server-side document to analyse (bare name or path)
    #[arg(long = "document-path")]
    pub document_path: Option<String>,

    /// Remote document to analyse
    #[arg(long = "document-url")]
    pub document_url: Option<String>,

    /// Keywords to search for, comma separated
    #[arg(long, value_delimiter = ',')]
    pub keywords: Vec<String>,

    /// Progress line period while the run is active (supports ms/s/m/h)
    #[arg(long = "render-interval", default_value = "100ms", value_parser = parse_duration_arg)]
    pub render_interval: Duration,

    /// Give up after this long (supports ms/s/m/h)
    #[arg(long = "max-duration", value_parser = parse_duration_arg)]
    pub max_duration: Option<Duration>,

    /// Report format (text or json)
    #[arg(
        long,
        short = 'o',
        default_value = "text",
        value_parser = parse_output_format,
        help_heading = "Common Options"
    )]
    pub output: OutputFormat,

    /// Add one report line per client
    #[arg(long = "per-client")]
    pub per_client: bool,

    /// Config file (TOML or JSON); pushpoll.toml or pushpoll.json are picked up otherwise
    #[arg(long)]
    pub config: Option<String>,

    /// Enable debug logging
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Disable ANSI colours in log output
    #[arg(long = "no-color")]
    pub no_color: bool,
}

impl PushpollArgs {
    /// Workload for the selected kind.
    ///
    /// # Errors
    ///
    /// Document analysis needs a document source and at least one keyword.
    pub fn task_parameters(&self) -> Result<TaskParameters, ValidationError> {
        match self.kind {
            TaskKind::ComputePi => Ok(TaskParameters::ComputePi {
                digits: self.digits.get(),
            }),
            TaskKind::DocumentAnalysis => {
                if self.document_path.is_none() && self.document_url.is_none() {
                    return Err(ValidationError::MissingDocument);
                }
                let keywords: Vec<String> = self
                    .keywords
                    .iter()
                    .map(|keyword| keyword.trim())
                    .filter(|keyword| !keyword.is_empty())
                    .map(str::to_owned)
                    .collect();
                if keywords.is_empty() {
                    return Err(ValidationError::MissingKeywords);
                }
                Ok(TaskParameters::DocumentAnalysis {
                    document_path: self.document_path.clone(),
                    document_url: self.document_url.clone(),
                    keywords,
                })
            }
        }
    }

    #[must_use]
    pub fn effective_poll_interval(&self) -> Duration {
        self.poll_interval
            .unwrap_or_else(|| self.kind.default_poll_interval())
    }
}
