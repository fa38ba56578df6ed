use std::time::Duration;

use url::Url;

use crate::args::{OutputFormat, PushpollArgs};
use crate::controller::RunParameters;
use crate::error::{AppError, AppResult};
use crate::profile::{TaskKind, TaskParameters, resolve_document_path};
use crate::transport::{derive_socket_base, parse_base_url};

/// Everything one invocation needs, validated up front.
#[derive(Debug, Clone)]
pub(crate) struct RunPlan {
    pub parameters: RunParameters,
    pub base_url: Url,
    pub socket_base: Url,
    pub keepalive: Duration,
    pub clients: usize,
    pub render_interval: Duration,
    pub max_duration: Option<Duration>,
    pub output: OutputFormat,
    pub per_client: bool,
}

impl RunPlan {
    #[must_use]
    pub(crate) const fn kind(&self) -> TaskKind {
        self.parameters.task.kind()
    }
}

pub(crate) fn build_plan(args: &PushpollArgs) -> AppResult<RunPlan> {
    let mut task = args.task_parameters()?;
    if let TaskParameters::DocumentAnalysis {
        document_path,
        document_url,
        ..
    } = &mut task
    {
        *document_path = resolve_document_path(document_path.as_deref(), document_url.as_deref());
    }

    let base_url = parse_base_url(&args.base_url).map_err(AppError::transport)?;
    let socket_base = match args.ws_base_url.as_deref() {
        Some(value) => parse_base_url(value).and_then(|explicit| derive_socket_base(&explicit)),
        None => derive_socket_base(&base_url),
    }
    .map_err(AppError::transport)?;

    Ok(RunPlan {
        parameters: RunParameters {
            task,
            poll_interval: args.effective_poll_interval(),
        },
        base_url,
        socket_base,
        keepalive: args.keepalive,
        clients: args.clients.get(),
        render_interval: args.render_interval,
        max_duration: args.max_duration,
        output: args.output,
        per_client: args.per_client,
    })
}
