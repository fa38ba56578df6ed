//! Task kinds and the hooks that teach the engines each kind's payloads.
mod compute_pi;
mod document_analysis;


use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::engine::{PollingHooks, StreamingHooks, UpdateNotifier};
use crate::error::ValidationError;
use crate::transport::TaskRoutes;

pub use document_analysis::{format_snippet, resolve_document_path};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskKind {
    #[default]
    ComputePi,
    DocumentAnalysis,
}

impl TaskKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            TaskKind::ComputePi => "compute-pi",
            TaskKind::DocumentAnalysis => "document-analysis",
        }
    }

    #[must_use]
    pub const fn routes(self) -> TaskRoutes {
        match self {
            TaskKind::ComputePi => compute_pi::ROUTES,
            TaskKind::DocumentAnalysis => document_analysis::ROUTES,
        }
    }

    #[must_use]
    pub const fn default_poll_interval(self) -> Duration {
        match self {
            TaskKind::ComputePi => Duration::from_millis(150),
            TaskKind::DocumentAnalysis => Duration::from_millis(200),
        }
    }

    #[must_use]
    pub fn streaming_hooks(self, on_update: Option<UpdateNotifier>) -> StreamingHooks {
        match self {
            TaskKind::ComputePi => compute_pi::streaming_hooks(on_update),
            TaskKind::DocumentAnalysis => document_analysis::streaming_hooks(on_update),
        }
    }

    #[must_use]
    pub fn polling_hooks(self, on_update: Option<UpdateNotifier>) -> PollingHooks {
        match self {
            TaskKind::ComputePi => compute_pi::polling_hooks(on_update),
            TaskKind::DocumentAnalysis => document_analysis::polling_hooks(on_update),
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compute-pi" | "pi" => Ok(TaskKind::ComputePi),
            "document-analysis" | "docs" => Ok(TaskKind::DocumentAnalysis),
            _ => Err(ValidationError::InvalidTaskKind {
                value: value.to_owned(),
            }),
        }
    }
}

/// Workload definition shared by both delivery modes of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum TaskParameters {
    ComputePi {
        digits: u64,
    },
    DocumentAnalysis {
        document_path: Option<String>,
        document_url: Option<String>,
        keywords: Vec<String>,
    },
}

impl TaskParameters {
    #[must_use]
    pub const fn kind(&self) -> TaskKind {
        match self {
            TaskParameters::ComputePi { .. } => TaskKind::ComputePi,
            TaskParameters::DocumentAnalysis { .. } => TaskKind::DocumentAnalysis,
        }
    }

    /// Body of the streaming task creation call.
    #[must_use]
    pub fn start_body(&self) -> Value {
        match self {
            TaskParameters::ComputePi { digits } => json!({ "n": digits }),
            TaskParameters::DocumentAnalysis {
                document_path,
                document_url,
                keywords,
            } => json!({
                "document_path": document_path,
                "document_url": document_url,
                "keywords": keywords,
            }),
        }
    }

    /// Body registering the polling twin of `task_id`.
    #[must_use]
    pub fn polling_body(&self, task_id: &str) -> Value {
        match self {
            TaskParameters::ComputePi { digits } => json!({
                "digits": digits,
                "task_id": task_id,
                "demo": true,
            }),
            TaskParameters::DocumentAnalysis {
                document_path,
                document_url,
                keywords,
            } => json!({
                "task_id": task_id,
                "document_path": document_path,
                "document_url": document_url,
                "keywords": keywords,
                "demo": true,
            }),
        }
    }
}
