use std::time::Duration;

use serde::Deserialize;

use crate::args::OutputFormat;
use crate::args::parsers::{parse_duration_value, split_keywords};
use crate::error::ValidationError;
use crate::profile::TaskKind;

/// Settings file contents. Every key mirrors a long CLI flag with dashes
/// turned into underscores.
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    pub base_url: Option<String>,
    pub ws_base_url: Option<String>,
    pub kind: Option<TaskKind>,
    pub clients: Option<usize>,
    pub poll_interval: Option<DurationValue>,
    pub keepalive: Option<DurationValue>,
    pub digits: Option<u64>,
    pub document_path: Option<String>,
    pub document_url: Option<String>,
    pub keywords: Option<KeywordList>,
    pub render_interval: Option<DurationValue>,
    pub max_duration: Option<DurationValue>,
    pub output: Option<OutputFormat>,
    pub per_client: Option<bool>,
    pub verbose: Option<bool>,
    pub no_color: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DurationValue {
    Seconds(u64),
    Text(String),
}

impl DurationValue {
    pub(crate) fn to_duration(&self) -> Result<Duration, ValidationError> {
        match self {
            DurationValue::Seconds(secs) => {
                if *secs == 0 {
                    Err(ValidationError::DurationZero)
                } else {
                    Ok(Duration::from_secs(*secs))
                }
            }
            DurationValue::Text(text) => parse_duration_value(text),
        }
    }
}

/// `keywords = ["a", "b"]` or `keywords = "a,b"`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum KeywordList {
    List(Vec<String>),
    Text(String),
}

impl KeywordList {
    pub(crate) fn to_keywords(&self) -> Vec<String> {
        match self {
            KeywordList::List(items) => items
                .iter()
                .map(|item| item.trim())
                .filter(|item| !item.is_empty())
                .map(str::to_owned)
                .collect(),
            KeywordList::Text(text) => split_keywords(text),
        }
    }
}
