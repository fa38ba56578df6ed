use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("URL '{url}' cannot carry a path.")]
    CannotBeABase { url: String },
    #[error("Unsupported URL scheme '{scheme}' for a socket base (use http, https, ws or wss).")]
    UnsupportedScheme { scheme: String },
    #[error("Failed to build HTTP client: {source}")]
    BuildClientFailed {
        #[source]
        source: reqwest::Error,
    },
}
