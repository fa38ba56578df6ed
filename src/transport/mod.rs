//! Request/response and socket adapters.
//!
//! Both adapters measure what crossed the wire and turn every transport
//! failure into a value; nothing here returns an error once a request or
//! connection is under way.
mod api;
mod http;
mod websocket;


pub use api::{HttpTaskApi, TaskApi, TaskRoutes};
pub use http::{ErrorCallback, FetchOutcome, HttpTransport};
pub use websocket::{
    MessageHandler, SignalHandler, SocketConnector, SocketErrorHandler, SocketHandle,
    SocketHandlers, WsConnector, derive_socket_base,
};

use std::time::Instant;

use url::Url;

use crate::error::TransportError;

/// Parse a user-supplied base URL.
///
/// # Errors
///
/// Returns an error when the value is not an absolute URL that can carry
/// a path.
pub fn parse_base_url(value: &str) -> Result<Url, TransportError> {
    let url = Url::parse(value).map_err(|source| TransportError::InvalidUrl {
        url: value.to_owned(),
        source,
    })?;
    if url.cannot_be_a_base() {
        return Err(TransportError::CannotBeABase {
            url: value.to_owned(),
        });
    }
    Ok(url)
}

/// Append path segments to a base URL, keeping its existing path.
pub(crate) fn with_segments<'segment, I>(base: &Url, segments: I) -> Result<Url, TransportError>
where
    I: IntoIterator<Item = &'segment str>,
{
    let mut url = base.clone();
    url.set_query(None);
    url.set_fragment(None);
    url.path_segments_mut()
        .map_err(|()| TransportError::CannotBeABase {
            url: base.to_string(),
        })?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Milliseconds since `start`, saturating.
#[must_use]
pub fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}
