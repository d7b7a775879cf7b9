//! Blocking HTTP behind a small trait so adapters and the executor can be
//! tested without a network.

use std::io::{self, Read};
use tracing::debug;

const USER_AGENT: &str = concat!("cdnsync/", env!("CARGO_PKG_VERSION"));

/// Longest error body kept in a [`FetchError::Status`].
const MAX_ERROR_BODY: usize = 512;

/// A successful (2xx) response.
pub struct HttpResponse {
    /// Value of the Content-Length header, when sent.
    pub content_length: Option<u64>,
    /// Response body, read incrementally.
    pub body: Box<dyn Read + Send>,
}

impl HttpResponse {
    /// Wrap an in-memory body.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            content_length: Some(bytes.len() as u64),
            body: Box::new(io::Cursor::new(bytes)),
        }
    }
}

/// Transport-level failures.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },
    #[error("{url} returned status {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },
    #[error("failed to read response from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: io::Error,
    },
}

impl FetchError {
    /// HTTP status for status errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Issues GET requests.
pub trait HttpClient {
    /// GET `url`. Non-2xx responses are errors.
    fn get(&self, url: &str) -> Result<HttpResponse, FetchError>;

    /// GET `url` and read the whole body.
    fn get_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let mut response = self.get(url)?;
        let mut bytes = Vec::new();
        response
            .body
            .read_to_end(&mut bytes)
            .map_err(|source| FetchError::Body {
                url: url.to_string(),
                source,
            })?;
        Ok(bytes)
    }
}

/// [`HttpClient`] backed by a `ureq` agent. No timeouts are set; transport
/// defaults apply.
#[derive(Debug, Clone)]
pub struct UreqClient {
    agent: ureq::Agent,
}

impl UreqClient {
    pub fn new() -> Self {
        Self {
            agent: ureq::AgentBuilder::new().user_agent(USER_AGENT).build(),
        }
    }
}

impl Default for UreqClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient for UreqClient {
    fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
        debug!(url, "GET");

        match self.agent.get(url).call() {
            Ok(response) => {
                let content_length = response
                    .header("Content-Length")
                    .and_then(|v| v.parse().ok());
                Ok(HttpResponse {
                    content_length,
                    body: Box::new(response.into_reader()),
                })
            }
            Err(ureq::Error::Status(status, response)) => {
                let mut body = response.into_string().unwrap_or_default();
                if body.len() > MAX_ERROR_BODY {
                    let mut end = MAX_ERROR_BODY;
                    while !body.is_char_boundary(end) {
                        end -= 1;
                    }
                    body.truncate(end);
                }
                Err(FetchError::Status {
                    url: url.to_string(),
                    status,
                    body,
                })
            }
            Err(e) => Err(FetchError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            }),
        }
    }
}
