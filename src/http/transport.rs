use async_trait::async_trait;
use std::fmt;

use crate::github::GitHubError;

/// HTTP verbs the rollout needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
        };
        f.write_str(verb)
    }
}

/// Undecoded response from the transport.
#[derive(Debug, Clone, Default)]
pub struct RawResponse {
    pub status: u16,
    /// Raw `Link` header, if the response carried one.
    pub link: Option<String>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Value of the `Link` header, or an empty string.
    pub fn link_header(&self) -> String {
        self.link.clone().unwrap_or_default()
    }
}

/// Authenticated REST transport against a fixed GitHub host.
///
/// `path` is either relative to the API root (`orgs/x/repos`) or an absolute URL taken
/// from a continuation link. Non-2xx statuses are returned as responses, not errors.
#[async_trait]
pub trait RestTransport: Send + Sync + fmt::Debug {
    async fn request(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<RawResponse, GitHubError>;
}
