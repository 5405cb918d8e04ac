use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

use super::errors::GitHubError;
use super::types::PageLink;
use crate::http::{HttpMethod, RestTransport};
use crate::observability::ApiMetrics;

/// Decoded result of a single API call.
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    pub status: u16,
    /// Raw `Link` header value, empty when the response carried none.
    pub next_page: String,
    /// `None` for empty bodies and `204 No Content`.
    pub data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    #[serde(default)]
    errors: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

/// Paginated JSON client over a [`RestTransport`].
///
/// Decodes bodies into the caller's type, exposes the continuation link of every
/// response, and follows continuation links for list endpoints. It never retries.
#[derive(Debug, Clone)]
pub struct ApiClient {
    transport: Arc<dyn RestTransport>,
    metrics: Arc<ApiMetrics>,
    max_pages: Option<u32>,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn RestTransport>) -> Self {
        Self {
            transport,
            metrics: Arc::new(ApiMetrics::new()),
            max_pages: None,
        }
    }

    /// Stop pagination with an error after this many pages.
    pub fn with_max_pages(mut self, max_pages: Option<u32>) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn metrics(&self) -> &ApiMetrics {
        &self.metrics
    }

    /// Issue one request and decode its body into `T`.
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<ApiResponse<T>, GitHubError> {
        self.metrics.record_request();

        let response = match self.transport.request(method, path, body).await {
            Ok(response) => response,
            Err(e) => {
                self.metrics.record_error();
                if matches!(e, GitHubError::Timeout { .. }) {
                    self.metrics.record_timeout();
                }
                return Err(e);
            }
        };

        let status = response.status;
        let next_page = response.link_header();
        debug!(%method, path, status, "GitHub API response");

        if !response.is_success() {
            self.metrics.record_error();
            return Err(GitHubError::Api {
                status,
                method: method.to_string(),
                path: path.to_string(),
                message: error_message(&response.body),
            });
        }

        let data = if status == 204 || response.body.iter().all(u8::is_ascii_whitespace) {
            None
        } else {
            let decoded =
                serde_json::from_slice(&response.body).map_err(|source| GitHubError::Decode {
                    path: path.to_string(),
                    source,
                })?;
            Some(decoded)
        };

        Ok(ApiResponse {
            status,
            next_page,
            data,
        })
    }

    /// Like [`ApiClient::call`] but the response must carry a body.
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<T, GitHubError> {
        let response = self.call(method, path, body).await?;
        response.data.ok_or_else(|| GitHubError::Api {
            status: response.status,
            method: method.to_string(),
            path: path.to_string(),
            message: "expected a JSON body but the response was empty".to_string(),
        })
    }

    /// GET `path` and every page after it.
    ///
    /// The loop ends when a response carries no `rel="next"` link. With `max_pages`
    /// set, a host that keeps returning continuation links yields
    /// [`GitHubError::PaginationLimit`] instead of looping.
    pub async fn get_paginated<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<Vec<T>, GitHubError> {
        let mut results = Vec::new();
        let mut target = path.to_string();
        let mut pages = 0u32;

        loop {
            let response = self.call::<Vec<T>>(HttpMethod::Get, &target, None).await?;
            pages += 1;
            results.extend(response.data.unwrap_or_default());

            let next = find_next_page(&response.next_page);
            if !next.present {
                break;
            }
            if let Some(max_pages) = self.max_pages {
                if pages >= max_pages {
                    warn!(path, max_pages, "Pagination limit reached");
                    return Err(GitHubError::PaginationLimit {
                        path: path.to_string(),
                        max_pages,
                    });
                }
            }

            self.metrics.record_page_followed();
            debug!(next = %next.url, page = pages + 1, "Following continuation link");
            target = next.url;
        }

        Ok(results)
    }

    /// Check the configured credentials before a run touches any repository.
    pub async fn verify_authentication(&self) -> Result<(), GitHubError> {
        match self
            .call::<serde_json::Value>(HttpMethod::Get, "rate_limit", None)
            .await
        {
            Ok(_) => Ok(()),
            Err(GitHubError::Api {
                status: 401,
                message,
                ..
            }) => Err(GitHubError::Authentication(message)),
            // Enterprise Server answers 404 when rate limiting is disabled.
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// Extract the `rel="next"` target from an RFC 5988 `Link` header.
///
/// Empty or malformed headers yield [`PageLink::none`].
pub fn find_next_page(link_header: &str) -> PageLink {
    for segment in link_header.split(',') {
        let mut parts = segment.split(';');
        let Some(target) = parts.next().map(str::trim) else {
            continue;
        };
        let Some(url) = target.strip_prefix('<').and_then(|t| t.strip_suffix('>')) else {
            continue;
        };

        let is_next = parts.any(|param| {
            param.split_once('=').is_some_and(|(key, value)| {
                key.trim().eq_ignore_ascii_case("rel")
                    && value
                        .trim()
                        .trim_matches('"')
                        .split_whitespace()
                        .any(|rel| rel == "next")
            })
        });

        if is_next && !url.trim().is_empty() {
            return PageLink::next(url.trim());
        }
    }
    PageLink::none()
}

fn error_message(body: &[u8]) -> String {
    match serde_json::from_slice::<ErrorBody>(body) {
        Ok(parsed) => {
            let details: Vec<String> = parsed
                .errors
                .into_iter()
                .filter_map(|detail| detail.message)
                .collect();
            let message = parsed.message.unwrap_or_else(|| "no message".to_string());
            if details.is_empty() {
                message
            } else {
                format!("{message}: {}", details.join("; "))
            }
        }
        Err(_) if body.is_empty() => "no message".to_string(),
        Err(_) => String::from_utf8_lossy(body).chars().take(200).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ANSIBLE_LINKS: &str = "<https://api.github.com/organizations/1507452/repos?page=2>; rel=\"next\", <https://api.github.com/organizations/1507452/repos?page=9>; rel=\"last\"";

    #[test]
    fn finds_next_link_among_several() {
        assert_eq!(
            find_next_page(ANSIBLE_LINKS),
            PageLink::next("https://api.github.com/organizations/1507452/repos?page=2")
        );
    }

    #[test]
    fn empty_header_has_no_next_page() {
        assert_eq!(find_next_page(""), PageLink::none());
        assert!(!find_next_page("").present);
    }

    #[test]
    fn last_page_has_no_next_page() {
        let header = "<https://api.github.com/organizations/1/repos?page=1>; rel=\"first\", <https://api.github.com/organizations/1/repos?page=8>; rel=\"prev\"";
        assert_eq!(find_next_page(header), PageLink::none());
    }

    #[test]
    fn next_relation_may_come_last_and_unquoted() {
        let header = "<https://x/repos?page=1>; rel=prev, <https://x/repos?page=3>; rel=next";
        assert_eq!(find_next_page(header), PageLink::next("https://x/repos?page=3"));
    }

    #[test]
    fn malformed_headers_are_tolerated() {
        assert_eq!(find_next_page("garbage"), PageLink::none());
        assert_eq!(find_next_page("https://x; rel=\"next\""), PageLink::none());
        assert_eq!(find_next_page("<>; rel=\"next\""), PageLink::none());
        assert_eq!(find_next_page(",,;"), PageLink::none());
    }

    #[test]
    fn error_message_joins_validation_details() {
        let body = br#"{"message":"Validation Failed","errors":[{"resource":"PullRequest","code":"custom","message":"A pull request already exists for paradisisland:gh-cli/codescanningworkflow."}]}"#;
        assert_eq!(
            error_message(body),
            "Validation Failed: A pull request already exists for paradisisland:gh-cli/codescanningworkflow."
        );
        assert_eq!(error_message(br#"{"message":"Not Found"}"#), "Not Found");
        assert_eq!(error_message(b""), "no message");
        assert_eq!(error_message(b"<html>"), "<html>");
    }
}
