//! GraphQL transport.

use crate::error::{GhqlError, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value as Json};

pub const DEFAULT_ENDPOINT: &str = "https://api.github.com/graphql";

/// The single entry point remote tables use to reach the API.
///
/// Implementations return the raw response envelope (`data` and `errors`);
/// callers decide what counts as a usable response.
#[async_trait]
pub trait GraphqlClient: Send + Sync {
    async fn query(&self, document: &str, variables: &Json) -> Result<Json>;
}

/// Extracts `data` from a response envelope.
///
/// Any `errors` entry fails the whole response, even when `data` is present,
/// so a partially resolved connection is never read as a complete one.
pub fn response_data(mut response: Json) -> Result<Json> {
    let errors = match response.get("errors") {
        Some(Json::Array(errors)) if !errors.is_empty() => Some(
            errors
                .iter()
                .map(|e| e.get("message").and_then(Json::as_str).unwrap_or("unknown error"))
                .collect::<Vec<_>>()
                .join("; "),
        ),
        _ => None,
    };
    let data = response
        .get_mut("data")
        .map(Json::take)
        .filter(|d| !d.is_null());

    match (data, errors) {
        (Some(_), Some(errors)) => Err(GhqlError::PartialData(errors)),
        (None, Some(errors)) => Err(GhqlError::GraphQl(errors)),
        (Some(data), None) => Ok(data),
        (None, None) => Err(GhqlError::MissingField("data".into())),
    }
}

/// GraphQL over HTTPS with bearer-token authentication.
#[derive(Debug)]
pub struct HttpGraphqlClient {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
    remaining: Mutex<Option<u64>>,
}

impl HttpGraphqlClient {
    pub fn new(endpoint: impl Into<String>, token: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("devsql/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            token: token.filter(|t| !t.is_empty()),
            remaining: Mutex::new(None),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Server-side request budget left, from the last response's
    /// `x-ratelimit-remaining` header.
    pub fn remaining(&self) -> Option<u64> {
        *self.remaining.lock()
    }
}

#[async_trait]
impl GraphqlClient for HttpGraphqlClient {
    async fn query(&self, document: &str, variables: &Json) -> Result<Json> {
        let token = self.token.as_deref().ok_or(GhqlError::MissingToken)?;

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(token)
            .json(&json!({ "query": document, "variables": variables }))
            .send()
            .await?;

        let remaining = resp
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        if let Some(remaining) = remaining {
            *self.remaining.lock() = Some(remaining);
            if remaining == 0 {
                tracing::warn!(endpoint = %self.endpoint, "server rate limit exhausted");
            }
        }

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "request rejected");
            return Err(GhqlError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(resp.json::<Json>().await?)
    }
}
