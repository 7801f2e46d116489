//! Client for the OpenAI Assistants v2 API.
//!
//! [`OpenAIHandler`] implements [`chat_relay::AssistantBackend`] over plain
//! JSON HTTP calls: threads, messages and runs.

mod models;
mod runs;
mod threads;

use std::time::Duration;

use async_trait::async_trait;
use chat_relay::{AssistantBackend, RelayError, Run, Step, ThreadId, ThreadMessage};
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::*;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

const BETA_HEADER: &str = "OpenAI-Beta";
const BETA_ASSISTANTS: &str = "assistants=v2";

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("invalid base url {url}: {reason}")]
    BaseUrl { url: String, reason: String },
    #[error("http client: {0}")]
    Http(#[from] reqwest::Error),
}

pub struct OpenAIHandler {
    client: Client,
    api_key: String,
    assistant_id: String,
    base_url: Url,
}

impl OpenAIHandler {
    pub fn new(
        api_key: impl Into<String>,
        assistant_id: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let raw = base_url.into();
        let trimmed = raw.trim_end_matches('/');
        let base_url = Url::parse(trimmed).map_err(|e| ClientError::BaseUrl {
            url: raw.clone(),
            reason: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::BaseUrl {
                url: raw,
                reason: "not a hierarchical url".to_string(),
            });
        }

        let client = Client::builder().timeout(timeout).build()?;
        Ok(OpenAIHandler {
            client,
            api_key: api_key.into(),
            assistant_id: assistant_id.into(),
            base_url,
        })
    }

    pub fn assistant_id(&self) -> &str {
        &self.assistant_id
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Appends `segments` to the base url, each percent-encoded as exactly
    /// one path segment. Ids that are empty or dot segments are refused.
    fn url(&self, step: Step, segments: &[&str]) -> Result<Url, RelayError> {
        if let Some(bad) = segments
            .iter()
            .find(|s| s.is_empty() || **s == "." || **s == "..")
        {
            return Err(RelayError::upstream(
                step,
                None,
                format!("invalid path segment {:?}", bad),
            ));
        }
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| RelayError::upstream(step, None, "base url cannot take a path"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Request with the credentials and beta header every endpoint needs.
    fn request(
        &self,
        step: Step,
        method: Method,
        segments: &[&str],
    ) -> Result<RequestBuilder, RelayError> {
        let url = self.url(step, segments)?;
        Ok(self
            .client
            .request(method, url)
            .bearer_auth(&self.api_key)
            .header(BETA_HEADER, BETA_ASSISTANTS))
    }

    /// Sends the request and keeps the response only if it is a success.
    async fn send(&self, step: Step, req: RequestBuilder) -> Result<Response, RelayError> {
        let resp = req
            .send()
            .await
            .map_err(|e| RelayError::upstream(step, None, e.to_string()))?;
        trace!("{} {} {:?}", step, resp.url(), resp.status());

        let status = resp.status();
        if !status.is_success() {
            let err_text = resp
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            warn!("{} rejected with {}: {}", step, status, err_text);
            return Err(RelayError::upstream(step, Some(status.as_u16()), err_text));
        }
        Ok(resp)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        step: Step,
        req: RequestBuilder,
    ) -> Result<T, RelayError> {
        let resp = self.send(step, req).await?;
        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| RelayError::upstream(step, None, format!("unreadable body: {e}")))?;
        trace!("{} response {}", step, body);
        serde_json::from_value(body)
            .map_err(|e| RelayError::upstream(step, None, format!("unexpected body: {e}")))
    }
}

#[async_trait]
impl AssistantBackend for OpenAIHandler {
    async fn create_thread(&self) -> Result<ThreadId, RelayError> {
        threads::create_thread(self).await
    }

    async fn post_message(&self, thread: &ThreadId, content: &str) -> Result<(), RelayError> {
        threads::post_message(self, thread, content).await
    }

    async fn start_run(&self, thread: &ThreadId) -> Result<Run, RelayError> {
        runs::start_run(self, thread).await
    }

    async fn get_run(&self, thread: &ThreadId, run_id: &str) -> Result<Run, RelayError> {
        runs::get_run(self, thread, run_id).await
    }

    async fn cancel_run(&self, thread: &ThreadId, run_id: &str) -> Result<(), RelayError> {
        runs::cancel_run(self, thread, run_id).await
    }

    async fn list_messages(&self, thread: &ThreadId) -> Result<Vec<ThreadMessage>, RelayError> {
        threads::list_messages(self, thread).await
    }
}
