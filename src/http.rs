//! HTTP implementation of [`TaskGateway`] on top of `reqwest`.
//!
//! Endpoints live under `{base_url}/api/v1/tasks`. Every response is an
//! [`Envelope`]; `success: false` fails even when the status is 2xx.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, ACCEPT};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::ApiConfig;
use crate::error::{Error, Result, FALLBACK_MESSAGE};
use crate::gateway::{Envelope, ListQuery, ReorderRequest, TaskGateway, TaskPage};
use crate::task::{format_api_date, ApiTask, OrderAssignment, Task, TaskDraft, TaskId, TaskPatch};

const TASKS_PATH: &str = "/api/v1/tasks";

/// Gateway talking to the task REST API.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpGateway {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent())
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim().trim_end_matches('/').to_string(),
            token: config
                .token
                .as_deref()
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .map(str::to_string),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a path below the tasks collection.
    pub fn tasks_url(&self, suffix: &str) -> String {
        format!("{}{}{}", self.base_url, TASKS_PATH, suffix)
    }

    fn request(&self, method: Method, suffix: &str) -> RequestBuilder {
        let url = self.tasks_url(suffix);
        tracing::debug!(%method, %url, "task api request");
        let builder = self
            .client
            .request(method, url)
            .header(ACCEPT, HeaderValue::from_static("application/json"));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<Envelope<T>> {
        let response = builder.send().await.map_err(|err| {
            tracing::warn!(error = %err, "task api unreachable");
            transport_error(&err)
        })?;
        let status = response.status();
        let body = response.text().await.map_err(|err| transport_error(&err))?;
        let result = decode_envelope(status, &body);
        if let Err(err) = &result {
            tracing::warn!(%status, error = %err, "task api request failed");
        }
        result
    }

    async fn send_task(&self, builder: RequestBuilder) -> Result<Task> {
        let envelope = self.send::<ApiTask>(builder).await?;
        Task::try_from(require_data(envelope.data)?)
    }
}

#[async_trait]
impl TaskGateway for HttpGateway {
    async fn list(&self, query: ListQuery) -> Result<TaskPage> {
        let mut params: Vec<(&str, String)> = Vec::new();
        if let Some(date) = query.date {
            params.push(("date", format_api_date(date)));
        }
        if let Some(per_page) = query.per_page {
            params.push(("per_page", per_page.to_string()));
        }

        let builder = self.request(Method::GET, "").query(&params);
        let envelope = self.send::<Vec<ApiTask>>(builder).await?;
        let tasks = require_data(envelope.data)?
            .into_iter()
            .map(Task::try_from)
            .collect::<Result<Vec<_>>>()?;

        Ok(TaskPage {
            tasks,
            pagination: envelope.meta,
        })
    }

    async fn get(&self, id: TaskId) -> Result<Task> {
        self.send_task(self.request(Method::GET, &format!("/{id}")))
            .await
    }

    async fn create(&self, draft: &TaskDraft) -> Result<Task> {
        self.send_task(self.request(Method::POST, "").json(draft))
            .await
    }

    async fn update(&self, id: TaskId, patch: &TaskPatch) -> Result<Task> {
        self.send_task(self.request(Method::PATCH, &format!("/{id}")).json(patch))
            .await
    }

    async fn delete(&self, id: TaskId) -> Result<()> {
        self.send::<serde_json::Value>(self.request(Method::DELETE, &format!("/{id}")))
            .await?;
        Ok(())
    }

    async fn toggle_completion(&self, id: TaskId) -> Result<Task> {
        self.send_task(self.request(Method::PATCH, &format!("/{id}/toggle-completion")))
            .await
    }

    async fn reorder(&self, assignments: &[OrderAssignment]) -> Result<Vec<Task>> {
        let body = ReorderRequest { tasks: assignments };
        let builder = self.request(Method::POST, "/reorder").json(&body);
        let envelope = self.send::<Vec<ApiTask>>(builder).await?;
        require_data(envelope.data)?
            .into_iter()
            .map(Task::try_from)
            .collect()
    }
}

/// Loose view of an error body; the data payload is irrelevant there.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    errors: Option<BTreeMap<String, Vec<String>>>,
}

/// Turn a raw response into an envelope, or the error it describes.
pub(crate) fn decode_envelope<T: DeserializeOwned>(
    status: StatusCode,
    body: &str,
) -> Result<Envelope<T>> {
    if !status.is_success() {
        let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
        return Err(error_for_status(status, parsed.message, parsed.errors));
    }

    let envelope: Envelope<T> = serde_json::from_str(body)
        .map_err(|err| Error::InvalidResponse(format!("malformed response body: {err}")))?;
    if !envelope.success {
        let message = non_blank(envelope.message).unwrap_or_else(|| FALLBACK_MESSAGE.to_string());
        return Err(Error::Rejected(message));
    }
    Ok(envelope)
}

fn error_for_status(
    status: StatusCode,
    message: Option<String>,
    errors: Option<BTreeMap<String, Vec<String>>>,
) -> Error {
    let message = non_blank(message).unwrap_or_else(|| generic_message(status));
    match status {
        StatusCode::UNPROCESSABLE_ENTITY | StatusCode::BAD_REQUEST => Error::Validation {
            message,
            errors: errors.unwrap_or_default(),
        },
        StatusCode::NOT_FOUND => Error::NotFound(message),
        StatusCode::UNAUTHORIZED => Error::Unauthorized(message),
        StatusCode::FORBIDDEN => Error::Forbidden(message),
        StatusCode::CONFLICT => Error::Conflict(message),
        _ => Error::Transport(message),
    }
}

fn generic_message(status: StatusCode) -> String {
    match status {
        StatusCode::UNPROCESSABLE_ENTITY | StatusCode::BAD_REQUEST => "Validation failed",
        StatusCode::NOT_FOUND => "Resource not found",
        StatusCode::UNAUTHORIZED => "Unauthenticated",
        StatusCode::FORBIDDEN => "This action is unauthorized",
        StatusCode::CONFLICT => "Resource conflict",
        StatusCode::TOO_MANY_REQUESTS => "Too many requests",
        s if s.is_server_error() => "Server error",
        _ => FALLBACK_MESSAGE,
    }
    .to_string()
}

fn transport_error(err: &reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Transport("Request timed out".to_string())
    } else if err.is_connect() {
        Error::Transport("Could not connect to the task API".to_string())
    } else {
        Error::Transport(format!("Network request failed: {err}"))
    }
}

fn require_data<T>(data: Option<T>) -> Result<T> {
    data.ok_or_else(|| Error::InvalidResponse("response carried no data".to_string()))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}
