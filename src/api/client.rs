//! HTTP client for the banking assistant backend.
//!
//! The backend exposes one chat endpoint per master agent plus an agent
//! directory and a liveness probe. The chat exchange is a single
//! request/response pair; routing happens server-side and is reported back
//! through `agent_name`.

use std::error::Error as StdError;
use std::fmt;

use crate::api::{AgentDirectory, ChatRequest, ChatResponse, HealthStatus};
use crate::utils::url::join_url;

#[derive(Debug)]
pub enum ApiError {
    /// Transport-level failure: connection refused, DNS, timeout, bad body.
    Network(reqwest::Error),

    /// The backend answered with a non-success status.
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Network(source) => write!(f, "Request failed: {source}"),
            ApiError::Status { status, body } => {
                if body.trim().is_empty() {
                    write!(f, "Backend returned {status}")
                } else {
                    write!(f, "Backend returned {status}: {body}")
                }
            }
        }
    }
}

impl StdError for ApiError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ApiError::Network(source) => Some(source),
            ApiError::Status { .. } => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(source: reqwest::Error) -> Self {
        ApiError::Network(source)
    }
}

#[derive(Clone)]
pub struct BankingClient {
    client: reqwest::Client,
    base_url: String,
}

impl BankingClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.to_string(),
        }
    }

    /// Send one chat message to the given agent endpoint (`/chat` for the
    /// routing agent, `/accounts/chat` etc. for direct specialist access).
    pub async fn send_chat(
        &self,
        endpoint: &str,
        request: &ChatRequest,
    ) -> Result<ChatResponse, ApiError> {
        let response = self
            .client
            .post(join_url(&self.base_url, endpoint))
            .json(request)
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(response.json::<ChatResponse>().await?)
    }

    /// Directory of available agents. Informational surfaces only; the chat
    /// lifecycle never consults this.
    pub async fn list_agents(&self) -> Result<AgentDirectory, ApiError> {
        let response = self
            .client
            .get(join_url(&self.base_url, "agents"))
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(response.json::<AgentDirectory>().await?)
    }

    /// Liveness probe, consumed at application start.
    pub async fn check_health(&self) -> Result<HealthStatus, ApiError> {
        let response = self
            .client
            .get(join_url(&self.base_url, "health"))
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(response.json::<HealthStatus>().await?)
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_else(|_| "<no body>".to_string());
    Err(ApiError::Status { status, body })
}
