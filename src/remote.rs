//! Request/response exchange with the game server
//!
//! One call is one POST. There are no retries, no timeout and no backoff:
//! every transport or decode failure comes back as a single `ClientError`
//! and the caller decides what to do with it.

use crate::protocol::{endpoints, CommandRequest, CommandResponse, UpdateRequest, UpdateResponse};
use crate::{ClientError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

/// The server as seen by the poller and the dispatcher
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Send a mutating command to `/cmd`.
    async fn command(&self, request: &CommandRequest) -> Result<CommandResponse>;

    /// Query `/update` for the session state and new chat.
    async fn update(&self, request: &UpdateRequest) -> Result<UpdateResponse>;
}

/// `RemoteClient` over HTTP with JSON bodies
pub struct HttpRemoteClient {
    client: Client,
    base_url: String,
}

impl HttpRemoteClient {
    /// Create a client for `base_url` (trailing slashes are ignored).
    pub fn new(base_url: &str) -> Result<Self> {
        // No request timeout: a stalled call only delays its own loop.
        let client = Client::builder()
            .user_agent(concat!("soup-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    /// POST `payload` to `endpoint` and decode the JSON reply.
    async fn send<Req, Resp>(&self, endpoint: &str, payload: &Req) -> Result<Resp>
    where
        Req: Serialize + Sync + ?Sized,
        Resp: DeserializeOwned,
    {
        let url = self.url_for(endpoint);

        let response = self
            .client
            .post(&url)
            .json(payload)
            .send()
            .await
            .map_err(|e| map_reqwest_error(endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| map_reqwest_error(endpoint, e))?;

        debug!("{} replied with {} bytes", endpoint, body.len());

        decode_body(endpoint, &body)
    }
}

#[async_trait]
impl RemoteClient for HttpRemoteClient {
    async fn command(&self, request: &CommandRequest) -> Result<CommandResponse> {
        self.send(endpoints::COMMAND, request).await
    }

    async fn update(&self, request: &UpdateRequest) -> Result<UpdateResponse> {
        self.send(endpoints::UPDATE, request).await
    }
}

fn map_reqwest_error(endpoint: &str, e: reqwest::Error) -> ClientError {
    let message = if e.is_connect() {
        format!("connection failed: {e}")
    } else if e.is_decode() || e.is_body() {
        format!("body read failed: {e}")
    } else {
        e.to_string()
    };
    ClientError::Transport {
        endpoint: endpoint.to_string(),
        message,
    }
}

/// Decode a response body, reporting parse failures as malformed responses.
pub(crate) fn decode_body<T: DeserializeOwned>(endpoint: &str, body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|e| ClientError::MalformedResponse {
        endpoint: endpoint.to_string(),
        message: e.to_string(),
    })
}
