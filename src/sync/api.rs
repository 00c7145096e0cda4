use crate::middleware::auth::CALLER_ID_HEADER;
use crate::routes::conversations::{
    ConversationDto, ConversationSummaryDto, CreateConversationRequest, MarkReadResponse,
};
use crate::routes::messages::{HistoryResponse, MessageDto, SendMessageRequest};
use async_trait::async_trait;
use error_types::ErrorResponse;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Could not reach the server or read the response; retrying is safe for
    /// polls, sends go through the provisional-entry rollback instead.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The server answered with an error body.
    #[error("rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
}

/// What a client needs from the server. The HTTP implementation below talks
/// to the real service; tests drive the protocol against an in-memory one.
#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn start_conversation(&self, peer_id: Uuid) -> Result<ConversationDto, ApiError>;

    async fn list_conversations(&self) -> Result<Vec<ConversationSummaryDto>, ApiError>;

    async fn message_page(
        &self,
        conversation_id: Uuid,
        page: i64,
        limit: i64,
    ) -> Result<HistoryResponse, ApiError>;

    async fn send_message(
        &self,
        conversation_id: Uuid,
        request: &SendMessageRequest,
    ) -> Result<MessageDto, ApiError>;

    async fn mark_read(&self, conversation_id: Uuid) -> Result<u64, ApiError>;
}

/// reqwest-backed implementation against the service's HTTP surface.
pub struct HttpChatApi {
    http: reqwest::Client,
    base_url: String,
    caller_id: Uuid,
}

impl HttpChatApi {
    pub fn new(base_url: impl Into<String>, caller_id: Uuid) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            caller_id,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }

    async fn read<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let status = response.status();
        if status.is_success() {
            response
                .json::<T>()
                .await
                .map_err(|e| ApiError::Transport(format!("decode: {e}")))
        } else {
            let message = match response.json::<ErrorResponse>().await {
                Ok(body) => body.message,
                Err(_) => status.to_string(),
            };
            Err(ApiError::Rejected {
                status: status.as_u16(),
                message,
            })
        }
    }
}

#[async_trait]
impl ChatApi for HttpChatApi {
    async fn start_conversation(&self, peer_id: Uuid) -> Result<ConversationDto, ApiError> {
        let response = self
            .http
            .post(self.url("/conversations"))
            .header(CALLER_ID_HEADER, self.caller_id.to_string())
            .json(&CreateConversationRequest { peer_id })
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Self::read(response).await
    }

    async fn list_conversations(&self) -> Result<Vec<ConversationSummaryDto>, ApiError> {
        let response = self
            .http
            .get(self.url("/conversations"))
            .header(CALLER_ID_HEADER, self.caller_id.to_string())
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Self::read(response).await
    }

    async fn message_page(
        &self,
        conversation_id: Uuid,
        page: i64,
        limit: i64,
    ) -> Result<HistoryResponse, ApiError> {
        let response = self
            .http
            .get(self.url(&format!("/conversations/{conversation_id}/messages")))
            .query(&[("page", page), ("limit", limit)])
            .header(CALLER_ID_HEADER, self.caller_id.to_string())
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Self::read(response).await
    }

    async fn send_message(
        &self,
        conversation_id: Uuid,
        request: &SendMessageRequest,
    ) -> Result<MessageDto, ApiError> {
        let response = self
            .http
            .post(self.url(&format!("/conversations/{conversation_id}/messages")))
            .header(CALLER_ID_HEADER, self.caller_id.to_string())
            .json(request)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Self::read(response).await
    }

    async fn mark_read(&self, conversation_id: Uuid) -> Result<u64, ApiError> {
        let response = self
            .http
            .post(self.url(&format!("/conversations/{conversation_id}/read")))
            .header(CALLER_ID_HEADER, self.caller_id.to_string())
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let body: MarkReadResponse = Self::read(response).await?;
        Ok(body.marked)
    }
}
