use crate::middleware::guards::{Participant, User};
use crate::models::{Attachment, DeliveryStatus, Message, MessageKind};
use crate::services::message_service::{MessageService, NewAttachment, NewMessage};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentDto {
    pub id: Uuid,
    pub file_url: String,
    pub file_name: String,
    pub file_type: String,
    pub file_size: i64,
    pub thumbnail_url: Option<String>,
    pub duration_secs: Option<i32>,
}

impl From<Attachment> for AttachmentDto {
    fn from(attachment: Attachment) -> Self {
        AttachmentDto {
            id: attachment.id,
            file_url: attachment.file_url,
            file_name: attachment.file_name,
            file_type: attachment.file_type,
            file_size: attachment.file_size,
            thumbnail_url: attachment.thumbnail_url,
            duration_secs: attachment.duration_secs,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageDto {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub kind: MessageKind,
    pub status: DeliveryStatus,
    pub content: Option<String>,
    pub created_at: DateTime<Utc>,
    pub attachments: Vec<AttachmentDto>,
}

impl From<Message> for MessageDto {
    fn from(message: Message) -> Self {
        MessageDto {
            id: message.id,
            conversation_id: message.conversation_id,
            sender_id: message.sender_id,
            kind: message.kind,
            status: message.status,
            content: message.content,
            created_at: message.created_at,
            attachments: message.attachments.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub kind: MessageKind,
    pub content: Option<String>,
    #[serde(default)]
    pub attachments: Vec<NewAttachment>,
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub messages: Vec<MessageDto>,
    pub has_more: bool,
    pub page: i64,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// POST /conversations/{id}/messages
pub async fn send_message(
    State(state): State<AppState>,
    user: User,
    Path(id): Path<Uuid>,
    Json(body): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<MessageDto>), crate::error::AppError> {
    // Membership is checked again inside append; verifying here keeps the
    // 403/404 distinction ahead of body validation.
    Participant::verify(&state.db, user.id, id).await?;

    let message = MessageService::append(
        &state.db,
        id,
        user.id,
        NewMessage {
            kind: body.kind,
            content: body.content,
            attachments: body.attachments,
            idempotency_key: body.idempotency_key,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(message.into())))
}

/// GET /conversations/{id}/messages?page&limit
/// Page 1 is the newest window; each page is oldest-first.
pub async fn get_message_history(
    State(state): State<AppState>,
    user: User,
    Path(id): Path<Uuid>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, crate::error::AppError> {
    Participant::verify(&state.db, user.id, id).await?;

    let page = query.page.unwrap_or(1);
    let limit = query
        .limit
        .unwrap_or(state.config.history_page_size)
        .min(state.config.history_page_size_max);

    let (messages, has_more) = MessageService::list_page(&state.db, id, page, limit).await?;

    Ok(Json(HistoryResponse {
        messages: messages.into_iter().map(Into::into).collect(),
        has_more,
        page,
    }))
}

/// DELETE /messages/{id}
/// Only the original sender may delete a message.
pub async fn delete_message(
    State(state): State<AppState>,
    user: User,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, crate::error::AppError> {
    MessageService::delete(&state.db, state.attachments.as_ref(), id, user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
