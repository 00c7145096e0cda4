use crate::middleware::guards::{Participant, User};
use crate::services::conversation_service::{ConversationService, ConversationSummary};
use crate::services::delivery::DeliveryService;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct ConversationDto {
    pub id: Uuid,
    pub peer_id: Uuid,
    pub last_message_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateConversationRequest {
    pub peer_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LastMessageDto {
    pub id: Uuid,
    pub preview: String,
    pub created_at: DateTime<Utc>,
    pub read: bool,
    pub mine: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummaryDto {
    pub id: Uuid,
    pub peer_id: Uuid,
    pub last_message: Option<LastMessageDto>,
    pub unread_count: i64,
    pub last_message_at: DateTime<Utc>,
}

impl From<ConversationSummary> for ConversationSummaryDto {
    fn from(summary: ConversationSummary) -> Self {
        ConversationSummaryDto {
            id: summary.conversation_id,
            peer_id: summary.peer_id,
            last_message: summary.last_message.map(|m| LastMessageDto {
                id: m.id,
                preview: m.preview,
                created_at: m.created_at,
                read: m.read,
                mine: m.mine,
            }),
            unread_count: summary.unread_count,
            last_message_at: summary.last_message_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MarkReadResponse {
    /// Number of messages transitioned to read; 0 when nothing was unread.
    pub marked: u64,
}

/// POST /conversations
/// Find or start the conversation between the caller and `peer_id`.
pub async fn create_conversation(
    State(state): State<AppState>,
    user: User,
    Json(body): Json<CreateConversationRequest>,
) -> Result<Json<ConversationDto>, crate::error::AppError> {
    let conversation = ConversationService::get_or_create(&state.db, user.id, body.peer_id).await?;
    let peer_id = conversation
        .peer_of(user.id)
        .ok_or(crate::error::AppError::Internal)?;

    Ok(Json(ConversationDto {
        id: conversation.id,
        peer_id,
        last_message_at: conversation.last_message_at,
        created_at: conversation.created_at,
    }))
}

/// GET /conversations
pub async fn list_conversations(
    State(state): State<AppState>,
    user: User,
) -> Result<Json<Vec<ConversationSummaryDto>>, crate::error::AppError> {
    let summaries = ConversationService::list_for_user(&state.db, user.id).await?;
    Ok(Json(summaries.into_iter().map(Into::into).collect()))
}

/// POST /conversations/{id}/read
/// Bulk-mark the caller's incoming messages as read.
pub async fn mark_read(
    State(state): State<AppState>,
    user: User,
    Path(id): Path<Uuid>,
) -> Result<Json<MarkReadResponse>, crate::error::AppError> {
    let participant = Participant::verify(&state.db, user.id, id).await?;

    let marked =
        DeliveryService::mark_conversation_read(&state.db, participant.conversation_id, user.id)
            .await?;

    Ok(Json(MarkReadResponse { marked }))
}
