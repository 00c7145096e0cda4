use crate::error::AppError;
use crate::models::{Attachment, DeliveryStatus, Message, MessageKind};
use crate::services::{
    attachment_validator, conversation_service::ConversationService, delivery::DeliveryService,
};
use crate::storage::ObjectStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Postgres, Row};
use std::collections::HashMap;
use uuid::Uuid;

/// Attachment metadata as declared by the client (normally echoed back from
/// the upload endpoint). Re-validated on append.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAttachment {
    pub file_url: String,
    pub file_name: String,
    pub file_type: String,
    pub file_size: i64,
    pub storage_key: String,
    pub thumbnail_url: Option<String>,
    pub duration_secs: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub kind: MessageKind,
    pub content: Option<String>,
    pub attachments: Vec<NewAttachment>,
    /// Optional client token; a repeated token returns the original message
    /// instead of appending twice.
    pub idempotency_key: Option<String>,
}

pub struct MessageService;

impl MessageService {
    /// Append a message to a conversation as one atomic unit: message row,
    /// delivered transition, attachment rows and the parent's
    /// `last_message_at` all commit or roll back together.
    pub async fn append(
        db: &Pool<Postgres>,
        conversation_id: Uuid,
        sender_id: Uuid,
        new: NewMessage,
    ) -> Result<Message, AppError> {
        let conversation = ConversationService::find(db, conversation_id).await?;
        if !conversation.has_participant(sender_id) {
            return Err(AppError::Forbidden);
        }

        // All validation happens before the first write.
        attachment_validator::validate_shape(new.kind, new.content.as_deref(), &new.attachments)?;

        if let Some(key) = new.idempotency_key.as_deref() {
            if let Some(existing) =
                Self::find_by_idempotency_key(db, conversation_id, sender_id, key).await?
            {
                return Ok(existing);
            }
        }

        let id = Uuid::new_v4();
        let mut tx = db.begin().await?;

        let insert = sqlx::query(
            "INSERT INTO messages (id, conversation_id, sender_id, kind, status, content, idempotency_key) \
             VALUES ($1, $2, $3, $4, 'sent', $5, $6) RETURNING created_at",
        )
        .bind(id)
        .bind(conversation_id)
        .bind(sender_id)
        .bind(new.kind.as_str())
        .bind(new.content.as_deref())
        .bind(new.idempotency_key.as_deref())
        .fetch_one(&mut *tx)
        .await;

        let created_at: DateTime<Utc> = match insert {
            Ok(row) => row.get("created_at"),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                // Lost an idempotency race: the other append won, return its row.
                drop(tx);
                if let Some(key) = new.idempotency_key.as_deref() {
                    if let Some(existing) =
                        Self::find_by_idempotency_key(db, conversation_id, sender_id, key).await?
                    {
                        return Ok(existing);
                    }
                }
                return Err(AppError::Database(sqlx::Error::Database(db_err)));
            }
            Err(e) => return Err(e.into()),
        };

        // Stored and visible to the recipient's next poll counts as delivered.
        DeliveryService::mark_delivered(&mut tx, id).await?;

        for attachment in &new.attachments {
            sqlx::query(
                "INSERT INTO message_attachments \
                 (id, message_id, file_url, file_name, file_type, file_size, storage_key, thumbnail_url, duration_secs) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            )
            .bind(Uuid::new_v4())
            .bind(id)
            .bind(&attachment.file_url)
            .bind(&attachment.file_name)
            .bind(&attachment.file_type)
            .bind(attachment.file_size)
            .bind(&attachment.storage_key)
            .bind(attachment.thumbnail_url.as_deref())
            .bind(attachment.duration_secs)
            .execute(&mut *tx)
            .await?;
        }

        ConversationService::touch_last_message(&mut tx, conversation_id, created_at).await?;

        tx.commit().await?;

        Self::find(db, id).await
    }

    pub async fn find(db: &Pool<Postgres>, id: Uuid) -> Result<Message, AppError> {
        let row = sqlx::query(
            "SELECT id, conversation_id, sender_id, kind, status, content, created_at \
             FROM messages WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or(AppError::NotFound)?;

        let mut message = Self::row_to_message(&row)?;
        let mut attachments = Self::attachments_for(db, &[message.id]).await?;
        message.attachments = attachments.remove(&message.id).unwrap_or_default();
        Ok(message)
    }

    async fn find_by_idempotency_key(
        db: &Pool<Postgres>,
        conversation_id: Uuid,
        sender_id: Uuid,
        key: &str,
    ) -> Result<Option<Message>, AppError> {
        let row = sqlx::query(
            "SELECT id FROM messages \
             WHERE conversation_id = $1 AND sender_id = $2 AND idempotency_key = $3",
        )
        .bind(conversation_id)
        .bind(sender_id)
        .bind(key)
        .fetch_optional(db)
        .await?;

        match row {
            Some(row) => Ok(Some(Self::find(db, row.get("id")).await?)),
            None => Ok(None),
        }
    }

    /// One page of history. Page 1 is the newest window; higher pages walk
    /// toward older messages. Rows inside a page run oldest-first so a client
    /// can prepend pages directly. `has_more` is true while older history
    /// remains.
    pub async fn list_page(
        db: &Pool<Postgres>,
        conversation_id: Uuid,
        page: i64,
        page_size: i64,
    ) -> Result<(Vec<Message>, bool), AppError> {
        if page < 1 {
            return Err(AppError::BadRequest("page starts at 1".into()));
        }
        let page_size = clamp_page_size(page_size);

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE conversation_id = $1")
                .bind(conversation_id)
                .fetch_one(db)
                .await?;

        let rows = sqlx::query(
            "SELECT id, conversation_id, sender_id, kind, status, content, created_at \
             FROM messages WHERE conversation_id = $1 \
             ORDER BY created_at DESC, id DESC \
             LIMIT $2 OFFSET $3",
        )
        .bind(conversation_id)
        .bind(page_size)
        .bind((page - 1) * page_size)
        .fetch_all(db)
        .await?;

        let mut messages = rows
            .iter()
            .map(Self::row_to_message)
            .collect::<Result<Vec<_>, _>>()?;
        // Fetched newest-first for the window; flip to chronological order.
        messages.reverse();

        let ids: Vec<Uuid> = messages.iter().map(|m| m.id).collect();
        let mut attachments = Self::attachments_for(db, &ids).await?;
        for message in &mut messages {
            message.attachments = attachments.remove(&message.id).unwrap_or_default();
        }

        Ok((messages, has_older(page, page_size, total)))
    }

    /// Sender-only delete; attachment rows cascade, stored objects are
    /// cleaned up best-effort afterwards.
    pub async fn delete(
        db: &Pool<Postgres>,
        store: &dyn ObjectStore,
        message_id: Uuid,
        requester_id: Uuid,
    ) -> Result<(), AppError> {
        let row = sqlx::query("SELECT sender_id FROM messages WHERE id = $1")
            .bind(message_id)
            .fetch_optional(db)
            .await?
            .ok_or(AppError::NotFound)?;

        let sender_id: Uuid = row.get("sender_id");
        if sender_id != requester_id {
            return Err(AppError::Forbidden);
        }

        let keys: Vec<String> =
            sqlx::query_scalar("SELECT storage_key FROM message_attachments WHERE message_id = $1")
                .bind(message_id)
                .fetch_all(db)
                .await?;

        sqlx::query("DELETE FROM messages WHERE id = $1")
            .bind(message_id)
            .execute(db)
            .await?;

        for key in keys {
            if let Err(e) = store.delete(&key).await {
                tracing::warn!(error = %e, %key, "orphaned attachment object left in store");
            }
        }

        Ok(())
    }

    async fn attachments_for(
        db: &Pool<Postgres>,
        message_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<Attachment>>, AppError> {
        if message_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query(
            "SELECT id, message_id, file_url, file_name, file_type, file_size, storage_key, \
                    thumbnail_url, duration_secs, created_at \
             FROM message_attachments WHERE message_id = ANY($1) \
             ORDER BY created_at, id",
        )
        .bind(message_ids)
        .fetch_all(db)
        .await?;

        let mut by_message: HashMap<Uuid, Vec<Attachment>> = HashMap::new();
        for row in rows {
            let attachment = Attachment {
                id: row.get("id"),
                message_id: row.get("message_id"),
                file_url: row.get("file_url"),
                file_name: row.get("file_name"),
                file_type: row.get("file_type"),
                file_size: row.get("file_size"),
                storage_key: row.get("storage_key"),
                thumbnail_url: row.get("thumbnail_url"),
                duration_secs: row.get("duration_secs"),
                created_at: row.get("created_at"),
            };
            by_message
                .entry(attachment.message_id)
                .or_default()
                .push(attachment);
        }
        Ok(by_message)
    }

    fn row_to_message(row: &sqlx::postgres::PgRow) -> Result<Message, AppError> {
        let kind_raw: String = row.get("kind");
        let status_raw: String = row.get("status");
        let kind = MessageKind::parse(&kind_raw)
            .ok_or_else(|| AppError::BadRequest(format!("unknown message kind {kind_raw}")))?;
        let status = DeliveryStatus::parse(&status_raw)
            .ok_or_else(|| AppError::BadRequest(format!("unknown status {status_raw}")))?;

        Ok(Message {
            id: row.get("id"),
            conversation_id: row.get("conversation_id"),
            sender_id: row.get("sender_id"),
            kind,
            status,
            content: row.get("content"),
            created_at: row.get("created_at"),
            attachments: Vec::new(),
        })
    }
}

fn clamp_page_size(page_size: i64) -> i64 {
    // Hard server-side cap regardless of what the route layer asked for.
    page_size.clamp(1, 200)
}

/// Whether a page further back in history exists after `page`.
fn has_older(page: i64, page_size: i64, total: i64) -> bool {
    page * page_size < total
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paging_window_math() {
        assert!(has_older(1, 20, 21));
        assert!(!has_older(1, 20, 20));
        assert!(!has_older(2, 20, 40));
        assert!(has_older(2, 20, 41));
        assert!(!has_older(1, 20, 0));
    }

    #[test]
    fn page_size_is_clamped() {
        assert_eq!(clamp_page_size(0), 1);
        assert_eq!(clamp_page_size(-5), 1);
        assert_eq!(clamp_page_size(20), 20);
        assert_eq!(clamp_page_size(100_000), 200);
    }
}
