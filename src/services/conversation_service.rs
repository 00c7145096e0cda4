use crate::error::AppError;
use crate::models::{Conversation, MessageKind};
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Pool, Postgres, Row};
use uuid::Uuid;

/// One entry of the conversation list: the peer, the newest message and the
/// viewer's unread counter.
#[derive(Debug, Clone)]
pub struct ConversationSummary {
    pub conversation_id: Uuid,
    pub peer_id: Uuid,
    pub last_message: Option<LastMessage>,
    pub unread_count: i64,
    pub last_message_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct LastMessage {
    pub id: Uuid,
    /// Message content, or a `[kind]` placeholder for non-text messages.
    pub preview: String,
    pub created_at: DateTime<Utc>,
    pub read: bool,
    /// Whether the viewer sent it.
    pub mine: bool,
}

pub struct ConversationService;

impl ConversationService {
    /// Find the conversation for an unordered pair of users, creating it when
    /// absent. Safe under concurrent calls from both sides: the unique index
    /// over the canonicalized pair decides the race and the loser re-reads
    /// the winner's row.
    pub async fn get_or_create(
        db: &Pool<Postgres>,
        user_a: Uuid,
        user_b: Uuid,
    ) -> Result<Conversation, AppError> {
        if user_a == user_b {
            return Err(AppError::InvalidParticipants);
        }
        if let Some(existing) = Self::find_by_pair(db, user_a, user_b).await? {
            return Ok(existing);
        }

        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO conversations (id, participant_a, participant_b) VALUES ($1, $2, $3) \
             ON CONFLICT DO NOTHING",
        )
        .bind(id)
        .bind(user_a)
        .bind(user_b)
        .execute(db)
        .await?;

        Self::find_by_pair(db, user_a, user_b)
            .await?
            .ok_or(AppError::Internal)
    }

    async fn find_by_pair(
        db: &Pool<Postgres>,
        user_a: Uuid,
        user_b: Uuid,
    ) -> Result<Option<Conversation>, AppError> {
        let row = sqlx::query(
            "SELECT id, participant_a, participant_b, last_message_at, created_at \
             FROM conversations \
             WHERE (participant_a = $1 AND participant_b = $2) \
                OR (participant_a = $2 AND participant_b = $1)",
        )
        .bind(user_a)
        .bind(user_b)
        .fetch_optional(db)
        .await?;

        Ok(row.map(|r| Self::row_to_conversation(&r)))
    }

    pub async fn find(db: &Pool<Postgres>, id: Uuid) -> Result<Conversation, AppError> {
        let row = sqlx::query(
            "SELECT id, participant_a, participant_b, last_message_at, created_at \
             FROM conversations WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or(AppError::NotFound)?;

        Ok(Self::row_to_conversation(&row))
    }

    pub async fn is_participant(
        db: &Pool<Postgres>,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, AppError> {
        let row = sqlx::query(
            "SELECT 1 FROM conversations \
             WHERE id = $1 AND (participant_a = $2 OR participant_b = $2) LIMIT 1",
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_optional(db)
        .await?;
        Ok(row.is_some())
    }

    /// Single-row update inside the append transaction; `last_message_at`
    /// always carries the DB-assigned timestamp of the newest message.
    pub async fn touch_last_message(
        conn: &mut PgConnection,
        conversation_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE conversations SET last_message_at = $2 WHERE id = $1")
            .bind(conversation_id)
            .bind(at)
            .execute(conn)
            .await?;
        Ok(())
    }

    /// All conversations the user participates in, newest activity first,
    /// each with the latest message and the viewer's unread counter. One
    /// round-trip; the unread subquery is served by the
    /// (conversation_id, sender_id, status) index.
    pub async fn list_for_user(
        db: &Pool<Postgres>,
        user_id: Uuid,
    ) -> Result<Vec<ConversationSummary>, AppError> {
        let rows = sqlx::query(
            r#"
            SELECT
              c.id,
              c.participant_a,
              c.participant_b,
              c.last_message_at,
              lm.id AS last_message_id,
              lm.sender_id AS last_sender_id,
              lm.kind AS last_kind,
              lm.status AS last_status,
              lm.content AS last_content,
              lm.created_at AS last_created_at,
              (
                SELECT COUNT(*) FROM messages m
                WHERE m.conversation_id = c.id
                  AND m.sender_id <> $1
                  AND m.status <> 'read'
              ) AS unread_count
            FROM conversations c
            LEFT JOIN LATERAL (
              SELECT id, sender_id, kind, status, content, created_at
              FROM messages
              WHERE conversation_id = c.id
              ORDER BY created_at DESC, id DESC
              LIMIT 1
            ) lm ON TRUE
            WHERE c.participant_a = $1 OR c.participant_b = $1
            ORDER BY c.last_message_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(db)
        .await?;

        let summaries = rows
            .into_iter()
            .map(|row| {
                let participant_a: Uuid = row.get("participant_a");
                let participant_b: Uuid = row.get("participant_b");
                let peer_id = if participant_a == user_id {
                    participant_b
                } else {
                    participant_a
                };

                let last_message = row
                    .try_get::<Uuid, _>("last_message_id")
                    .ok()
                    .map(|message_id| {
                        let kind: String = row.get("last_kind");
                        let status: String = row.get("last_status");
                        let content: Option<String> = row.get("last_content");
                        let sender_id: Uuid = row.get("last_sender_id");
                        LastMessage {
                            id: message_id,
                            preview: preview_for(kind.as_str(), content.as_deref()),
                            created_at: row.get("last_created_at"),
                            read: status == "read",
                            mine: sender_id == user_id,
                        }
                    });

                ConversationSummary {
                    conversation_id: row.get("id"),
                    peer_id,
                    last_message,
                    unread_count: row.get("unread_count"),
                    last_message_at: row.get("last_message_at"),
                }
            })
            .collect();

        Ok(summaries)
    }

    fn row_to_conversation(row: &sqlx::postgres::PgRow) -> Conversation {
        Conversation {
            id: row.get("id"),
            participant_a: row.get("participant_a"),
            participant_b: row.get("participant_b"),
            last_message_at: row.get("last_message_at"),
            created_at: row.get("created_at"),
        }
    }
}

/// Text content verbatim for text messages; a `[kind]` placeholder otherwise.
fn preview_for(kind: &str, content: Option<&str>) -> String {
    match MessageKind::parse(kind) {
        Some(MessageKind::Text) => content.unwrap_or_default().to_string(),
        Some(MessageKind::Emoji) => content.unwrap_or(MessageKind::Emoji.placeholder()).to_string(),
        Some(other) => other.placeholder().to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_uses_content_for_text_and_placeholders_for_media() {
        assert_eq!(preview_for("text", Some("hello")), "hello");
        assert_eq!(preview_for("emoji", Some("🙂")), "🙂");
        assert_eq!(preview_for("image", Some("caption")), "[image]");
        assert_eq!(preview_for("file", None), "[file]");
    }
}
