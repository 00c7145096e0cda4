//! Delivery status machine: sent -> delivered -> read.
//!
//! Monotonicity is enforced in the SQL predicates themselves, never by
//! read-modify-write, so concurrent transitions cannot move a message
//! backward and repeating a transition is a harmless no-op.

use crate::error::AppError;
use sqlx::{PgConnection, Pool, Postgres};
use uuid::Uuid;

pub struct DeliveryService;

impl DeliveryService {
    /// sent -> delivered. Runs inside the append transaction: in this core
    /// "delivered" means "stored and visible to the recipient's next poll",
    /// there is no separate transport acknowledgment. Returns whether a row
    /// actually moved.
    pub async fn mark_delivered(
        conn: &mut PgConnection,
        message_id: Uuid,
    ) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE messages SET status = 'delivered' WHERE id = $1 AND status = 'sent'")
            .bind(message_id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Bulk-transition every message the viewer received and has not read.
    /// One UPDATE, idempotent; returns the number of messages transitioned.
    pub async fn mark_conversation_read(
        db: &Pool<Postgres>,
        conversation_id: Uuid,
        viewer_id: Uuid,
    ) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE messages SET status = 'read' \
             WHERE conversation_id = $1 AND sender_id <> $2 AND status <> 'read'",
        )
        .bind(conversation_id)
        .bind(viewer_id)
        .execute(db)
        .await?;
        Ok(result.rows_affected())
    }
}
