//! Authorization guards that enforce permission checks at the type level
//! This prevents handlers from accidentally bypassing authorization

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::AppError;

/// The resolved caller, extracted from the identity middleware's extension.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
}

#[async_trait]
impl<S> FromRequestParts<S> for User
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .extensions
            .get::<Uuid>()
            .cloned()
            .ok_or(AppError::Unauthorized)?;

        Ok(User { id: user_id })
    }
}

/// A caller verified to be one of the two participants of a conversation.
/// One query resolves existence and membership together.
#[derive(Debug, Clone)]
pub struct Participant {
    pub user_id: Uuid,
    pub conversation_id: Uuid,
    pub peer_id: Uuid,
}

impl Participant {
    pub async fn verify(
        db: &PgPool,
        user_id: Uuid,
        conversation_id: Uuid,
    ) -> Result<Self, AppError> {
        let row = sqlx::query(
            "SELECT participant_a, participant_b FROM conversations WHERE id = $1",
        )
        .bind(conversation_id)
        .fetch_optional(db)
        .await?
        .ok_or(AppError::NotFound)?;

        let participant_a: Uuid = row.get("participant_a");
        let participant_b: Uuid = row.get("participant_b");

        let peer_id = if participant_a == user_id {
            participant_b
        } else if participant_b == user_id {
            participant_a
        } else {
            return Err(AppError::Forbidden);
        };

        Ok(Participant {
            user_id,
            conversation_id,
            peer_id,
        })
    }
}
