use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Closed set of message shapes. Determines the content/attachment rules a
/// message must satisfy before it is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Audio,
    Video,
    Image,
    File,
    Emoji,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::Audio => "audio",
            MessageKind::Video => "video",
            MessageKind::Image => "image",
            MessageKind::File => "file",
            MessageKind::Emoji => "emoji",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "text" => Some(MessageKind::Text),
            "audio" => Some(MessageKind::Audio),
            "video" => Some(MessageKind::Video),
            "image" => Some(MessageKind::Image),
            "file" => Some(MessageKind::File),
            "emoji" => Some(MessageKind::Emoji),
            _ => None,
        }
    }

    /// Conversation-list preview for a message without usable text.
    pub fn placeholder(&self) -> &'static str {
        match self {
            MessageKind::Text => "[text]",
            MessageKind::Audio => "[audio]",
            MessageKind::Video => "[video]",
            MessageKind::Image => "[image]",
            MessageKind::File => "[file]",
            MessageKind::Emoji => "[emoji]",
        }
    }
}

/// Per-message delivery state. Transitions only ever move forward; trying to
/// move backward is a no-op everywhere in the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Sent,
    Delivered,
    Read,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Sent => "sent",
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::Read => "read",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "sent" => Some(DeliveryStatus::Sent),
            "delivered" => Some(DeliveryStatus::Delivered),
            "read" => Some(DeliveryStatus::Read),
            _ => None,
        }
    }

    pub fn rank(&self) -> u8 {
        match self {
            DeliveryStatus::Sent => 0,
            DeliveryStatus::Delivered => 1,
            DeliveryStatus::Read => 2,
        }
    }

    /// True when moving from `self` to `to` goes forward.
    pub fn can_advance_to(&self, to: DeliveryStatus) -> bool {
        to.rank() > self.rank()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub kind: MessageKind,
    pub status: DeliveryStatus,
    pub content: Option<String>,
    pub created_at: DateTime<Utc>,
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub id: Uuid,
    pub message_id: Uuid,
    pub file_url: String,
    pub file_name: String,
    pub file_type: String,
    pub file_size: i64,
    pub storage_key: String,
    pub thumbnail_url: Option<String>,
    pub duration_secs: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_only_moves_forward() {
        assert!(DeliveryStatus::Sent.can_advance_to(DeliveryStatus::Delivered));
        assert!(DeliveryStatus::Sent.can_advance_to(DeliveryStatus::Read));
        assert!(DeliveryStatus::Delivered.can_advance_to(DeliveryStatus::Read));
        assert!(!DeliveryStatus::Read.can_advance_to(DeliveryStatus::Delivered));
        assert!(!DeliveryStatus::Delivered.can_advance_to(DeliveryStatus::Sent));
        assert!(!DeliveryStatus::Read.can_advance_to(DeliveryStatus::Read));
    }

    #[test]
    fn kind_strings_are_closed() {
        for kind in [
            MessageKind::Text,
            MessageKind::Audio,
            MessageKind::Video,
            MessageKind::Image,
            MessageKind::File,
            MessageKind::Emoji,
        ] {
            assert_eq!(MessageKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(MessageKind::parse("sticker"), None);
    }
}
