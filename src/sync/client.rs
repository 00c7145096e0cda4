use super::api::{ApiError, ChatApi};
use super::timeline::{EntryId, Timeline};
use crate::routes::conversations::{ConversationDto, ConversationSummaryDto};
use crate::routes::messages::SendMessageRequest;
use chrono::Utc;
use uuid::Uuid;

struct OpenConversation {
    conversation_id: Uuid,
    timeline: Timeline,
    /// Set when a mark-read call failed; retried on the next poll cycle.
    read_pending: bool,
}

/// Drives the polling protocol for one user: keeps the conversation list
/// fresh, maintains the open conversation's timeline, sends optimistically
/// and reconciles against the server's answers.
pub struct ChatClient<A: ChatApi> {
    api: A,
    caller_id: Uuid,
    page_size: i64,
    summaries: Vec<ConversationSummaryDto>,
    open: Option<OpenConversation>,
}

impl<A: ChatApi> ChatClient<A> {
    pub fn new(api: A, caller_id: Uuid, page_size: i64) -> Self {
        Self {
            api,
            caller_id,
            page_size,
            summaries: Vec::new(),
            open: None,
        }
    }

    pub fn caller_id(&self) -> Uuid {
        self.caller_id
    }

    pub fn summaries(&self) -> &[ConversationSummaryDto] {
        &self.summaries
    }

    pub fn timeline(&self) -> Option<&Timeline> {
        self.open.as_ref().map(|o| &o.timeline)
    }

    pub fn open_conversation_id(&self) -> Option<Uuid> {
        self.open.as_ref().map(|o| o.conversation_id)
    }

    /// Find or create the conversation with `peer_id` on the server.
    pub async fn start_conversation(&mut self, peer_id: Uuid) -> Result<ConversationDto, ApiError> {
        self.api.start_conversation(peer_id).await
    }

    /// Open a conversation: fetch the newest window and mark it read. The
    /// read marking is fire-and-forget; a failure only flags a retry.
    pub async fn open(&mut self, conversation_id: Uuid) -> Result<(), ApiError> {
        let mut timeline = Timeline::new();
        let newest = self
            .api
            .message_page(conversation_id, 1, self.page_size)
            .await?;
        timeline.apply_newest_page(&newest);

        let read_pending = self.api.mark_read(conversation_id).await.is_err();

        self.open = Some(OpenConversation {
            conversation_id,
            timeline,
            read_pending,
        });
        Ok(())
    }

    /// One poll cycle: refresh the conversation list, refresh the open
    /// conversation's newest page and retry a pending read marking.
    pub async fn poll_once(&mut self) -> Result<(), ApiError> {
        self.summaries = self.api.list_conversations().await?;

        if let Some(open) = self.open.as_mut() {
            let newest = self
                .api
                .message_page(open.conversation_id, 1, self.page_size)
                .await?;
            open.timeline.apply_newest_page(&newest);

            if open.read_pending {
                open.read_pending = self.api.mark_read(open.conversation_id).await.is_err();
            }
        }
        Ok(())
    }

    /// Optimistic send: the message appears in the timeline immediately and
    /// is replaced by the authoritative copy on success, or rolled back on
    /// failure (the error is returned so the caller can surface it).
    pub async fn send(&mut self, request: SendMessageRequest) -> Result<EntryId, ApiError> {
        let open = self
            .open
            .as_mut()
            .ok_or_else(|| ApiError::Transport("no open conversation".into()))?;

        let local = open.timeline.begin_send(
            self.caller_id,
            request.kind,
            request.content.clone(),
            &request.attachments,
            Utc::now(),
        );

        match self.api.send_message(open.conversation_id, &request).await {
            Ok(message) => {
                let id = EntryId::Server(message.id);
                open.timeline.confirm(local, &message);
                Ok(id)
            }
            Err(e) => {
                open.timeline.fail(local);
                Err(e)
            }
        }
    }

    /// Fetch the next older page, if any. Returns false once history is
    /// exhausted (or no conversation is open).
    pub async fn load_older(&mut self) -> Result<bool, ApiError> {
        let Some(open) = self.open.as_mut() else {
            return Ok(false);
        };
        let Some(page_number) = open.timeline.next_older_page() else {
            return Ok(false);
        };

        let older = self
            .api
            .message_page(open.conversation_id, page_number, self.page_size)
            .await?;
        open.timeline.apply_older_page(page_number, &older);
        Ok(true)
    }
}
