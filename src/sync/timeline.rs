//! Per-conversation timeline with explicit provisional-entry states.
//!
//! Every entry is either server-confirmed or a local provisional send. The
//! two live in disjoint id namespaces so a provisional entry can never be
//! mistaken for authoritative history.

use crate::models::{DeliveryStatus, MessageKind};
use crate::routes::messages::{AttachmentDto, HistoryResponse, MessageDto};
use crate::services::message_service::NewAttachment;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use uuid::Uuid;

/// How far apart a provisional entry's client timestamp and the authoritative
/// `created_at` may be and still describe the same send. Generous, because
/// client clocks drift.
pub const RECONCILE_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryId {
    /// Provisional namespace: a counter local to this timeline.
    Local(u64),
    /// Authoritative server id.
    Server(Uuid),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// Rendered optimistically, not yet acknowledged by the server.
    Pending,
    /// Backed by an authoritative message.
    Confirmed,
    /// The send failed; the entry is handed back to the caller and no longer
    /// part of the timeline.
    Failed,
}

/// Attachment as the timeline renders it; works for both provisional
/// (client-declared) and confirmed (server-returned) entries.
#[derive(Debug, Clone, PartialEq)]
pub struct AttachmentView {
    pub file_url: String,
    pub file_name: String,
    pub file_type: String,
    pub file_size: i64,
    pub thumbnail_url: Option<String>,
    pub duration_secs: Option<i32>,
}

impl From<&AttachmentDto> for AttachmentView {
    fn from(dto: &AttachmentDto) -> Self {
        AttachmentView {
            file_url: dto.file_url.clone(),
            file_name: dto.file_name.clone(),
            file_type: dto.file_type.clone(),
            file_size: dto.file_size,
            thumbnail_url: dto.thumbnail_url.clone(),
            duration_secs: dto.duration_secs,
        }
    }
}

impl From<&NewAttachment> for AttachmentView {
    fn from(new: &NewAttachment) -> Self {
        AttachmentView {
            file_url: new.file_url.clone(),
            file_name: new.file_name.clone(),
            file_type: new.file_type.clone(),
            file_size: new.file_size,
            thumbnail_url: new.thumbnail_url.clone(),
            duration_secs: new.duration_secs,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TimelineEntry {
    pub id: EntryId,
    pub sender_id: Uuid,
    pub kind: MessageKind,
    pub status: DeliveryStatus,
    pub content: Option<String>,
    pub created_at: DateTime<Utc>,
    pub state: EntryState,
    pub attachments: Vec<AttachmentView>,
}

impl TimelineEntry {
    fn confirmed(dto: &MessageDto) -> Self {
        TimelineEntry {
            id: EntryId::Server(dto.id),
            sender_id: dto.sender_id,
            kind: dto.kind,
            status: dto.status,
            content: dto.content.clone(),
            created_at: dto.created_at,
            state: EntryState::Confirmed,
            attachments: dto.attachments.iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug)]
pub struct Timeline {
    /// Chronological order, oldest first.
    entries: Vec<TimelineEntry>,
    /// Server ids already present, the de-duplication ground truth.
    known: HashSet<Uuid>,
    next_local: u64,
    /// Highest (oldest) page number merged so far; 0 before the first fetch.
    oldest_loaded_page: i64,
    has_more: bool,
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Timeline {
    pub fn new() -> Self {
        Timeline {
            entries: Vec::new(),
            known: HashSet::new(),
            next_local: 0,
            oldest_loaded_page: 0,
            has_more: true,
        }
    }

    pub fn entries(&self) -> &[TimelineEntry] {
        &self.entries
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn contains(&self, server_id: Uuid) -> bool {
        self.known.contains(&server_id)
    }

    pub fn pending_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.state == EntryState::Pending)
            .count()
    }

    /// Render a send optimistically. The returned id lives in the local
    /// namespace until [`confirm`](Self::confirm) or [`fail`](Self::fail)
    /// resolves it.
    pub fn begin_send(
        &mut self,
        sender_id: Uuid,
        kind: MessageKind,
        content: Option<String>,
        attachments: &[NewAttachment],
        now: DateTime<Utc>,
    ) -> EntryId {
        let id = EntryId::Local(self.next_local);
        self.next_local += 1;
        self.entries.push(TimelineEntry {
            id,
            sender_id,
            kind,
            status: DeliveryStatus::Sent,
            content,
            created_at: now,
            state: EntryState::Pending,
            attachments: attachments.iter().map(Into::into).collect(),
        });
        id
    }

    /// The server acknowledged the send: replace the provisional entry in
    /// place with the authoritative message. If a background poll already
    /// merged that message, the provisional copy is simply dropped.
    pub fn confirm(&mut self, local: EntryId, message: &MessageDto) {
        if self.known.contains(&message.id) {
            self.entries.retain(|e| e.id != local);
            return;
        }
        match self.entries.iter().position(|e| e.id == local) {
            Some(pos) => {
                self.entries[pos] = TimelineEntry::confirmed(message);
            }
            None => {
                self.entries.push(TimelineEntry::confirmed(message));
            }
        }
        self.known.insert(message.id);
        self.sort_entries();
    }

    /// The send failed: roll the provisional entry back out of the timeline.
    /// The removed entry is returned (marked failed) so the caller can offer
    /// a retry.
    pub fn fail(&mut self, local: EntryId) -> Option<TimelineEntry> {
        let pos = self
            .entries
            .iter()
            .position(|e| e.id == local && e.state == EntryState::Pending)?;
        let mut entry = self.entries.remove(pos);
        entry.state = EntryState::Failed;
        Some(entry)
    }

    /// Merge a fresh fetch of page 1 (the newest window).
    pub fn apply_newest_page(&mut self, page: &HistoryResponse) {
        for dto in &page.messages {
            self.merge_confirmed(dto);
        }
        if self.oldest_loaded_page == 0 {
            self.oldest_loaded_page = 1;
        }
        // has_more tracks the oldest window we have; a newest-page refresh
        // only speaks for page 1.
        if self.oldest_loaded_page == 1 {
            self.has_more = page.has_more;
        }
        self.sort_entries();
    }

    /// The next page to request when walking toward older history, or None
    /// once the server reported the history exhausted.
    pub fn next_older_page(&self) -> Option<i64> {
        if !self.has_more {
            return None;
        }
        if self.oldest_loaded_page == 0 {
            Some(1)
        } else {
            Some(self.oldest_loaded_page + 1)
        }
    }

    /// Merge an older page. Only the page returned by
    /// [`next_older_page`](Self::next_older_page) is accepted; anything else
    /// would refetch a window that is already loaded.
    pub fn apply_older_page(&mut self, page_number: i64, page: &HistoryResponse) {
        if Some(page_number) != self.next_older_page() {
            return;
        }
        for dto in &page.messages {
            self.merge_confirmed(dto);
        }
        self.oldest_loaded_page = page_number;
        self.has_more = page.has_more;
        self.sort_entries();
    }

    fn merge_confirmed(&mut self, dto: &MessageDto) {
        if self.known.contains(&dto.id) {
            // Already present; the server may have advanced its status
            // (delivered -> read). Never move backward.
            if let Some(entry) = self
                .entries
                .iter_mut()
                .find(|e| e.id == EntryId::Server(dto.id))
            {
                if entry.status.can_advance_to(dto.status) {
                    entry.status = dto.status;
                }
            }
            return;
        }

        // A provisional entry for this very send may already occupy the slot
        // (our poll outran the send response). Replace it instead of showing
        // both.
        if let Some(pos) = self.matching_pending(dto) {
            self.entries[pos] = TimelineEntry::confirmed(dto);
        } else {
            self.entries.push(TimelineEntry::confirmed(dto));
        }
        self.known.insert(dto.id);
    }

    fn matching_pending(&self, dto: &MessageDto) -> Option<usize> {
        self.entries.iter().position(|e| {
            e.state == EntryState::Pending
                && e.sender_id == dto.sender_id
                && e.kind == dto.kind
                && e.content == dto.content
                && (e.created_at - dto.created_at).num_seconds().abs() <= RECONCILE_TOLERANCE_SECS
        })
    }

    fn sort_entries(&mut self) {
        // created_at first, id as tiebreak; provisional entries sort after
        // confirmed ones of the same instant.
        self.entries.sort_by_key(|e| {
            (
                e.created_at,
                match e.id {
                    EntryId::Server(id) => (0u8, id.as_u128()),
                    EntryId::Local(n) => (1u8, n as u128),
                },
            )
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn dto(sender: Uuid, content: &str, created_at: DateTime<Utc>) -> MessageDto {
        MessageDto {
            id: Uuid::new_v4(),
            conversation_id: Uuid::new_v4(),
            sender_id: sender,
            kind: MessageKind::Text,
            status: DeliveryStatus::Delivered,
            content: Some(content.to_string()),
            created_at,
            attachments: Vec::new(),
        }
    }

    fn page(messages: Vec<MessageDto>, has_more: bool) -> HistoryResponse {
        HistoryResponse {
            messages,
            has_more,
            page: 1,
        }
    }

    #[test]
    fn confirm_replaces_the_provisional_entry_in_place() {
        let sender = Uuid::new_v4();
        let mut timeline = Timeline::new();
        let local = timeline.begin_send(sender, MessageKind::Text, Some("hello".into()), &[], Utc::now());
        assert_eq!(timeline.pending_count(), 1);

        let authoritative = dto(sender, "hello", Utc::now());
        timeline.confirm(local, &authoritative);

        assert_eq!(timeline.entries().len(), 1);
        let entry = &timeline.entries()[0];
        assert_eq!(entry.id, EntryId::Server(authoritative.id));
        assert_eq!(entry.state, EntryState::Confirmed);
        assert_eq!(timeline.pending_count(), 0);
    }

    #[test]
    fn fail_rolls_the_provisional_entry_back() {
        let sender = Uuid::new_v4();
        let mut timeline = Timeline::new();
        let local = timeline.begin_send(sender, MessageKind::Text, Some("oops".into()), &[], Utc::now());

        let removed = timeline.fail(local).expect("entry should be removable");
        assert_eq!(removed.state, EntryState::Failed);
        assert!(timeline.entries().is_empty());
        // A second rollback of the same id is a no-op.
        assert!(timeline.fail(local).is_none());
    }

    #[test]
    fn poll_arriving_before_the_send_response_does_not_duplicate() {
        let sender = Uuid::new_v4();
        let mut timeline = Timeline::new();
        let local = timeline.begin_send(sender, MessageKind::Text, Some("hi".into()), &[], Utc::now());

        // Background poll delivers the authoritative copy first.
        let authoritative = dto(sender, "hi", Utc::now());
        timeline.apply_newest_page(&page(vec![authoritative.clone()], false));
        assert_eq!(timeline.entries().len(), 1);
        assert_eq!(timeline.pending_count(), 0);

        // The direct response lands afterwards.
        timeline.confirm(local, &authoritative);
        assert_eq!(timeline.entries().len(), 1);
        assert_eq!(
            timeline.entries()[0].id,
            EntryId::Server(authoritative.id)
        );
    }

    #[test]
    fn unrelated_pending_entries_survive_a_poll() {
        let sender = Uuid::new_v4();
        let peer = Uuid::new_v4();
        let mut timeline = Timeline::new();
        timeline.begin_send(sender, MessageKind::Text, Some("mine".into()), &[], Utc::now());

        timeline.apply_newest_page(&page(vec![dto(peer, "theirs", Utc::now())], false));

        assert_eq!(timeline.entries().len(), 2);
        assert_eq!(timeline.pending_count(), 1);
    }

    #[test]
    fn merging_the_same_page_twice_is_idempotent() {
        let peer = Uuid::new_v4();
        let mut timeline = Timeline::new();
        let window = page(
            vec![dto(peer, "a", Utc::now()), dto(peer, "b", Utc::now())],
            false,
        );
        timeline.apply_newest_page(&window);
        timeline.apply_newest_page(&window);
        assert_eq!(timeline.entries().len(), 2);
    }

    #[test]
    fn status_updates_from_polls_never_move_backward() {
        let peer = Uuid::new_v4();
        let mut timeline = Timeline::new();
        let mut message = dto(peer, "hello", Utc::now());
        message.status = DeliveryStatus::Read;
        timeline.apply_newest_page(&page(vec![message.clone()], false));

        // A stale poll result reports the earlier status.
        message.status = DeliveryStatus::Delivered;
        timeline.apply_newest_page(&page(vec![message], false));

        assert_eq!(timeline.entries()[0].status, DeliveryStatus::Read);
    }

    #[test]
    fn pagination_cursor_only_moves_forward_and_stops_at_the_end() {
        let peer = Uuid::new_v4();
        let base = Utc::now();
        let mut timeline = Timeline::new();

        timeline.apply_newest_page(&page(vec![dto(peer, "newest", base)], true));
        assert_eq!(timeline.next_older_page(), Some(2));

        let older = dto(peer, "older", base - Duration::minutes(30));
        timeline.apply_older_page(2, &page(vec![older], false));
        assert_eq!(timeline.next_older_page(), None);
        assert!(!timeline.has_more());

        // A duplicate or out-of-order page is ignored outright.
        timeline.apply_older_page(2, &page(vec![dto(peer, "stray", base)], true));
        assert_eq!(timeline.entries().len(), 2);
        assert_eq!(timeline.next_older_page(), None);

        // Oldest first after the prepend.
        assert_eq!(timeline.entries()[0].content.as_deref(), Some("older"));
        assert_eq!(timeline.entries()[1].content.as_deref(), Some("newest"));
    }

    #[test]
    fn newest_page_refresh_does_not_clobber_a_deeper_cursor() {
        let peer = Uuid::new_v4();
        let base = Utc::now();
        let mut timeline = Timeline::new();

        timeline.apply_newest_page(&page(vec![dto(peer, "new", base)], true));
        timeline.apply_older_page(
            2,
            &page(vec![dto(peer, "old", base - Duration::minutes(5))], true),
        );
        assert_eq!(timeline.next_older_page(), Some(3));

        // Refreshing page 1 reports has_more=true for page 1, which says
        // nothing about pages beyond the ones already loaded.
        timeline.apply_newest_page(&page(vec![dto(peer, "new2", base)], true));
        assert_eq!(timeline.next_older_page(), Some(3));
    }
}
