//! Pure attachment and message-shape validation. Runs before any database or
//! object-store I/O; a rejected upload never reaches storage.

use crate::error::AppError;
use crate::models::MessageKind;
use crate::services::message_service::NewAttachment;

pub const AUDIO_CEILING: i64 = 10 * 1024 * 1024;
pub const VIDEO_CEILING: i64 = 50 * 1024 * 1024;
pub const IMAGE_CEILING: i64 = 5 * 1024 * 1024;
pub const FILE_CEILING: i64 = 25 * 1024 * 1024;

const DOCUMENT_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.ms-powerpoint",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    "text/plain",
    "text/csv",
];

/// Size ceiling and its user-facing label for an attachment kind.
pub fn ceiling(kind: MessageKind) -> (i64, &'static str) {
    match kind {
        MessageKind::Audio => (AUDIO_CEILING, "10 MiB"),
        MessageKind::Video => (VIDEO_CEILING, "50 MiB"),
        MessageKind::Image => (IMAGE_CEILING, "5 MiB"),
        // Text and emoji never carry attachments; the generic ceiling applies
        // to anything classified as a plain file.
        _ => (FILE_CEILING, "25 MiB"),
    }
}

fn kind_for_mime(mime_type: &str) -> Option<MessageKind> {
    let parsed: mime::Mime = mime_type.trim().parse().ok()?;
    let family = parsed.type_();
    if family == mime::AUDIO {
        Some(MessageKind::Audio)
    } else if family == mime::VIDEO {
        Some(MessageKind::Video)
    } else if family == mime::IMAGE {
        Some(MessageKind::Image)
    } else {
        let essence = parsed.essence_str();
        DOCUMENT_TYPES
            .iter()
            .any(|t| t.eq_ignore_ascii_case(essence))
            .then_some(MessageKind::File)
    }
}

/// Map a declared MIME type and byte size to a message kind, or reject.
pub fn classify(mime_type: &str, byte_size: i64) -> Result<MessageKind, AppError> {
    let kind =
        kind_for_mime(mime_type).ok_or_else(|| AppError::UnsupportedType(mime_type.to_string()))?;
    let (limit, label) = ceiling(kind);
    if byte_size > limit {
        return Err(AppError::FileTooLarge {
            kind: kind.as_str(),
            limit: label,
        });
    }
    Ok(kind)
}

/// Exactly one emoji-looking glyph: short, no ASCII letters, digits,
/// punctuation or whitespace. Multi-codepoint sequences (skin tones, ZWJ
/// families) pass; ordinary words do not.
fn is_single_emoji(content: &str) -> bool {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return false;
    }
    let count = trimmed.chars().count();
    count <= 8 && trimmed.chars().all(|c| !c.is_ascii())
}

/// Enforce the kind/content/attachment-cardinality rules for a new message.
pub fn validate_shape(
    kind: MessageKind,
    content: Option<&str>,
    attachments: &[NewAttachment],
) -> Result<(), AppError> {
    match kind {
        MessageKind::Text => {
            if !attachments.is_empty() {
                return Err(AppError::InvalidMessage(
                    "text messages cannot carry attachments".into(),
                ));
            }
            if content.map_or(true, |c| c.trim().is_empty()) {
                return Err(AppError::InvalidMessage(
                    "text messages need non-empty content".into(),
                ));
            }
        }
        MessageKind::Emoji => {
            if !attachments.is_empty() {
                return Err(AppError::InvalidMessage(
                    "emoji messages cannot carry attachments".into(),
                ));
            }
            if !content.is_some_and(is_single_emoji) {
                return Err(AppError::InvalidMessage(
                    "emoji messages must contain exactly one emoji".into(),
                ));
            }
        }
        MessageKind::Audio | MessageKind::Video | MessageKind::Image => {
            if attachments.len() != 1 {
                return Err(AppError::InvalidMessage(format!(
                    "{} messages need exactly one attachment",
                    kind.as_str()
                )));
            }
            let attachment = &attachments[0];
            let classified = classify(&attachment.file_type, attachment.file_size)?;
            if classified != kind {
                return Err(AppError::InvalidMessage(format!(
                    "attachment type {} does not match a {} message",
                    attachment.file_type,
                    kind.as_str()
                )));
            }
            validate_media_fields(kind, attachment)?;
        }
        MessageKind::File => {
            if attachments.is_empty() {
                return Err(AppError::InvalidMessage(
                    "file messages need at least one attachment".into(),
                ));
            }
            for attachment in attachments {
                classify(&attachment.file_type, attachment.file_size)?;
                if attachment.duration_secs.is_some() || attachment.thumbnail_url.is_some() {
                    return Err(AppError::InvalidMessage(
                        "file attachments cannot carry media metadata".into(),
                    ));
                }
            }
        }
    }
    Ok(())
}

fn validate_media_fields(kind: MessageKind, attachment: &NewAttachment) -> Result<(), AppError> {
    // duration only makes sense for audio/video, thumbnails for image/video
    if attachment.duration_secs.is_some() && kind == MessageKind::Image {
        return Err(AppError::InvalidMessage(
            "image attachments cannot have a duration".into(),
        ));
    }
    if attachment.thumbnail_url.is_some() && kind == MessageKind::Audio {
        return Err(AppError::InvalidMessage(
            "audio attachments cannot have a thumbnail".into(),
        ));
    }
    if let Some(duration) = attachment.duration_secs {
        if duration < 0 {
            return Err(AppError::InvalidMessage("negative duration".into()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attachment(file_type: &str, file_size: i64) -> NewAttachment {
        NewAttachment {
            file_url: "https://cdn.test/x".into(),
            file_name: "x".into(),
            file_type: file_type.into(),
            file_size,
            storage_key: "attachments/x".into(),
            thumbnail_url: None,
            duration_secs: None,
        }
    }

    #[test]
    fn classifies_media_by_mime_family() {
        assert_eq!(
            classify("image/png", 4 * 1024 * 1024).unwrap(),
            MessageKind::Image
        );
        assert_eq!(classify("audio/mpeg", 1024).unwrap(), MessageKind::Audio);
        assert_eq!(classify("video/mp4", 1024).unwrap(), MessageKind::Video);
        assert_eq!(
            classify("application/pdf", 1024).unwrap(),
            MessageKind::File
        );
    }

    #[test]
    fn oversized_image_is_rejected_with_ceiling() {
        let err = classify("image/png", 6 * 1024 * 1024).unwrap_err();
        match err {
            AppError::FileTooLarge { kind, limit } => {
                assert_eq!(kind, "image");
                assert_eq!(limit, "5 MiB");
            }
            other => panic!("expected FileTooLarge, got {other:?}"),
        }
    }

    #[test]
    fn unknown_mime_is_unsupported() {
        assert!(matches!(
            classify("application/x-msdownload", 10),
            Err(AppError::UnsupportedType(_))
        ));
        assert!(matches!(
            classify("not a mime", 10),
            Err(AppError::UnsupportedType(_))
        ));
    }

    #[test]
    fn text_requires_content_and_no_attachments() {
        assert!(validate_shape(MessageKind::Text, Some("hello"), &[]).is_ok());
        assert!(validate_shape(MessageKind::Text, None, &[]).is_err());
        assert!(validate_shape(MessageKind::Text, Some("   "), &[]).is_err());
        assert!(
            validate_shape(MessageKind::Text, Some("hi"), &[attachment("image/png", 10)]).is_err()
        );
    }

    #[test]
    fn emoji_accepts_one_glyph_only() {
        assert!(validate_shape(MessageKind::Emoji, Some("🙂"), &[]).is_ok());
        assert!(validate_shape(MessageKind::Emoji, Some("👍🏽"), &[]).is_ok());
        assert!(validate_shape(MessageKind::Emoji, Some("hi"), &[]).is_err());
        assert!(validate_shape(MessageKind::Emoji, Some(""), &[]).is_err());
        assert!(validate_shape(MessageKind::Emoji, None, &[]).is_err());
    }

    #[test]
    fn media_kinds_need_exactly_one_matching_attachment() {
        assert!(
            validate_shape(MessageKind::Image, None, &[attachment("image/png", 10)]).is_ok()
        );
        assert!(validate_shape(MessageKind::Image, None, &[]).is_err());
        assert!(validate_shape(
            MessageKind::Image,
            None,
            &[attachment("image/png", 10), attachment("image/png", 10)]
        )
        .is_err());
        // MIME family must agree with the declared kind
        assert!(
            validate_shape(MessageKind::Image, None, &[attachment("audio/mpeg", 10)]).is_err()
        );
    }

    #[test]
    fn file_kind_needs_at_least_one_attachment() {
        assert!(validate_shape(MessageKind::File, None, &[]).is_err());
        assert!(validate_shape(
            MessageKind::File,
            Some("see attached"),
            &[attachment("application/pdf", 10), attachment("text/csv", 10)]
        )
        .is_ok());
    }

    #[test]
    fn oversized_attachment_fails_shape_validation_too() {
        assert!(matches!(
            validate_shape(
                MessageKind::Image,
                None,
                &[attachment("image/png", IMAGE_CEILING + 1)]
            ),
            Err(AppError::FileTooLarge { .. })
        ));
    }
}
