//! Attachment routing for a user turn.
//!
//! A turn carries at most one file. Images go inline as an image part of the
//! message content; documents are bound to the message as context for code
//! execution and retrieval search. The two forms never mix.

use std::path::Path;
use threadline_core::assistant::{
    AssistantService, FilePurpose, MessageAttachment, NewMessage,
};
use threadline_core::error::{Error, Result};
use threadline_core::event::{DomainEvent, EventBus};
use threadline_core::message::{ContentPart, Role, TurnText};
use tracing::debug;

/// Extensions sent inline as image content.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

/// Extensions attached as analysis context.
pub const DOCUMENT_EXTENSIONS: &[&str] = &["txt", "csv", "xlsx", "pdf"];

/// How an uploaded file is bound to its message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    InlineImage,
    Document,
}

/// Route a file by its extension (case-insensitive).
pub fn classify(file_name: &str) -> Result<AttachmentKind> {
    let ext = Path::new(file_name)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Ok(AttachmentKind::InlineImage)
    } else if DOCUMENT_EXTENSIONS.contains(&ext.as_str()) {
        Ok(AttachmentKind::Document)
    } else {
        Err(Error::UnsupportedAttachment {
            file_name: file_name.to_string(),
            allowed: IMAGE_EXTENSIONS
                .iter()
                .chain(DOCUMENT_EXTENSIONS)
                .copied()
                .collect::<Vec<_>>()
                .join(", "),
        })
    }
}

/// A file the user attached to a turn.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub file_name: String,
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn new(file_name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            data,
        }
    }

    /// Read an attachment from disk, checking its extension first.
    pub async fn from_path(path: &Path) -> Result<Self> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        classify(&file_name)?;

        let data = tokio::fs::read(path).await.map_err(|e| Error::AttachmentRead {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { file_name, data })
    }
}

/// Build the message for a turn, uploading the attachment if there is one.
pub async fn prepare_message(
    service: &dyn AssistantService,
    prompt: &str,
    attachment: Option<Attachment>,
    events: &EventBus,
) -> Result<NewMessage> {
    let Some(attachment) = attachment else {
        return Ok(NewMessage {
            role: Role::User,
            content: TurnText::from(prompt),
            attachments: vec![],
        });
    };

    let kind = classify(&attachment.file_name)?;
    let file = service
        .upload_file(&attachment.file_name, attachment.data, FilePurpose::Assistants)
        .await?;
    debug!(file_id = %file.id, file_name = %attachment.file_name, ?kind, "Uploaded attachment");

    events.publish(DomainEvent::AttachmentUploaded {
        file_name: attachment.file_name.clone(),
        file_id: file.id.clone(),
        inline_image: kind == AttachmentKind::InlineImage,
        timestamp: chrono::Utc::now(),
    });

    Ok(match kind {
        AttachmentKind::InlineImage => NewMessage {
            role: Role::User,
            content: TurnText::Parts(vec![
                ContentPart::text(prompt),
                ContentPart::image_file(file.id),
            ]),
            attachments: vec![],
        },
        AttachmentKind::Document => NewMessage {
            role: Role::User,
            content: TurnText::from(prompt),
            attachments: vec![MessageAttachment::for_analysis(file.id)],
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{Recorded, ScriptedService};
    use threadline_core::assistant::AttachmentTool;

    #[test]
    fn classify_by_extension() {
        assert_eq!(classify("chart.png").unwrap(), AttachmentKind::InlineImage);
        assert_eq!(classify("PHOTO.JPEG").unwrap(), AttachmentKind::InlineImage);
        assert_eq!(classify("anim.webp").unwrap(), AttachmentKind::InlineImage);
        assert_eq!(classify("data.csv").unwrap(), AttachmentKind::Document);
        assert_eq!(classify("report.XLSX").unwrap(), AttachmentKind::Document);
        assert_eq!(classify("notes.txt").unwrap(), AttachmentKind::Document);
    }

    #[test]
    fn classify_rejects_unlisted_extensions() {
        let err = classify("script.sh").unwrap_err();
        match err {
            Error::UnsupportedAttachment { file_name, allowed } => {
                assert_eq!(file_name, "script.sh");
                assert!(allowed.contains("png"));
                assert!(allowed.contains("pdf"));
            }
            other => panic!("Expected UnsupportedAttachment, got {other:?}"),
        }
        assert!(classify("no_extension").is_err());
    }

    #[tokio::test]
    async fn plain_prompt_has_no_upload() {
        let service = ScriptedService::new(vec![]);
        let msg = prepare_message(&service, "hi", None, &EventBus::default())
            .await
            .unwrap();

        assert_eq!(msg.content, TurnText::from("hi"));
        assert!(msg.attachments.is_empty());
        assert!(service.calls().is_empty());
    }

    #[tokio::test]
    async fn image_goes_inline() {
        let service = ScriptedService::new(vec![]);
        let events = EventBus::default();
        let mut rx = events.subscribe();

        let msg = prepare_message(
            &service,
            "describe this image",
            Some(Attachment::new("chart.png", vec![1, 2, 3])),
            &events,
        )
        .await
        .unwrap();

        assert_eq!(
            msg.content,
            TurnText::Parts(vec![
                ContentPart::text("describe this image"),
                ContentPart::image_file("file-chart.png"),
            ])
        );
        assert!(msg.attachments.is_empty());

        let event = rx.recv().await.unwrap();
        assert!(matches!(
            event.as_ref(),
            DomainEvent::AttachmentUploaded { inline_image: true, .. }
        ));
    }

    #[tokio::test]
    async fn document_becomes_analysis_attachment() {
        let service = ScriptedService::new(vec![]);
        let msg = prepare_message(
            &service,
            "summarize this",
            Some(Attachment::new("data.csv", b"a,b\n1,2".to_vec())),
            &EventBus::default(),
        )
        .await
        .unwrap();

        assert_eq!(msg.content, TurnText::from("summarize this"));
        assert_eq!(msg.attachments.len(), 1);
        assert_eq!(msg.attachments[0].file_id, "file-data.csv");
        assert_eq!(
            msg.attachments[0].tools,
            vec![AttachmentTool::CodeInterpreter, AttachmentTool::FileSearch]
        );
    }

    #[tokio::test]
    async fn unsupported_file_is_not_uploaded() {
        let service = ScriptedService::new(vec![]);
        let result = prepare_message(
            &service,
            "run this",
            Some(Attachment::new("tool.exe", vec![0])),
            &EventBus::default(),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(
            service.count(|c| matches!(c, Recorded::UploadFile { .. })),
            0
        );
    }

    #[tokio::test]
    async fn from_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        std::fs::write(&path, "a,b\n").unwrap();

        let attachment = Attachment::from_path(&path).await.unwrap();
        assert_eq!(attachment.file_name, "data.csv");
        assert_eq!(attachment.data, b"a,b\n");

        let missing = Attachment::from_path(&dir.path().join("gone.csv")).await;
        assert!(matches!(missing, Err(Error::AttachmentRead { .. })));

        let wrong = Attachment::from_path(&dir.path().join("x.bin")).await;
        assert!(matches!(wrong, Err(Error::UnsupportedAttachment { .. })));
    }
}
