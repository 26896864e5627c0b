//! Response rendering: turn the assistant's reply into a transcript turn.
//!
//! Text blocks are concatenated in order. Image blocks and `file_path`
//! annotations are resolved to bytes through the file-content endpoint. An
//! item that cannot be fetched is logged and left out; the rest of the reply
//! still renders.

use std::sync::Arc;
use threadline_core::assistant::{Annotation, AssistantService, MessageContent, ThreadMessage};
use threadline_core::error::{Error, Result};
use threadline_core::message::{GeneratedFile, Role, Turn};
use tracing::{debug, warn};

pub struct Renderer {
    service: Arc<dyn AssistantService>,
}

impl Renderer {
    pub fn new(service: Arc<dyn AssistantService>) -> Self {
        Self { service }
    }

    /// Render the thread's newest assistant reply for `run_id`.
    pub async fn render_latest(&self, thread_id: &str, run_id: &str) -> Result<Turn> {
        let messages = self.service.list_messages(thread_id).await?;
        let message = select_reply(&messages, run_id).ok_or_else(|| {
            Error::Internal(format!("Run {run_id} completed without an assistant message"))
        })?;
        Ok(self.render(message).await)
    }

    /// Render one message's content blocks into an assistant turn.
    pub async fn render(&self, message: &ThreadMessage) -> Turn {
        let mut text = String::new();
        let mut images = Vec::new();
        let mut files = Vec::new();

        for block in &message.content {
            match block {
                MessageContent::Text { text: content } => {
                    text.push_str(&content.value);
                    for annotation in &content.annotations {
                        let Annotation::FilePath { text: path, file_path } = annotation else {
                            continue;
                        };
                        let name = display_name(path).unwrap_or(&file_path.file_id).to_string();
                        if let Some(data) = self.fetch(&file_path.file_id).await {
                            files.push(GeneratedFile { name, data });
                        }
                    }
                }
                MessageContent::ImageFile { image_file } => {
                    if let Some(data) = self.fetch(&image_file.file_id).await {
                        images.push(data);
                    }
                }
                MessageContent::Unsupported => {
                    debug!(message_id = %message.id, "Skipping unsupported content block");
                }
            }
        }

        Turn::assistant(text, images, files)
    }

    async fn fetch(&self, file_id: &str) -> Option<Vec<u8>> {
        match self.service.read_file(file_id).await {
            Ok(data) => Some(data),
            Err(e) => {
                warn!(file_id, error = %e, "Failed to download file content");
                None
            }
        }
    }
}

/// Pick the reply to render from a newest-first message list.
///
/// Prefers the newest assistant message produced by `run_id`; falls back to
/// the newest assistant message when the service does not report run ids.
pub fn select_reply<'a>(messages: &'a [ThreadMessage], run_id: &str) -> Option<&'a ThreadMessage> {
    let mut assistant = messages.iter().filter(|m| m.role == Role::Assistant);
    let newest = assistant.clone().next();
    assistant
        .find(|m| m.run_id.as_deref() == Some(run_id))
        .or_else(|| newest.filter(|m| m.run_id.is_none()))
}

/// The download name for a generated file: the trailing path component of
/// the annotation text, with any `sandbox:` style prefix removed.
pub fn display_name(path_text: &str) -> Option<&str> {
    let trimmed = path_text.trim().trim_end_matches('/');
    let tail = match trimmed.rsplit_once('/') {
        Some((_, tail)) => tail,
        None => trimmed.rsplit_once(':').map_or(trimmed, |(_, tail)| tail),
    };
    (!tail.is_empty()).then_some(tail)
}
