//! AssistantService trait: the abstraction over the hosted assistant API.
//!
//! The remote service owns assistants, threads, runs and uploaded files;
//! local code only holds their identifiers. The types below mirror the
//! JSON shapes of the Assistants REST API closely enough to be deserialized
//! directly, with tagged enums in place of `type`-discriminated objects.
//!
//! Implementations: Azure OpenAI, OpenAI (same client, different auth).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::message::{ImageFileRef, Role, TurnText};
use crate::tool::ToolDefinition;

// --- Assistant definition ---

/// A capability enabled on the remote assistant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AssistantTool {
    /// Sandboxed code execution
    CodeInterpreter,
    /// Document retrieval search
    FileSearch,
    /// A function answered locally
    Function { function: ToolDefinition },
}

/// What to declare when creating the remote assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantSpec {
    pub name: String,
    pub instructions: String,
    pub model: String,
    pub tools: Vec<AssistantTool>,
}

/// A created remote assistant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assistant {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub model: String,
}

/// A remote conversation thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    pub id: String,
}

// --- Outbound messages ---

/// Capabilities a message attachment is made available to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AttachmentTool {
    CodeInterpreter,
    FileSearch,
}

/// An uploaded file bound to a message as tool context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageAttachment {
    pub file_id: String,
    pub tools: Vec<AttachmentTool>,
}

impl MessageAttachment {
    /// Attach a file for both code execution and retrieval search.
    pub fn for_analysis(file_id: impl Into<String>) -> Self {
        Self {
            file_id: file_id.into(),
            tools: vec![AttachmentTool::CodeInterpreter, AttachmentTool::FileSearch],
        }
    }
}

/// A message to post onto a thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessage {
    pub role: Role,
    pub content: TurnText,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<MessageAttachment>,
}

// --- Inbound messages ---

/// A message read back from a thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadMessage {
    pub id: String,
    pub role: Role,
    #[serde(default)]
    pub content: Vec<MessageContent>,
    /// The run that produced this message, for assistant messages
    #[serde(default)]
    pub run_id: Option<String>,
    #[serde(default)]
    pub created_at: i64,
}

/// One content block of an inbound message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    Text { text: TextContent },
    ImageFile { image_file: ImageFileRef },
    /// Block types this client does not render
    #[serde(other)]
    Unsupported,
}

/// The text payload of a text block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextContent {
    pub value: String,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

/// A marker inside a text block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Annotation {
    /// Points at a generated file available for download
    FilePath { text: String, file_path: FileRef },
    /// Cites a passage from a retrieved document
    FileCitation { text: String, file_citation: FileRef },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    pub file_id: String,
}

// --- Runs ---

/// The status of a remote run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Incomplete,
    Expired,
}

impl RunStatus {
    /// Whether the run has stopped progressing.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunStatus::Cancelled
                | RunStatus::Failed
                | RunStatus::Completed
                | RunStatus::Incomplete
                | RunStatus::Expired
        )
    }

    /// Whether the run stopped without producing a usable answer.
    pub fn is_failure(self) -> bool {
        self.is_terminal() && self != RunStatus::Completed
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::InProgress => "in_progress",
            RunStatus::RequiresAction => "requires_action",
            RunStatus::Cancelling => "cancelling",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Failed => "failed",
            RunStatus::Completed => "completed",
            RunStatus::Incomplete => "incomplete",
            RunStatus::Expired => "expired",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A function invocation requested by the remote assistant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// Arguments as a JSON-encoded string
    pub arguments: String,
}

/// A pending tool call inside a `requires_action` run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredToolCall {
    pub id: String,
    pub function: FunctionCall,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitToolOutputs {
    pub tool_calls: Vec<RequiredToolCall>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredAction {
    pub submit_tool_outputs: SubmitToolOutputs,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunError {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// A remote run, as last observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    pub id: String,
    pub thread_id: String,
    pub status: RunStatus,
    #[serde(default)]
    pub required_action: Option<RequiredAction>,
    #[serde(default)]
    pub last_error: Option<RunError>,
}

impl Run {
    /// The tool calls awaiting an answer, empty unless `requires_action`.
    pub fn pending_tool_calls(&self) -> &[RequiredToolCall] {
        self.required_action
            .as_ref()
            .map(|a| a.submit_tool_outputs.tool_calls.as_slice())
            .unwrap_or(&[])
    }
}

/// The answer to one tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub tool_call_id: String,
    pub output: String,
}

// --- Files ---

/// Why a file is being uploaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilePurpose {
    Assistants,
}

impl FilePurpose {
    pub fn as_str(self) -> &'static str {
        match self {
            FilePurpose::Assistants => "assistants",
        }
    }
}

/// An uploaded file handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileObject {
    pub id: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub bytes: u64,
}

/// The core AssistantService trait.
///
/// Every call is one request/response against the remote service. Message
/// listing returns newest first, matching the API's default ordering.
#[async_trait]
pub trait AssistantService: Send + Sync {
    /// A human-readable name for this backend (e.g., "azure", "openai").
    fn name(&self) -> &str;

    async fn create_assistant(&self, spec: &AssistantSpec) -> Result<Assistant, ProviderError>;

    async fn create_thread(&self) -> Result<Thread, ProviderError>;

    async fn create_message(
        &self,
        thread_id: &str,
        message: &NewMessage,
    ) -> Result<ThreadMessage, ProviderError>;

    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run, ProviderError>;

    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<Run, ProviderError>;

    /// Answer every pending tool call of a `requires_action` run in one call.
    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: &[ToolOutput],
    ) -> Result<Run, ProviderError>;

    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> Result<Run, ProviderError>;

    /// Messages on the thread, newest first.
    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>, ProviderError>;

    async fn upload_file(
        &self,
        file_name: &str,
        data: Vec<u8>,
        purpose: FilePurpose,
    ) -> Result<FileObject, ProviderError>;

    async fn read_file(&self, file_id: &str) -> Result<Vec<u8>, ProviderError>;
}
