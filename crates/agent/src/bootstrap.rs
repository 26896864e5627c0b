//! Session bootstrap: one remote assistant and one thread per process.
//!
//! Creating the assistant and thread is memoized in [`OnceCell`]s, so however
//! many times the shell asks for a session, the remote side sees exactly one
//! `create_assistant` and one `create_thread` call. The assistant has its own
//! cell: a retry after a failed thread creation reuses it.

use std::path::Path;
use std::sync::Arc;
use threadline_config::AppConfig;
use threadline_core::assistant::{AssistantService, AssistantSpec, AssistantTool, FilePurpose};
use threadline_core::error::{Error, Result};
use threadline_core::message::{Transcript, Turn};
use threadline_core::tool::ToolRegistry;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// Remote handles shared by every turn of the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHandles {
    pub assistant_id: String,
    pub thread_id: String,
    /// Reference document uploaded at bootstrap, if one was configured
    pub reference_file_id: Option<String>,
}

/// A live chat session: the remote handles plus the local transcript.
#[derive(Debug, Clone)]
pub struct Session {
    handles: Arc<SessionHandles>,
    transcript: Transcript,
}

impl Session {
    pub fn new(handles: Arc<SessionHandles>) -> Self {
        Self {
            handles,
            transcript: Transcript::new(),
        }
    }

    pub fn handles(&self) -> &SessionHandles {
        &self.handles
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub(crate) fn record(&mut self, turn: Turn) {
        self.transcript.push(turn);
    }
}

/// A small document uploaded once at bootstrap for later retrieval.
#[derive(Debug, Clone)]
pub struct ReferenceDocument {
    pub file_name: String,
    pub data: Vec<u8>,
}

impl ReferenceDocument {
    pub async fn load(path: &Path) -> Result<Self> {
        let data = tokio::fs::read(path).await.map_err(|e| Error::AttachmentRead {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "reference.txt".into());
        Ok(Self { file_name, data })
    }
}

/// Build the assistant declaration from config and the local tool registry.
///
/// Code execution and retrieval search are always enabled; every registered
/// tool is declared as a callable function.
pub fn assistant_spec(config: &AppConfig, tools: &ToolRegistry) -> AssistantSpec {
    let mut declared = vec![AssistantTool::CodeInterpreter, AssistantTool::FileSearch];
    declared.extend(
        tools
            .definitions()
            .into_iter()
            .map(|function| AssistantTool::Function { function }),
    );

    AssistantSpec {
        name: config.assistant.name.clone(),
        instructions: config.assistant.instructions.clone(),
        model: config.model.clone(),
        tools: declared,
    }
}

/// Memoized creator of the process-wide session handles.
pub struct Bootstrap {
    service: Arc<dyn AssistantService>,
    spec: AssistantSpec,
    reference: Option<ReferenceDocument>,
    assistant_id: OnceCell<String>,
    handles: OnceCell<Arc<SessionHandles>>,
}

impl Bootstrap {
    pub fn new(service: Arc<dyn AssistantService>, spec: AssistantSpec) -> Self {
        Self {
            service,
            spec,
            reference: None,
            assistant_id: OnceCell::new(),
            handles: OnceCell::new(),
        }
    }

    /// Upload this document once, alongside creating the assistant.
    pub fn with_reference_document(mut self, document: ReferenceDocument) -> Self {
        self.reference = Some(document);
        self
    }

    /// Create the assistant and thread on first call; return the same handles after.
    ///
    /// A failed attempt leaves the cell empty, so the next call retries.
    pub async fn ensure(&self) -> Result<Arc<SessionHandles>> {
        self.handles
            .get_or_try_init(|| self.create())
            .await
            .cloned()
    }

    /// Start a session with an empty transcript on the memoized handles.
    pub async fn start_session(&self) -> Result<Session> {
        Ok(Session::new(self.ensure().await?))
    }

    async fn create_assistant(&self) -> Result<String> {
        let assistant = self.service.create_assistant(&self.spec).await?;
        info!(
            assistant_id = %assistant.id,
            model = %assistant.model,
            tools = self.spec.tools.len(),
            "Created assistant"
        );
        Ok(assistant.id)
    }

    async fn create(&self) -> Result<Arc<SessionHandles>> {
        let assistant_id = self
            .assistant_id
            .get_or_try_init(|| self.create_assistant())
            .await?
            .clone();

        let thread = self.service.create_thread().await?;
        info!(thread_id = %thread.id, "Created thread");

        let reference_file_id = match &self.reference {
            Some(doc) => {
                let file = self
                    .service
                    .upload_file(&doc.file_name, doc.data.clone(), FilePurpose::Assistants)
                    .await?;
                debug!(file_id = %file.id, file_name = %doc.file_name, "Uploaded reference document");
                Some(file.id)
            }
            None => None,
        };

        Ok(Arc::new(SessionHandles {
            assistant_id,
            thread_id: thread.id,
            reference_file_id,
        }))
    }
}
