//! Shared test helpers: a scripted in-memory assistant service.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use threadline_core::assistant::*;
use threadline_core::error::ProviderError;
use threadline_core::message::Role;

/// One call observed by the [`ScriptedService`].
#[derive(Debug, Clone)]
pub enum Recorded {
    CreateAssistant(AssistantSpec),
    CreateThread,
    CreateMessage(NewMessage),
    CreateRun,
    GetRun,
    SubmitToolOutputs(Vec<ToolOutput>),
    CancelRun,
    ListMessages,
    UploadFile { file_name: String, size: usize },
    ReadFile(String),
}

/// A mock service that replays a scripted sequence of run states.
///
/// `get_run` pops the next scripted run; the last one repeats once the
/// script is down to a single entry. An empty script reports `completed`.
/// Uploaded files get the id `file-<name>`.
pub struct ScriptedService {
    polls: Mutex<VecDeque<Run>>,
    messages: Mutex<Vec<ThreadMessage>>,
    files: Mutex<HashMap<String, Vec<u8>>>,
    calls: Mutex<Vec<Recorded>>,
    thread_failures: Mutex<usize>,
}

impl ScriptedService {
    pub fn new(polls: Vec<Run>) -> Self {
        Self {
            polls: Mutex::new(polls.into()),
            messages: Mutex::new(Vec::new()),
            files: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            thread_failures: Mutex::new(0),
        }
    }

    /// Make the next `count` calls to `create_thread` fail.
    pub fn failing_thread_creation(self, count: usize) -> Self {
        *self.thread_failures.lock().unwrap() = count;
        self
    }

    /// Messages returned by `list_messages`, newest first.
    pub fn with_messages(self, messages: Vec<ThreadMessage>) -> Self {
        *self.messages.lock().unwrap() = messages;
        self
    }

    pub fn with_file(self, file_id: &str, data: &[u8]) -> Self {
        self.files
            .lock()
            .unwrap()
            .insert(file_id.to_string(), data.to_vec());
        self
    }

    pub fn calls(&self) -> Vec<Recorded> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Recorded) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    /// Every batch passed to `submit_tool_outputs`, in call order.
    pub fn submissions(&self) -> Vec<Vec<ToolOutput>> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Recorded::SubmitToolOutputs(outputs) => Some(outputs),
                _ => None,
            })
            .collect()
    }

    /// Every message posted with `create_message`.
    pub fn posted_messages(&self) -> Vec<NewMessage> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Recorded::CreateMessage(m) => Some(m),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Recorded) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl AssistantService for ScriptedService {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn create_assistant(&self, spec: &AssistantSpec) -> Result<Assistant, ProviderError> {
        self.record(Recorded::CreateAssistant(spec.clone()));
        Ok(Assistant {
            id: "asst_1".into(),
            name: Some(spec.name.clone()),
            model: spec.model.clone(),
        })
    }

    async fn create_thread(&self) -> Result<Thread, ProviderError> {
        self.record(Recorded::CreateThread);
        let mut failures = self.thread_failures.lock().unwrap();
        if *failures > 0 {
            *failures -= 1;
            return Err(ProviderError::Network("connection reset".into()));
        }
        Ok(Thread {
            id: "thread_1".into(),
        })
    }

    async fn create_message(
        &self,
        _thread_id: &str,
        message: &NewMessage,
    ) -> Result<ThreadMessage, ProviderError> {
        self.record(Recorded::CreateMessage(message.clone()));
        Ok(ThreadMessage {
            id: "msg_user".into(),
            role: Role::User,
            content: vec![],
            run_id: None,
            created_at: 0,
        })
    }

    async fn create_run(&self, _thread_id: &str, _assistant_id: &str) -> Result<Run, ProviderError> {
        self.record(Recorded::CreateRun);
        Ok(run(RunStatus::Queued))
    }

    async fn get_run(&self, _thread_id: &str, _run_id: &str) -> Result<Run, ProviderError> {
        self.record(Recorded::GetRun);
        let mut polls = self.polls.lock().unwrap();
        let next = if polls.len() > 1 {
            polls.pop_front()
        } else {
            polls.front().cloned()
        };
        Ok(next.unwrap_or_else(|| run(RunStatus::Completed)))
    }

    async fn submit_tool_outputs(
        &self,
        _thread_id: &str,
        _run_id: &str,
        outputs: &[ToolOutput],
    ) -> Result<Run, ProviderError> {
        self.record(Recorded::SubmitToolOutputs(outputs.to_vec()));
        Ok(run(RunStatus::Queued))
    }

    async fn cancel_run(&self, _thread_id: &str, _run_id: &str) -> Result<Run, ProviderError> {
        self.record(Recorded::CancelRun);
        Ok(run(RunStatus::Cancelling))
    }

    async fn list_messages(&self, _thread_id: &str) -> Result<Vec<ThreadMessage>, ProviderError> {
        self.record(Recorded::ListMessages);
        Ok(self.messages.lock().unwrap().clone())
    }

    async fn upload_file(
        &self,
        file_name: &str,
        data: Vec<u8>,
        _purpose: FilePurpose,
    ) -> Result<FileObject, ProviderError> {
        self.record(Recorded::UploadFile {
            file_name: file_name.to_string(),
            size: data.len(),
        });
        Ok(FileObject {
            id: format!("file-{file_name}"),
            filename: file_name.to_string(),
            bytes: data.len() as u64,
        })
    }

    async fn read_file(&self, file_id: &str) -> Result<Vec<u8>, ProviderError> {
        self.record(Recorded::ReadFile(file_id.to_string()));
        self.files
            .lock()
            .unwrap()
            .get(file_id)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(format!("No such file: {file_id}")))
    }
}

/// A run in the given state with no pending action.
pub fn run(status: RunStatus) -> Run {
    Run {
        id: "run_1".into(),
        thread_id: "thread_1".into(),
        status,
        required_action: None,
        last_error: None,
    }
}

/// A failed run carrying a service error message.
pub fn failed_run(message: &str) -> Run {
    Run {
        last_error: Some(RunError {
            code: "server_error".into(),
            message: message.into(),
        }),
        ..run(RunStatus::Failed)
    }
}

/// A `requires_action` run asking for the given `(call_id, name, arguments)`.
pub fn requires_action(calls: &[(&str, &str, &str)]) -> Run {
    Run {
        required_action: Some(RequiredAction {
            submit_tool_outputs: SubmitToolOutputs {
                tool_calls: calls
                    .iter()
                    .map(|(id, name, arguments)| RequiredToolCall {
                        id: id.to_string(),
                        function: FunctionCall {
                            name: name.to_string(),
                            arguments: arguments.to_string(),
                        },
                    })
                    .collect(),
            },
        }),
        ..run(RunStatus::RequiresAction)
    }
}

/// An assistant message with the given content blocks.
pub fn assistant_message(id: &str, run_id: Option<&str>, content: Vec<MessageContent>) -> ThreadMessage {
    ThreadMessage {
        id: id.into(),
        role: Role::Assistant,
        content,
        run_id: run_id.map(str::to_string),
        created_at: 0,
    }
}

pub fn text_block(value: &str) -> MessageContent {
    MessageContent::Text {
        text: TextContent {
            value: value.into(),
            annotations: vec![],
        },
    }
}

/// A tool that echoes its `location` argument into a fixed-shape payload.
pub struct FixedTool {
    pub name: &'static str,
}

#[async_trait]
impl threadline_core::tool::Tool for FixedTool {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        "Fixed test tool"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {"location": {"type": "string"}},
            "required": ["location"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
    ) -> Result<threadline_core::tool::ToolResult, threadline_core::error::ToolError> {
        let location = arguments["location"].as_str().ok_or_else(|| {
            threadline_core::error::ToolError::InvalidArguments("Missing 'location' argument".into())
        })?;
        Ok(threadline_core::tool::ToolResult {
            call_id: String::new(),
            success: true,
            output: serde_json::json!({"tool": self.name, "location": location}).to_string(),
        })
    }
}

/// A registry with `current_weather` and `current_time` fixed tools.
pub fn fixed_registry() -> threadline_core::tool::ToolRegistry {
    let mut registry = threadline_core::tool::ToolRegistry::new();
    registry.register(Box::new(FixedTool {
        name: "current_weather",
    }));
    registry.register(Box::new(FixedTool {
        name: "current_time",
    }));
    registry
}
