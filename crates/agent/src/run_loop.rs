//! The run loop: start a run on the session thread and drive it to a
//! terminal state, answering tool calls along the way.
//!
//! ```text
//! create_run -> POLL
//! POLL  queued | in_progress | cancelling  -> wait, POLL
//! POLL  requires_action                    -> DISPATCH
//! DISPATCH  submit whole batch             -> POLL
//! POLL  completed                          -> Ok(run)
//! POLL  failed | cancelled | expired | incomplete -> Err(RunFailed)
//! abort signal while waiting               -> cancel_run, Err(Aborted)
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};
use futures::future::join_all;
use threadline_core::assistant::{AssistantService, RequiredToolCall, Run, RunStatus, ToolOutput};
use threadline_core::error::{Error, Result};
use threadline_core::event::{DomainEvent, EventBus};
use threadline_core::tool::{ToolCall, ToolRegistry};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::bootstrap::SessionHandles;

/// Default delay between status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Drives one run at a time against the remote service.
pub struct RunLoop {
    service: Arc<dyn AssistantService>,
    tools: Arc<ToolRegistry>,
    event_bus: Arc<EventBus>,
    poll_interval: Duration,
}

impl RunLoop {
    pub fn new(
        service: Arc<dyn AssistantService>,
        tools: Arc<ToolRegistry>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            service,
            tools,
            event_bus,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Start a run for the thread's latest message and poll it to completion.
    ///
    /// Returns the completed run. Setting `abort` to `true` while the run is
    /// in flight cancels it remotely and returns [`Error::Aborted`].
    pub async fn run_to_completion(
        &self,
        handles: &SessionHandles,
        abort: &mut watch::Receiver<bool>,
    ) -> Result<Run> {
        let thread_id = handles.thread_id.as_str();
        let mut run = self
            .service
            .create_run(thread_id, &handles.assistant_id)
            .await?;

        info!(run_id = %run.id, thread_id, "Run started");
        self.event_bus.publish(DomainEvent::RunStarted {
            run_id: run.id.clone(),
            thread_id: thread_id.to_string(),
            timestamp: chrono::Utc::now(),
        });

        let mut last_status = run.status;

        loop {
            match run.status {
                RunStatus::Completed => {
                    self.finished(&run);
                    return Ok(run);
                }
                RunStatus::RequiresAction => {
                    let outputs = self.dispatch(run.pending_tool_calls()).await;
                    debug!(run_id = %run.id, count = outputs.len(), "Submitting tool outputs");
                    run = self
                        .service
                        .submit_tool_outputs(thread_id, &run.id, &outputs)
                        .await?;
                    self.observe(&run, &mut last_status);
                    continue;
                }
                status if status.is_failure() => {
                    warn!(run_id = %run.id, %status, "Run did not complete");
                    self.finished(&run);
                    return Err(Error::RunFailed {
                        run_id: run.id,
                        status,
                        last_error: run.last_error.map(|e| e.message),
                    });
                }
                _ => {}
            }

            if self.wait_or_abort(abort).await {
                return Err(self.abort(thread_id, &run.id).await);
            }

            run = self.service.get_run(thread_id, &run.id).await?;
            self.observe(&run, &mut last_status);
        }
    }

    /// Answer a batch of tool calls. Output order matches call order.
    pub async fn dispatch(&self, calls: &[RequiredToolCall]) -> Vec<ToolOutput> {
        join_all(calls.iter().map(|call| self.answer(call))).await
    }

    async fn answer(&self, call: &RequiredToolCall) -> ToolOutput {
        let name = call.function.name.as_str();
        let start = Instant::now();

        let (output, success, arguments) = if self.tools.get(name).is_none() {
            warn!(tool = name, "Unrecognized tool call, answering with empty object");
            ("{}".to_string(), true, serde_json::Value::Null)
        } else {
            match serde_json::from_str::<serde_json::Value>(&call.function.arguments) {
                Err(e) => {
                    warn!(tool = name, error = %e, "Tool arguments are not valid JSON");
                    (error_payload(&format!("Invalid arguments: {e}")), false, serde_json::Value::Null)
                }
                Ok(arguments) => {
                    let tool_call = ToolCall {
                        id: call.id.clone(),
                        name: name.to_string(),
                        arguments: arguments.clone(),
                    };
                    match self.tools.execute(&tool_call).await {
                        Ok(result) => (result.output, result.success, arguments),
                        Err(e) => {
                            warn!(tool = name, error = %e, "Tool execution failed");
                            (error_payload(&e.to_string()), false, arguments)
                        }
                    }
                }
            }
        };

        self.event_bus.publish(DomainEvent::ToolDispatched {
            tool_name: name.to_string(),
            arguments,
            success,
            duration_ms: start.elapsed().as_millis() as u64,
            timestamp: chrono::Utc::now(),
        });

        ToolOutput {
            tool_call_id: call.id.clone(),
            output,
        }
    }

    /// Sleep one poll interval. Returns `true` if an abort was requested.
    async fn wait_or_abort(&self, abort: &mut watch::Receiver<bool>) -> bool {
        if *abort.borrow() {
            return true;
        }

        tokio::select! {
            _ = tokio::time::sleep(self.poll_interval) => false,
            changed = abort.changed() => match changed {
                Ok(()) => *abort.borrow(),
                Err(_) => {
                    // Sender gone: nobody can abort anymore
                    tokio::time::sleep(self.poll_interval).await;
                    false
                }
            },
        }
    }

    async fn abort(&self, thread_id: &str, run_id: &str) -> Error {
        info!(run_id, "Aborting run");
        match self.service.cancel_run(thread_id, run_id).await {
            Ok(run) => debug!(run_id, status = %run.status, "Cancel requested"),
            Err(e) => warn!(run_id, error = %e, "Failed to cancel run"),
        }
        self.event_bus.publish(DomainEvent::RunFinished {
            run_id: run_id.to_string(),
            status: RunStatus::Cancelled,
            timestamp: chrono::Utc::now(),
        });
        Error::Aborted {
            run_id: run_id.to_string(),
        }
    }

    fn observe(&self, run: &Run, last_status: &mut RunStatus) {
        if run.status == *last_status {
            return;
        }
        debug!(run_id = %run.id, from = %last_status, to = %run.status, "Run status changed");
        *last_status = run.status;
        self.event_bus.publish(DomainEvent::RunStatusChanged {
            run_id: run.id.clone(),
            status: run.status,
            timestamp: chrono::Utc::now(),
        });
    }

    fn finished(&self, run: &Run) {
        self.event_bus.publish(DomainEvent::RunFinished {
            run_id: run.id.clone(),
            status: run.status,
            timestamp: chrono::Utc::now(),
        });
    }
}

fn error_payload(message: &str) -> String {
    serde_json::json!({ "error": message }).to_string()
}
