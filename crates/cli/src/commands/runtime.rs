//! Wiring shared by the chat and ask commands.

use anyhow::Context;
use std::path::Path;
use std::sync::Arc;
use threadline_agent::{
    Bootstrap, ChatEngine, ReferenceDocument, Session, assistant_spec,
};
use threadline_config::AppConfig;
use threadline_core::assistant::AssistantService;
use threadline_core::event::{DomainEvent, EventBus};
use threadline_tools::OpenWeatherClient;
use tokio::sync::{broadcast, oneshot, watch};
use tokio::task::JoinHandle;

pub struct Runtime {
    pub config: AppConfig,
    pub engine: ChatEngine,
    bootstrap: Bootstrap,
}

impl Runtime {
    /// Load config and build the service client, tools, and engine.
    ///
    /// Missing API key or endpoint stops here, before any interaction.
    pub async fn build(secrets: Option<&Path>) -> anyhow::Result<Self> {
        let config = AppConfig::load(secrets).context("Configuration error")?;

        let service: Arc<dyn AssistantService> =
            Arc::new(threadline_providers::build_from_config(&config)?);

        let weather = Arc::new(OpenWeatherClient::new(
            &config.weather.base_url,
            config.weather_api_key.clone(),
        ));
        let tools = Arc::new(threadline_tools::default_registry(weather));

        let mut bootstrap = Bootstrap::new(service.clone(), assistant_spec(&config, &tools));
        if let Some(path) = &config.reference_document {
            let document = ReferenceDocument::load(path)
                .await
                .context("Failed to load reference document")?;
            bootstrap = bootstrap.with_reference_document(document);
        }

        let engine =
            ChatEngine::new(service, tools, Arc::new(EventBus::default())).configured(&config);

        Ok(Self {
            config,
            engine,
            bootstrap,
        })
    }

    pub async fn session(&self) -> anyhow::Result<Session> {
        self.bootstrap
            .start_session()
            .await
            .context("Failed to create assistant session")
    }

    /// Print run progress to stderr until the returned printer is finished or dropped.
    pub fn spawn_progress(&self) -> Progress {
        Progress::spawn(self.engine.event_bus().subscribe(), |line| eprintln!("  {line}"))
    }
}

/// Background printer of progress lines.
pub struct Progress {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl Progress {
    pub fn spawn(
        mut events: broadcast::Receiver<Arc<DomainEvent>>,
        mut sink: impl FnMut(String) + Send + 'static,
    ) -> Self {
        let (stop, mut stopped) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            loop {
                // Queued events print before the stop signal is honoured
                tokio::select! {
                    biased;
                    event = events.recv() => match event {
                        Ok(event) => {
                            if let Some(line) = progress_line(&event) {
                                sink(line);
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    _ = &mut stopped => break,
                }
            }
        });
        Self { stop, task }
    }

    /// Print whatever is already queued, then stop.
    pub async fn finish(self) {
        let _ = self.stop.send(());
        let _ = self.task.await;
    }
}

fn progress_line(event: &DomainEvent) -> Option<String> {
    match event {
        DomainEvent::AttachmentUploaded {
            file_name,
            inline_image,
            ..
        } => Some(if *inline_image {
            format!("[image] {file_name}")
        } else {
            format!("[document] {file_name}")
        }),
        DomainEvent::RunStarted { .. } => Some("... thinking".into()),
        DomainEvent::ToolDispatched {
            tool_name,
            arguments,
            ..
        } => {
            let location = arguments["location"].as_str().unwrap_or("?");
            Some(format!(" -> {tool_name}: {location}"))
        }
        DomainEvent::RunFinished { status, .. } => Some(format!("... {status}")),
        DomainEvent::RunStatusChanged { .. } => None,
    }
}

/// An abort signal that fires on Ctrl+C, for the duration of one turn.
pub struct AbortOnInterrupt {
    receiver: Option<watch::Receiver<bool>>,
    listener: JoinHandle<()>,
}

impl AbortOnInterrupt {
    pub fn arm() -> Self {
        let (sender, receiver) = watch::channel(false);
        let listener = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\n  Cancelling run...");
                let _ = sender.send(true);
            }
        });
        Self {
            receiver: Some(receiver),
            listener,
        }
    }

    pub fn receiver(&mut self) -> watch::Receiver<bool> {
        self.receiver
            .take()
            .unwrap_or_else(|| watch::channel(false).1)
    }
}

impl Drop for AbortOnInterrupt {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::Mutex;
    use threadline_core::assistant::RunStatus;

    #[tokio::test]
    async fn finish_prints_events_already_queued() {
        let bus = EventBus::default();
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink = lines.clone();
        let progress = Progress::spawn(bus.subscribe(), move |line| sink.lock().unwrap().push(line));

        bus.publish(DomainEvent::RunStarted {
            run_id: "run_1".into(),
            thread_id: "thread_1".into(),
            timestamp: Utc::now(),
        });
        bus.publish(DomainEvent::RunFinished {
            run_id: "run_1".into(),
            status: RunStatus::Completed,
            timestamp: Utc::now(),
        });
        progress.finish().await;

        assert_eq!(*lines.lock().unwrap(), vec!["... thinking", "... completed"]);
    }

    #[test]
    fn status_changes_are_not_printed() {
        let event = DomainEvent::RunStatusChanged {
            run_id: "run_1".into(),
            status: RunStatus::InProgress,
            timestamp: Utc::now(),
        };
        assert!(progress_line(&event).is_none());
    }
}
