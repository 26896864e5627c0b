//! One user turn end to end: post, run, render, record.

use std::sync::Arc;
use threadline_config::AppConfig;
use threadline_core::assistant::AssistantService;
use threadline_core::error::Result;
use threadline_core::event::EventBus;
use threadline_core::message::Turn;
use threadline_core::tool::ToolRegistry;
use tokio::sync::watch;
use tracing::info;

use crate::attachment::{Attachment, prepare_message};
use crate::bootstrap::Session;
use crate::renderer::Renderer;
use crate::run_loop::RunLoop;

/// What the user submitted for one turn.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub prompt: String,
    pub attachment: Option<Attachment>,
}

impl TurnRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            attachment: None,
        }
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachment = Some(attachment);
        self
    }
}

/// Runs turns against a session.
///
/// `send` takes the session by `&mut`, so a session never has two runs in
/// flight.
pub struct ChatEngine {
    service: Arc<dyn AssistantService>,
    run_loop: RunLoop,
    renderer: Renderer,
    event_bus: Arc<EventBus>,
}

impl ChatEngine {
    pub fn new(
        service: Arc<dyn AssistantService>,
        tools: Arc<ToolRegistry>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            run_loop: RunLoop::new(service.clone(), tools, event_bus.clone()),
            renderer: Renderer::new(service.clone()),
            service,
            event_bus,
        }
    }

    /// Apply tuning knobs from config.
    pub fn configured(mut self, config: &AppConfig) -> Self {
        self.run_loop = self.run_loop.with_poll_interval(config.poll_interval());
        self
    }

    pub fn with_poll_interval(mut self, interval: std::time::Duration) -> Self {
        self.run_loop = self.run_loop.with_poll_interval(interval);
        self
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    /// Send one turn and wait for the rendered reply.
    ///
    /// The user turn is recorded once the message is posted. The assistant
    /// turn is recorded only if the run completes; on any error the
    /// transcript keeps just the user turn.
    pub async fn send(
        &self,
        session: &mut Session,
        request: TurnRequest,
        mut abort: watch::Receiver<bool>,
    ) -> Result<Turn> {
        let handles = session.handles().clone();

        let message = prepare_message(
            self.service.as_ref(),
            &request.prompt,
            request.attachment,
            &self.event_bus,
        )
        .await?;
        self.service
            .create_message(&handles.thread_id, &message)
            .await?;
        session.record(Turn::user(message.content));

        let run = self.run_loop.run_to_completion(&handles, &mut abort).await?;
        let reply = self.renderer.render_latest(&handles.thread_id, &run.id).await?;
        info!(
            run_id = %run.id,
            images = reply.images.len(),
            files = reply.files.len(),
            "Rendered reply"
        );

        session.record(reply.clone());
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap::SessionHandles;
    use crate::test_helpers::*;
    use std::time::Duration;
    use threadline_core::assistant::RunStatus;
    use threadline_core::message::{Role, TurnText};

    fn session() -> Session {
        Session::new(Arc::new(SessionHandles {
            assistant_id: "asst_1".into(),
            thread_id: "thread_1".into(),
            reference_file_id: None,
        }))
    }

    fn engine(service: Arc<ScriptedService>) -> ChatEngine {
        ChatEngine::new(
            service,
            Arc::new(fixed_registry()),
            Arc::new(EventBus::default()),
        )
        .with_poll_interval(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn weather_question_round_trip() {
        let service = Arc::new(
            ScriptedService::new(vec![
                requires_action(&[("call_1", "current_weather", r#"{"location":"Seoul"}"#)]),
                run(RunStatus::Completed),
            ])
            .with_messages(vec![assistant_message(
                "msg_2",
                Some("run_1"),
                vec![text_block("It is 21.3°C and clear in Seoul.")],
            )]),
        );
        let engine = engine(service.clone());
        let mut session = session();
        let (_tx, rx) = watch::channel(false);

        let reply = engine
            .send(&mut session, TurnRequest::text("What's the weather in Seoul?"), rx)
            .await
            .unwrap();

        assert!(reply.text.display_text().contains("21.3"));
        assert!(reply.images.is_empty());
        assert!(reply.files.is_empty());

        let turns = session.transcript().turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[0].text, TurnText::from("What's the weather in Seoul?"));
        assert_eq!(turns[1].role, Role::Assistant);
        assert_eq!(service.submissions().len(), 1);
    }

    #[tokio::test]
    async fn failed_run_records_no_reply() {
        let service = Arc::new(ScriptedService::new(vec![
            run(RunStatus::InProgress),
            run(RunStatus::InProgress),
            run(RunStatus::Failed),
        ]));
        let engine = engine(service.clone());
        let mut session = session();
        let (_tx, rx) = watch::channel(false);

        let result = engine
            .send(&mut session, TurnRequest::text("hello"), rx)
            .await;

        assert!(result.is_err());
        let turns = session.transcript().turns();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(service.count(|c| matches!(c, Recorded::ListMessages)), 0);
    }

    #[tokio::test]
    async fn image_turn_keeps_structured_text() {
        let service = Arc::new(
            ScriptedService::new(vec![run(RunStatus::Completed)]).with_messages(vec![
                assistant_message("msg_2", Some("run_1"), vec![text_block("A bar chart.")]),
            ]),
        );
        let engine = engine(service.clone());
        let mut session = session();
        let (_tx, rx) = watch::channel(false);

        let request = TurnRequest::text("describe this image")
            .with_attachment(Attachment::new("chart.png", vec![0x89, b'P']));
        engine.send(&mut session, request, rx).await.unwrap();

        let posted = service.posted_messages();
        assert_eq!(posted.len(), 1);
        assert!(posted[0].attachments.is_empty());
        assert_eq!(posted[0].content.image_file_ids(), vec!["file-chart.png"]);

        let user_turn = &session.transcript().turns()[0];
        assert_eq!(user_turn.text.display_text(), "describe this image");
        assert_eq!(user_turn.text.image_file_ids(), vec!["file-chart.png"]);
    }

    #[tokio::test]
    async fn unsupported_attachment_posts_nothing() {
        let service = Arc::new(ScriptedService::new(vec![]));
        let engine = engine(service.clone());
        let mut session = session();
        let (_tx, rx) = watch::channel(false);

        let request =
            TurnRequest::text("run it").with_attachment(Attachment::new("run.sh", vec![1]));
        assert!(engine.send(&mut session, request, rx).await.is_err());
        assert!(service.calls().is_empty());
        assert!(session.transcript().is_empty());
    }
}
