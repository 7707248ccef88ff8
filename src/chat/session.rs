//! Conversation session
//!
//! Holds the continuation id and turns each prompt into a lazy stream of
//! normalized increments.

use std::sync::Arc;

use futures::StreamExt;
use futures::stream::BoxStream;

use super::error::ChatError;
use super::increment::NormalizedIncrement;
use super::normalizer::{EventNormalizer, Normalized};
use super::tools::ToolNameTable;
use crate::mistral::model::requests::{AppendConversationRequest, StartConversationRequest};
use crate::mistral::service::ConversationService;
use crate::model::config::Config;

/// Parameters for starting new conversations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    pub model: String,
    pub tools: Vec<String>,
    pub title_length: usize,
}

impl SessionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            model: config.model.clone(),
            tools: config.tools.clone(),
            title_length: config.title_length,
        }
    }
}

/// Stream of increments for one prompt
pub type IncrementStream<'a> = BoxStream<'a, Result<NormalizedIncrement, ChatError>>;

pub struct ConversationSession<S> {
    service: Arc<S>,
    normalizer: EventNormalizer<S>,
    settings: SessionSettings,
    conversation_id: Option<String>,
}

impl<S: ConversationService> ConversationSession<S> {
    /// Session that starts a new conversation on its first prompt
    pub fn new(service: Arc<S>, tools: ToolNameTable, settings: SessionSettings) -> Self {
        Self {
            normalizer: EventNormalizer::new(service.clone(), tools),
            service,
            settings,
            conversation_id: None,
        }
    }

    /// Session continuing an existing conversation
    pub fn resume(
        service: Arc<S>,
        tools: ToolNameTable,
        settings: SessionSettings,
        conversation_id: impl Into<String>,
    ) -> Self {
        let mut session = Self::new(service, tools, settings);
        session.conversation_id = Some(conversation_id.into());
        session
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    /// Send a prompt and stream the reply
    ///
    /// Nothing is sent until the stream is first polled. Each increment is
    /// yielded as soon as its event is normalized, and the continuation id
    /// is refreshed on every event. Per-event errors are yielded and the
    /// stream goes on; a terminal error is yielded last. Dropping the stream
    /// abandons the response body and never resends the prompt.
    pub fn send(&mut self, prompt: impl Into<String>) -> IncrementStream<'_> {
        let prompt = prompt.into();
        let session = self;

        Box::pin(async_stream::stream! {
            let opened = match session.conversation_id.clone() {
                None => {
                    tracing::info!(model = %session.settings.model, "Starting new conversation");
                    let request = StartConversationRequest::new(
                        session.settings.model.clone(),
                        prompt,
                        session.settings.title_length,
                        &session.settings.tools,
                    );
                    session.service.start_conversation(request).await
                }
                Some(id) => {
                    tracing::info!(conversation_id = %id, "Continuing conversation");
                    session
                        .service
                        .append_conversation(&id, AppendConversationRequest::new(prompt))
                        .await
                }
            };

            let mut events = match opened {
                Ok(events) => events,
                Err(e) => {
                    tracing::error!("Failed to send prompt: {}", e);
                    yield Err(ChatError::Transport(e));
                    return;
                }
            };

            while let Some(event) = events.next().await {
                let event = match event {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::error!("Reply stream failed: {}", e);
                        yield Err(ChatError::Transport(e));
                        return;
                    }
                };

                match session
                    .normalizer
                    .normalize(event, session.conversation_id.as_deref())
                    .await
                {
                    Ok(Normalized {
                        increment,
                        conversation_id,
                    }) => {
                        session.conversation_id = conversation_id;
                        if let Some(increment) = increment {
                            yield Ok(increment);
                        }
                    }
                    Err(e) if e.is_terminal() => {
                        tracing::error!("Reply aborted: {}", e);
                        yield Err(e);
                        return;
                    }
                    Err(e) => {
                        tracing::warn!("Skipping event: {}", e);
                        yield Err(e);
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::image::tests::png_header;
    use crate::chat::testing::{Call, FakeService, Reply, output, started, status_error, tool_started};
    use crate::mistral::model::content::{ContentChunk, MessageContent};
    use crate::mistral::model::events::RawEvent;
    use futures::TryStreamExt;
    use reqwest::StatusCode;
    use std::sync::atomic::Ordering;

    fn settings() -> SessionSettings {
        SessionSettings {
            model: "mistral-large-2411".to_string(),
            tools: vec!["web_search".to_string()],
            title_length: 30,
        }
    }

    fn session(service: FakeService) -> ConversationSession<FakeService> {
        ConversationSession::new(Arc::new(service), ToolNameTable::default(), settings())
    }

    async fn collect(
        session: &mut ConversationSession<FakeService>,
        prompt: &str,
    ) -> Vec<Result<NormalizedIncrement, ChatError>> {
        session.send(prompt).collect().await
    }

    #[tokio::test]
    async fn test_fresh_session_starts_conversation() {
        let service = FakeService::new().with_reply(vec![started("c1"), output("hi there")]);
        let mut session = session(service);

        let increments: Vec<_> = session.send("hello").try_collect().await.unwrap();

        assert_eq!(increments, vec![NormalizedIncrement::text("hi there")]);
        assert_eq!(session.conversation_id(), Some("c1"));
        assert_eq!(
            session.service.calls(),
            vec![Call::Start(StartConversationRequest::new(
                "mistral-large-2411",
                "hello",
                30,
                &["web_search".to_string()]
            ))]
        );
    }

    #[tokio::test]
    async fn test_second_prompt_appends() {
        let service = FakeService::new()
            .with_reply(vec![started("c1"), output("first")])
            .with_reply(vec![started("c1"), output("second")]);
        let mut session = session(service);

        collect(&mut session, "one").await;
        let second: Vec<_> = session.send("two").try_collect().await.unwrap();

        assert_eq!(second, vec![NormalizedIncrement::text("second")]);
        assert_eq!(
            session.service.calls()[1],
            Call::Append("c1".to_string(), AppendConversationRequest::new("two"))
        );
    }

    #[tokio::test]
    async fn test_resumed_session_appends_immediately() {
        let service = FakeService::new().with_reply(vec![output("welcome back")]);
        let mut session = ConversationSession::resume(
            Arc::new(service),
            ToolNameTable::default(),
            settings(),
            "c9",
        );

        collect(&mut session, "hi again").await;
        assert_eq!(
            session.service.calls(),
            vec![Call::Append("c9".to_string(), AppendConversationRequest::new("hi again"))]
        );
        assert_eq!(session.conversation_id(), Some("c9"));
    }

    #[tokio::test]
    async fn test_increments_keep_event_order() {
        let service = FakeService::new()
            .with_reply(vec![
                started("c1"),
                tool_started("web_search"),
                output("a"),
                RawEvent::MessageOutput {
                    content: MessageContent::Chunk(ContentChunk::ToolReference {
                        tool: None,
                        title: "t".to_string(),
                        url: Some("u".to_string()),
                    }),
                },
                RawEvent::ToolExecutionDone {
                    tool_name: "web_search".to_string(),
                },
                output("b"),
                RawEvent::ResponseDone { usage: None },
            ]);
        let mut session = session(service);

        let increments: Vec<_> = session.send("q").try_collect().await.unwrap();
        assert_eq!(
            increments,
            vec![
                NormalizedIncrement::StatusNote {
                    text: "Searching the web\n\n".to_string()
                },
                NormalizedIncrement::text("a"),
                NormalizedIncrement::text(" [[t](u)] "),
                NormalizedIncrement::text("b"),
            ]
        );
    }

    #[tokio::test]
    async fn test_per_event_errors_do_not_end_stream() {
        let service = FakeService::new()
            .with_file("f1", png_header(8, 8))
            .with_reply(vec![
                started("c1"),
                tool_started("unknown_tool"),
                RawEvent::MessageOutput {
                    content: MessageContent::Chunk(ContentChunk::ToolFile {
                        tool: None,
                        file_id: "missing".to_string(),
                        file_name: None,
                        file_type: None,
                    }),
                },
                RawEvent::MessageOutput {
                    content: MessageContent::Chunk(ContentChunk::ToolFile {
                        tool: None,
                        file_id: "f1".to_string(),
                        file_name: None,
                        file_type: None,
                    }),
                },
                output("after"),
            ]);
        let mut session = session(service);

        let items = collect(&mut session, "draw").await;
        assert_eq!(items.len(), 4);
        assert!(matches!(items[0], Err(ChatError::UnknownTool { .. })));
        assert!(matches!(items[1], Err(ChatError::AttachmentFetch { .. })));
        assert!(matches!(items[2], Ok(NormalizedIncrement::ImageReady { .. })));
        assert_eq!(items[3].as_ref().unwrap(), &NormalizedIncrement::text("after"));
    }

    #[tokio::test]
    async fn test_transport_error_is_terminal() {
        let service = FakeService::new().with_script(Reply::Events(vec![
            Ok(started("c1")),
            Ok(output("partial")),
            Err(status_error("append conversation", StatusCode::BAD_GATEWAY)),
            Ok(output("never")),
        ]));
        let mut session = session(service);

        let items = collect(&mut session, "q").await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), &NormalizedIncrement::text("partial"));
        assert!(matches!(items[1], Err(ChatError::Transport(_))));
        assert_eq!(session.conversation_id(), Some("c1"));
    }

    #[tokio::test]
    async fn test_failed_start_yields_single_error() {
        let service = FakeService::new().with_script(Reply::Fail(status_error(
            "start conversation",
            StatusCode::UNAUTHORIZED,
        )));
        let mut session = session(service);

        let items = collect(&mut session, "q").await;
        assert_eq!(items.len(), 1);
        assert!(items[0].as_ref().unwrap_err().is_terminal());
        assert_eq!(session.conversation_id(), None);
    }

    #[tokio::test]
    async fn test_remote_error_ends_stream() {
        let service = FakeService::new().with_reply(vec![
            started("c1"),
            RawEvent::ResponseError {
                code: "3000".to_string(),
                message: "overloaded".to_string(),
            },
            output("never"),
        ]);
        let mut session = session(service);

        let items = collect(&mut session, "q").await;
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(ChatError::Remote { .. })));
    }

    #[tokio::test]
    async fn test_lazy_and_abandonable() {
        let service = Arc::new(FakeService::new().with_reply(vec![
            started("c1"),
            output("one"),
            output("two"),
            output("three"),
        ]));
        let mut session =
            ConversationSession::new(service.clone(), ToolNameTable::default(), settings());

        drop(session.send("never sent"));
        assert!(service.calls().is_empty());

        let first: Vec<_> = session.send("q").take(1).collect().await;
        assert_eq!(first.len(), 1);

        // started + first output pulled, the rest abandoned
        assert_eq!(service.pulled.load(Ordering::SeqCst), 2);
        assert_eq!(service.calls().len(), 1);
        assert_eq!(session.conversation_id(), Some("c1"));
    }
}
