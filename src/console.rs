//! Line-oriented console driver
//!
//! Reads prompts from stdin and prints reply increments as they arrive.
//! Generated images are written to the configured directory.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::chat::accumulator::{Appended, MessageAccumulator};
use crate::chat::image::DecodedImage;
use crate::chat::transcript::{RenderableMessage, Speaker, reconstruct};
use crate::chat::worker::{self, WorkerUpdate};
use crate::chat::{ConversationSession, SessionSettings, ToolNameTable};
use crate::mistral::service::ConversationService;

/// Updates buffered between the worker and the console
const UPDATE_CAPACITY: usize = 64;

const PROMPT: &str = "> ";

/// Print `id<TAB>name` for every named conversation
pub async fn list_conversations<S: ConversationService>(service: &S) -> anyhow::Result<()> {
    let conversations = service
        .list_conversations()
        .await
        .context("Failed to list conversations")?;

    let mut out = std::io::stdout().lock();
    for conversation in conversations {
        writeln!(out, "{}\t{}", conversation.id, conversation.name)?;
    }
    Ok(())
}

/// Run an interactive chat, optionally resuming `resume`
pub async fn run<S: ConversationService + 'static>(
    service: Arc<S>,
    tools: ToolNameTable,
    settings: SessionSettings,
    image_dir: &Path,
    resume: Option<String>,
    initial_message: Option<String>,
) -> anyhow::Result<()> {
    let (session, accumulator) = open_session(service, tools, settings, resume).await?;
    chat_loop(session, accumulator, image_dir, initial_message).await
}

/// Fresh session, or one continuing `resume` with its history printed
async fn open_session<S: ConversationService>(
    service: Arc<S>,
    tools: ToolNameTable,
    settings: SessionSettings,
    resume: Option<String>,
) -> anyhow::Result<(ConversationSession<S>, MessageAccumulator)> {
    match resume {
        Some(id) => {
            let accumulator = print_transcript(service.as_ref(), &id).await?;
            Ok((
                ConversationSession::resume(service, tools, settings, id),
                accumulator,
            ))
        }
        None => Ok((
            ConversationSession::new(service, tools, settings),
            MessageAccumulator::new(),
        )),
    }
}

/// Print a stored conversation and return it as the starting transcript
async fn print_transcript<S: ConversationService>(
    service: &S,
    conversation_id: &str,
) -> anyhow::Result<MessageAccumulator> {
    let history = service
        .get_messages(conversation_id)
        .await
        .with_context(|| format!("Failed to load conversation {}", conversation_id))?;
    let messages = reconstruct(&history);
    tracing::info!(
        conversation_id,
        count = messages.len(),
        "Reconstructed transcript"
    );

    let mut out = std::io::stdout().lock();
    for message in &messages {
        write!(out, "{}", format_message(message))?;
    }
    out.flush()?;

    Ok(MessageAccumulator::from_transcript(messages))
}

fn format_message(message: &RenderableMessage) -> String {
    match message.speaker {
        Speaker::User => format!("{}{}\n\n", PROMPT, message.text),
        Speaker::Assistant => format!("{}\n\n", message.text.trim_end()),
    }
}

async fn chat_loop<S: ConversationService + 'static>(
    session: ConversationSession<S>,
    mut accumulator: MessageAccumulator,
    image_dir: &Path,
    initial_message: Option<String>,
) -> anyhow::Result<()> {
    let (handle, mut updates) = worker::spawn(session, UPDATE_CAPACITY);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut busy = false;

    match initial_message.filter(|m| !m.trim().is_empty()) {
        Some(message) => {
            println!("{}{}", PROMPT, message);
            accumulator.push_user(message.clone());
            handle.submit(message)?;
            busy = true;
        }
        None => show_prompt()?,
    }

    loop {
        tokio::select! {
            line = lines.next_line(), if !busy => {
                let Some(line) = line.context("Failed to read from stdin")? else {
                    break;
                };
                let prompt = line.trim();
                if prompt.is_empty() {
                    show_prompt()?;
                    continue;
                }
                accumulator.push_user(prompt);
                handle.submit(prompt)?;
                busy = true;
            }
            update = updates.recv() => {
                let Some(update) = update else {
                    break;
                };
                if handle_update(update, &mut accumulator, image_dir).await? {
                    busy = false;
                    show_prompt()?;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                if !busy {
                    break;
                }
                handle.cancel();
            }
        }
    }

    handle.shutdown();
    println!();
    Ok(())
}

/// Print one worker update; returns whether the turn is over
async fn handle_update(
    update: WorkerUpdate,
    accumulator: &mut MessageAccumulator,
    image_dir: &Path,
) -> anyhow::Result<bool> {
    match update {
        WorkerUpdate::Increment(increment) => match accumulator.push(increment) {
            Appended::Text(text) => {
                let mut out = std::io::stdout().lock();
                write!(out, "{}", text)?;
                out.flush()?;
            }
            Appended::Image(image) => match save_image(image_dir, &image).await {
                Ok(path) => println!(
                    "\n[image {}x{} saved to {}]\n",
                    image.width,
                    image.height,
                    path.display()
                ),
                Err(e) => eprintln!("\n[image could not be saved: {:#}]\n", e),
            },
        },
        WorkerUpdate::Error(e) => eprintln!("\n[error: {}]", e),
        WorkerUpdate::TurnFinished {
            conversation_id,
            cancelled,
        } => {
            accumulator.finish_turn();
            if cancelled {
                println!("\n[cancelled]");
            }
            tracing::debug!(?conversation_id, "Turn finished");
            println!("\n");
            return Ok(true);
        }
    }
    Ok(false)
}

fn show_prompt() -> anyhow::Result<()> {
    let mut out = std::io::stdout().lock();
    write!(out, "{}", PROMPT)?;
    out.flush()?;
    Ok(())
}

/// Write `image` under `dir`, keeping only the final component of its file name
async fn save_image(dir: &Path, image: &DecodedImage) -> anyhow::Result<PathBuf> {
    let stem = format!("image-{}", chrono::Utc::now().format("%Y%m%d-%H%M%S%.3f"));
    let path = dir.join(safe_file_name(&image.suggested_file_name(&stem), &stem));

    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    tokio::fs::write(&path, &image.bytes)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

fn safe_file_name(name: &str, fallback: &str) -> String {
    Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.starts_with('.'))
        .unwrap_or(fallback)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::accumulator::TranscriptEntry;
    use crate::chat::image::decode_image;
    use crate::chat::image::tests::png_header;
    use crate::chat::testing::{Call, FakeService, output, started};
    use crate::mistral::model::conversations::StoredMessage;
    use crate::mistral::model::requests::AppendConversationRequest;
    use bytes::Bytes;
    use futures::TryStreamExt;

    fn settings() -> SessionSettings {
        SessionSettings {
            model: "mistral-large-2411".to_string(),
            tools: vec!["web_search".to_string()],
            title_length: 30,
        }
    }

    #[test]
    fn test_format_message() {
        assert_eq!(format_message(&RenderableMessage::user("hi")), "> hi\n\n");
        assert_eq!(
            format_message(&RenderableMessage::assistant("answer\n\n")),
            "answer\n\n"
        );
    }

    #[tokio::test]
    async fn test_resume_continues_stored_conversation() {
        let service = Arc::new(
            FakeService::new()
                .with_history(
                    "c9",
                    vec![StoredMessage::user("hi"), StoredMessage::assistant("hello")],
                )
                .with_reply(vec![started("c9"), output("again")]),
        );

        let (mut session, mut accumulator) = open_session(
            service.clone(),
            ToolNameTable::default(),
            settings(),
            Some("c9".to_string()),
        )
        .await
        .unwrap();

        assert_eq!(session.conversation_id(), Some("c9"));
        assert_eq!(
            accumulator.entries(),
            &[
                TranscriptEntry::Message(RenderableMessage::user("hi")),
                TranscriptEntry::Message(RenderableMessage::assistant("hello")),
            ]
        );

        accumulator.push_user("more");
        let increments: Vec<_> = session.send("more").try_collect().await.unwrap();
        for increment in increments {
            accumulator.push(increment);
        }
        accumulator.finish_turn();

        assert_eq!(
            service.calls(),
            vec![Call::Append(
                "c9".to_string(),
                AppendConversationRequest::new("more")
            )]
        );
        assert_eq!(accumulator.assistant_texts(), vec!["hello", "again"]);
        assert_eq!(
            accumulator.entries()[2],
            TranscriptEntry::Message(RenderableMessage::user("more"))
        );
    }

    #[tokio::test]
    async fn test_resume_unknown_conversation_fails() {
        let service = Arc::new(FakeService::new());
        let result = open_session(
            service.clone(),
            ToolNameTable::default(),
            settings(),
            Some("missing".to_string()),
        )
        .await;

        let err = result.err().unwrap();
        assert!(format!("{:#}", err).contains("Failed to load conversation missing"));
        assert!(service.calls().is_empty());
    }

    #[test]
    fn test_safe_file_name() {
        assert_eq!(safe_file_name("cat.png", "x"), "cat.png");
        assert_eq!(safe_file_name("../../etc/passwd", "x"), "passwd");
        assert_eq!(safe_file_name("..", "x"), "x");
        assert_eq!(safe_file_name(".hidden", "x"), "x");
    }

    #[tokio::test]
    async fn test_save_image() {
        let dir = std::env::temp_dir().join(format!(
            "intuistral-test-{}-{}",
            std::process::id(),
            chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));
        let mut image = decode_image(Bytes::from(png_header(2, 2)), None).unwrap();
        image.file_name = Some("sub/dir/cat.png".to_string());

        let path = save_image(&dir, &image).await.unwrap();
        assert_eq!(path, dir.join("cat.png"));
        assert_eq!(tokio::fs::read(&path).await.unwrap(), image.bytes.to_vec());

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
