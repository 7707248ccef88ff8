//! Chat worker
//!
//! A background task owns the session and runs prompts one at a time.
//! Increments reach the presentation layer over a bounded channel in the
//! order they were produced.

use futures::StreamExt;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use super::error::ChatError;
use super::increment::NormalizedIncrement;
use super::session::ConversationSession;
use crate::mistral::service::ConversationService;

/// Message from the worker to the presentation layer
#[derive(Debug)]
pub enum WorkerUpdate {
    Increment(NormalizedIncrement),
    Error(ChatError),
    /// The current prompt is done; the next submission may start
    TurnFinished {
        conversation_id: Option<String>,
        cancelled: bool,
    },
}

#[derive(Debug, Error)]
#[error("chat worker has stopped")]
pub struct WorkerStopped;

/// Handle to a running chat worker; dropping it stops the worker
pub struct ChatHandle {
    prompts: mpsc::UnboundedSender<String>,
    cancel: watch::Sender<u64>,
    task: JoinHandle<()>,
}

impl ChatHandle {
    /// Queue a prompt
    pub fn submit(&self, prompt: impl Into<String>) -> Result<(), WorkerStopped> {
        self.prompts.send(prompt.into()).map_err(|_| WorkerStopped)
    }

    /// Abandon the reply in flight, if any
    pub fn cancel(&self) {
        self.cancel.send_modify(|generation| *generation = generation.wrapping_add(1));
    }

    /// Stop the worker without waiting for the reply in flight
    pub fn shutdown(&self) {
        self.task.abort();
    }

    #[cfg(test)]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for ChatHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Spawn a worker owning `session`
///
/// `capacity` bounds the number of updates not yet taken by the receiver.
/// Dropping the receiver stops the worker at its next handoff.
pub fn spawn<S>(
    session: ConversationSession<S>,
    capacity: usize,
) -> (ChatHandle, mpsc::Receiver<WorkerUpdate>)
where
    S: ConversationService + 'static,
{
    let (prompt_tx, prompt_rx) = mpsc::unbounded_channel();
    let (update_tx, update_rx) = mpsc::channel(capacity);
    let (cancel_tx, cancel_rx) = watch::channel(0u64);

    let task = tokio::spawn(run(session, prompt_rx, cancel_rx, update_tx));

    (
        ChatHandle {
            prompts: prompt_tx,
            cancel: cancel_tx,
            task,
        },
        update_rx,
    )
}

async fn run<S: ConversationService>(
    mut session: ConversationSession<S>,
    mut prompts: mpsc::UnboundedReceiver<String>,
    mut cancel: watch::Receiver<u64>,
    updates: mpsc::Sender<WorkerUpdate>,
) {
    while let Some(prompt) = prompts.recv().await {
        // Cancels issued between turns do not apply to this one
        cancel.borrow_and_update();
        let mut cancelled = false;

        {
            let mut stream = session.send(prompt);
            loop {
                tokio::select! {
                    item = stream.next() => {
                        let update = match item {
                            Some(Ok(increment)) => WorkerUpdate::Increment(increment),
                            Some(Err(e)) => WorkerUpdate::Error(e),
                            None => break,
                        };
                        if updates.send(update).await.is_err() {
                            tracing::debug!("Update receiver dropped, stopping chat worker");
                            return;
                        }
                    }
                    changed = cancel.changed() => {
                        if changed.is_err() {
                            return;
                        }
                        tracing::info!("Reply cancelled");
                        cancelled = true;
                        break;
                    }
                }
            }
        }

        let finished = WorkerUpdate::TurnFinished {
            conversation_id: session.conversation_id().map(str::to_string),
            cancelled,
        };
        if updates.send(finished).await.is_err() {
            return;
        }
    }
}
