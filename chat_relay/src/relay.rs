use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::*;

use crate::{AssistantBackend, RelayError, Role, Run, ThreadId, ThreadMessage};

/// How often and how long to wait for a run.
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    pub interval: Duration,
    /// Upper bound on status checks. Always at least one.
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        PollPolicy {
            interval: Duration::from_millis(900),
            max_attempts: 40,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RelayReply {
    pub reply: String,
    pub thread_id: ThreadId,
}

pub struct ChatRelay {
    backend: Arc<dyn AssistantBackend>,
    poll: PollPolicy,
}

impl ChatRelay {
    pub fn new(backend: Arc<dyn AssistantBackend>, poll: PollPolicy) -> Self {
        ChatRelay {
            backend,
            poll: PollPolicy {
                max_attempts: poll.max_attempts.max(1),
                ..poll
            },
        }
    }

    pub fn poll_policy(&self) -> PollPolicy {
        self.poll
    }

    /// Sends `message` on `thread` (creating one when `None`), runs the
    /// assistant and returns its reply.
    pub async fn relay(
        &self,
        message: &str,
        thread: Option<ThreadId>,
    ) -> Result<RelayReply, RelayError> {
        if message.is_empty() {
            return Err(RelayError::InvalidInput);
        }
        let thread_id = self.ensure_thread(thread).await?;
        self.relay_on(message, thread_id).await
    }

    /// Returns `thread`, or a freshly created thread when `None`.
    pub async fn ensure_thread(&self, thread: Option<ThreadId>) -> Result<ThreadId, RelayError> {
        match thread {
            Some(id) => Ok(id),
            None => {
                let id = self.backend.create_thread().await?;
                info!("New thread: {}", id);
                Ok(id)
            }
        }
    }

    /// Posts `message` on an existing thread, runs the assistant and returns
    /// its reply.
    pub async fn relay_on(
        &self,
        message: &str,
        thread_id: ThreadId,
    ) -> Result<RelayReply, RelayError> {
        if message.is_empty() {
            return Err(RelayError::InvalidInput);
        }

        trace!("relay thread={} message={}", thread_id, message);
        self.backend.post_message(&thread_id, message).await?;

        let run = self.backend.start_run(&thread_id).await?;
        debug!("relay thread={} run={} status={}", thread_id, run.id, run.status);

        let run = self.wait_for_run(&thread_id, run).await?;

        let messages = self.backend.list_messages(&thread_id).await?;
        let reply = latest_reply(&messages, &run.id);

        debug!("relay thread={} run={} reply={}", thread_id, run.id, reply);
        Ok(RelayReply { reply, thread_id })
    }

    async fn wait_for_run(&self, thread: &ThreadId, mut run: Run) -> Result<Run, RelayError> {
        let mut attempts = 0;
        while !run.status.is_terminal() && attempts < self.poll.max_attempts {
            tokio::time::sleep(self.poll.interval).await;
            run = self.backend.get_run(thread, &run.id).await?;
            attempts += 1;
            trace!(
                "poll thread={} run={} attempt={} status={}",
                thread,
                run.id,
                attempts,
                run.status
            );
        }

        if run.status.is_failure() {
            warn!("Run {} on thread {} ended as {}", run.id, thread, run.status);
            return Err(RelayError::RunFailed {
                reason: run.failure_reason(),
                run_id: run.id,
                status: run.status,
            });
        }

        if !run.status.is_terminal() {
            warn!(
                "Run {} on thread {} still {} after {} checks, cancelling",
                run.id, thread, run.status, attempts
            );
            // The timeout is what the caller sees, whatever the cancel does.
            if let Err(e) = self.backend.cancel_run(thread, &run.id).await {
                warn!("Cancel of run {} failed: {}", run.id, e);
            }
            return Err(RelayError::Timeout {
                run_id: run.id,
                attempts,
            });
        }

        Ok(run)
    }
}

/// Text of the newest assistant message, preferring the ones written by
/// `run_id`. `messages` is newest first.
fn latest_reply(messages: &[ThreadMessage], run_id: &str) -> String {
    let assistant = || messages.iter().filter(|m| m.role == Role::Assistant);
    assistant()
        .find(|m| m.run_id.as_deref() == Some(run_id))
        .or_else(|| assistant().next())
        .map(|m| m.content.text())
        .unwrap_or_default()
}
