use async_trait::async_trait;

use crate::{RelayError, Run, ThreadId, ThreadMessage};

/// The remote assistant service, one method per vendor call.
///
/// The relay front end only sees this trait so it stays independent of the
/// concrete HTTP client. Implementations map every non-success response to
/// [`RelayError::Upstream`].
#[async_trait]
pub trait AssistantBackend: Send + Sync {
    async fn create_thread(&self) -> Result<ThreadId, RelayError>;

    async fn post_message(&self, thread: &ThreadId, content: &str) -> Result<(), RelayError>;

    /// Starts the configured assistant on the thread.
    async fn start_run(&self, thread: &ThreadId) -> Result<Run, RelayError>;

    async fn get_run(&self, thread: &ThreadId, run_id: &str) -> Result<Run, RelayError>;

    async fn cancel_run(&self, thread: &ThreadId, run_id: &str) -> Result<(), RelayError>;

    /// Messages of the thread, newest first.
    async fn list_messages(&self, thread: &ThreadId) -> Result<Vec<ThreadMessage>, RelayError>;
}
