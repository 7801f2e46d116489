use chat_relay::{RelayError, Step, ThreadId, ThreadMessage};
use reqwest::Method;
use serde_json::json;
use tracing::*;

use crate::models::{CreatedThread, ListPage, NewMessage};
use crate::OpenAIHandler;

pub(crate) async fn create_thread(handler: &OpenAIHandler) -> Result<ThreadId, RelayError> {
    let req = handler
        .request(Step::CreateThread, Method::POST, &["threads"])?
        .json(&json!({}));
    let created: CreatedThread = handler.send_json(Step::CreateThread, req).await?;
    if created.id.is_empty() {
        return Err(RelayError::upstream(
            Step::CreateThread,
            None,
            "No thread id found",
        ));
    }
    Ok(ThreadId::new(created.id))
}

pub(crate) async fn post_message(
    handler: &OpenAIHandler,
    thread: &ThreadId,
    content: &str,
) -> Result<(), RelayError> {
    trace!("post_message thread={} content={}", thread, content);
    let req = handler
        .request(
            Step::PostMessage,
            Method::POST,
            &["threads", thread.as_str(), "messages"],
        )?
        .json(&NewMessage {
            role: "user",
            content,
        });
    // Only the status matters here.
    handler.send(Step::PostMessage, req).await?;
    Ok(())
}

pub(crate) async fn list_messages(
    handler: &OpenAIHandler,
    thread: &ThreadId,
) -> Result<Vec<ThreadMessage>, RelayError> {
    let req = handler
        .request(
            Step::ListMessages,
            Method::GET,
            &["threads", thread.as_str(), "messages"],
        )?
        .query(&[("order", "desc")]);
    let page: ListPage<ThreadMessage> = handler.send_json(Step::ListMessages, req).await?;
    debug!("list_messages thread={} count={}", thread, page.data.len());
    Ok(page.data)
}
