use chat_relay::{RelayError, Run, Step, ThreadId};
use reqwest::Method;
use serde_json::json;
use tracing::*;

use crate::models::NewRun;
use crate::OpenAIHandler;

pub(crate) async fn start_run(
    handler: &OpenAIHandler,
    thread: &ThreadId,
) -> Result<Run, RelayError> {
    let req = handler
        .request(Step::StartRun, Method::POST, &["threads", thread.as_str(), "runs"])?
        .json(&NewRun {
            assistant_id: &handler.assistant_id,
        });
    let run: Run = handler.send_json(Step::StartRun, req).await?;
    debug!("start_run thread={} run={} status={}", thread, run.id, run.status);
    Ok(run)
}

pub(crate) async fn get_run(
    handler: &OpenAIHandler,
    thread: &ThreadId,
    run_id: &str,
) -> Result<Run, RelayError> {
    let req = handler.request(
        Step::GetRun,
        Method::GET,
        &["threads", thread.as_str(), "runs", run_id],
    )?;
    handler.send_json(Step::GetRun, req).await
}

pub(crate) async fn cancel_run(
    handler: &OpenAIHandler,
    thread: &ThreadId,
    run_id: &str,
) -> Result<(), RelayError> {
    let req = handler
        .request(
            Step::CancelRun,
            Method::POST,
            &["threads", thread.as_str(), "runs", run_id, "cancel"],
        )?
        .json(&json!({}));
    handler.send(Step::CancelRun, req).await?;
    info!("Cancelled run {} on thread {}", run_id, thread);
    Ok(())
}
