use std::fmt;

use thiserror::Error;

use crate::RunStatus;

/// Vendor call that failed, used to label upstream errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    CreateThread,
    PostMessage,
    StartRun,
    GetRun,
    CancelRun,
    ListMessages,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Step::CreateThread => "create thread",
            Step::PostMessage => "post message",
            Step::StartRun => "run assistant",
            Step::GetRun => "check run status",
            Step::CancelRun => "cancel run",
            Step::ListMessages => "fetch messages",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("missing message")]
    InvalidInput,

    /// Non-success response, transport failure or undecodable body.
    #[error("{step} error: {}", upstream_detail(.status, .detail))]
    Upstream {
        step: Step,
        status: Option<u16>,
        detail: String,
    },

    #[error("assistant run {run_id} ended with status {status}{}", reason_suffix(.reason))]
    RunFailed {
        run_id: String,
        status: RunStatus,
        reason: Option<String>,
    },

    #[error("assistant run {run_id} still pending after {attempts} status checks")]
    Timeout { run_id: String, attempts: u32 },
}

impl RelayError {
    pub fn upstream(step: Step, status: Option<u16>, detail: impl Into<String>) -> Self {
        RelayError::Upstream {
            step,
            status,
            detail: detail.into(),
        }
    }

    /// True for errors caused by the caller rather than the assistant service.
    pub fn is_client_error(&self) -> bool {
        matches!(self, RelayError::InvalidInput)
    }
}

fn upstream_detail(status: &Option<u16>, detail: &str) -> String {
    match status {
        Some(code) => format!("HTTP {code}: {detail}"),
        None => detail.to_string(),
    }
}

fn reason_suffix(reason: &Option<String>) -> String {
    reason
        .as_deref()
        .map(|r| format!(": {r}"))
        .unwrap_or_default()
}
