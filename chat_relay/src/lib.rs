//! Relaying chat messages to a hosted assistant.
//!
//! This crate holds everything that does not depend on a particular vendor
//! client or HTTP front end: the [`AssistantBackend`] trait, the thread/run
//! data model, reply extraction, the relay sequence itself ([`ChatRelay`]) and
//! the per-session thread slots ([`SessionThreads`]).

mod backend;
mod content;
mod error;
mod models;
mod relay;
mod session;

pub use backend::AssistantBackend;
pub use content::{extract_reply, ContentBlock, MessageContent, TextValue};
pub use error::{RelayError, Step};
pub use models::{Role, Run, RunError, RunStatus, ThreadId, ThreadMessage};
pub use relay::{ChatRelay, PollPolicy, RelayReply};
pub use session::{SessionThreads, ThreadSlot, DEFAULT_SESSION};
