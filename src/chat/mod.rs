// Chat dispatch to the external reply dependency

mod dispatcher;
mod provider;

pub use dispatcher::{ChatDispatcher, ChatResponse};
pub use provider::{request_reply, CommandReplyProvider, ReplyOutcome, ReplyProvider};
