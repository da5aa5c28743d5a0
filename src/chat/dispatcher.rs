use crate::chat::provider::{request_reply, ReplyOutcome, ReplyProvider};
use crate::config::ChatConfig;
use crate::event::InboundEvent;
use crate::state::StateEngine;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

const THOUGHT_PREVIEW_CHARS: usize = 30;
const ACTION_PREVIEW_CHARS: usize = 40;

/// Body returned by POST /send
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub ok: bool,
    /// Set when the reply is the local fallback rather than the dependency's
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub test: bool,
}

impl ChatResponse {
    fn reply(reply: String) -> Self {
        let response = if reply.is_empty() {
            "Message received".to_string()
        } else {
            reply
        };
        Self {
            response,
            ok: true,
            test: false,
        }
    }

    fn fallback(message: &str) -> Self {
        Self {
            response: format!("[Tower Test Mode] Received: \"{}\"", message),
            ok: true,
            test: true,
        }
    }
}

/// Routes chat messages to the reply dependency, mirroring progress on the
/// assistant agent's state.
pub struct ChatDispatcher {
    engine: Arc<StateEngine>,
    provider: Arc<dyn ReplyProvider>,
    assistant: String,
    timeout: Duration,
}

impl ChatDispatcher {
    pub fn new(
        engine: Arc<StateEngine>,
        provider: Arc<dyn ReplyProvider>,
        assistant: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            engine,
            provider,
            assistant: assistant.into(),
            timeout,
        }
    }

    pub fn from_config(
        engine: Arc<StateEngine>,
        provider: Arc<dyn ReplyProvider>,
        config: &ChatConfig,
    ) -> Self {
        Self::new(
            engine,
            provider,
            config.assistant_agent.clone(),
            Duration::from_secs(config.timeout_seconds),
        )
    }

    /// Handle one chat message. Never fails: dependency errors and timeouts
    /// degrade to a fallback response.
    pub async fn dispatch(&self, message: &str) -> ChatResponse {
        info!(message = %message, "Chat message");

        self.emit(InboundEvent::thinking(
            &self.assistant,
            Some(processing_thought(message)),
        ))
        .await;

        let outcome = request_reply(self.provider.as_ref(), message, self.timeout).await;

        self.emit(InboundEvent::thinking(&self.assistant, None)).await;

        match outcome {
            ReplyOutcome::Replied(reply) => {
                self.emit(InboundEvent::action(&self.assistant, chat_action(message)))
                    .await;
                ChatResponse::reply(reply)
            }
            ReplyOutcome::TimedOut => {
                warn!(timeout_secs = self.timeout.as_secs_f64(), "Reply dependency timed out");
                ChatResponse::fallback(message)
            }
            ReplyOutcome::Failed(e) => {
                error!(error = %e, "Reply dependency failed");
                ChatResponse::fallback(message)
            }
        }
    }

    async fn emit(&self, event: InboundEvent) {
        if let Err(e) = self.engine.process_event(event).await {
            warn!(agent = %self.assistant, error = %e, "Chat side effect rejected");
        }
    }
}

fn preview(message: &str, max_chars: usize) -> &str {
    match message.char_indices().nth(max_chars) {
        Some((idx, _)) => &message[..idx],
        None => message,
    }
}

/// In-progress thought shown while the reply is pending
fn processing_thought(message: &str) -> String {
    format!("Processing: {}...", preview(message, THOUGHT_PREVIEW_CHARS))
}

/// Activity text logged once a reply arrived
fn chat_action(message: &str) -> String {
    let head = preview(message, ACTION_PREVIEW_CHARS);
    let ellipsis = if head.len() < message.len() { "..." } else { "" };
    format!("Chat: \"{}{}\"", head, ellipsis)
}
