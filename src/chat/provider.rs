use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// External dependency that turns a chat message into a reply.
///
/// Implementations may take arbitrarily long; callers bound them with
/// [`request_reply`].
#[async_trait]
pub trait ReplyProvider: Send + Sync {
    async fn reply(&self, message: &str) -> Result<String>;
}

/// Result of one bounded reply request
#[derive(Debug)]
pub enum ReplyOutcome {
    Replied(String),
    TimedOut,
    Failed(anyhow::Error),
}

/// Ask `provider` for a reply, giving up after `timeout`.
///
/// The in-flight request is dropped on timeout; the provider is expected
/// to release its resources on drop.
pub async fn request_reply(
    provider: &dyn ReplyProvider,
    message: &str,
    timeout: Duration,
) -> ReplyOutcome {
    match tokio::time::timeout(timeout, provider.reply(message)).await {
        Ok(Ok(reply)) => ReplyOutcome::Replied(reply),
        Ok(Err(e)) => ReplyOutcome::Failed(e),
        Err(_) => ReplyOutcome::TimedOut,
    }
}

/// Reply provider backed by a CLI: runs `command args... <message>` and
/// uses trimmed stdout as the reply.
///
/// The message is passed as a single argument, never through a shell.
/// A non-zero exit still counts as a reply when stdout is non-empty.
pub struct CommandReplyProvider {
    command: String,
    args: Vec<String>,
}

impl CommandReplyProvider {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }
}

#[async_trait]
impl ReplyProvider for CommandReplyProvider {
    async fn reply(&self, message: &str) -> Result<String> {
        let output = Command::new(&self.command)
            .args(&self.args)
            .arg(message)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("failed to run reply command '{}'", self.command))?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();

        if output.status.success() || !stdout.is_empty() {
            return Ok(stdout);
        }

        bail!(
            "reply command '{}' exited with {}: {}",
            self.command,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )
    }
}
