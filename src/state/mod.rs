// Agent registry, activity history and the state engine that sequences them

mod agent;
mod engine;
mod history;

pub use agent::{AgentRecord, AgentRegistry, AgentStatus};
pub use engine::{ProcessError, Snapshot, StateEngine};
pub use history::{ActivityEntry, ActivityHistory, ActivityKind, DEFAULT_MAX_ACTIVITY};

#[cfg(test)]
mod tests;
