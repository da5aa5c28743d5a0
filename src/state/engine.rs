use crate::config::HubConfig;
use crate::event::{EventKind, EventPayload, InboundEvent, OutboundEvent};
use crate::state::agent::{AgentRecord, AgentRegistry};
use crate::state::history::{ActivityEntry, ActivityHistory, ActivityKind};
use crate::subscription::{BroadcastHub, InitMessage, Observer, ServerMessage};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

/// Reasons the engine refuses an event. A refused event changes no state
/// and is never broadcast.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProcessError {
    #[error("unknown agent '{0}'")]
    UnknownAgent(String),
    #[error("unknown event type '{0}'")]
    UnknownEventType(String),
    #[error("invalid {kind} payload: {reason}")]
    InvalidPayload { kind: EventKind, reason: String },
}

/// Full current state, as sent to joining observers and served by GET /state
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub agents: BTreeMap<String, AgentRecord>,
    #[serde(rename = "activityLog")]
    pub activity_log: Vec<ActivityEntry>,
}

/// An event that passed every check and only awaits a timestamp
struct Prepared {
    kind: EventKind,
    agent: String,
    data: serde_json::Value,
    payload: EventPayload,
}

/// State guarded by the sequencer
struct EngineState {
    agents: AgentRegistry,
    history: ActivityHistory,
    last_timestamp: i64,
}

impl EngineState {
    /// Check an event against the registry and parse its payload. No mutation.
    fn prepare(&self, event: InboundEvent) -> Result<Prepared, ProcessError> {
        let kind = EventKind::parse(&event.event_type)
            .ok_or_else(|| ProcessError::UnknownEventType(event.event_type.clone()))?;

        if !self.agents.contains(&event.agent) {
            return Err(ProcessError::UnknownAgent(event.agent));
        }

        let payload =
            EventPayload::parse(kind, &event.data).map_err(|e| ProcessError::InvalidPayload {
                kind,
                reason: e.to_string(),
            })?;

        Ok(Prepared {
            kind,
            agent: event.agent,
            data: event.data,
            payload,
        })
    }

    /// Wall-clock milliseconds, never behind the previous event
    fn next_timestamp(&mut self) -> i64 {
        let now = Utc::now().timestamp_millis().max(self.last_timestamp);
        self.last_timestamp = now;
        now
    }

    /// Apply a prepared event and produce its outbound record
    fn commit(&mut self, prepared: Prepared) -> OutboundEvent {
        let timestamp = self.next_timestamp();
        let Prepared {
            kind,
            agent,
            data,
            payload,
        } = prepared;

        match payload {
            EventPayload::Thinking(thinking) => {
                if let Some(record) = self.agents.get_mut(&agent) {
                    record.apply_thinking(thinking.thought);
                }
            }
            EventPayload::Status(status) => {
                if let Some(record) = self.agents.get_mut(&agent) {
                    record.apply_status(status.status, status.task);
                }
            }
            EventPayload::Action(action) => {
                self.history.append(ActivityEntry {
                    timestamp,
                    agent: agent.clone(),
                    text: action.action,
                    kind: ActivityKind::Action,
                });
            }
            EventPayload::Meeting(meeting) => {
                self.history.append(ActivityEntry {
                    timestamp,
                    agent: agent.clone(),
                    text: format!("Meeting with {}: {}", meeting.with, meeting.topic),
                    kind: ActivityKind::Meeting,
                });
            }
        }

        OutboundEvent {
            kind,
            agent,
            data,
            timestamp,
        }
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            agents: self.agents.snapshot(),
            activity_log: self.history.snapshot(),
        }
    }
}

/// State engine: the single sequencer for agent state and activity history.
///
/// Every mutation and its broadcast happen under one lock, and observers
/// join under the same lock, so a joining observer's snapshot and the
/// stream that follows it neither overlap nor leave a gap.
pub struct StateEngine {
    state: Mutex<EngineState>,

    /// Fan-out to connected observers
    hub: Arc<BroadcastHub>,

    /// Declared agent ids; fixed for the process lifetime
    agent_ids: Vec<String>,
}

impl StateEngine {
    pub fn new(agents: AgentRegistry, history: ActivityHistory, hub: Arc<BroadcastHub>) -> Self {
        let agent_ids = agents.ids().to_vec();
        Self {
            state: Mutex::new(EngineState {
                agents,
                history,
                last_timestamp: 0,
            }),
            hub,
            agent_ids,
        }
    }

    /// Build the engine and its hub from configuration
    pub fn from_config(config: &HubConfig) -> Self {
        let agents = AgentRegistry::new(
            config
                .agents
                .iter()
                .map(|agent| (agent.id.clone(), agent.floor)),
        );
        let history = ActivityHistory::new(config.history.max_entries);
        let hub = Arc::new(BroadcastHub::new(config.broadcast.observer_buffer));
        Self::new(agents, history, hub)
    }

    pub fn hub(&self) -> &Arc<BroadcastHub> {
        &self.hub
    }

    /// Agent identifiers in declaration order
    pub fn agent_ids(&self) -> &[String] {
        &self.agent_ids
    }

    /// Apply one event and broadcast it.
    pub async fn process_event(&self, event: InboundEvent) -> Result<OutboundEvent, ProcessError> {
        let mut state = self.state.lock().await;

        let prepared = state.prepare(event).map_err(|e| {
            warn!(error = %e, "Rejected event");
            e
        })?;
        let outbound = state.commit(prepared);
        self.publish(&outbound);

        Ok(outbound)
    }

    /// Apply a batch of events for one agent as a contiguous run.
    ///
    /// The agent and every event are checked before anything is applied:
    /// either the whole batch is committed and broadcast in order, or nothing is.
    pub async fn process_batch(
        &self,
        agent: &str,
        events: Vec<InboundEvent>,
    ) -> Result<Vec<OutboundEvent>, ProcessError> {
        let mut state = self.state.lock().await;

        if !state.agents.contains(agent) {
            warn!(agent = %agent, "Rejected batch for unknown agent");
            return Err(ProcessError::UnknownAgent(agent.to_string()));
        }

        let prepared = events
            .into_iter()
            .map(|event| state.prepare(event))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| {
                warn!(agent = %agent, error = %e, "Rejected batch");
                e
            })?;

        let mut outbound = Vec::with_capacity(prepared.len());
        for prepared in prepared {
            let event = state.commit(prepared);
            self.publish(&event);
            outbound.push(event);
        }

        Ok(outbound)
    }

    /// Current registry and history
    pub async fn snapshot(&self) -> Snapshot {
        self.state.lock().await.snapshot()
    }

    /// Register a new observer whose first frame is the current snapshot
    pub async fn join(&self) -> Result<Observer, serde_json::Error> {
        let state = self.state.lock().await;
        let init = ServerMessage::Init(InitMessage::from(state.snapshot())).encode()?;
        Ok(self.hub.join(init))
    }

    /// Broadcast an applied event. Called with the sequencer held.
    fn publish(&self, event: &OutboundEvent) {
        let frame = match ServerMessage::Event(event.clone()).encode() {
            Ok(frame) => frame,
            Err(e) => {
                error!(error = %e, agent = %event.agent, "Failed to encode event");
                return;
            }
        };

        let delivered = self.hub.publish(frame);
        debug!(
            kind = %event.kind,
            agent = %event.agent,
            timestamp = event.timestamp,
            delivered,
            "Event broadcast"
        );
    }
}

impl Default for StateEngine {
    fn default() -> Self {
        Self::from_config(&HubConfig::default())
    }
}
