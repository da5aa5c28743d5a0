use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;

mod validation;

pub use validation::{validate, ValidationError};

/// The closed set of event types producers may submit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Thinking,
    Status,
    Action,
    Meeting,
}

impl EventKind {
    /// Parse a wire `type` string. Returns `None` for unrecognized types.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "thinking" => Some(EventKind::Thinking),
            "status" => Some(EventKind::Status),
            "action" => Some(EventKind::Action),
            "meeting" => Some(EventKind::Meeting),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Thinking => "thinking",
            EventKind::Status => "status",
            EventKind::Action => "action",
            EventKind::Meeting => "meeting",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// InboundEvent is the unit of work crossing the ingress boundary.
///
/// `event_type` stays a raw string so that unrecognized types survive
/// deserialization and are rejected by the state engine, not by serde.
/// Missing fields deserialize to empty values and are caught by [`validate`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InboundEvent {
    #[serde(rename = "type", default)]
    pub event_type: String,

    #[serde(default)]
    pub agent: String,

    /// Type-dependent payload, echoed verbatim to observers.
    #[serde(default)]
    pub data: Value,
}

impl InboundEvent {
    pub fn new(kind: EventKind, agent: impl Into<String>, data: Value) -> Self {
        Self {
            event_type: kind.as_str().to_string(),
            agent: agent.into(),
            data,
        }
    }

    /// `thinking` event; `None` clears the thought.
    pub fn thinking(agent: impl Into<String>, thought: Option<String>) -> Self {
        Self::new(EventKind::Thinking, agent, json!({ "thought": thought }))
    }

    pub fn action(agent: impl Into<String>, action: impl Into<String>) -> Self {
        Self::new(EventKind::Action, agent, json!({ "action": action.into() }))
    }

    /// `status` event. Absent fields are omitted from the payload.
    pub fn status(agent: impl Into<String>, status: Option<String>, task: Option<String>) -> Self {
        let mut data = Map::new();
        if let Some(status) = status {
            data.insert("status".to_string(), Value::String(status));
        }
        if let Some(task) = task {
            data.insert("task".to_string(), Value::String(task));
        }
        Self::new(EventKind::Status, agent, Value::Object(data))
    }

    pub fn meeting(
        agent: impl Into<String>,
        with: impl Into<String>,
        topic: impl Into<String>,
    ) -> Self {
        Self::new(
            EventKind::Meeting,
            agent,
            json!({ "with": with.into(), "topic": topic.into() }),
        )
    }
}

/// Payload of a `thinking` event. A missing `thought` is a clear.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct ThinkingData {
    #[serde(default)]
    pub thought: Option<String>,
}

/// Payload of a `status` event.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct StatusData {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub task: Option<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ActionData {
    pub action: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct MeetingData {
    pub with: String,
    pub topic: String,
}

/// Typed view of an event's `data`, used to drive state mutation.
#[derive(Clone, Debug, PartialEq)]
pub enum EventPayload {
    Thinking(ThinkingData),
    Status(StatusData),
    Action(ActionData),
    Meeting(MeetingData),
}

impl EventPayload {
    /// Interpret raw `data` according to `kind`. A `null` payload is read as
    /// an empty object, so optional-only payloads accept it.
    pub fn parse(kind: EventKind, data: &Value) -> Result<Self, serde_json::Error> {
        let data = if data.is_null() {
            Value::Object(Map::new())
        } else {
            data.clone()
        };

        Ok(match kind {
            EventKind::Thinking => EventPayload::Thinking(serde_json::from_value(data)?),
            EventKind::Status => EventPayload::Status(serde_json::from_value(data)?),
            EventKind::Action => EventPayload::Action(serde_json::from_value(data)?),
            EventKind::Meeting => EventPayload::Meeting(serde_json::from_value(data)?),
        })
    }
}

/// OutboundEvent is the canonical record published to observers:
/// the inbound fields plus the hub-assigned timestamp.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutboundEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub agent: String,
    pub data: Value,
    /// Unix epoch milliseconds, assigned at processing time
    pub timestamp: i64,
}

/// Batched status report (heartbeat integration).
///
/// `thought` distinguishes an absent field (`None`) from an explicit
/// `null` (`Some(None)`), which clears the agent's thought.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct StatusReport {
    #[serde(default)]
    pub agent: String,

    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub task: Option<String>,

    #[serde(default, deserialize_with = "explicit_field")]
    pub thought: Option<Option<String>>,

    #[serde(default, rename = "recentActions")]
    pub recent_actions: Option<Vec<String>>,
}

impl StatusReport {
    /// Decompose into the equivalent ordered sequence of single events:
    /// status, then thinking, then one action per recent action.
    pub fn into_events(self) -> Vec<InboundEvent> {
        let mut events = Vec::new();

        if self.status.is_some() || self.task.is_some() {
            events.push(InboundEvent::status(&self.agent, self.status, self.task));
        }

        if let Some(thought) = self.thought {
            events.push(InboundEvent::thinking(&self.agent, thought));
        }

        for action in self.recent_actions.into_iter().flatten() {
            events.push(InboundEvent::action(&self.agent, action));
        }

        events
    }
}

fn explicit_field<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}
