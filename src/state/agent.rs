use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Agent status. `idle` and `working` are the statuses the hub derives
/// itself; producers may report any other token.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AgentStatus {
    #[default]
    Idle,
    Working,
    Other(String),
}

impl From<String> for AgentStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "idle" => AgentStatus::Idle,
            "working" => AgentStatus::Working,
            _ => AgentStatus::Other(raw),
        }
    }
}

impl From<&str> for AgentStatus {
    fn from(raw: &str) -> Self {
        AgentStatus::from(raw.to_string())
    }
}

impl From<AgentStatus> for String {
    fn from(status: AgentStatus) -> Self {
        match status {
            AgentStatus::Idle => "idle".to_string(),
            AgentStatus::Working => "working".to_string(),
            AgentStatus::Other(raw) => raw,
        }
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentStatus::Idle => f.write_str("idle"),
            AgentStatus::Working => f.write_str("working"),
            AgentStatus::Other(raw) => f.write_str(raw),
        }
    }
}

/// Mutable status record for one known agent
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub status: AgentStatus,

    /// Sticky: only replaced by a new non-empty task
    pub task: Option<String>,

    pub thought: Option<String>,

    /// Layout hint for renderers; never changes
    pub floor: i32,
}

impl AgentRecord {
    pub fn new(floor: i32) -> Self {
        Self {
            status: AgentStatus::Idle,
            task: None,
            thought: None,
            floor,
        }
    }

    /// Apply a `thinking` transition: a non-empty thought means working,
    /// anything else clears the thought and means idle.
    pub fn apply_thinking(&mut self, thought: Option<String>) {
        match thought.filter(|t| !t.is_empty()) {
            Some(thought) => {
                self.thought = Some(thought);
                self.status = AgentStatus::Working;
            }
            None => {
                self.thought = None;
                self.status = AgentStatus::Idle;
            }
        }
    }

    /// Apply a `status` transition. An absent status leaves it unchanged.
    pub fn apply_status(&mut self, status: Option<String>, task: Option<String>) {
        if let Some(status) = status {
            self.status = AgentStatus::from(status);
        }
        if let Some(task) = task.filter(|t| !t.is_empty()) {
            self.task = Some(task);
        }
    }
}

/// Fixed set of agents, declared once at startup.
///
/// Records are never created or removed after construction; lookups for
/// undeclared identifiers return `None`.
#[derive(Clone, Debug)]
pub struct AgentRegistry {
    records: HashMap<String, AgentRecord>,
    /// Declaration order, for listing
    order: Vec<String>,
}

impl AgentRegistry {
    /// Build a registry from `(id, floor)` pairs. A repeated id keeps its
    /// first declaration.
    pub fn new<I, S>(agents: I) -> Self
    where
        I: IntoIterator<Item = (S, i32)>,
        S: Into<String>,
    {
        let mut records = HashMap::new();
        let mut order = Vec::new();

        for (id, floor) in agents {
            let id = id.into();
            if records.contains_key(&id) {
                continue;
            }
            records.insert(id.clone(), AgentRecord::new(floor));
            order.push(id);
        }

        Self { records, order }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&AgentRecord> {
        self.records.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut AgentRecord> {
        self.records.get_mut(id)
    }

    /// Agent identifiers in declaration order
    pub fn ids(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Copy of every record, keyed by identifier
    pub fn snapshot(&self) -> BTreeMap<String, AgentRecord> {
        self.records
            .iter()
            .map(|(id, record)| (id.clone(), record.clone()))
            .collect()
    }
}
