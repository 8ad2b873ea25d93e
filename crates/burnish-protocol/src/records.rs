use serde::{Deserialize, Serialize};

pub const DEFAULT_ENDPOINT_URL: &str = "http://localhost:8090";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolishOutcome {
    pub polished: String,
    pub model: String,
    pub elapsed_ms: u64,
}

/// Durable representation of the single active or most-recent polish job.
///
/// Written by the coordinator; the one sanctioned exception is a view
/// force-failing a record whose coordinator evidently abandoned it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub status: JobStatus,
    pub input_text: String,
    pub model_id: String,
    pub started_at_ms: u64,
    #[serde(default)]
    pub cancel_requested: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<PolishOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobRecord {
    pub fn running(
        input_text: impl Into<String>,
        model_id: impl Into<String>,
        started_at_ms: u64,
    ) -> Self {
        Self {
            status: JobStatus::Running,
            input_text: input_text.into(),
            model_id: model_id.into(),
            started_at_ms,
            cancel_requested: false,
            result: None,
            error: None,
        }
    }

    pub fn completed(self, result: PolishOutcome) -> Self {
        Self {
            status: JobStatus::Completed,
            result: Some(result),
            error: None,
            ..self
        }
    }

    pub fn failed(self, error: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Failed,
            result: None,
            error: Some(error.into()),
            ..self
        }
    }

    pub fn cancelled(self) -> Self {
        Self {
            status: JobStatus::Cancelled,
            result: None,
            error: None,
            ..self
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub input: String,
    pub output: String,
    pub model: String,
    pub elapsed_ms: u64,
    pub timestamp_ms: u64,
}

/// Newest-first log of successful completions, truncated from the tail.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryLog {
    pub entries: Vec<HistoryEntry>,
}

impl HistoryLog {
    pub fn push_front(&mut self, entry: HistoryEntry, cap: usize) {
        self.entries.insert(0, entry);
        self.entries.truncate(cap);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionSettings {
    pub endpoint_url: String,
    #[serde(default)]
    pub api_key: String,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            endpoint_url: DEFAULT_ENDPOINT_URL.to_owned(),
            api_key: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKey {
    Job,
    History,
    Draft,
    Connection,
}

impl StoreKey {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Job => "job",
            Self::History => "history",
            Self::Draft => "draft",
            Self::Connection => "connection",
        }
    }
}

/// Tagged union of everything the shared store holds. Change-event
/// consumers dispatch on the tag, never on field presence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum StoreRecord {
    Job(JobRecord),
    History(HistoryLog),
    Draft(String),
    Connection(ConnectionSettings),
}

impl StoreRecord {
    pub fn key(&self) -> StoreKey {
        match self {
            Self::Job(_) => StoreKey::Job,
            Self::History(_) => StoreKey::History,
            Self::Draft(_) => StoreKey::Draft,
            Self::Connection(_) => StoreKey::Connection,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{HistoryEntry, HistoryLog, JobRecord, JobStatus, PolishOutcome};

    fn entry(id: &str) -> HistoryEntry {
        HistoryEntry {
            id: id.to_owned(),
            input: "in".to_owned(),
            output: "out".to_owned(),
            model: "m1".to_owned(),
            elapsed_ms: 10,
            timestamp_ms: 1_000,
        }
    }

    #[test]
    fn history_push_front_evicts_the_oldest_beyond_cap() {
        let mut log = HistoryLog::default();
        for index in 0..9 {
            log.push_front(entry(&format!("h_{index}")), 7);
        }

        assert_eq!(log.len(), 7);
        assert_eq!(log.entries[0].id, "h_8");
        assert_eq!(log.entries[6].id, "h_2");
    }

    #[test]
    fn terminal_transitions_clear_the_opposite_payload() {
        let running = JobRecord::running("text", "m1", 42);

        let completed = running.clone().completed(PolishOutcome {
            polished: "Text.".to_owned(),
            model: "m1".to_owned(),
            elapsed_ms: 1_200,
        });
        assert_eq!(completed.status, JobStatus::Completed);
        assert!(completed.error.is_none());
        assert_eq!(completed.started_at_ms, 42);

        let failed = running.clone().failed("boom");
        assert_eq!(failed.status, JobStatus::Failed);
        assert!(failed.result.is_none());

        let cancelled = running.cancelled();
        assert_eq!(cancelled.status, JobStatus::Cancelled);
        assert!(cancelled.result.is_none());
        assert!(cancelled.error.is_none());
    }
}
