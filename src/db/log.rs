//! Connection-keyed SQL log.
//!
//! Every dispatch appends an entry before the transport is called and the
//! same entry is settled in place afterwards, so a UI can show in-flight
//! queries. Nothing is persisted.

use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::sql::{Row, Value};

pub const DEFAULT_LOG_CAPACITY: usize = 1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqlLog {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub sql: String,
    pub parameters: Vec<Value>,
    pub result: Option<Vec<Row>>,
    /// Milliseconds, set once the transport succeeds.
    pub duration: Option<u64>,
    pub error: Option<String>,
}

impl SqlLog {
    pub fn is_pending(&self) -> bool {
        self.result.is_none() && self.error.is_none()
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug)]
pub struct LogStore {
    entries: DashMap<String, Vec<SqlLog>>,
    /// `None` keeps everything.
    capacity: Option<usize>,
}

impl Default for LogStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LogStore {
    pub fn new() -> Self {
        Self::with_capacity(Some(DEFAULT_LOG_CAPACITY))
    }

    pub fn with_capacity(capacity: Option<usize>) -> Self {
        Self {
            entries: DashMap::new(),
            capacity,
        }
    }

    /// Record a pending execution and return its id.
    pub fn append(&self, connection_id: &str, sql: &str, parameters: &[Value]) -> Uuid {
        let entry = SqlLog {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            sql: sql.to_string(),
            parameters: parameters.to_vec(),
            result: None,
            duration: None,
            error: None,
        };
        let id = entry.id;

        let mut log = self.entries.entry(connection_id.to_string()).or_default();
        log.push(entry);
        self.evict(&mut log);
        id
    }

    /// Drop the oldest settled entries beyond the cap. Pending entries stay
    /// until they settle, so a connection can briefly exceed the cap.
    fn evict(&self, log: &mut Vec<SqlLog>) {
        let Some(cap) = self.capacity else {
            return;
        };
        let mut excess = log.len().saturating_sub(cap);
        if excess == 0 {
            return;
        }
        log.retain(|entry| {
            if excess > 0 && !entry.is_pending() {
                excess -= 1;
                false
            } else {
                true
            }
        });
    }

    /// Settle an entry with its rows. Returns false if the entry is gone.
    pub fn complete(&self, connection_id: &str, id: Uuid, rows: Vec<Row>, duration: Duration) -> bool {
        self.update(connection_id, id, |entry| {
            entry.result = Some(rows);
            entry.duration = Some(duration.as_millis() as u64);
        })
    }

    /// Settle an entry as failed. Returns false if the entry is gone.
    pub fn fail(&self, connection_id: &str, id: Uuid, error: impl Into<String>) -> bool {
        let error = error.into();
        self.update(connection_id, id, |entry| entry.error = Some(error))
    }

    fn update(&self, connection_id: &str, id: Uuid, apply: impl FnOnce(&mut SqlLog)) -> bool {
        let Some(mut log) = self.entries.get_mut(connection_id) else {
            return false;
        };
        let Some(entry) = log.iter_mut().rev().find(|e| e.id == id) else {
            return false;
        };
        apply(entry);
        self.evict(&mut log);
        true
    }

    /// Entries for one connection in creation order.
    pub fn entries(&self, connection_id: &str) -> Vec<SqlLog> {
        self.entries
            .get(connection_id)
            .map(|log| log.value().clone())
            .unwrap_or_default()
    }

    pub fn get(&self, connection_id: &str, id: Uuid) -> Option<SqlLog> {
        self.entries
            .get(connection_id)?
            .iter()
            .find(|e| e.id == id)
            .cloned()
    }

    pub fn clear(&self, connection_id: &str) {
        self.entries.remove(connection_id);
    }

    pub fn connections(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }
}
