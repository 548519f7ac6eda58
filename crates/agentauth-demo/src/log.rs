//! Append-only narrative log shared by the actors of one run.

use std::sync::Mutex;

use crate::types::{AgentId, LogEntry, Severity};

#[derive(Debug, Default)]
pub struct LogAggregator {
    entries: Mutex<Vec<LogEntry>>,
}

impl LogAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_entries(&self) -> std::sync::MutexGuard<'_, Vec<LogEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn append(&self, actor: &AgentId, message: impl Into<String>, severity: Severity) {
        let message = message.into();
        match severity {
            Severity::Error => {
                tracing::warn!(actor = %actor, severity = %severity, "{message}")
            }
            _ => tracing::info!(actor = %actor, severity = %severity, "{message}"),
        }

        self.lock_entries().push(LogEntry {
            actor: actor.clone(),
            message,
            severity,
            timestamp: chrono::Utc::now(),
        });
    }

    /// Handle that can only write under `actor`.
    pub fn scoped<'a>(&'a self, actor: &'a AgentId) -> ActorLog<'a> {
        ActorLog { log: self, actor }
    }

    pub fn snapshot(&self) -> Vec<LogEntry> {
        self.lock_entries().clone()
    }

    pub fn len(&self) -> usize {
        self.lock_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_entries().is_empty()
    }
}

#[derive(Clone, Copy)]
pub struct ActorLog<'a> {
    log: &'a LogAggregator,
    actor: &'a AgentId,
}

impl ActorLog<'_> {
    pub fn actor(&self) -> &AgentId {
        self.actor
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log.append(self.actor, message, Severity::Info);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.log.append(self.actor, message, Severity::Success);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.log.append(self.actor, message, Severity::Warning);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log.append(self.actor, message, Severity::Error);
    }
}
