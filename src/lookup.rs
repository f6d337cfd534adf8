//! Lookup sub-flow - capture a query, wait for its definition, then resume
//!
//! The session only tracks what was asked and what came back. Issuing the
//! provider call and restoring the reading position belong to the controller.

use crate::state::Snapshot;

/// Where a lookup request stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupStatus {
    Pending,
    Done(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupRequest {
    pub id: u64,
    pub query: String,
    pub status: LookupStatus,
}

/// One lookup visit, from wake phrase to cancel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupSession {
    snapshot: Snapshot,
    request: Option<LookupRequest>,
}

impl LookupSession {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            snapshot,
            request: None,
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        self.snapshot
    }

    pub fn request(&self) -> Option<&LookupRequest> {
        self.request.as_ref()
    }

    /// Still waiting for the user to say what to look up
    pub fn awaiting_query(&self) -> bool {
        self.request.is_none()
    }

    pub fn is_pending(&self) -> bool {
        matches!(
            self.request,
            Some(LookupRequest {
                status: LookupStatus::Pending,
                ..
            })
        )
    }

    /// Forget the current query so a new one can be asked. The snapshot
    /// is kept; a completion for the old request becomes stale.
    pub fn rearm(&mut self) {
        self.request = None;
    }

    /// Record a query. Returns false when a query was already recorded or the
    /// text trims to nothing.
    pub fn begin(&mut self, id: u64, query: &str) -> bool {
        let query = query.trim();
        if self.request.is_some() || query.is_empty() {
            return false;
        }
        self.request = Some(LookupRequest {
            id,
            query: query.to_string(),
            status: LookupStatus::Pending,
        });
        true
    }

    /// Settle the pending request. Returns the content to show, or `None`
    /// if `id` does not belong to the pending request.
    pub fn complete(&mut self, id: u64, result: Result<String, String>) -> Option<String> {
        let request = self
            .request
            .as_mut()
            .filter(|r| r.id == id && r.status == LookupStatus::Pending)?;

        let content = match &result {
            Ok(definition) => result_content(&request.query, definition),
            Err(err) => error_content(&request.query, err),
        };
        request.status = match result {
            Ok(definition) => LookupStatus::Done(definition),
            Err(err) => LookupStatus::Failed(err),
        };
        Some(content)
    }
}

pub fn prompt_content(wake_phrase: &str) -> String {
    format!(
        "Lookup mode. What would you like to look up?\n\nSay the word or phrase. Say 'cancel' to go back, or '{}' to ask again.",
        wake_phrase
    )
}

pub fn pending_content(query: &str) -> String {
    format!("Looking up \"{}\"...", query)
}

pub fn result_content(query: &str, definition: &str) -> String {
    format!("{}\n\n{}\n\nSay 'continue reading' to resume.", query, definition)
}

pub fn error_content(query: &str, err: &str) -> String {
    format!(
        "Could not look up \"{}\": {}\n\nSay the wake phrase to try again, or 'cancel' to resume reading.",
        query, err
    )
}

pub fn reminder_content() -> &'static str {
    "Say 'continue reading' to resume."
}
