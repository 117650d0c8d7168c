//! Durable persistence of session transcripts.
//!
//! One entry per session id, keyed `chat-history-<sessionId>`. The store is
//! a port: the default backend writes one JSON file per session under the
//! platform data directory, and tests (or non-desktop targets) supply an
//! in-memory backend through the same trait.
//!
//! Corrupted persisted data is treated as an absent session. It is logged
//! and the session starts empty; it is never surfaced as an error.

use std::cell::RefCell;
use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::warn;

use crate::core::message::{Message, Role};
use crate::core::routing;

/// Errors that can occur when writing transcripts to disk.
#[derive(Debug)]
pub enum StoreError {
    /// Failed to write the transcript file.
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to encode the transcript as JSON.
    Encode(serde_json::Error),

    /// No usable data directory on this platform.
    NoDataDir,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Write { path, source } => {
                write!(f, "Failed to write history at {}: {}", path.display(), source)
            }
            StoreError::Encode(source) => write!(f, "Failed to encode history: {source}"),
            StoreError::NoDataDir => write!(f, "No data directory available for chat history"),
        }
    }
}

impl StdError for StoreError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            StoreError::Write { source, .. } => Some(source),
            StoreError::Encode(source) => Some(source),
            StoreError::NoDataDir => None,
        }
    }
}

/// Persistence port for session transcripts.
///
/// `save` overwrites the whole entry and is synchronous from the caller's
/// perspective; when it returns, a subsequent `load` observes the saved
/// list. `load` swallows corruption and returns an empty transcript.
pub trait HistoryStore {
    fn load(&self, session_id: &str) -> Vec<Message>;
    fn save(&self, session_id: &str, messages: &[Message]) -> Result<(), StoreError>;
    fn clear(&self, session_id: &str) -> Result<(), StoreError>;
}

fn history_key(session_id: &str) -> String {
    format!("chat-history-{session_id}")
}

fn parse_history(raw: &str, session_id: &str) -> Vec<Message> {
    match serde_json::from_str::<Vec<Message>>(raw) {
        Ok(messages) => messages,
        Err(error) => {
            warn!(session_id = %session_id, %error, "discarding unparsable chat history");
            Vec::new()
        }
    }
}

/// File-backed store: one `chat-history-<sessionId>.json` per session under
/// the project data directory. Saves go through a temp file in the same
/// directory followed by an atomic rename, so a reload never observes a
/// half-written transcript.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new() -> Result<Self, StoreError> {
        let dirs = ProjectDirs::from("", "", "teller").ok_or(StoreError::NoDataDir)?;
        Ok(Self::with_dir(dirs.data_dir().join("history")))
    }

    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn entry_path(&self, session_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", history_key(session_id)))
    }

    fn write_atomic(&self, path: &Path, contents: &str) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(|source| StoreError::Write {
            path: self.dir.clone(),
            source,
        })?;
        let mut temp = NamedTempFile::new_in(&self.dir).map_err(|source| StoreError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        temp.write_all(contents.as_bytes())
            .map_err(|source| StoreError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        temp.flush().map_err(|source| StoreError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        temp.persist(path).map_err(|error| StoreError::Write {
            path: path.to_path_buf(),
            source: error.error,
        })?;
        Ok(())
    }
}

impl HistoryStore for FileStore {
    fn load(&self, session_id: &str) -> Vec<Message> {
        match fs::read_to_string(self.entry_path(session_id)) {
            Ok(raw) => parse_history(&raw, session_id),
            Err(_) => Vec::new(),
        }
    }

    fn save(&self, session_id: &str, messages: &[Message]) -> Result<(), StoreError> {
        let encoded = serde_json::to_string(messages).map_err(StoreError::Encode)?;
        self.write_atomic(&self.entry_path(session_id), &encoded)
    }

    fn clear(&self, session_id: &str) -> Result<(), StoreError> {
        let path = self.entry_path(session_id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Write { path, source }),
        }
    }
}

/// In-memory store used by tests and non-desktop embeddings. Entries hold
/// the serialized form so corruption behaves exactly like the file backend.
/// Clones share the same underlying map.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inject a raw persisted value, valid or not.
    pub fn insert_raw(&self, session_id: &str, raw: impl Into<String>) {
        self.entries
            .borrow_mut()
            .insert(history_key(session_id), raw.into());
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.entries.borrow().contains_key(&history_key(session_id))
    }
}

impl HistoryStore for MemoryStore {
    fn load(&self, session_id: &str) -> Vec<Message> {
        match self.entries.borrow().get(&history_key(session_id)) {
            Some(raw) => parse_history(raw, session_id),
            None => Vec::new(),
        }
    }

    fn save(&self, session_id: &str, messages: &[Message]) -> Result<(), StoreError> {
        let encoded = serde_json::to_string(messages).map_err(StoreError::Encode)?;
        self.entries.borrow_mut().insert(history_key(session_id), encoded);
        Ok(())
    }

    fn clear(&self, session_id: &str) -> Result<(), StoreError> {
        self.entries.borrow_mut().remove(&history_key(session_id));
        Ok(())
    }
}

/// Self-contained snapshot of a session, suitable for handoff outside the
/// client. Producing one has no effect on stored state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatExport {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    #[serde(rename = "exportDate")]
    pub export_date: DateTime<Utc>,
    pub messages: Vec<ExportedMessage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedMessage {
    #[serde(rename = "type")]
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "agentName", default, skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
    #[serde(rename = "routedTo", default, skip_serializing_if = "Option::is_none")]
    pub routed_to: Option<String>,
}

/// Project a transcript to the export artifact. The routing label is
/// materialized here (and only here) so the artifact stays readable without
/// access to the routing table.
pub fn export(session_id: &str, messages: &[Message]) -> ChatExport {
    ChatExport {
        session_id: session_id.to_string(),
        export_date: Utc::now(),
        messages: messages
            .iter()
            .map(|message| ExportedMessage {
                role: message.role,
                content: message.content.clone(),
                timestamp: message.timestamp,
                agent_name: message.agent_name.clone(),
                routed_to: message
                    .is_agent()
                    .then(|| routing::resolve(message.agent_name.as_deref()).label.to_string()),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_messages() -> Vec<Message> {
        let user = Message::user("What's my account balance?", None);
        let agent = Message::agent("Your balance is $100", "AccountMasterAgent", Some(user.id));
        vec![user, agent]
    }

    #[test]
    fn file_store_round_trips_a_transcript() {
        let dir = tempdir().unwrap();
        let store = FileStore::with_dir(dir.path());
        let messages = sample_messages();

        store.save("s1", &messages).unwrap();
        assert_eq!(store.load("s1"), messages);
    }

    #[test]
    fn loading_an_absent_session_yields_an_empty_transcript() {
        let dir = tempdir().unwrap();
        let store = FileStore::with_dir(dir.path());
        assert!(store.load("nobody").is_empty());
    }

    #[test]
    fn corrupted_history_loads_as_empty() {
        let dir = tempdir().unwrap();
        let store = FileStore::with_dir(dir.path());
        fs::create_dir_all(dir.path()).unwrap();
        fs::write(dir.path().join("chat-history-s1.json"), "{not json").unwrap();
        assert!(store.load("s1").is_empty());
    }

    #[test]
    fn clear_removes_the_entry_and_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = FileStore::with_dir(dir.path());
        store.save("s1", &sample_messages()).unwrap();

        store.clear("s1").unwrap();
        assert!(store.load("s1").is_empty());
        // Clearing an already-absent entry is not an error.
        store.clear("s1").unwrap();
    }

    #[test]
    fn save_overwrites_the_previous_entry() {
        let dir = tempdir().unwrap();
        let store = FileStore::with_dir(dir.path());
        let messages = sample_messages();
        store.save("s1", &messages).unwrap();
        store.save("s1", &messages[..1]).unwrap();
        assert_eq!(store.load("s1"), messages[..1]);
    }

    #[test]
    fn memory_store_matches_file_store_semantics() {
        let store = MemoryStore::new();
        let messages = sample_messages();

        store.save("s1", &messages).unwrap();
        assert_eq!(store.load("s1"), messages);

        store.insert_raw("s2", "][");
        assert!(store.load("s2").is_empty());

        store.clear("s1").unwrap();
        assert!(store.load("s1").is_empty());
        assert!(!store.contains("s1"));
    }

    #[test]
    fn export_projects_the_essential_fields() {
        let messages = sample_messages();
        let artifact = export("main_session_1", &messages);

        assert_eq!(artifact.session_id, "main_session_1");
        assert_eq!(artifact.messages.len(), 2);
        assert_eq!(artifact.messages[0].role, Role::User);
        assert!(artifact.messages[0].routed_to.is_none());
        assert_eq!(
            artifact.messages[1].routed_to.as_deref(),
            Some("Account Specialist")
        );
    }

    #[test]
    fn export_round_trips_through_json() {
        let messages = sample_messages();
        let artifact = export("main_session_1", &messages);

        let encoded = serde_json::to_string_pretty(&artifact).unwrap();
        let reparsed: ChatExport = serde_json::from_str(&encoded).unwrap();
        assert_eq!(reparsed, artifact);

        // Field names match the published artifact format.
        let value: serde_json::Value = serde_json::from_str(&encoded).unwrap();
        assert!(value.get("sessionId").is_some());
        assert!(value.get("exportDate").is_some());
        assert_eq!(value["messages"][1]["agentName"], "AccountMasterAgent");
        assert_eq!(value["messages"][1]["routedTo"], "Account Specialist");
    }

    #[test]
    fn export_does_not_touch_stored_state() {
        let store = MemoryStore::new();
        let messages = sample_messages();
        store.save("s1", &messages).unwrap();
        let _ = export("s1", &messages);
        assert_eq!(store.load("s1"), messages);
    }
}
