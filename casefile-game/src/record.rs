//! Persisted session records and the store seam behind them.
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use thiserror::Error;

use crate::session::CaseSession;
use crate::state::GameState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionResources {
    pub time: u32,
    pub trust: u8,
}

/// One stored session row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: u64,
    pub case_id: String,
    pub current_room: String,
    pub resources: SessionResources,
    /// Full [`GameState`] dump.
    pub state: serde_json::Value,
    #[serde(default)]
    pub is_complete: bool,
}

impl SessionRecord {
    /// Decode the stored state blob.
    ///
    /// # Errors
    ///
    /// Returns an error if the blob is not a valid game state.
    pub fn game_state(&self) -> Result<GameState, serde_json::Error> {
        GameState::deserialize(&self.state)
    }
}

/// Fields for a new record; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSession {
    pub case_id: String,
    pub current_room: String,
    pub resources: SessionResources,
    pub state: serde_json::Value,
    #[serde(default)]
    pub is_complete: bool,
}

impl NewSession {
    /// Snapshot a live session.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be serialized.
    pub fn snapshot(session: &CaseSession) -> Result<Self, serde_json::Error> {
        let state = session.state();
        Ok(Self {
            case_id: state.case_id.clone(),
            current_room: session.current_room().to_string(),
            resources: SessionResources {
                time: state.time,
                trust: state.trust,
            },
            state: serde_json::to_value(state)?,
            is_complete: state.phase.is_terminal(),
        })
    }
}

/// Partial update; `None` leaves a field as stored.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionPatch {
    pub current_room: Option<String>,
    pub resources: Option<SessionResources>,
    pub state: Option<serde_json::Value>,
    pub is_complete: Option<bool>,
}

impl SessionPatch {
    /// Patch carrying every field of a snapshot.
    #[must_use]
    pub fn from_snapshot(snapshot: NewSession) -> Self {
        Self {
            current_room: Some(snapshot.current_room),
            resources: Some(snapshot.resources),
            state: Some(snapshot.state),
            is_complete: Some(snapshot.is_complete),
        }
    }

    fn apply_to(self, record: &mut SessionRecord) {
        if let Some(room) = self.current_room {
            record.current_room = room;
        }
        if let Some(resources) = self.resources {
            record.resources = resources;
        }
        if let Some(state) = self.state {
            record.state = state;
        }
        if let Some(done) = self.is_complete {
            record.is_complete = done;
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session {0} not found")]
    NotFound(u64),
    #[error("session state could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Trait for abstracting session persistence.
/// Platform-specific implementations should provide this
pub trait SessionStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Insert a new record and return it with its assigned id.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be stored.
    fn create(&self, new: NewSession) -> Result<SessionRecord, Self::Error>;

    /// Fetch a record by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    fn get(&self, id: u64) -> Result<Option<SessionRecord>, Self::Error>;

    /// Apply a partial update and return the updated record.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is unknown or the store fails.
    fn update(&self, id: u64, patch: SessionPatch) -> Result<SessionRecord, Self::Error>;
}

/// In-memory store; clones share the same rows.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    rows: Rc<RefCell<BTreeMap<u64, SessionRecord>>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.borrow().is_empty()
    }
}

impl SessionStore for MemorySessionStore {
    type Error = StoreError;

    fn create(&self, new: NewSession) -> Result<SessionRecord, Self::Error> {
        let mut rows = self.rows.borrow_mut();
        let id = rows.keys().next_back().map_or(1, |last| last + 1);
        let record = SessionRecord {
            id,
            case_id: new.case_id,
            current_room: new.current_room,
            resources: new.resources,
            state: new.state,
            is_complete: new.is_complete,
        };
        rows.insert(id, record.clone());
        Ok(record)
    }

    fn get(&self, id: u64) -> Result<Option<SessionRecord>, Self::Error> {
        Ok(self.rows.borrow().get(&id).cloned())
    }

    fn update(&self, id: u64, patch: SessionPatch) -> Result<SessionRecord, Self::Error> {
        let mut rows = self.rows.borrow_mut();
        let record = rows.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        patch.apply_to(record);
        Ok(record.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::Case;
    use crate::config::GradingConfig;

    fn live_session() -> CaseSession {
        let mut session = CaseSession::new(Case::case001().unwrap(), GradingConfig::default());
        session.start().unwrap();
        session.visit_evidence("ev1").unwrap();
        session
    }

    #[test]
    fn create_assigns_sequential_ids() {
        let store = MemorySessionStore::new();
        let snapshot = NewSession::snapshot(&live_session()).unwrap();
        let first = store.create(snapshot.clone()).unwrap();
        let second = store.create(snapshot).unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn snapshot_round_trips_game_state() {
        let session = live_session();
        let store = MemorySessionStore::new();
        let record = store
            .create(NewSession::snapshot(&session).unwrap())
            .unwrap();
        assert_eq!(record.current_room, "investigation");
        assert_eq!(record.resources.time, 95);
        assert!(!record.is_complete);
        assert_eq!(&record.game_state().unwrap(), session.state());
    }

    #[test]
    fn patch_updates_only_given_fields() {
        let store = MemorySessionStore::new();
        let record = store
            .create(NewSession::snapshot(&live_session()).unwrap())
            .unwrap();
        let updated = store
            .update(
                record.id,
                SessionPatch {
                    is_complete: Some(true),
                    ..SessionPatch::default()
                },
            )
            .unwrap();
        assert!(updated.is_complete);
        assert_eq!(updated.current_room, record.current_room);
        assert_eq!(updated.state, record.state);
    }

    #[test]
    fn unknown_ids() {
        let store = MemorySessionStore::new();
        assert!(store.get(9).unwrap().is_none());
        assert!(matches!(
            store.update(9, SessionPatch::default()),
            Err(StoreError::NotFound(9))
        ));
    }
}
