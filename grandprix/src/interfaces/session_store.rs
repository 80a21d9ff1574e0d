use crate::core::events::{SessionEvent, SessionType};
use crate::core::qualifying::QualifyingTime;
use crate::error::SimError;
use crate::post::race_result::RaceClassification;
use std::collections::HashMap;
use std::sync::Mutex;

/// SessionRecord is everything persisted for one session of a race weekend.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionRecord {
    Qualifying {
        events: Vec<SessionEvent>,
        grid: Vec<QualifyingTime>,
    },
    Race {
        events: Vec<SessionEvent>,
        classification: Vec<RaceClassification>,
    },
}

impl SessionRecord {
    pub fn session_type(&self) -> SessionType {
        match self {
            SessionRecord::Qualifying { .. } => SessionType::Qualifying,
            SessionRecord::Race { .. } => SessionType::Race,
        }
    }

    pub fn events(&self) -> &[SessionEvent] {
        match self {
            SessionRecord::Qualifying { events, .. } | SessionRecord::Race { events, .. } => events,
        }
    }
}

/// SessionStore persists the outcome of simulated sessions. A commit replaces everything stored
/// for the same race and session type in one step, other sessions are left untouched.
pub trait SessionStore: Send + Sync {
    fn commit(&self, race_id: u32, record: SessionRecord) -> Result<(), SimError>;

    fn load(&self, race_id: u32, session_type: SessionType)
        -> Result<Option<SessionRecord>, SimError>;

    /// starting_grid returns the driver ids in qualifying order, if qualifying was committed.
    fn starting_grid(&self, race_id: u32) -> Result<Option<Vec<u32>>, SimError> {
        Ok(match self.load(race_id, SessionType::Qualifying)? {
            Some(SessionRecord::Qualifying { grid, .. }) => {
                Some(grid.iter().map(|time| time.driver_id).collect())
            }
            _ => None,
        })
    }
}

/// MemoryStore keeps all sessions in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    sessions: Mutex<HashMap<(u32, SessionType), SessionRecord>>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    pub fn no_sessions(&self) -> Result<usize, SimError> {
        Ok(self
            .sessions
            .lock()
            .map_err(|e| SimError::Store(e.to_string()))?
            .len())
    }
}

impl SessionStore for MemoryStore {
    fn commit(&self, race_id: u32, record: SessionRecord) -> Result<(), SimError> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|e| SimError::Store(e.to_string()))?;

        let key = (race_id, record.session_type());
        sessions.remove(&key);
        sessions.insert(key, record);
        Ok(())
    }

    fn load(
        &self,
        race_id: u32,
        session_type: SessionType,
    ) -> Result<Option<SessionRecord>, SimError> {
        let sessions = self
            .sessions
            .lock()
            .map_err(|e| SimError::Store(e.to_string()))?;

        Ok(sessions.get(&(race_id, session_type)).cloned())
    }
}
