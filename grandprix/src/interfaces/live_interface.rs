use crate::core::events::{SessionEvent, SessionStatus, SessionType};

/// LiveUpdate is sent from the simulation worker to a listener while a session is simulated.
#[derive(Debug, Clone, PartialEq)]
pub enum LiveUpdate {
    Event {
        session_type: SessionType,
        event: SessionEvent,
    },
    /// Sent at the end of every race lap
    LapCompleted {
        lap: u32,
        tot_no_laps: u32,
        leader: Option<u32>,
    },
    /// Last message of a session
    Finished {
        session_type: SessionType,
        status: SessionStatus,
    },
}
