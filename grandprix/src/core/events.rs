use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    Qualifying,
    Race,
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SessionType::Qualifying => f.pad("qualifying"),
            SessionType::Race => f.pad("race"),
        }
    }
}

/// SessionStatus describes how a session ended. Sessions without participants and races in which
/// every car retired are valid outcomes, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Completed,
    NoParticipants,
    AllRetired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Start,
    Weather,
    LapTime,
    Elimination,
    Pole,
    FastLap,
    Spin,
    OffTrack,
    Dnf,
    PitStop,
    Overtake,
    Finish,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Start => "start",
            EventKind::Weather => "weather",
            EventKind::LapTime => "lap_time",
            EventKind::Elimination => "elimination",
            EventKind::Pole => "pole",
            EventKind::FastLap => "fast_lap",
            EventKind::Spin => "spin",
            EventKind::OffTrack => "off_track",
            EventKind::Dnf => "dnf",
            EventKind::PitStop => "pit_stop",
            EventKind::Overtake => "overtake",
            EventKind::Finish => "finish",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// SessionEvent is a single entry of the event feed of a session. In qualifying `lap` contains
/// the stage number (1-3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEvent {
    pub lap: u32,
    pub kind: EventKind,
    pub description: String,
    pub driver_id: Option<u32>,
}

impl SessionEvent {
    pub fn new(lap: u32, kind: EventKind, description: String, driver_id: Option<u32>) -> Self {
        SessionEvent {
            lap,
            kind,
            description,
            driver_id,
        }
    }
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{:>3}] {:<11} {}", self.lap, self.kind, self.description)
    }
}
