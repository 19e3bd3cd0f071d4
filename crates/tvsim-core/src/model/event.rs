// ── Interrupt events ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Interrupt,
}

/// Emitted for every hardware-sourced command so observers can tell
/// controller input apart from local UI changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterruptEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub code: u32,
    pub name: String,
    pub timestamp: DateTime<Utc>,
}

impl InterruptEvent {
    pub fn new(code: u32, name: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind: EventKind::Interrupt,
            code,
            name: name.into(),
            timestamp,
        }
    }
}
