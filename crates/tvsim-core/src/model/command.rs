use serde::{Deserialize, Serialize};
use strum::Display;

/// Where a command came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Source {
    /// Arrived over the control channel from an external controller.
    Hardware,
    /// Injected directly by a UI surface.
    Local,
}

/// One button press. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    /// Raw wire code. Only values up to 0xFF can name a button.
    pub code: u32,
    pub source: Source,
}

impl Command {
    pub const fn new(code: u32, source: Source) -> Self {
        Self { code, source }
    }

    pub const fn hardware(code: u32) -> Self {
        Self::new(code, Source::Hardware)
    }

    pub const fn local(code: u32) -> Self {
        Self::new(code, Source::Local)
    }
}
