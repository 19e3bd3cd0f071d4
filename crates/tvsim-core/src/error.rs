// ── Core error types ──
//
// Lifecycle errors of the simulator facade. Invalid channel entries and
// unknown codes are not errors; they come back as
// `machine::TransitionOutcome` and surface as notifications.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Simulator has not been started")]
    NotStarted,

    #[error("Simulator is already running")]
    AlreadyRunning,

    #[error("Simulator stopped")]
    SimulatorStopped,
}
