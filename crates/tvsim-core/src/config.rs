use std::time::Duration;

/// Runtime settings for a [`Simulator`](crate::Simulator).
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Endpoint identity (socket path or pipe name).
    pub endpoint: String,
    /// Start the transport listener. Without it only local commands arrive.
    pub hardware: bool,
    /// Tick of the ephemeral-field sweep.
    pub sweep_interval: Duration,
    /// Lifetime of notification text and a partial channel entry.
    pub ephemeral_timeout: Duration,
    /// Capacity of the hardware command queue.
    pub ingress_capacity: usize,
    /// Pause after a failed accept.
    pub accept_retry: Duration,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            endpoint: tvsim_ipc::default_identity().to_owned(),
            hardware: true,
            sweep_interval: Duration::from_millis(100),
            ephemeral_timeout: Duration::from_secs(2),
            ingress_capacity: 64,
            accept_retry: Duration::from_millis(100),
        }
    }
}
