//! Output configuration values.

use std::time::Duration;

/// Configuration for one remote-display output.
///
/// Carries values only; listening itself is the protocol engine's job.
#[derive(Clone, Debug)]
pub struct OutputConfig {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Address the protocol engine should listen on.
    pub listen: String,
    /// Port the protocol engine should listen on.
    pub port: u16,
    /// Cadence of the frame-completion pacing tick.
    pub pacing_interval: Duration,
    /// Gap after which the pacing tick fabricates a completion credit so a
    /// quiet or disconnected viewer cannot stall the repaint loop.
    pub stall_threshold: Duration,
    /// Queue depth past which input floods are logged and the consumer is
    /// nudged harder. Events are never dropped.
    pub input_high_water: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 640,
            listen: "localhost".to_string(),
            port: 5900,
            pacing_interval: Duration::from_millis(40),
            stall_threshold: Duration::from_millis(500),
            input_high_water: 10_000,
        }
    }
}
