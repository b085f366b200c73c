//! Backend error taxonomy.
//!
//! Only failures that abort output construction are typed; steady-state
//! trouble (queue pressure, transport hiccups, completion stalls) is
//! contained where it happens and logged, keeping the repaint loop alive.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    /// A pixel buffer could not be allocated. Raised only at output
    /// construction; there is no runtime reallocation path.
    #[error("pixel buffer allocation of {0} bytes failed")]
    ResourceExhausted(usize),

    /// A cursor image exceeded the fixed 64x64 capacity.
    #[error("cursor image {width}x{height} exceeds the 64x64 limit")]
    CursorOversized { width: u32, height: u32 },
}
