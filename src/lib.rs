//! rfbridge - remote-display output backend
//!
//! Bridges a single-threaded repaint scheduler with a VNC-style protocol
//! engine that runs its own network thread. The scheduler paints on its own
//! cadence; the engine consumes published frames and reports finishes on a
//! network-dependent cadence and delivers viewer input asynchronously. The
//! pieces here keep those timelines coordinated without tearing the
//! framebuffer, without unbounded queues, and without letting a slow or dead
//! viewer stall local repainting.
//!
//! ```text
//! scheduler ── repaint ──> Output ── paint ──> back buffer
//!                            │  publish (atomic cutover)
//!                            ├── mark damage ──> protocol engine
//!                            │                      │ (own thread)
//!        seat <── dispatch ──┴── input queue <── pointer/key callbacks
//!   finish_frame <── pacing tick <── completion clock <── finish callbacks
//! ```

pub mod buffer;
pub mod config;
pub mod cursor;
pub mod error;
pub mod input;
pub mod keymap;
pub mod output;
pub mod pacing;
pub mod sim;
pub mod swap;

pub use buffer::{DamageRegion, PixelBuffer, Rect};
pub use config::OutputConfig;
pub use cursor::{CursorImage, CursorTracker};
pub use error::BackendError;
pub use input::{Button, EventQueue, InputDispatcher, InputEvent, Seat};
pub use output::{Output, OutputHandle, RemoteDisplay, RepaintScheduler, Renderer};
pub use pacing::FrameClock;
pub use swap::SwapPair;
