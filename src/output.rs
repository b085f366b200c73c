//! The repaint orchestrator.
//!
//! `Output` ties the double-buffered framebuffer, the completion clock, the
//! input queue and the cursor tracker together. The host's scheduler calls
//! [`Output::repaint`] on its own cadence; the protocol engine calls back
//! through an [`OutputHandle`] from whatever thread it runs its event loop
//! on; [`Output::dispatch`] is the single consumer that turns both streams
//! into seat input and completion reports.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use anyhow::Result;
use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, trace, warn};

use crate::buffer::{DamageRegion, PixelBuffer, Rect};
use crate::config::OutputConfig;
use crate::cursor::{CursorImage, CursorTracker};
use crate::error::BackendError;
use crate::input::{EventQueue, InputDispatcher, InputEvent, Seat};
use crate::pacing::FrameClock;
use crate::swap::SwapPair;

/// Pointer position seeded into the seat before any client input arrives.
const INITIAL_POINTER: (i32, i32) = (50, 50);

/// Paints the damaged region of the scene into the provided back buffer.
pub trait Renderer: Send {
    fn paint(&mut self, buffer: &mut PixelBuffer, damage: &DamageRegion) -> Result<()>;
}

/// The host scheduler's completion edge: exactly one call per repaint it
/// issued.
pub trait RepaintScheduler: Send + Sync {
    fn finish_frame(&self, at: Instant);
}

/// Command surface of the protocol engine.
pub trait RemoteDisplay: Send + Sync {
    /// One call per damage rectangle after a frame is published.
    fn mark_region_modified(&self, rect: Rect);
    /// Called only when the cursor image actually changed.
    fn set_cursor(&self, image: &CursorImage);
}

/// One remote-display output.
pub struct Output {
    config: OutputConfig,
    swap: SwapPair,
    clock: FrameClock,
    queue: EventQueue,
    cursor: Mutex<CursorTracker>,
    remote: Arc<dyn RemoteDisplay>,
    started: Instant,
    repaints: AtomicU64,
    finishes: AtomicU64,
    frame_wanted: Notify,
    closed: AtomicBool,
    close_wake: Notify,
}

impl Output {
    /// Allocates both pixel buffers; failure here aborts backend startup.
    pub fn new(config: OutputConfig, remote: Arc<dyn RemoteDisplay>) -> Result<Self, BackendError> {
        let swap = SwapPair::new(config.width, config.height)?;
        info!(
            width = config.width,
            height = config.height,
            listen = %config.listen,
            port = config.port,
            "output created"
        );
        Ok(Self {
            clock: FrameClock::new(config.stall_threshold),
            queue: EventQueue::new(config.input_high_water),
            cursor: Mutex::new(CursorTracker::new()),
            swap,
            config,
            remote,
            started: Instant::now(),
            repaints: AtomicU64::new(0),
            finishes: AtomicU64::new(0),
            frame_wanted: Notify::new(),
            closed: AtomicBool::new(false),
            close_wake: Notify::new(),
        })
    }

    pub fn config(&self) -> &OutputConfig {
        &self.config
    }

    /// Milliseconds since this output started; the timestamp attached to
    /// input events.
    fn now_ms(&self) -> u32 {
        self.started.elapsed().as_millis() as u32
    }

    /// Repaints the damaged region and publishes the result to the protocol
    /// engine. Safe against concurrent engine callbacks; returns the damage
    /// consumed so the scheduler can clear it from its accumulation.
    pub fn repaint(&self, renderer: &mut dyn Renderer, damage: &DamageRegion) -> Result<DamageRegion> {
        let back = self.swap.back_buffer();
        {
            let mut buffer = back.lock().unwrap_or_else(PoisonError::into_inner);
            renderer.paint(&mut buffer, damage)?;
        }
        // cutover is one atomic store; the engine's next read sees this frame
        self.swap.publish();
        for rect in damage.rects() {
            trace!(?rect, "mark modified");
            self.remote.mark_region_modified(*rect);
        }
        let cursor_push = {
            let mut cursor = self.cursor.lock().unwrap_or_else(PoisonError::into_inner);
            cursor.take_dirty().then(|| cursor.snapshot().clone())
        };
        if let Some(image) = cursor_push {
            self.remote.set_cursor(&image);
        }
        self.clock.record_repaint();
        let repaints = self.repaints.fetch_add(1, Ordering::Relaxed) + 1;
        if repaints % 60 == 0 {
            debug!(
                repaints,
                finishes = self.finishes.load(Ordering::Relaxed),
                queued_input = self.queue.len(),
                "output counters"
            );
        }
        Ok(damage.clone())
    }

    /// The buffer currently published to the protocol engine.
    pub fn front_buffer(&self) -> Arc<Mutex<PixelBuffer>> {
        self.swap.front_buffer()
    }

    /// Offers a new cursor image; returns whether it differed from the
    /// current one. The push to the engine happens on the next repaint.
    pub fn update_cursor(&self, image: &CursorImage) -> bool {
        self.cursor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .update(image)
    }

    /// Hides the cursor; returns whether anything was visible before.
    pub fn hide_cursor(&self) -> bool {
        self.cursor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .hide()
    }

    /// Resolves when a client asks for the next frame. Schedulers not driven
    /// by their own clock can use this to pace repaints.
    pub async fn frame_requested(&self) {
        self.frame_wanted.notified().await;
    }

    /// Repaints issued but not yet reported complete.
    pub fn frames_in_flight(&self) -> u32 {
        self.clock.outstanding()
    }

    /// Single-consumer loop: drains client input into the seat on every
    /// queue wakeup and runs the completion clock on the pacing interval.
    /// Returns after [`Output::close`].
    pub async fn dispatch(&self, seat: &mut dyn Seat, scheduler: &dyn RepaintScheduler) {
        let mut dispatcher = InputDispatcher::new();
        dispatcher.seed(self.now_ms(), INITIAL_POINTER.0, INITIAL_POINTER.1, seat);

        let mut pacing = tokio::time::interval(self.config.pacing_interval);
        pacing.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.queue.notified() => {
                    let batch = self.queue.drain();
                    if !batch.is_empty() {
                        dispatcher.dispatch(&batch, seat);
                    }
                }
                _ = pacing.tick() => {
                    if let Some(at) = self.clock.tick() {
                        scheduler.finish_frame(at);
                    }
                }
                _ = self.close_wake.notified() => {}
            }
            if self.closed.load(Ordering::Acquire) {
                break;
            }
        }

        // shutdown drains and discards
        let discarded = self.queue.drain().len();
        if discarded > 0 {
            debug!(discarded, "discarded queued input at shutdown");
        }
    }

    /// Stops the dispatch loop. Buffers and timers go away with the Output.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.close_wake.notify_waiters();
    }
}

/// Engine-facing callbacks for one output. Cheap to clone, safe to drive
/// from the protocol engine's own threads.
#[derive(Clone)]
pub struct OutputHandle {
    output: Arc<Output>,
}

impl OutputHandle {
    pub fn new(output: Arc<Output>) -> Self {
        Self { output }
    }

    /// Pointer sample from a client: current button mask and absolute
    /// position.
    pub fn pointer_event(&self, buttons: u8, x: i32, y: i32) {
        self.output.queue.push(InputEvent::Pointer {
            time_ms: self.output.now_ms(),
            buttons,
            x,
            y,
        });
    }

    /// Key press or release from a client, as an X keysym.
    pub fn key_event(&self, down: bool, keysym: u32) {
        debug!(keysym = format_args!("{keysym:#06x}"), down, "client key");
        self.output.queue.push(InputEvent::Key {
            time_ms: self.output.now_ms(),
            down,
            keysym,
        });
    }

    /// A client is ready for the next frame.
    pub fn frame_request(&self) {
        self.output.frame_wanted.notify_one();
    }

    /// The engine finished transmitting the published frame. A non-zero
    /// result is terminal for that client's connection only; the token still
    /// counts so pacing never hinges on one dying viewer.
    pub fn frame_finished(&self, result: i32) {
        if result != 0 {
            warn!(result, "remote display transport error");
        }
        self.output.clock.record_finish(Instant::now());
        self.output.finishes.fetch_add(1, Ordering::Relaxed);
    }
}
