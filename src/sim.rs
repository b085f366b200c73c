//! Simulated collaborators for soak runs and integration tests.
//!
//! Stands in for the real protocol engine, renderer and scheduler so the
//! whole bridge can be exercised without a network or a compositor: a
//! test-card renderer, a completion-paced repaint loop, and a fake engine
//! thread that acknowledges published frames with jittered latency and
//! injects synthetic viewer input through the callback surface.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use rand::Rng;
use tracing::{debug, info, trace, warn};

use crate::buffer::{DamageRegion, PixelBuffer, Rect};
use crate::config::OutputConfig;
use crate::cursor::CursorImage;
use crate::input::{Button, Seat};
use crate::output::{Output, OutputHandle, RemoteDisplay, RepaintScheduler, Renderer};

const BOX_SIZE: i32 = 48;

/// Renderer double: a static gradient with a bouncing box on top.
pub struct TestCardRenderer {
    width: u32,
    height: u32,
    tick: u64,
    box_pos: (i32, i32),
    box_vel: (i32, i32),
}

impl TestCardRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            tick: 0,
            box_pos: (8, 8),
            box_vel: (3, 2),
        }
    }

    fn box_rect(&self) -> Rect {
        Rect::new(
            self.box_pos.0,
            self.box_pos.1,
            self.box_pos.0 + BOX_SIZE,
            self.box_pos.1 + BOX_SIZE,
        )
    }

    /// Moves the box one step and returns the damage for the next repaint:
    /// where the box was plus where it is now.
    pub fn advance(&mut self) -> DamageRegion {
        let mut damage = DamageRegion::from_rect(self.box_rect());
        let (mut x, mut y) = self.box_pos;
        let (mut vx, mut vy) = self.box_vel;
        x += vx;
        y += vy;
        if x < 0 || x + BOX_SIZE > self.width as i32 {
            vx = -vx;
            x += 2 * vx;
        }
        if y < 0 || y + BOX_SIZE > self.height as i32 {
            vy = -vy;
            y += 2 * vy;
        }
        self.box_pos = (x, y);
        self.box_vel = (vx, vy);
        self.tick += 1;
        damage.add(self.box_rect());
        damage
    }
}

impl Renderer for TestCardRenderer {
    fn paint(&mut self, buffer: &mut PixelBuffer, damage: &DamageRegion) -> Result<()> {
        let bounds = buffer.bounds();
        let stride = buffer.stride();
        let (width, height) = (self.width.max(1) as i32, self.height.max(1) as i32);
        let phase = (self.tick % 256) as u8;
        for rect in damage.rects() {
            let clip = match rect.intersection(&bounds) {
                Some(c) => c,
                None => continue,
            };
            let data = buffer.bytes_mut();
            for y in clip.y1..clip.y2 {
                let row = y as usize * stride;
                for x in clip.x1..clip.x2 {
                    let idx = row + x as usize * 4;
                    data[idx] = (x * 255 / width) as u8;
                    data[idx + 1] = (y * 255 / height) as u8;
                    data[idx + 2] = phase;
                    data[idx + 3] = 0xff;
                }
            }
        }
        let box_rect = self.box_rect();
        for rect in damage.rects() {
            if let Some(overlap) = rect.intersection(&box_rect) {
                buffer.fill_rect(&overlap, [0xff, 0xff, 0xff, 0xff]);
            }
        }
        Ok(())
    }
}

/// Seat double that counts what reaches it.
#[derive(Debug, Default)]
pub struct CountingSeat {
    pub motions: u64,
    pub buttons: u64,
    pub axes: u64,
    pub keys: u64,
}

impl Seat for CountingSeat {
    fn motion_absolute(&mut self, time_ms: u32, x: i32, y: i32) {
        trace!(time_ms, x, y, "seat motion");
        self.motions += 1;
    }
    fn button(&mut self, time_ms: u32, button: Button, pressed: bool) {
        trace!(time_ms, ?button, pressed, "seat button");
        self.buttons += 1;
    }
    fn axis(&mut self, time_ms: u32, delta: f64) {
        trace!(time_ms, delta, "seat axis");
        self.axes += 1;
    }
    fn key(&mut self, time_ms: u32, keycode: u32, pressed: bool) {
        trace!(time_ms, keycode, pressed, "seat key");
        self.keys += 1;
    }
}

/// Scheduler double that forwards completion reports over a channel.
pub struct ChannelScheduler {
    tx: tokio::sync::mpsc::UnboundedSender<Instant>,
}

impl ChannelScheduler {
    pub fn new() -> (Self, tokio::sync::mpsc::UnboundedReceiver<Instant>) {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl RepaintScheduler for ChannelScheduler {
    fn finish_frame(&self, at: Instant) {
        let _ = self.tx.send(at);
    }
}

/// Commands the fake engine receives from the orchestrator side.
pub enum RemoteCommand {
    Damage(Rect),
    Cursor(u32, u32),
}

/// Protocol-engine double: forwards the command surface to a channel so a
/// separate engine thread can react on its own timeline.
pub struct SimulatedRemote {
    tx: Sender<RemoteCommand>,
}

impl SimulatedRemote {
    pub fn new() -> (Self, Receiver<RemoteCommand>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx }, rx)
    }
}

impl RemoteDisplay for SimulatedRemote {
    fn mark_region_modified(&self, rect: Rect) {
        let _ = self.tx.send(RemoteCommand::Damage(rect));
    }
    fn set_cursor(&self, image: &CursorImage) {
        let _ = self
            .tx
            .send(RemoteCommand::Cursor(image.width(), image.height()));
    }
}

/// Fake engine thread body: coalesces each burst of damage marks into one
/// simulated transmission, acknowledges it after a jittered delay, and
/// injects synthetic pointer/key traffic like a fidgety viewer would.
pub fn engine_loop(
    rx: Receiver<RemoteCommand>,
    handle: OutputHandle,
    width: u32,
    height: u32,
    stop: Arc<AtomicBool>,
) {
    let mut rng = rand::thread_rng();
    let (mut x, mut y) = (50i32, 50i32);
    let mut frames = 0u64;
    let mut cursor_updates = 0u64;

    while !stop.load(Ordering::Acquire) {
        let first = match rx.recv_timeout(Duration::from_millis(50)) {
            Ok(cmd) => cmd,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };
        let mut rects = 0u64;
        let mut handle_cmd = |cmd: RemoteCommand| match cmd {
            RemoteCommand::Damage(_) => rects += 1,
            RemoteCommand::Cursor(..) => cursor_updates += 1,
        };
        handle_cmd(first);
        while let Ok(cmd) = rx.try_recv() {
            handle_cmd(cmd);
        }
        drop(handle_cmd);

        if rects == 0 {
            continue;
        }

        // encode plus transmit, with network jitter
        std::thread::sleep(Duration::from_millis(rng.gen_range(2..25)));
        handle.frame_finished(0);
        frames += 1;

        x = (x + rng.gen_range(-4..=4)).clamp(0, width as i32 - 1);
        y = (y + rng.gen_range(-4..=4)).clamp(0, height as i32 - 1);
        handle.pointer_event(0, x, y);
        if frames % 16 == 0 {
            handle.pointer_event(0x01, x, y);
            handle.pointer_event(0, x, y);
        }
        if frames % 32 == 0 {
            handle.key_event(true, u32::from(b'a'));
            handle.key_event(false, u32::from(b'a'));
        }
        if frames % 8 == 0 {
            handle.frame_request();
        }
    }
    debug!(frames, cursor_updates, "simulated engine stopped");
}

/// Runs the whole bridge against the simulated collaborators for a bounded
/// number of frames.
pub async fn run_soak(config: OutputConfig, frames: u64) -> Result<()> {
    let (remote, commands) = SimulatedRemote::new();
    let output = Arc::new(Output::new(config.clone(), Arc::new(remote))?);
    let stop = Arc::new(AtomicBool::new(false));

    let engine = {
        let handle = OutputHandle::new(Arc::clone(&output));
        let stop = Arc::clone(&stop);
        let (width, height) = (config.width, config.height);
        std::thread::spawn(move || engine_loop(commands, handle, width, height, stop))
    };

    let (scheduler, mut finished) = ChannelScheduler::new();
    let scheduler = Arc::new(scheduler);

    let dispatch = tokio::spawn({
        let output = Arc::clone(&output);
        let scheduler = Arc::clone(&scheduler);
        async move {
            let mut seat = CountingSeat::default();
            output.dispatch(&mut seat, scheduler.as_ref()).await;
            seat
        }
    });

    let mut renderer = TestCardRenderer::new(config.width, config.height);
    let mut damage = DamageRegion::full(config.width, config.height);

    for frame in 0..frames {
        let consumed = output.repaint(&mut renderer, &damage)?;
        damage.subtract(&consumed);

        tokio::select! {
            report = finished.recv() => {
                if report.is_none() {
                    break;
                }
            }
            _ = output.frame_requested() => {
                trace!(frame, "viewer requested an early frame");
            }
            _ = tokio::time::sleep(Duration::from_secs(1)) => {
                warn!(frame, "no completion within a second");
            }
        }

        for rect in renderer.advance().rects() {
            damage.add(*rect);
        }
        if frame > 0 && frame % 120 == 0 {
            info!(frame, in_flight = output.frames_in_flight(), "soak progress");
        }
    }

    output.close();
    let seat = dispatch.await?;
    stop.store(true, Ordering::Release);
    engine.join().ok();
    info!(
        motions = seat.motions,
        buttons = seat.buttons,
        axes = seat.axes,
        keys = seat.keys,
        "soak finished"
    );
    Ok(())
}
