//! Input event queue and pointer event reduction.
//!
//! Protocol-engine callback threads append raw pointer/keyboard samples;
//! a single consumer on the orchestrator side drains them in batches and
//! replays them into the seat as a minimal sequence of motion, button, axis
//! and key transitions. Redundant absolute-motion samples collapse into one
//! notification per batch; every button or scroll edge is delivered exactly
//! once.

use std::mem;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use tokio::sync::Notify;
use tracing::{debug, error, trace, warn};

use crate::keymap;

/// Scroll step reported to the seat per wheel edge.
pub const AXIS_STEP: f64 = 5.0;

const BTN_LEFT: u8 = 0x01;
const BTN_MIDDLE: u8 = 0x02;
const BTN_RIGHT: u8 = 0x04;
const BTN_SCROLL_UP: u8 = 0x08;
const BTN_SCROLL_DOWN: u8 = 0x10;

/// Raw sample from a remote client, as delivered by the protocol engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputEvent {
    Pointer {
        time_ms: u32,
        buttons: u8,
        x: i32,
        y: i32,
    },
    Key {
        time_ms: u32,
        down: bool,
        keysym: u32,
    },
}

/// Pointer button identity, in the order transitions are emitted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Button {
    Left,
    Middle,
    Right,
}

/// Sink for reduced input, implemented by the host's seat subsystem.
pub trait Seat: Send {
    fn motion_absolute(&mut self, time_ms: u32, x: i32, y: i32);
    fn button(&mut self, time_ms: u32, button: Button, pressed: bool);
    fn axis(&mut self, time_ms: u32, delta: f64);
    fn key(&mut self, time_ms: u32, keycode: u32, pressed: bool);
}

/// Multi-producer, single-consumer event journal.
///
/// Producers never block and events are never dropped; past the high-water
/// mark a push logs, wakes the consumer again and yields its timeslice to
/// hurry the drain along.
pub struct EventQueue {
    events: Mutex<Vec<InputEvent>>,
    depth: AtomicUsize,
    wake: Notify,
    high_water: usize,
}

impl EventQueue {
    pub fn new(high_water: usize) -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            depth: AtomicUsize::new(0),
            wake: Notify::new(),
            high_water,
        }
    }

    /// Appends an event. Callable from any thread, including the protocol
    /// engine's callback thread.
    pub fn push(&self, event: InputEvent) {
        let depth = {
            let mut queue = self.events.lock().unwrap_or_else(PoisonError::into_inner);
            if queue.try_reserve(1).is_err() {
                error!("input queue allocation failed, dropping event");
                return;
            }
            queue.push(event);
            let depth = queue.len();
            self.depth.store(depth, Ordering::Release);
            depth
        };
        if depth > self.high_water {
            warn!(depth, "input queue past high-water mark");
            self.wake.notify_one();
            std::thread::yield_now();
        }
        self.wake.notify_one();
    }

    /// Detaches and returns every pending event in enqueue order. Single
    /// consumer only.
    pub fn drain(&self) -> Vec<InputEvent> {
        let mut queue = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        self.depth.store(0, Ordering::Release);
        mem::take(&mut *queue)
    }

    pub fn len(&self) -> usize {
        self.depth.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolves when a producer has signalled new events. Edge-triggered: a
    /// push that raced ahead of the wait completes the next wait immediately.
    pub async fn notified(&self) {
        self.wake.notified().await;
    }
}

/// Pointer state carried across drain batches.
#[derive(Clone, Copy, Debug, Default)]
pub struct PointerState {
    x: i32,
    y: i32,
    buttons: u8,
    time_ms: u32,
    motion_pending: bool,
}

impl PointerState {
    pub fn position(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    pub fn buttons(&self) -> u8 {
        self.buttons
    }
}

/// Replays drained batches into a seat.
///
/// Motion is lazy: a position change only marks motion pending, and the
/// single notification is flushed when a button edge, a key event, or the
/// end of the batch forces the position to be current.
#[derive(Debug, Default)]
pub struct InputDispatcher {
    pointer: PointerState,
}

impl InputDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Places the pointer and tells the seat, without generating an edge.
    /// Used once at startup so the seat never sees buttons before a position.
    pub fn seed(&mut self, time_ms: u32, x: i32, y: i32, seat: &mut dyn Seat) {
        self.pointer.x = x;
        self.pointer.y = y;
        self.pointer.time_ms = time_ms;
        self.pointer.motion_pending = false;
        seat.motion_absolute(time_ms, x, y);
    }

    pub fn pointer_state(&self) -> &PointerState {
        &self.pointer
    }

    /// Replays one drained batch in order, then flushes any trailing motion.
    pub fn dispatch(&mut self, batch: &[InputEvent], seat: &mut dyn Seat) {
        for event in batch {
            match *event {
                InputEvent::Pointer {
                    time_ms,
                    buttons,
                    x,
                    y,
                } => self.pointer_sample(time_ms, buttons, x, y, seat),
                InputEvent::Key {
                    time_ms,
                    down,
                    keysym,
                } => {
                    // pointer position must not be stale relative to a key
                    self.flush_motion(seat);
                    match keymap::keycode_for_sym(keysym) {
                        Some(keycode) => {
                            trace!(keysym = format_args!("{keysym:#06x}"), keycode, down, "key");
                            seat.key(time_ms, keycode, down);
                        }
                        None => {
                            debug!(
                                keysym = format_args!("{keysym:#06x}"),
                                "no keycode for keysym"
                            );
                        }
                    }
                }
            }
        }
        self.flush_motion(seat);
    }

    fn pointer_sample(&mut self, time_ms: u32, buttons: u8, x: i32, y: i32, seat: &mut dyn Seat) {
        self.pointer.time_ms = time_ms;
        if x != self.pointer.x || y != self.pointer.y {
            self.pointer.x = x;
            self.pointer.y = y;
            self.pointer.motion_pending = true;
        }
        if buttons != self.pointer.buttons {
            self.flush_motion(seat);
            let changed = buttons ^ self.pointer.buttons;
            if changed & BTN_LEFT != 0 {
                seat.button(time_ms, Button::Left, buttons & BTN_LEFT != 0);
            }
            if changed & BTN_MIDDLE != 0 {
                seat.button(time_ms, Button::Middle, buttons & BTN_MIDDLE != 0);
            }
            if changed & BTN_RIGHT != 0 {
                seat.button(time_ms, Button::Right, buttons & BTN_RIGHT != 0);
            }
            if changed & BTN_SCROLL_UP != 0 {
                seat.axis(time_ms, -AXIS_STEP);
            }
            if changed & BTN_SCROLL_DOWN != 0 {
                seat.axis(time_ms, AXIS_STEP);
            }
            self.pointer.buttons = buttons;
        }
    }

    fn flush_motion(&mut self, seat: &mut dyn Seat) {
        if self.pointer.motion_pending {
            seat.motion_absolute(self.pointer.time_ms, self.pointer.x, self.pointer.y);
            self.pointer.motion_pending = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    enum SeatEvent {
        Motion(u32, i32, i32),
        Button(u32, Button, bool),
        Axis(u32, f64),
        Key(u32, u32, bool),
    }

    #[derive(Default)]
    struct RecordingSeat {
        events: Vec<SeatEvent>,
    }

    impl Seat for RecordingSeat {
        fn motion_absolute(&mut self, time_ms: u32, x: i32, y: i32) {
            self.events.push(SeatEvent::Motion(time_ms, x, y));
        }
        fn button(&mut self, time_ms: u32, button: Button, pressed: bool) {
            self.events.push(SeatEvent::Button(time_ms, button, pressed));
        }
        fn axis(&mut self, time_ms: u32, delta: f64) {
            self.events.push(SeatEvent::Axis(time_ms, delta));
        }
        fn key(&mut self, time_ms: u32, keycode: u32, pressed: bool) {
            self.events.push(SeatEvent::Key(time_ms, keycode, pressed));
        }
    }

    fn pointer(time_ms: u32, buttons: u8, x: i32, y: i32) -> InputEvent {
        InputEvent::Pointer {
            time_ms,
            buttons,
            x,
            y,
        }
    }

    #[test]
    fn queue_preserves_push_order_and_empties() {
        let queue = EventQueue::new(10_000);
        for i in 0..5 {
            queue.push(pointer(i, 0, i as i32, 0));
        }
        assert_eq!(queue.len(), 5);
        let batch = queue.drain();
        assert_eq!(batch.len(), 5);
        for (i, event) in batch.iter().enumerate() {
            assert_eq!(*event, pointer(i as u32, 0, i as i32, 0));
        }
        assert!(queue.drain().is_empty());
        assert!(queue.is_empty());
    }

    #[test]
    fn queue_keeps_events_past_high_water() {
        let queue = EventQueue::new(4);
        for i in 0..10 {
            queue.push(pointer(i, 0, 0, 0));
        }
        assert_eq!(queue.drain().len(), 10);
    }

    #[tokio::test]
    async fn push_wakes_a_later_waiter() {
        let queue = EventQueue::new(16);
        queue.push(pointer(0, 0, 1, 1));
        // the permit from push completes this wait immediately
        queue.notified().await;
    }

    #[test]
    fn motion_coalesces_to_one_notification_per_batch() {
        let mut dispatcher = InputDispatcher::new();
        let mut seat = RecordingSeat::default();
        let batch: Vec<_> = (0..20).map(|i| pointer(i, 0, i as i32, 2 * i as i32)).collect();
        dispatcher.dispatch(&batch, &mut seat);
        assert_eq!(seat.events, vec![SeatEvent::Motion(19, 19, 38)]);
    }

    #[test]
    fn button_edges_emit_in_fixed_bit_order() {
        let mut dispatcher = InputDispatcher::new();
        let mut seat = RecordingSeat::default();
        // left+right+scroll-up all flip between two consecutive samples
        dispatcher.dispatch(
            &[pointer(1, 0, 5, 5), pointer(2, BTN_LEFT | BTN_RIGHT | BTN_SCROLL_UP, 5, 5)],
            &mut seat,
        );
        assert_eq!(
            seat.events,
            vec![
                SeatEvent::Motion(1, 5, 5),
                SeatEvent::Button(2, Button::Left, true),
                SeatEvent::Button(2, Button::Right, true),
                SeatEvent::Axis(2, -AXIS_STEP),
            ]
        );
    }

    #[test]
    fn scroll_bits_fire_on_every_flip() {
        let mut dispatcher = InputDispatcher::new();
        let mut seat = RecordingSeat::default();
        dispatcher.dispatch(
            &[
                pointer(1, BTN_SCROLL_DOWN, 0, 0),
                pointer(2, 0, 0, 0),
            ],
            &mut seat,
        );
        assert_eq!(
            seat.events,
            vec![SeatEvent::Axis(1, AXIS_STEP), SeatEvent::Axis(2, AXIS_STEP)]
        );
    }

    #[test]
    fn click_sequence_flushes_superseded_motion_once() {
        let mut dispatcher = InputDispatcher::new();
        let mut seat = RecordingSeat::default();
        dispatcher.dispatch(
            &[
                pointer(1, 0, 10, 10),
                pointer(2, BTN_LEFT, 12, 11),
                pointer(3, 0, 12, 11),
            ],
            &mut seat,
        );
        assert_eq!(
            seat.events,
            vec![
                SeatEvent::Motion(2, 12, 11),
                SeatEvent::Button(2, Button::Left, true),
                SeatEvent::Button(3, Button::Left, false),
            ]
        );
    }

    #[test]
    fn key_event_flushes_pending_motion_first() {
        let mut dispatcher = InputDispatcher::new();
        let mut seat = RecordingSeat::default();
        dispatcher.dispatch(
            &[
                pointer(1, 0, 30, 40),
                InputEvent::Key {
                    time_ms: 2,
                    down: true,
                    keysym: u32::from(b'a'),
                },
            ],
            &mut seat,
        );
        assert_eq!(
            seat.events,
            vec![SeatEvent::Motion(1, 30, 40), SeatEvent::Key(2, 30, true)]
        );
    }

    #[test]
    fn unknown_keysym_is_dropped() {
        let mut dispatcher = InputDispatcher::new();
        let mut seat = RecordingSeat::default();
        dispatcher.dispatch(
            &[InputEvent::Key {
                time_ms: 1,
                down: true,
                keysym: 0xfffd,
            }],
            &mut seat,
        );
        assert!(seat.events.is_empty());
    }

    #[test]
    fn state_persists_across_batches() {
        let mut dispatcher = InputDispatcher::new();
        let mut seat = RecordingSeat::default();
        dispatcher.dispatch(&[pointer(1, 0, 7, 7)], &mut seat);
        // same position again: no new motion in the second batch
        dispatcher.dispatch(&[pointer(2, 0, 7, 7)], &mut seat);
        assert_eq!(seat.events, vec![SeatEvent::Motion(1, 7, 7)]);
        assert_eq!(dispatcher.pointer_state().position(), (7, 7));
        assert_eq!(dispatcher.pointer_state().buttons(), 0);
    }
}
