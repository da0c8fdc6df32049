//! Pending events and the keyboard state that filters key transitions.

use crate::disk::DriveId;
use crate::error::DiskError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Event kind, as seen by the guest in register `a`.
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
#[repr(u16)]
pub enum EventKind {
    None = 0,
    KeyUp = 1,
    KeyDown = 2,
    ScreenRefresh = 3,
    Disk0Finished = 4,
    Disk1Finished = 5,
}

#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
pub struct Event {
    pub kind: EventKind,
    pub payload: u16,
}

impl Event {
    pub const NONE: Event = Event { kind: EventKind::None, payload: 0 };

    pub fn key_up(key: u16) -> Self {
        Event { kind: EventKind::KeyUp, payload: key }
    }

    pub fn key_down(key: u16) -> Self {
        Event { kind: EventKind::KeyDown, payload: key }
    }

    pub fn screen_refresh() -> Self {
        Event { kind: EventKind::ScreenRefresh, payload: 0 }
    }

    /// Completion (or rejection) of a transfer on `drive`.
    pub fn disk_finished(drive: DriveId, result: Result<(), DiskError>) -> Self {
        let kind = match drive {
            DriveId::D0 => EventKind::Disk0Finished,
            DriveId::D1 => EventKind::Disk1Finished,
        };
        let payload = match result {
            Ok(()) => 0,
            Err(e) => e.code(),
        };
        Event { kind, payload }
    }

    /// Values loaded into `a` and `b` when the event is consumed.
    pub fn registers(self) -> (u16, u16) {
        (self.kind as u16, self.payload)
    }
}

pub const MAX_QUEUE_CAPACITY: usize = 64;

/// How events that arrive before the guest consumes the previous one are kept.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum EventBuffering {
    /// Single slot; a newer event replaces the pending one.
    Latest,
    /// FIFO of up to `capacity` events; when full the oldest one is dropped.
    Queue { capacity: usize },
}

impl Default for EventBuffering {
    fn default() -> Self {
        EventBuffering::Latest
    }
}

#[derive(Clone)]
pub(crate) struct EventQueue {
    items: [Event; MAX_QUEUE_CAPACITY],
    head: usize,
    len: usize,
    capacity: usize,
}

impl EventQueue {
    /// `buffering` must already be validated by `Config::validate`.
    pub(crate) fn new(buffering: EventBuffering) -> Self {
        let capacity = match buffering {
            EventBuffering::Latest => 1,
            EventBuffering::Queue { capacity } => capacity.min(MAX_QUEUE_CAPACITY).max(1),
        };
        EventQueue {
            items: [Event::NONE; MAX_QUEUE_CAPACITY],
            head: 0,
            len: 0,
            capacity,
        }
    }

    pub(crate) fn push(&mut self, event: Event) {
        self.items[(self.head + self.len) % self.capacity] = event;
        if self.len == self.capacity {
            if self.capacity > 1 {
                log::debug!("event queue full, dropping oldest event");
            }
            self.head = (self.head + 1) % self.capacity;
        } else {
            self.len += 1;
        }
    }

    pub(crate) fn pop(&mut self) -> Option<Event> {
        if self.len == 0 {
            None
        } else {
            let event = self.items[self.head];
            self.head = (self.head + 1) % self.capacity;
            self.len -= 1;
            Some(event)
        }
    }

    pub(crate) fn is_pending(&self) -> bool {
        self.len != 0
    }

    pub(crate) fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }
}

const KEY_WORDS: usize = (1 << 16) / 64;

/// Pressed state of every 16-bit key code.
#[derive(Clone)]
pub(crate) struct KeyState {
    pressed: [u64; KEY_WORDS],
}

impl KeyState {
    pub(crate) fn new() -> Self {
        KeyState { pressed: [0; KEY_WORDS] }
    }

    /// Marks `key` as held; returns whether it was up before.
    pub(crate) fn press(&mut self, key: u16) -> bool {
        let (word, bit) = Self::locate(key);
        let was_up = self.pressed[word] & bit == 0;
        self.pressed[word] |= bit;
        was_up
    }

    /// Marks `key` as released; returns whether it was held before.
    pub(crate) fn release(&mut self, key: u16) -> bool {
        let (word, bit) = Self::locate(key);
        let was_down = self.pressed[word] & bit != 0;
        self.pressed[word] &= !bit;
        was_down
    }

    pub(crate) fn is_pressed(&self, key: u16) -> bool {
        let (word, bit) = Self::locate(key);
        self.pressed[word] & bit != 0
    }

    fn locate(key: u16) -> (usize, u64) {
        (usize::from(key >> 6), 1 << (key & 63))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_event_wins() {
        let mut queue = EventQueue::new(EventBuffering::Latest);
        assert_eq!(queue.pop(), None);
        queue.push(Event::key_down(7));
        queue.push(Event::screen_refresh());
        assert!(queue.is_pending());
        assert_eq!(queue.pop(), Some(Event::screen_refresh()));
        assert_eq!(queue.pop(), None);
        assert!(!queue.is_pending());
    }

    #[test]
    fn fifo_keeps_order() {
        let mut queue = EventQueue::new(EventBuffering::Queue { capacity: 8 });
        queue.push(Event::key_down(3));
        queue.push(Event::key_up(5));
        assert_eq!(queue.pop(), Some(Event::key_down(3)));
        assert_eq!(queue.pop(), Some(Event::key_up(5)));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn full_fifo_drops_oldest() {
        let mut queue = EventQueue::new(EventBuffering::Queue { capacity: 3 });
        for key in 0..5 {
            queue.push(Event::key_down(key));
        }
        assert_eq!(queue.pop(), Some(Event::key_down(2)));
        assert_eq!(queue.pop(), Some(Event::key_down(3)));
        assert_eq!(queue.pop(), Some(Event::key_down(4)));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn clear_discards_pending() {
        let mut queue = EventQueue::new(EventBuffering::Queue { capacity: 4 });
        queue.push(Event::key_down(1));
        queue.push(Event::key_down(2));
        queue.clear();
        assert_eq!(queue.pop(), None);
        queue.push(Event::key_up(9));
        assert_eq!(queue.pop(), Some(Event::key_up(9)));
    }

    #[test]
    fn disk_payloads() {
        assert_eq!(Event::disk_finished(DriveId::D0, Ok(())).registers(), (4, 0));
        assert_eq!(Event::disk_finished(DriveId::D1, Err(DiskError::NotPresent)).registers(), (5, 1));
        assert_eq!(Event::disk_finished(DriveId::D0, Err(DiskError::Busy)).registers(), (4, 2));
        assert_eq!(Event::disk_finished(DriveId::D1, Err(DiskError::NotWriteable)).registers(), (5, 3));
    }

    #[test]
    fn key_transitions_only_fire_on_change() {
        let mut keys = KeyState::new();
        assert!(keys.press(0xffff));
        assert!(!keys.press(0xffff));
        assert!(keys.is_pressed(0xffff));
        assert!(!keys.is_pressed(0xfffe));
        assert!(keys.release(0xffff));
        assert!(!keys.release(0xffff));
        assert!(!keys.release(12));
    }
}
