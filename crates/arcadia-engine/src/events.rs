//! Fast numeric event ring for high-frequency effect and audio triggers.
//!
//! One writer ([`FastEventBus::emit`]) and any number of readers, each owning
//! its own cursor. Cursors are absolute `u64` positions; the slot for cursor
//! `c` is `c & mask`. Readers never block the writer: a reader that falls
//! more than one ring length behind is clamped forward and simply misses the
//! overwritten records.

use tracing::warn;

/// Well-known event ids emitted by the core.
pub mod fx {
    /// `[x, y, damage, 0]`
    pub const HIT: u32 = 1;
    /// `[x, y, variant, 0]`
    pub const DEATH: u32 = 2;
    /// `[x, y, variant, 0]`, when an enemy finishes spawning.
    pub const SPAWN: u32 = 3;
    /// `[x, y, vx, vy]`
    pub const PROJECTILE_FIRED: u32 = 4;
    /// `[x, y, amount, panel_id]`
    pub const PANEL_DAMAGED: u32 = 5;
    /// `[from_x, from_y, to_x, to_y]`
    pub const TELEPORT: u32 = 6;
    /// `[x, y, count, damage]`
    pub const PULSE: u32 = 7;
}

/// One ring record.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FastEvent {
    pub id: u32,
    pub args: [f32; 4],
}

/// Power-of-two ring of [`FastEvent`]s.
#[derive(Debug, Clone)]
pub struct FastEventBus {
    slots: Vec<FastEvent>,
    mask: u64,
    write: u64,
    dropped: u64,
}

impl FastEventBus {
    /// `capacity` is rounded up to the next power of two (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1).next_power_of_two();
        Self {
            slots: vec![FastEvent::default(); capacity],
            mask: capacity as u64 - 1,
            write: 0,
            dropped: 0,
        }
    }

    /// Append a record. Non-finite payloads are rejected and counted.
    pub fn emit(&mut self, id: u32, args: [f32; 4]) -> bool {
        if args.iter().any(|a| !a.is_finite()) {
            self.dropped += 1;
            warn!(event_id = id, ?args, "dropping fast event with non-finite payload");
            return false;
        }
        self.slots[(self.write & self.mask) as usize] = FastEvent { id, args };
        self.write += 1;
        true
    }

    /// Replay every retained record from `from` up to the write cursor.
    ///
    /// `from` is clamped into `[write - capacity, write]`. Returns the new
    /// cursor, which is always the current write cursor.
    pub fn read_events(&self, from: u64, mut handler: impl FnMut(&FastEvent)) -> u64 {
        let start = from.clamp(self.oldest_cursor(), self.write);
        for cursor in start..self.write {
            handler(&self.slots[(cursor & self.mask) as usize]);
        }
        self.write
    }

    /// Oldest cursor whose record is still in the ring.
    pub fn oldest_cursor(&self) -> u64 {
        self.write.saturating_sub(self.capacity() as u64)
    }

    pub fn write_cursor(&self) -> u64 {
        self.write
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Records rejected by [`emit`](Self::emit).
    pub fn dropped_count(&self) -> u64 {
        self.dropped
    }
}

/// A consumer-owned cursor over a [`FastEventBus`].
#[derive(Debug, Clone, Default)]
pub struct EventReader {
    cursor: u64,
    missed: u64,
}

impl EventReader {
    /// A reader that will see every event still retained by the ring.
    pub fn new() -> Self {
        Self::default()
    }

    /// A reader that ignores everything emitted so far.
    pub fn at_head(bus: &FastEventBus) -> Self {
        Self {
            cursor: bus.write_cursor(),
            missed: 0,
        }
    }

    /// Deliver new events to `handler`, returning how many were delivered.
    pub fn read(&mut self, bus: &FastEventBus, handler: impl FnMut(&FastEvent)) -> usize {
        let oldest = bus.oldest_cursor();
        if self.cursor < oldest {
            self.missed += oldest - self.cursor;
        }
        let start = self.cursor.clamp(oldest, bus.write_cursor());
        self.cursor = bus.read_events(self.cursor, handler);
        (self.cursor - start) as usize
    }

    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Events this reader lost to overwrites.
    pub fn missed(&self) -> u64 {
        self.missed
    }
}
