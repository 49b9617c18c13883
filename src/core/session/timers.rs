use tokio::task::JoinHandle;

/// Timer kinds owned by the session manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    IdleWarning,
    IdleLogout,
    TokenCheck,
    BackgroundLogout,
}

impl TimerKind {
    pub const ALL: [TimerKind; 4] = [
        TimerKind::IdleWarning,
        TimerKind::IdleLogout,
        TimerKind::TokenCheck,
        TimerKind::BackgroundLogout,
    ];

    fn index(self) -> usize {
        match self {
            TimerKind::IdleWarning => 0,
            TimerKind::IdleLogout => 1,
            TimerKind::TokenCheck => 2,
            TimerKind::BackgroundLogout => 3,
        }
    }
}

#[derive(Debug)]
struct Slot {
    generation: u64,
    handle: JoinHandle<()>,
}

/// At most one pending task per timer kind
///
/// Every armed task receives a generation number. A task that wakes up must
/// `claim` its slot before acting: the claim fails if the slot was cancelled
/// or re-armed in the meantime, and a successful claim detaches the task so
/// `cancel_all` can no longer abort it.
#[derive(Debug, Default)]
pub struct TimerSlots {
    slots: [Option<Slot>; 4],
    next_generation: u64,
}

impl TimerSlots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel any pending timer of this kind, then install the spawned one
    pub fn arm<F>(&mut self, kind: TimerKind, spawn: F) -> u64
    where
        F: FnOnce(u64) -> JoinHandle<()>,
    {
        self.cancel(kind);
        self.next_generation += 1;
        let generation = self.next_generation;
        let handle = spawn(generation);
        self.slots[kind.index()] = Some(Slot { generation, handle });
        generation
    }

    /// Abort the pending timer of this kind, if any
    pub fn cancel(&mut self, kind: TimerKind) -> bool {
        match self.slots[kind.index()].take() {
            Some(slot) => {
                slot.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Abort every pending timer, returning how many were pending
    pub fn cancel_all(&mut self) -> usize {
        TimerKind::ALL
            .iter()
            .filter(|kind| self.cancel(**kind))
            .count()
    }

    pub fn is_current(&self, kind: TimerKind, generation: u64) -> bool {
        matches!(&self.slots[kind.index()], Some(slot) if slot.generation == generation)
    }

    /// Take ownership of a fired timer's slot
    pub fn claim(&mut self, kind: TimerKind, generation: u64) -> bool {
        if self.is_current(kind, generation) {
            // dropping a JoinHandle detaches the task
            self.slots[kind.index()].take();
            true
        } else {
            false
        }
    }

    pub fn is_pending(&self, kind: TimerKind) -> bool {
        self.slots[kind.index()].is_some()
    }

    pub fn pending_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }
}

impl Drop for TimerSlots {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
