//! Per-source FIFO that holds events back behind ones still being filtered.

use std::collections::VecDeque;

use crate::GameEvent;

enum Slot {
    Ready(GameEvent),
    /// Waiting for the chat filter job with this sequence number.
    Waiting(u64),
}

/// Keeps one source's events in arrival order while some of them wait on
/// the chat filter.
///
/// An event is released only when everything queued before it has been
/// released.
#[derive(Default)]
pub(crate) struct ReleaseQueue {
    slots: VecDeque<Slot>,
}

impl ReleaseQueue {
    pub(crate) fn push_ready(&mut self, event: GameEvent) {
        self.slots.push_back(Slot::Ready(event));
    }

    pub(crate) fn push_waiting(&mut self, seq: u64) {
        self.slots.push_back(Slot::Waiting(seq));
    }

    /// Fills the placeholder for `seq`. Returns `false` if there is none.
    pub(crate) fn fill(&mut self, seq: u64, event: GameEvent) -> bool {
        let slot = self
            .slots
            .iter_mut()
            .find(|slot| matches!(slot, Slot::Waiting(s) if *s == seq));
        match slot {
            Some(slot) => {
                *slot = Slot::Ready(event);
                true
            }
            None => false,
        }
    }

    /// Moves every event not stuck behind a placeholder into `out`.
    pub(crate) fn release(&mut self, out: &mut Vec<GameEvent>) {
        while matches!(self.slots.front(), Some(Slot::Ready(_))) {
            if let Some(Slot::Ready(event)) = self.slots.pop_front() {
                out.push(event);
            }
        }
    }

    pub(crate) fn waiting(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| matches!(slot, Slot::Waiting(_)))
            .count()
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
    }
}
