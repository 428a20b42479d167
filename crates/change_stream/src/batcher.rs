//! Per-turn event batching
//!
//! The batcher sits behind the scene model's observer seam and collects
//! every change of one synchronous turn into a single FIFO batch. An
//! explicit state machine replaces implicit microtask ordering: the first
//! event arms the batch (`Idle` to `Pending`), the host flushes once at the
//! end of its turn, and listeners receive the whole batch in arrival order.

use crate::ChangeEvent;
use scene_model::{ChangeObserver, PropertyChange};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Callback receiving one flushed batch.
pub type BatchListener = Rc<dyn Fn(&[ChangeEvent])>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    /// No events collected since the last flush.
    Idle,
    /// At least one event is waiting for the end-of-turn flush.
    Pending,
    /// A flush is being delivered; events arriving now go to the next batch.
    Flushed,
}

/// Collects change events and delivers them in per-turn batches. Single
/// threaded; share via `Rc` and install a clone as the page observer.
pub struct ChangeBatcher {
    state: Cell<BatchState>,
    pending: RefCell<Vec<ChangeEvent>>,
    listeners: RefCell<Vec<BatchListener>>,
}

impl ChangeBatcher {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            state: Cell::new(BatchState::Idle),
            pending: RefCell::new(Vec::new()),
            listeners: RefCell::new(Vec::new()),
        })
    }

    pub fn state(&self) -> BatchState {
        self.state.get()
    }

    /// Replace all listeners with one callback.
    pub fn set_listener(&self, listener: BatchListener) {
        let mut listeners = self.listeners.borrow_mut();
        listeners.clear();
        listeners.push(listener);
    }

    pub fn add_listener(&self, listener: BatchListener) {
        self.listeners.borrow_mut().push(listener);
    }

    /// Deliver the pending batch, if any, to every listener. Returns the
    /// number of events flushed. Events observed during delivery are held
    /// for the next batch, never appended to the one in flight.
    pub fn flush(&self) -> usize {
        if self.state.get() != BatchState::Pending {
            return 0;
        }
        let batch = self.pending.borrow_mut().split_off(0);
        self.state.set(BatchState::Flushed);
        let listeners: Vec<BatchListener> = self.listeners.borrow().clone();
        for listener in listeners {
            listener(&batch);
        }
        let next = if self.pending.borrow().is_empty() {
            BatchState::Idle
        } else {
            BatchState::Pending
        };
        self.state.set(next);
        batch.len()
    }

    /// Drop any collected events without delivering them.
    pub fn discard(&self) {
        self.pending.borrow_mut().clear();
        self.state.set(BatchState::Idle);
    }
}

impl ChangeObserver for ChangeBatcher {
    fn changed(&self, change: PropertyChange) {
        self.pending.borrow_mut().push(ChangeEvent::from(change));
        if self.state.get() == BatchState::Idle {
            self.state.set(BatchState::Pending);
        }
    }
}
