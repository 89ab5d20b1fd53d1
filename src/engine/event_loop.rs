//! Polled action lists.
//!
//! An [`EventLoop`] is an ordered list of actions run on every
//! [`poll`](EventLoop::poll). Trigger bindings register themselves here and
//! the scheduler polls its active loop once per tick.
//!
//! ## Semantics
//! * Actions run in binding order.
//! * An action bound while the loop is polling is held back and runs from
//!   the next poll on.
//! * [`clear`](EventLoop::clear) during a poll stops that poll after the
//!   current action.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::mem;
use std::rc::Rc;


type Action = Box<dyn FnMut()>;

#[derive(Default)]
struct LoopInner {
    bindings: RefCell<Vec<Action>>,
    pending: RefCell<Vec<Action>>,
    polling: Cell<bool>,
    cleared: Cell<bool>,
}

/// Shared handle to a list of polled actions.
///
/// Clones refer to the same loop.
#[derive(Clone, Default)]
pub struct EventLoop {
    inner: Rc<LoopInner>,
}

impl EventLoop {
    /// Creates an empty loop.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `action` to the loop.
    pub fn bind(&self, action: impl FnMut() + 'static) {
        if self.inner.polling.get() {
            self.inner.pending.borrow_mut().push(Box::new(action));
        } else {
            self.inner.bindings.borrow_mut().push(Box::new(action));
        }
    }

    /// Runs every bound action once.
    pub fn poll(&self) {
        // actions are taken out so they can bind or clear re-entrantly
        let mut actions = mem::take(&mut *self.inner.bindings.borrow_mut());
        self.inner.polling.set(true);
        self.inner.cleared.set(false);

        for action in actions.iter_mut() {
            action();
            if self.inner.cleared.get() {
                break;
            }
        }

        self.inner.polling.set(false);
        if self.inner.cleared.replace(false) {
            // only actions bound after the clear survive
            actions.clear();
        }

        let pending = mem::take(&mut *self.inner.pending.borrow_mut());
        actions.extend(pending);
        *self.inner.bindings.borrow_mut() = actions;
    }

    /// Removes every action.
    pub fn clear(&self) {
        let dropped_bindings = mem::take(&mut *self.inner.bindings.borrow_mut());
        let dropped_pending = mem::take(&mut *self.inner.pending.borrow_mut());
        if self.inner.polling.get() {
            self.inner.cleared.set(true);
        }
        drop(dropped_bindings);
        drop(dropped_pending);
    }

    /// Number of bound actions, including ones waiting for the current poll
    /// to finish.
    pub fn len(&self) -> usize {
        self.inner.bindings.borrow().len() + self.inner.pending.borrow().len()
    }

    /// Whether no action is bound.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether both handles refer to the same loop.
    pub fn ptr_eq(&self, other: &EventLoop) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLoop")
            .field("bindings", &self.len())
            .field("polling", &self.inner.polling.get())
            .finish()
    }
}
