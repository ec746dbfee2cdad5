use parking_lot::{Condvar, Mutex};

enum CellState<V> {
    // Created by a lookup, nobody is computing the value yet.
    Empty,
    // A claimant is evaluating its init closure.
    Computing,
    Ready(V),
    // The computation failed and the cell was unlinked from its bucket. Terminal.
    Abandoned,
}

/// The outcome of [`ValueCell::claim`].
pub(crate) enum Claim<V> {
    /// The caller now owns the computation. It must call either `commit` or
    /// `abandon` exactly once.
    Won,
    /// The value was already computed (possibly while the caller was waiting).
    Ready(V),
    /// The computation the caller was waiting for failed. Look the key up again.
    Abandoned,
}

/// A single-assignment slot for the value of one key.
///
/// Every cell carries its own lock and condition variable, so callers waiting
/// for one key never contend with callers of another key.
pub(crate) struct ValueCell<V> {
    state: Mutex<CellState<V>>,
    state_changed: Condvar,
}

impl<V> ValueCell<V> {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(CellState::Empty),
            state_changed: Condvar::new(),
        }
    }

    /// Stores the computed value and wakes up all waiters.
    pub(crate) fn commit(&self, value: V) {
        let mut state = self.state.lock();
        debug_assert!(matches!(*state, CellState::Computing));
        *state = CellState::Ready(value);
        std::mem::drop(state);
        self.state_changed.notify_all();
    }

    /// Marks the computation as failed and wakes up all waiters.
    ///
    /// The cell must have been unlinked from its bucket before calling this, so
    /// that woken waiters do not find it again.
    pub(crate) fn abandon(&self) {
        let mut state = self.state.lock();
        debug_assert!(matches!(*state, CellState::Computing));
        *state = CellState::Abandoned;
        std::mem::drop(state);
        self.state_changed.notify_all();
    }
}

impl<V: Clone> ValueCell<V> {
    /// Tries to become the one caller that computes the value.
    ///
    /// Blocks while another caller is computing.
    pub(crate) fn claim(&self) -> Claim<V> {
        let mut state = self.state.lock();
        loop {
            match *state {
                CellState::Empty => {
                    *state = CellState::Computing;
                    return Claim::Won;
                }
                CellState::Computing => self.state_changed.wait(&mut state),
                CellState::Ready(ref v) => return Claim::Ready(v.clone()),
                CellState::Abandoned => return Claim::Abandoned,
            }
        }
    }

    /// Waits until the value is ready without ever claiming the computation.
    ///
    /// Returns `None` if the cell was abandoned.
    pub(crate) fn wait_ready(&self) -> Option<V> {
        let mut state = self.state.lock();
        loop {
            match *state {
                CellState::Empty | CellState::Computing => self.state_changed.wait(&mut state),
                CellState::Ready(ref v) => return Some(v.clone()),
                CellState::Abandoned => return None,
            }
        }
    }

    /// Returns the value if it is ready. Never blocks on a computation.
    pub(crate) fn peek(&self) -> Option<V> {
        match *self.state.lock() {
            CellState::Ready(ref v) => Some(v.clone()),
            _ => None,
        }
    }
}
