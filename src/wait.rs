//! A counter of bars which have yet to finish.

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;

/// Counts outstanding bars so that [`crate::Progress::stop`] can block until
/// every one of them has reported completion.
#[derive(Default)]
pub(crate) struct Pending {
    state: Mutex<State>,
    cond: Condvar,
}

#[derive(Default)]
struct State {
    count: usize,
    /// Set once the coordinator has gone away, after which nobody can finish.
    closed: bool,
}

impl Pending {
    pub(crate) fn add(&self) {
        self.state.lock().count += 1;
    }

    pub(crate) fn done(&self) {
        let mut state = self.state.lock();
        state.count = state.count.saturating_sub(1);
        if state.count == 0 {
            self.cond.notify_all();
        }
    }

    /// Release all current and future waiters.
    pub(crate) fn close(&self) {
        self.state.lock().closed = true;
        self.cond.notify_all();
    }

    pub(crate) fn count(&self) -> usize {
        self.state.lock().count
    }

    /// A guard which closes the counter when dropped, unwinding included.
    pub(crate) fn closer(self: &Arc<Self>) -> Closer {
        Closer(Arc::clone(self))
    }

    /// Block until the count reaches zero, or the counter is closed.
    pub(crate) fn wait(&self) {
        let mut state = self.state.lock();
        while state.count > 0 && !state.closed {
            self.cond.wait(&mut state);
        }
    }
}

/// Closes its [`Pending`] on drop. See [`Pending::closer`].
pub(crate) struct Closer(Arc<Pending>);

impl Drop for Closer {
    fn drop(&mut self) {
        self.0.close();
    }
}
