use std::{
    fmt,
    sync::{Arc, Mutex},
};

type Hook = Arc<dyn Fn() + Send + Sync>;

/// A thread-safe, replaceable callable used to wake the event loop.
///
/// The cell is armed by the worker before its loop runs and disarmed during
/// teardown; in between, the signaling thread fires it to interrupt the loop.
/// [`Interrupt::fire`] snapshots the hook under the lock and invokes the
/// snapshot after releasing it, so the hook itself may arm or disarm the cell
/// without deadlocking.
#[derive(Default)]
pub struct Interrupt {
    hook: Mutex<Option<Hook>>,
}

impl Interrupt {
    /// Installs `hook`, replacing any previous one.
    pub fn arm<F>(&self, hook: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        *self.lock() = Some(Arc::new(hook));
    }

    /// Removes the installed hook, if any.
    pub(crate) fn disarm(&self) {
        *self.lock() = None;
    }

    /// Reports whether a hook is installed.
    pub fn is_armed(&self) -> bool {
        self.lock().is_some()
    }

    /// Invokes the installed hook.
    ///
    /// ## Panics
    ///
    /// Panics if the cell is disarmed. Callers are expected to test
    /// [`Interrupt::is_armed`] first.
    pub fn fire(&self) {
        let hook = self.lock().clone();
        let hook = hook.expect("fired a disarmed interrupt");
        hook();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Hook>> {
        self.hook.lock().expect("interrupt mutex poisoned")
    }
}

impl fmt::Debug for Interrupt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interrupt")
            .field("armed", &self.is_armed())
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn fires_installed_hook() {
        let fired = Arc::new(AtomicUsize::new(0));
        let cell = Interrupt::default();
        assert!(!cell.is_armed());

        let counter = fired.clone();
        cell.arm(move || {
            counter.fetch_add(1, Ordering::Relaxed);
        });
        assert!(cell.is_armed());

        cell.fire();
        cell.fire();
        assert_eq!(fired.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn arm_replaces_previous_hook() {
        let fired = Arc::new(AtomicUsize::new(0));
        let cell = Interrupt::default();

        cell.arm(|| panic!("replaced hook must not run"));
        let counter = fired.clone();
        cell.arm(move || {
            counter.fetch_add(1, Ordering::Relaxed);
        });

        cell.fire();
        assert_eq!(fired.load(Ordering::Relaxed), 1);
    }

    // The hook runs outside the cell's lock, so it may mutate the cell.
    #[test]
    fn hook_may_disarm_the_cell() {
        let cell = Arc::new(Interrupt::default());

        let inner = Arc::clone(&cell);
        cell.arm(move || inner.disarm());

        cell.fire();
        assert!(!cell.is_armed());
    }

    #[test]
    #[should_panic(expected = "fired a disarmed interrupt")]
    fn firing_disarmed_cell_panics() {
        Interrupt::default().fire();
    }
}
