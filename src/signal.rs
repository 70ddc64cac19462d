use std::sync::atomic::{AtomicU64, Ordering};

/// A control event delivered from outside the worker thread into the event
/// loop.
///
/// Signals are control plumbing, not diagnostics: they carry no payload, and
/// several raises of the same signal may coalesce into a single dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Signal {
    /// Ask the hosted service to shut down.
    Terminate = 0,
    /// A user-defined control event.
    User1 = 1,
}

impl Signal {
    /// Number of defined signals. Mask bits at or above this index are never
    /// raised.
    pub(crate) const COUNT: u32 = 2;

    /// Maps a mask bit index back to a signal.
    pub const fn from_index(index: u32) -> Option<Self> {
        match index {
            0 => Some(Self::Terminate),
            1 => Some(Self::User1),
            _ => None,
        }
    }

    /// The signal's bit in the pending set.
    pub(crate) const fn bit(self) -> u64 {
        1 << self as u32
    }
}

/// Pending-signal set shared between signaling threads and the event loop.
///
/// Bit *i* means "signal *i* pending". Raises OR the bit in; the dispatcher
/// takes the whole set with a swap-to-zero, so a raise completed before the
/// swap is always observed by that dispatch.
#[derive(Debug, Default)]
pub(crate) struct SignalSet(AtomicU64);

impl SignalSet {
    pub(crate) fn raise(&self, signal: Signal) {
        self.0.fetch_or(signal.bit(), Ordering::AcqRel);
    }

    /// Atomically takes the pending set, leaving it empty.
    pub(crate) fn drain(&self) -> u64 {
        self.0.swap(0, Ordering::AcqRel)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn index_round_trip() {
        assert_eq!(Signal::from_index(0), Some(Signal::Terminate));
        assert_eq!(Signal::from_index(1), Some(Signal::User1));
        assert_eq!(Signal::from_index(2), None);
        assert_eq!(Signal::from_index(63), None);
    }

    #[test]
    fn raises_coalesce_until_drained() {
        let set = SignalSet::default();
        set.raise(Signal::User1);
        set.raise(Signal::User1);
        set.raise(Signal::Terminate);

        let pending = set.drain();
        assert_eq!(pending, Signal::Terminate.bit() | Signal::User1.bit());
        assert_eq!(set.drain(), 0);
    }
}
