use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicU64, Ordering},
};

/// Activity of the orchestrator, shared with the idle watchdog.
///
/// Written only through [`BusyFlag::enter`] (by the orchestrator), read by the watchdog.
/// Besides the busy bit it counts completed deliveries, so a reader can tell whether any
/// task was handled between two observations even if it never saw the busy bit set.
#[derive(Clone, Default)]
pub struct BusyFlag {
    inner: Arc<BusyState>,
}

#[derive(Default)]
struct BusyState {
    busy: AtomicBool,
    handled: AtomicU64,
}

impl BusyFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the orchestrator busy until the returned guard is dropped.
    #[must_use = "the orchestrator is idle again as soon as the guard is dropped"]
    pub fn enter(&self) -> BusyGuard {
        self.inner.busy.store(true, Ordering::Release);
        BusyGuard {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Whether a task is being handled right now.
    pub fn is_busy(&self) -> bool {
        self.inner.busy.load(Ordering::Acquire)
    }

    /// Number of deliveries handled so far.
    pub fn handled(&self) -> u64 {
        self.inner.handled.load(Ordering::Acquire)
    }
}

/// Keeps the orchestrator marked busy; counts one handled delivery on drop.
pub struct BusyGuard {
    inner: Arc<BusyState>,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.inner.handled.fetch_add(1, Ordering::AcqRel);
        self.inner.busy.store(false, Ordering::Release);
    }
}
