use std::sync::atomic::{AtomicUsize, Ordering};

/// Live objects plus outstanding `LockServer(TRUE)` calls for the whole module.
pub static SERVER_LOCKS: LoadCounter = LoadCounter::new();

/// Process-wide count deciding whether the hosting module may be unloaded.
#[derive(Debug, Default)]
pub struct LoadCounter(AtomicUsize);

impl LoadCounter {
    pub const fn new() -> Self {
        Self(AtomicUsize::new(0))
    }

    pub fn is_zero(&self) -> bool {
        self.get() == 0
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    /// Returns the count after incrementing.
    pub fn increment(&self) -> usize {
        let old_value = self.0.fetch_add(1, Ordering::SeqCst);
        if old_value >= usize::MAX / 2 {
            panic!("load count overflow (positive)");
        }
        old_value + 1
    }

    /// Returns the count after decrementing. Never goes below zero.
    pub fn decrement(&self) -> usize {
        match self
            .0
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        {
            Ok(old_value) => old_value - 1,
            Err(_) => {
                log::error!("Unbalanced release of the module load count");
                0
            }
        }
    }
}
