// src/cache/slot.rs
use arc_swap::ArcSwapOption;
use std::sync::{Arc, Weak};
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, Instant, MissedTickBehavior};
use tracing::debug;

struct Entry<T> {
    value: Arc<T>,
    expires_at: Instant,
}

/// A single cached value with a time-to-live.
///
/// Reads never block. An expired value is reported as absent even while it
/// is still physically held; `sweep` releases it.
pub struct TtlSlot<T> {
    entry: ArcSwapOption<Entry<T>>,
    ttl: Duration,
}

impl<T: Send + Sync + 'static> TtlSlot<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entry: ArcSwapOption::empty(),
            ttl,
        }
    }

    /// Returns the stored value if it has not expired.
    pub fn get(&self) -> Option<Arc<T>> {
        let guard = self.entry.load();
        match &*guard {
            Some(entry) if Instant::now() < entry.expires_at => Some(entry.value.clone()),
            _ => None,
        }
    }

    /// Replaces the slot contents and restarts the time-to-live.
    pub fn set(&self, value: T) -> Arc<T> {
        let value = Arc::new(value);
        self.entry.store(Some(Arc::new(Entry {
            value: value.clone(),
            expires_at: Instant::now() + self.ttl,
        })));
        value
    }

    /// Drops an expired entry. Returns whether anything was removed.
    pub fn sweep(&self) -> bool {
        let now = Instant::now();
        let previous = self.entry.rcu(|current| match current {
            Some(entry) if now >= entry.expires_at => None,
            other => other.clone(),
        });
        matches!(previous, Some(entry) if now >= entry.expires_at)
    }

    /// Whether the slot still physically holds a value, expired or not.
    pub fn is_occupied(&self) -> bool {
        self.entry.load().is_some()
    }

    /// Sweeps on `every` for as long as the slot is alive.
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let slot: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match slot.upgrade() {
                    Some(slot) => {
                        if slot.sweep() {
                            debug!("swept expired cache entry");
                        }
                    }
                    None => break,
                }
            }
        })
    }
}
