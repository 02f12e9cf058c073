//! Time sources for the worker.
//!
//! Every mutation is stamped with the clock's reading at the moment the
//! worker handles it. Tests drive a [`ManualClock`] to cross round and reveal
//! deadlines without sleeping.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use game_core::Timestamp;

pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall-clock Unix seconds.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or_default();
        Timestamp::from_secs(secs)
    }
}

/// Clock that only moves when told to. Clones share the same reading.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    secs: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            secs: Arc::new(AtomicU64::new(start.as_secs())),
        }
    }

    pub fn set(&self, at: Timestamp) {
        self.secs.store(at.as_secs(), Ordering::SeqCst);
    }

    pub fn advance(&self, secs: u64) -> Timestamp {
        let previous = self.secs.fetch_add(secs, Ordering::SeqCst);
        Timestamp::from_secs(previous.saturating_add(secs))
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_secs(self.secs.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_is_shared_between_clones() {
        let clock = ManualClock::new(Timestamp(100));
        let view = clock.clone();

        assert_eq!(clock.advance(50), Timestamp(150));
        assert_eq!(view.now(), Timestamp(150));

        view.set(Timestamp(10));
        assert_eq!(clock.now(), Timestamp(10));
    }

    #[test]
    fn system_clock_is_past_2020() {
        assert!(SystemClock.now() > Timestamp(1_577_836_800));
    }
}
