//! One-second tick sources for the session engine.
//!
//! A [`Clock`] hands out subscriptions; every tick it produces is tagged with
//! the [`SubscriptionId`] it belongs to. The engine only honours ticks for its
//! single live subscription, so a tick that races a cancellation is dropped.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Handle for one clock subscription
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Source of once-per-second ticks
pub trait Clock {
    /// Start producing ticks for a new subscription
    fn subscribe(&mut self) -> SubscriptionId;

    /// Stop producing ticks for `id`; cancelling an unknown id is a no-op
    fn cancel(&mut self, id: SubscriptionId);
}

/// Deterministic clock: ticks are delivered by whoever drives the engine
#[derive(Debug, Default)]
pub struct ManualClock {
    next_id: u64,
    live: BTreeSet<SubscriptionId>,
    cancelled: Vec<SubscriptionId>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscriptions that have not been cancelled
    pub fn live(&self) -> impl Iterator<Item = SubscriptionId> + '_ {
        self.live.iter().copied()
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Every cancellation in call order
    pub fn cancelled(&self) -> &[SubscriptionId] {
        &self.cancelled
    }
}

impl Clock for ManualClock {
    fn subscribe(&mut self) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.live.insert(id);
        id
    }

    fn cancel(&mut self, id: SubscriptionId) {
        if self.live.remove(&id) {
            self.cancelled.push(id);
        }
    }
}

/// Wall-clock ticks from a background thread per subscription
///
/// The sink is called once per second with the subscription id until the
/// subscription is cancelled.
pub struct IntervalClock<F>
where
    F: Fn(SubscriptionId) + Send + Sync + 'static,
{
    sink: Arc<F>,
    period: Duration,
    next_id: u64,
    running: Vec<(SubscriptionId, Arc<AtomicBool>)>,
}

impl<F> IntervalClock<F>
where
    F: Fn(SubscriptionId) + Send + Sync + 'static,
{
    pub fn new(sink: F) -> Self {
        Self::with_period(sink, Duration::from_secs(1))
    }

    pub fn with_period(sink: F, period: Duration) -> Self {
        Self {
            sink: Arc::new(sink),
            period,
            next_id: 0,
            running: Vec::new(),
        }
    }
}

impl<F> Clock for IntervalClock<F>
where
    F: Fn(SubscriptionId) + Send + Sync + 'static,
{
    fn subscribe(&mut self) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        let stop = Arc::new(AtomicBool::new(false));

        let sink = Arc::clone(&self.sink);
        let flag = Arc::clone(&stop);
        let period = self.period;
        thread::spawn(move || loop {
            thread::sleep(period);
            if flag.load(Ordering::Acquire) {
                break;
            }
            sink(id);
        });

        self.running.push((id, stop));
        tracing::debug!("Clock subscription {} started", id.raw());
        id
    }

    fn cancel(&mut self, id: SubscriptionId) {
        if let Some(pos) = self.running.iter().position(|(sid, _)| *sid == id) {
            let (_, stop) = self.running.swap_remove(pos);
            stop.store(true, Ordering::Release);
            tracing::debug!("Clock subscription {} cancelled", id.raw());
        }
    }
}

impl<F> Drop for IntervalClock<F>
where
    F: Fn(SubscriptionId) + Send + Sync + 'static,
{
    fn drop(&mut self) {
        for (_, stop) in self.running.drain(..) {
            stop.store(true, Ordering::Release);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_manual_clock_tracks_live_subscriptions() {
        let mut clock = ManualClock::new();
        let a = clock.subscribe();
        let b = clock.subscribe();
        assert_ne!(a, b);
        assert_eq!(clock.live_count(), 2);

        clock.cancel(a);
        assert_eq!(clock.live().collect::<Vec<_>>(), vec![b]);
        assert_eq!(clock.cancelled(), &[a]);
    }

    #[test]
    fn test_manual_clock_cancel_unknown_is_noop() {
        let mut clock = ManualClock::new();
        clock.cancel(SubscriptionId::new(42));
        assert!(clock.cancelled().is_empty());
    }

    #[test]
    fn test_interval_clock_delivers_and_stops() {
        let (tx, rx) = mpsc::channel();
        let tx = std::sync::Mutex::new(tx);
        let mut clock = IntervalClock::with_period(
            move |id| {
                if let Ok(tx) = tx.lock() {
                    let _ = tx.send(id);
                }
            },
            Duration::from_millis(5),
        );

        let id = clock.subscribe();
        let first = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(first, id);

        clock.cancel(id);
        // Drain anything already in flight, then expect silence.
        thread::sleep(Duration::from_millis(30));
        while rx.try_recv().is_ok() {}
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
    }
}
