//! # Keyed Exclusive Locks
//!
//! SQLite has no `SELECT ... FOR UPDATE`. Recorders take in-process locks on
//! the rows they are about to modify before opening their transaction, so
//! two writers touching the same ledger row or invoice series run one after
//! the other instead of racing.
//!
//! ## Acquisition Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  LockKey ordering (derived Ord, variant order first):                  │
//! │                                                                         │
//! │   Purchase(id)                                                          │
//! │     < InvoiceSeries { section_id, sale_date }                           │
//! │       < StockRow { product_id, location_id }   (product, then location)│
//! │                                                                         │
//! │  acquire() sorts and de-duplicates its keys, then locks them in order. │
//! │  A caller that locks twice (purchase update) only ever moves forward   │
//! │  in this order, so no two callers can wait on each other in a cycle.   │
//! │                                                                         │
//! │  Sale on (P2, Main) + (P1, Main):                                       │
//! │      InvoiceSeries(S, day) → StockRow(P1, Main) → StockRow(P2, Main)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Guards are held in a [`LockSet`] and released when it drops, after the
//! transaction has committed or rolled back.

use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

/// A lockable resource.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LockKey {
    /// The item set of one purchase.
    Purchase(String),
    /// Invoice numbering for one section on one day.
    InvoiceSeries {
        section_id: String,
        sale_date: NaiveDate,
    },
    /// One ledger row.
    StockRow {
        product_id: String,
        location_id: String,
    },
}

impl LockKey {
    pub fn stock_row(product_id: impl Into<String>, location_id: impl Into<String>) -> Self {
        LockKey::StockRow {
            product_id: product_id.into(),
            location_id: location_id.into(),
        }
    }
}

/// Guards for a set of keys, released on drop.
#[derive(Debug, Default)]
pub struct LockSet {
    keys: Vec<LockKey>,
    guards: Vec<OwnedMutexGuard<()>>,
}

impl LockSet {
    /// Keys held, in acquisition order.
    pub fn keys(&self) -> &[LockKey] {
        &self.keys
    }

    pub fn holds(&self, key: &LockKey) -> bool {
        self.keys.contains(key)
    }

    /// Moves the guards of `later` into this set.
    pub fn extend(&mut self, later: LockSet) {
        self.keys.extend(later.keys);
        self.guards.extend(later.guards);
    }
}

/// Hands out one async mutex per key.
///
/// Slots nobody holds or waits on are dropped the next time a slot is
/// looked up, so the map only grows with contention, not with history.
#[derive(Debug, Default)]
pub struct LockManager {
    slots: Mutex<HashMap<LockKey, Arc<AsyncMutex<()>>>>,
}

impl LockManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: &LockKey) -> Arc<AsyncMutex<()>> {
        // A panic while holding this map cannot leave it inconsistent.
        let mut slots = self.slots.lock().unwrap_or_else(|p| p.into_inner());
        slots.retain(|_, slot| Arc::strong_count(slot) > 1);
        slots
            .entry(key.clone())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Locks every key, in global order. Waits until all are held.
    pub async fn acquire<I>(&self, keys: I) -> LockSet
    where
        I: IntoIterator<Item = LockKey>,
    {
        let ordered: BTreeSet<LockKey> = keys.into_iter().collect();
        let mut set = LockSet::default();

        for key in ordered {
            let guard = self.slot(&key).lock_owned().await;
            debug!(?key, "Lock acquired");
            set.keys.push(key);
            set.guards.push(guard);
        }

        set
    }

    /// Runs `f` while holding every key.
    pub async fn with_exclusive_locks<I, F, Fut, T>(&self, keys: I, f: F) -> T
    where
        I: IntoIterator<Item = LockKey>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _held = self.acquire(keys).await;
        f().await
    }

    /// Number of live slots (held or awaited).
    pub fn active_slots(&self) -> usize {
        let slots = self.slots.lock().unwrap_or_else(|p| p.into_inner());
        slots
            .values()
            .filter(|slot| Arc::strong_count(slot) > 1)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 4).unwrap()
    }

    #[test]
    fn test_key_order() {
        let purchase = LockKey::Purchase("zzz".into());
        let series = LockKey::InvoiceSeries {
            section_id: "aaa".into(),
            sale_date: day(),
        };
        let row_a = LockKey::stock_row("P1", "L2");
        let row_b = LockKey::stock_row("P2", "L1");

        assert!(purchase < series);
        assert!(series < row_a);
        assert!(row_a < row_b);
    }

    #[tokio::test]
    async fn test_acquire_sorts_and_dedups() {
        let locks = LockManager::new();
        let set = locks
            .acquire(vec![
                LockKey::stock_row("P2", "L1"),
                LockKey::stock_row("P1", "L1"),
                LockKey::stock_row("P2", "L1"),
            ])
            .await;

        assert_eq!(
            set.keys(),
            &[LockKey::stock_row("P1", "L1"), LockKey::stock_row("P2", "L1")]
        );
        assert_eq!(locks.active_slots(), 2);

        drop(set);
        assert_eq!(locks.active_slots(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_same_key_is_exclusive() {
        let locks = Arc::new(LockManager::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let inside = inside.clone();
            let max_inside = max_inside.clone();
            handles.push(tokio::spawn(async move {
                locks
                    .with_exclusive_locks(vec![LockKey::stock_row("P1", "L1")], || async {
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        max_inside.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(5)).await;
                        inside.fetch_sub(1, Ordering::SeqCst);
                    })
                    .await;
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_opposite_request_order_does_not_deadlock() {
        let locks = Arc::new(LockManager::new());

        let mut handles = Vec::new();
        for i in 0..20 {
            let locks = locks.clone();
            handles.push(tokio::spawn(async move {
                let keys = if i % 2 == 0 {
                    vec![LockKey::stock_row("P1", "L1"), LockKey::stock_row("P2", "L1")]
                } else {
                    vec![LockKey::stock_row("P2", "L1"), LockKey::stock_row("P1", "L1")]
                };
                let _set = locks.acquire(keys).await;
                tokio::task::yield_now().await;
            }));
        }

        let all = async {
            for handle in handles {
                handle.await.unwrap();
            }
        };
        tokio::time::timeout(Duration::from_secs(5), all)
            .await
            .expect("lock ordering deadlocked");
    }
}
