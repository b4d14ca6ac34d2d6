//! A bounded, identity-deduplicating min-priority-queue.
//!
//! Mirrors the source's heap-backed `PriorityQueue`, but inverted: here a
//! *lower* priority value is scheduled first (I2), so entries are wrapped in
//! `Reverse` before going into the stdlib's max-heap `BinaryHeap`. Identity
//! dedup (I1) and monotonic-sequence FIFO tie-break (S9) are carried over
//! unchanged from the source's mechanism.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

use super::error::QueueError;
use crate::domain::HasIdentity;

/// A heap slot: priority plus a monotonic sequence number that breaks ties
/// in FIFO order, and a generation counter so stale slots (superseded by a
/// later `update`) can be recognised and skipped lazily on pop.
struct HeapEntry<T> {
    priority: i64,
    sequence: u64,
    identity: String,
    generation: u64,
    item: T,
}

impl<T> PartialEq for HeapEntry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.sequence == other.sequence
    }
}
impl<T> Eq for HeapEntry<T> {}

impl<T> PartialOrd for HeapEntry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for HeapEntry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.priority, self.sequence).cmp(&(other.priority, other.sequence))
    }
}

/// Bookkeeping for the identity index: the generation currently considered
/// live, and the priority it was last pushed/updated at.
struct LiveEntry {
    generation: u64,
    priority: i64,
}

struct Inner<T> {
    heap: BinaryHeap<Reverse<HeapEntry<T>>>,
    live: HashMap<String, LiveEntry>,
    sequence: u64,
}

/// A bounded min-priority-queue, deduplicated on `T::identity()`.
///
/// Pushing an item whose identity is already present updates its priority
/// in place (S9) rather than creating a second entry (I1), provided the
/// queue's `allow_priority_updates` policy permits it (§4.1) — see `push`
/// and `update`. `maxsize == 0` means unbounded.
pub struct PriorityQueue<T: HasIdentity> {
    inner: Mutex<Inner<T>>,
    maxsize: usize,
    next_generation: AtomicU64,
    allow_priority_updates: bool,
}

impl<T: HasIdentity + Clone> PriorityQueue<T> {
    /// Equivalent to `with_policy(maxsize, true)`: priority updates via
    /// `push` are allowed, matching the source's default behaviour.
    pub fn new(maxsize: usize) -> Self {
        Self::with_policy(maxsize, true)
    }

    /// `allow_priority_updates = false` makes `push` reject a
    /// differing-priority push of an already-queued identity with
    /// `NotAllowed` (§4.1); `update` always bypasses this policy.
    pub fn with_policy(maxsize: usize, allow_priority_updates: bool) -> Self {
        Self {
            inner: Mutex::new(Inner {
                heap: BinaryHeap::new(),
                live: HashMap::new(),
                sequence: 0,
            }),
            maxsize,
            next_generation: AtomicU64::new(0),
            allow_priority_updates,
        }
    }

    pub fn maxsize(&self) -> usize {
        self.maxsize
    }

    /// Number of live (non-superseded) entries.
    pub fn len(&self) -> usize {
        self.inner.lock().live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Push `item` at `priority`. If an entry with the same identity is
    /// already queued at the *same* priority, this is a silent no-op
    /// (§4.1's idempotent case). If queued at a *different* priority, the
    /// old heap slot is marked stale and a fresh one takes over (S9) —
    /// unless this queue's `allow_priority_updates` policy is `false`, in
    /// which case the push fails with `NotAllowed` (§4.1). `pop` skips
    /// stale slots lazily.
    pub fn push(&self, priority: i64, item: T) -> Result<(), QueueError> {
        self.push_with_policy(priority, item, self.allow_priority_updates)
    }

    /// `update(p_item)`: equivalent to `push` with
    /// `allow_priority_updates=true` regardless of this queue's own
    /// policy (§4.1) — the explicit "I intend to re-prioritise" entry
    /// point.
    pub fn update(&self, priority: i64, item: T) -> Result<(), QueueError> {
        self.push_with_policy(priority, item, true)
    }

    fn push_with_policy(&self, priority: i64, item: T, allow_update: bool) -> Result<(), QueueError> {
        let identity = item.identity();
        let mut inner = self.inner.lock();

        if let Some(live) = inner.live.get(&identity) {
            if live.priority == priority {
                return Ok(());
            }
            if !allow_update {
                return Err(QueueError::NotAllowed);
            }
        } else if self.maxsize != 0 && inner.live.len() >= self.maxsize {
            return Err(QueueError::QueueFull { maxsize: self.maxsize });
        }

        let generation = self.next_generation.fetch_add(1, AtomicOrdering::Relaxed);
        let sequence = inner.sequence;
        inner.sequence += 1;

        inner.live.insert(identity.clone(), LiveEntry { generation, priority });
        inner.heap.push(Reverse(HeapEntry {
            priority,
            sequence,
            identity,
            generation,
            item,
        }));
        Ok(())
    }

    /// Pop the lowest-priority live entry, discarding any stale slots ahead
    /// of it in the heap (entries superseded by a later `push`/`update`).
    pub fn pop(&self) -> Option<T> {
        let mut inner = self.inner.lock();
        loop {
            let Reverse(entry) = inner.heap.pop()?;
            match inner.live.get(&entry.identity) {
                Some(live) if live.generation == entry.generation => {
                    inner.live.remove(&entry.identity);
                    return Some(entry.item);
                }
                _ => continue, // stale slot, superseded or already removed
            }
        }
    }

    /// Poll for an item up to `timeout`, returning `None` if it elapses
    /// first. The source blocks on a condition variable; without one here,
    /// this approximates it with a short polling interval.
    pub async fn pop_wait(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(item) = self.pop() {
                return Some(item);
            }
            if Instant::now() >= deadline {
                return None;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
    }

    /// Remove a live entry by identity without returning it. No-op if absent.
    pub fn remove_identity(&self, identity: &str) {
        self.inner.lock().live.remove(identity);
    }

    /// Current priority of a live entry, if present.
    pub fn peek_priority(&self, identity: &str) -> Option<i64> {
        self.inner.lock().live.get(identity).map(|e| e.priority)
    }

    /// True if an entry with this identity is currently queued.
    pub fn contains(&self, identity: &str) -> bool {
        self.inner.lock().live.contains_key(identity)
    }
}

impl<T: HasIdentity + Clone> PriorityQueue<T> {
    /// A snapshot of live entries as `(priority, item)` pairs, ordered by
    /// priority ascending. Does not mutate the queue (P4: read-only).
    pub fn snapshot(&self) -> Vec<(i64, T)>
    where
        T: Clone,
    {
        let inner = self.inner.lock();
        let mut out: Vec<(i64, T)> = inner
            .heap
            .iter()
            .filter_map(|Reverse(entry)| {
                let live = inner.live.get(&entry.identity)?;
                if live.generation == entry.generation {
                    Some((entry.priority, entry.item.clone()))
                } else {
                    None
                }
            })
            .collect();
        out.sort_by_key(|(priority, _)| *priority);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::time::Duration as StdDuration;

    #[derive(Clone, Debug, PartialEq, Eq)]
    struct Item {
        id: &'static str,
    }

    impl HasIdentity for Item {
        fn identity(&self) -> String {
            self.id.to_string()
        }
    }

    #[test]
    fn test_push_pop_orders_by_ascending_priority() {
        let q: PriorityQueue<Item> = PriorityQueue::new(0);
        q.push(5, Item { id: "b" }).unwrap();
        q.push(1, Item { id: "a" }).unwrap();
        q.push(3, Item { id: "c" }).unwrap();

        assert_eq!(q.pop().unwrap().id, "a");
        assert_eq!(q.pop().unwrap().id, "c");
        assert_eq!(q.pop().unwrap().id, "b");
        assert!(q.pop().is_none());
    }

    #[test]
    fn test_equal_priority_is_fifo() {
        let q: PriorityQueue<Item> = PriorityQueue::new(0);
        q.push(1, Item { id: "first" }).unwrap();
        q.push(1, Item { id: "second" }).unwrap();
        q.push(1, Item { id: "third" }).unwrap();

        assert_eq!(q.pop().unwrap().id, "first");
        assert_eq!(q.pop().unwrap().id, "second");
        assert_eq!(q.pop().unwrap().id, "third");
    }

    #[test]
    fn test_duplicate_identity_updates_priority_in_place() {
        let q: PriorityQueue<Item> = PriorityQueue::new(0);
        q.push(10, Item { id: "a" }).unwrap();
        q.push(1, Item { id: "a" }).unwrap();

        assert_eq!(q.len(), 1);
        assert_eq!(q.pop().unwrap().id, "a");
        assert!(q.pop().is_none());
    }

    #[test]
    fn test_identical_repush_is_idempotent_noop() {
        let q: PriorityQueue<Item> = PriorityQueue::new(0);
        q.push(5, Item { id: "a" }).unwrap();
        q.push(5, Item { id: "a" }).unwrap();

        assert_eq!(q.len(), 1);
        assert_eq!(q.pop().unwrap().id, "a");
        assert!(q.pop().is_none());
    }

    #[test]
    fn test_push_with_updates_disabled_rejects_differing_priority() {
        let q: PriorityQueue<Item> = PriorityQueue::with_policy(0, false);
        q.push(10, Item { id: "a" }).unwrap();

        let err = q.push(1, Item { id: "a" }).unwrap_err();
        assert!(matches!(err, QueueError::NotAllowed));

        // The original entry (priority 10) is untouched: a lower-priority
        // "b" still pops first.
        q.push(2, Item { id: "b" }).unwrap();
        assert_eq!(q.len(), 2);
        assert_eq!(q.pop().unwrap().id, "b");
        assert_eq!(q.pop().unwrap().id, "a");
    }

    #[test]
    fn test_push_with_updates_disabled_still_allows_identical_repush() {
        let q: PriorityQueue<Item> = PriorityQueue::with_policy(0, false);
        q.push(10, Item { id: "a" }).unwrap();
        q.push(10, Item { id: "a" }).unwrap();

        assert_eq!(q.len(), 1);
    }

    #[test]
    fn test_update_bypasses_disabled_policy() {
        let q: PriorityQueue<Item> = PriorityQueue::with_policy(0, false);
        q.push(10, Item { id: "a" }).unwrap();
        q.update(1, Item { id: "a" }).unwrap();
        q.push(5, Item { id: "b" }).unwrap();

        assert_eq!(q.len(), 2);
        // "a" was re-prioritised to 1 via `update`, so it now pops first.
        assert_eq!(q.pop().unwrap().id, "a");
        assert_eq!(q.pop().unwrap().id, "b");
    }

    #[test]
    fn test_maxsize_zero_is_unbounded() {
        let q: PriorityQueue<Item> = PriorityQueue::new(0);
        for i in 0..100 {
            q.push(i, Item { id: Box::leak(format!("item-{i}").into_boxed_str()) })
                .unwrap();
        }
        assert_eq!(q.len(), 100);
    }

    #[test]
    fn test_bounded_queue_rejects_when_full() {
        let q: PriorityQueue<Item> = PriorityQueue::new(2);
        q.push(1, Item { id: "a" }).unwrap();
        q.push(2, Item { id: "b" }).unwrap();

        let err = q.push(3, Item { id: "c" }).unwrap_err();
        assert!(matches!(err, QueueError::QueueFull { maxsize: 2 }));
    }

    #[test]
    fn test_bounded_queue_allows_update_of_existing_identity_when_full() {
        let q: PriorityQueue<Item> = PriorityQueue::new(2);
        q.push(1, Item { id: "a" }).unwrap();
        q.push(2, Item { id: "b" }).unwrap();
        // Not a new identity, so this must not trip QueueFull.
        q.push(0, Item { id: "a" }).unwrap();

        assert_eq!(q.len(), 2);
        assert_eq!(q.pop().unwrap().id, "a");
    }

    #[test]
    fn test_remove_identity() {
        let q: PriorityQueue<Item> = PriorityQueue::new(0);
        q.push(1, Item { id: "a" }).unwrap();
        q.push(2, Item { id: "b" }).unwrap();

        q.remove_identity("a");
        assert_eq!(q.len(), 1);
        assert_eq!(q.pop().unwrap().id, "b");
    }

    #[test]
    fn test_snapshot_is_read_only_and_ordered() {
        let q: PriorityQueue<Item> = PriorityQueue::new(0);
        q.push(5, Item { id: "b" }).unwrap();
        q.push(1, Item { id: "a" }).unwrap();

        let snap = q.snapshot();
        assert_eq!(snap.len(), 2);
        assert_eq!(snap[0].0, 1);
        assert_eq!(snap[1].0, 5);
        // Still there after snapshot.
        assert_eq!(q.len(), 2);
    }

    #[tokio::test]
    async fn test_pop_wait_returns_immediately_when_available() {
        let q: PriorityQueue<Item> = PriorityQueue::new(0);
        q.push(1, Item { id: "a" }).unwrap();

        let item = q.pop_wait(StdDuration::from_secs(1)).await;
        assert_eq!(item.unwrap().id, "a");
    }

    #[tokio::test]
    async fn test_pop_wait_times_out_on_empty_queue() {
        let q: PriorityQueue<Item> = PriorityQueue::new(0);
        let item = q.pop_wait(StdDuration::from_millis(50)).await;
        assert!(item.is_none());
    }

    #[tokio::test]
    async fn test_pop_wait_unblocks_on_late_push() {
        use std::sync::Arc;

        let q: Arc<PriorityQueue<Item>> = Arc::new(PriorityQueue::new(0));
        let q2 = q.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(StdDuration::from_millis(30)).await;
            q2.push(1, Item { id: "late" }).unwrap();
        });

        let item = q.pop_wait(StdDuration::from_secs(1)).await;
        assert_eq!(item.unwrap().id, "late");
        handle.await.unwrap();
    }

    // A push target that carries its own priority, so property tests can
    // verify the priority a `pop` actually returned (§8 P1-P3).
    #[derive(Clone, Debug)]
    struct RankedItem {
        identity: String,
        priority: i64,
    }

    impl HasIdentity for RankedItem {
        fn identity(&self) -> String {
            self.identity.clone()
        }
    }

    proptest! {
        /// P1: after any sequence of pushes, at most one live entry remains
        /// per distinct identity — logical length equals the number of
        /// distinct identities pushed.
        #[test]
        fn prop_dedup_by_identity(
            pushes in prop::collection::vec((0u8..6, -50i64..50i64), 0..200)
        ) {
            let q: PriorityQueue<RankedItem> = PriorityQueue::new(0);
            for (id, priority) in &pushes {
                let identity = format!("item-{id}");
                q.push(*priority, RankedItem { identity, priority: *priority }).unwrap();
            }
            let distinct: std::collections::HashSet<u8> = pushes.iter().map(|(id, _)| *id).collect();
            prop_assert_eq!(q.len(), distinct.len());
        }

        /// P2/P3: the pop sequence is non-decreasing in priority and the
        /// logical size never exceeds `maxsize`, across an arbitrary
        /// interleaving of pushes (some rejected by `QueueFull`).
        #[test]
        fn prop_pop_order_non_decreasing_and_bounded(
            pushes in prop::collection::vec((0u16..40, -50i64..50i64), 0..150),
            maxsize in 1usize..20,
        ) {
            let q: PriorityQueue<RankedItem> = PriorityQueue::new(maxsize);
            for (id, priority) in &pushes {
                let identity = format!("item-{id}");
                let _ = q.push(*priority, RankedItem { identity, priority: *priority });
                prop_assert!(q.len() <= maxsize);
            }

            let mut last_priority = i64::MIN;
            while let Some(item) = q.pop() {
                prop_assert!(item.priority >= last_priority);
                last_priority = item.priority;
            }
        }
    }
}
