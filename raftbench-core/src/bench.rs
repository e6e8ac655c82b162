//! Load generation.
//!
//! Operation plans are built up front as immutable descriptor lists, then
//! dispatched either sequentially (throughput baseline) or through a
//! semaphore-bounded pool of spawned workers. Outcomes land in a pre-sized
//! slot buffer indexed by operation index, so workers never contend on a
//! shared append structure and the result always has exactly one entry per
//! planned operation - a failed request, a request that timed out, and even
//! a worker task that died all count as unsuccessful outcomes rather than
//! errors.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::kv::KvStore;

/// The two data-path operations a benchmark can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Put,
    Get,
}

/// One planned operation. Immutable once the plan is built.
#[derive(Debug, Clone)]
pub struct OpSpec {
    pub index: usize,
    pub kind: OpKind,
    pub key: String,
    /// `Some` for writes, `None` for reads.
    pub value: Option<String>,
}

/// Success/failure and timing of one dispatched operation. Owned by the
/// worker that produced it until collected into the run's slot buffer.
#[derive(Debug, Clone)]
pub struct OperationOutcome {
    pub index: usize,
    pub kind: OpKind,
    pub success: bool,
    pub started: Instant,
    pub finished: Instant,
}

impl OperationOutcome {
    pub fn latency(&self) -> Duration {
        self.finished.duration_since(self.started)
    }

    fn failed(index: usize, kind: OpKind) -> Self {
        let now = Instant::now();
        Self { index, kind, success: false, started: now, finished: now }
    }
}

/// `count` writes with unique payloads under `{prefix}_{i}` keys.
pub fn put_plan_prefixed(prefix: &str, count: usize) -> Vec<OpSpec> {
    (0..count)
        .map(|i| OpSpec {
            index: i,
            kind: OpKind::Put,
            key: format!("{}_{}", prefix, i),
            value: Some(format!("value_{}", Uuid::new_v4())),
        })
        .collect()
}

/// The standard write suite: `bench_key_{i}`.
pub fn put_plan(count: usize) -> Vec<OpSpec> {
    put_plan_prefixed("bench_key", count)
}

/// Reads of the keys [`put_plan`] writes. Seed them first (see
/// [`LoadGenerator::seed_keys`]) so the suite measures lookups, not misses.
pub fn get_plan(count: usize) -> Vec<OpSpec> {
    (0..count)
        .map(|i| OpSpec {
            index: i,
            kind: OpKind::Get,
            key: format!("bench_key_{}", i),
            value: None,
        })
        .collect()
}

/// Interleaved read-after-write: even slots write `mixed_key_{i}`, odd
/// slots read back the key written in the immediately preceding slot. This
/// exercises the leader's current state, not cross-node consistency.
pub fn mixed_plan(count: usize) -> Vec<OpSpec> {
    (0..count)
        .map(|i| {
            if i % 2 == 0 {
                OpSpec {
                    index: i,
                    kind: OpKind::Put,
                    key: format!("mixed_key_{}", i),
                    value: Some(format!("value_{}", i)),
                }
            } else {
                OpSpec { index: i, kind: OpKind::Get, key: format!("mixed_key_{}", i - 1), value: None }
            }
        })
        .collect()
}

async fn execute(store: &dyn KvStore, spec: &OpSpec) -> OperationOutcome {
    let started = Instant::now();
    let success = match spec.kind {
        OpKind::Put => {
            let value = spec.value.as_deref().unwrap_or_default();
            store.put(&spec.key, value).await.is_ok()
        }
        // a read that comes back "not found" did not do its job
        OpKind::Get => matches!(store.get(&spec.key).await, Ok((_, true))),
    };
    OperationOutcome { index: spec.index, kind: spec.kind, success, started, finished: Instant::now() }
}

/// Dispatches a plan against one [`KvStore`] capability.
pub struct LoadGenerator {
    store: Arc<dyn KvStore>,
}

impl LoadGenerator {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Best-effort warmup writes, then a short settle for commits to land
    /// before anything is measured.
    pub async fn warmup(&self, count: usize) {
        for i in 0..count {
            let key = format!("warmup_{}", i);
            let value = format!("warmup_value_{}", i);
            if let Err(err) = self.store.put(&key, &value).await {
                log::debug!("warmup write {} failed: {}", i, err);
            }
        }
        if count > 0 {
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
    }

    /// Writes every key a read plan will look up, then settles briefly.
    pub async fn seed_keys(&self, plan: &[OpSpec]) {
        let mut seeded = 0;
        for spec in plan.iter().filter(|s| s.kind == OpKind::Get) {
            let value = format!("value_{}", spec.index);
            if let Err(err) = self.store.put(&spec.key, &value).await {
                log::debug!("seeding {} failed: {}", spec.key, err);
            } else {
                seeded += 1;
            }
        }
        if seeded > 0 {
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
    }

    /// Baseline mode: one operation at a time on the calling task.
    pub async fn run_sequential(&self, plan: &[OpSpec]) -> Vec<OperationOutcome> {
        let mut outcomes = Vec::with_capacity(plan.len());
        for spec in plan {
            outcomes.push(execute(self.store.as_ref(), spec).await);
        }
        outcomes
    }

    /// Bounded-pool mode: at most `concurrency` operations in flight at
    /// once, no ordering guarantee between workers. The returned vector is
    /// ordered by operation index and always has exactly `plan.len()`
    /// entries.
    pub async fn run_concurrent(
        &self,
        plan: &[OpSpec],
        concurrency: usize,
    ) -> Vec<OperationOutcome> {
        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
        let mut handles = Vec::with_capacity(plan.len());

        for spec in plan.iter().cloned() {
            let permit = match Arc::clone(&semaphore).acquire_owned().await {
                Ok(permit) => permit,
                // closed semaphore: nothing more can be dispatched
                Err(_) => break,
            };
            let store = Arc::clone(&self.store);
            handles.push(tokio::spawn(async move {
                let _permit = permit;
                execute(store.as_ref(), &spec).await
            }));
        }

        let mut slots: Vec<Option<OperationOutcome>> = vec![None; plan.len()];
        for joined in join_all(handles).await {
            match joined {
                Ok(outcome) => {
                    let index = outcome.index;
                    slots[index] = Some(outcome);
                }
                Err(err) => log::warn!("benchmark worker died: {}", err),
            }
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(i, slot)| slot.unwrap_or_else(|| OperationOutcome::failed(i, plan[i].kind)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::kv::KvError;

    /// In-memory store with an optional failure switch.
    #[derive(Default)]
    struct FakeStore {
        data: Mutex<std::collections::HashMap<String, String>>,
        fail_all: bool,
        puts: AtomicU32,
        gets: AtomicU32,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl FakeStore {
        fn failing() -> Self {
            Self { fail_all: true, ..Default::default() }
        }

        fn enter(&self) {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        }

        fn leave(&self) {
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl KvStore for FakeStore {
        async fn put(&self, key: &str, value: &str) -> Result<(), KvError> {
            self.enter();
            self.puts.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            self.leave();
            if self.fail_all {
                return Err(KvError::Status(500));
            }
            self.data.lock().unwrap().insert(key.to_string(), value.to_string());
            Ok(())
        }

        async fn get(&self, key: &str) -> Result<(String, bool), KvError> {
            self.enter();
            self.gets.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            self.leave();
            if self.fail_all {
                return Err(KvError::Status(500));
            }
            match self.data.lock().unwrap().get(key) {
                Some(value) => Ok((value.clone(), true)),
                None => Ok((String::new(), false)),
            }
        }
    }

    #[test]
    fn test_mixed_plan_interleaves_read_after_write() {
        let plan = mixed_plan(6);
        assert_eq!(plan.len(), 6);
        for spec in &plan {
            if spec.index % 2 == 0 {
                assert_eq!(spec.kind, OpKind::Put);
                assert_eq!(spec.key, format!("mixed_key_{}", spec.index));
            } else {
                assert_eq!(spec.kind, OpKind::Get);
                assert_eq!(spec.key, format!("mixed_key_{}", spec.index - 1));
            }
        }
    }

    #[test]
    fn test_put_plan_values_are_unique() {
        let plan = put_plan(4);
        let mut values: Vec<_> = plan.iter().filter_map(|s| s.value.clone()).collect();
        values.sort();
        values.dedup();
        assert_eq!(values.len(), 4);
    }

    #[tokio::test]
    async fn test_sequential_run_covers_whole_plan() {
        let store = Arc::new(FakeStore::default());
        let generator = LoadGenerator::new(store.clone());

        let outcomes = generator.run_sequential(&put_plan(10)).await;
        assert_eq!(outcomes.len(), 10);
        assert!(outcomes.iter().all(|o| o.success));
        assert_eq!(store.puts.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn test_concurrent_run_returns_one_outcome_per_op() {
        for concurrency in [1, 3, 10, 50] {
            let store = Arc::new(FakeStore::default());
            let generator = LoadGenerator::new(store.clone());

            let outcomes = generator.run_concurrent(&put_plan(50), concurrency).await;
            assert_eq!(outcomes.len(), 50);
            let successful = outcomes.iter().filter(|o| o.success).count();
            let failed = outcomes.iter().filter(|o| !o.success).count();
            assert_eq!(successful + failed, 50);
            assert!(outcomes.iter().enumerate().all(|(i, o)| o.index == i));
            assert!(store.max_in_flight.load(Ordering::SeqCst) <= concurrency);
        }
    }

    #[tokio::test]
    async fn test_concurrent_failures_are_counted_not_raised() {
        let store = Arc::new(FakeStore::failing());
        let generator = LoadGenerator::new(store);

        let outcomes = generator.run_concurrent(&put_plan(20), 5).await;
        assert_eq!(outcomes.len(), 20);
        assert!(outcomes.iter().all(|o| !o.success));
    }

    #[tokio::test]
    async fn test_get_of_missing_key_is_unsuccessful() {
        let store = Arc::new(FakeStore::default());
        let generator = LoadGenerator::new(store);

        let outcomes = generator.run_sequential(&get_plan(3)).await;
        assert!(outcomes.iter().all(|o| !o.success));
    }

    #[tokio::test(start_paused = true)]
    async fn test_seeded_gets_succeed() {
        let store = Arc::new(FakeStore::default());
        let generator = LoadGenerator::new(store);

        let plan = get_plan(5);
        generator.seed_keys(&plan).await;
        let outcomes = generator.run_sequential(&plan).await;
        assert!(outcomes.iter().all(|o| o.success));
    }

    #[tokio::test]
    async fn test_mixed_run_reads_back_writes() {
        let store = Arc::new(FakeStore::default());
        let generator = LoadGenerator::new(store);

        let outcomes = generator.run_sequential(&mixed_plan(10)).await;
        assert_eq!(outcomes.len(), 10);
        assert!(outcomes.iter().all(|o| o.success));
    }
}
