#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use stuapi::{
    cache::{local::LocalCache, CacheBackend, Pipeline},
    error::{CacheError, CacheResult, StoreError, StoreResult},
    keys::{CachePolicy, STUDENT_LIST_KEY},
    propagate::CachePropagator,
    service::StudentService,
    store::{memory::MemoryStore, StudentStore},
    student::{Student, StudentId, StudentInput},
};

pub fn input(name: &str, email: &str, age: u32) -> StudentInput {
    StudentInput {
        name: name.to_string(),
        email: email.to_string(),
        age,
    }
}

/// Memory store that counts reads
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryStore,
    pub gets: AtomicUsize,
    pub lists: AtomicUsize,
}

impl CountingStore {
    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn lists(&self) -> usize {
        self.lists.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StudentStore for CountingStore {
    async fn create(&self, input: StudentInput) -> StoreResult<Student> {
        self.inner.create(input).await
    }

    async fn get_by_id(&self, id: StudentId) -> StoreResult<Student> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get_by_id(id).await
    }

    async fn list(&self) -> StoreResult<Vec<Student>> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        self.inner.list().await
    }

    async fn update(&self, id: StudentId, input: StudentInput) -> StoreResult<()> {
        self.inner.update(id, input).await
    }

    async fn delete(&self, id: StudentId) -> StoreResult<()> {
        self.inner.delete(id).await
    }
}

/// Store whose every call fails
pub struct BrokenStore;

#[async_trait]
impl StudentStore for BrokenStore {
    async fn create(&self, _input: StudentInput) -> StoreResult<Student> {
        Err(StoreError::Database(sqlx::Error::PoolTimedOut))
    }

    async fn get_by_id(&self, _id: StudentId) -> StoreResult<Student> {
        Err(StoreError::Database(sqlx::Error::PoolTimedOut))
    }

    async fn list(&self) -> StoreResult<Vec<Student>> {
        Err(StoreError::Database(sqlx::Error::PoolTimedOut))
    }

    async fn update(&self, _id: StudentId, _input: StudentInput) -> StoreResult<()> {
        Err(StoreError::Database(sqlx::Error::PoolTimedOut))
    }

    async fn delete(&self, _id: StudentId) -> StoreResult<()> {
        Err(StoreError::Database(sqlx::Error::PoolTimedOut))
    }
}

/// Local cache that counts pipeline executions
#[derive(Default)]
pub struct RecordingCache {
    pub inner: LocalCache,
    pub execs: AtomicUsize,
}

impl RecordingCache {
    pub fn execs(&self) -> usize {
        self.execs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CacheBackend for RecordingCache {
    async fn hget_all(&self, key: &str) -> CacheResult<HashMap<String, String>> {
        self.inner.hget_all(key).await
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        self.inner.get(key).await
    }

    async fn exec(&self, pipeline: Pipeline) -> CacheResult<()> {
        self.execs.fetch_add(1, Ordering::SeqCst);
        self.inner.exec(pipeline).await
    }
}

/// Cache backend that is never reachable
pub struct DownCache;

#[async_trait]
impl CacheBackend for DownCache {
    async fn hget_all(&self, _key: &str) -> CacheResult<HashMap<String, String>> {
        Err(CacheError::Unavailable("connection refused".into()))
    }

    async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
        Err(CacheError::Unavailable("connection refused".into()))
    }

    async fn exec(&self, _pipeline: Pipeline) -> CacheResult<()> {
        Err(CacheError::Unavailable("connection refused".into()))
    }
}

pub fn service<S, C>(store: Arc<S>, cache: Arc<C>) -> StudentService<S, C>
where
    S: StudentStore,
    C: CacheBackend + 'static,
{
    StudentService::new(
        store,
        cache,
        CachePropagator::start(2, 64),
        CachePolicy::new(Duration::from_secs(60)),
    )
}

pub type TestService = StudentService<CountingStore, LocalCache>;

const POLLS: usize = 400;
const POLL_EVERY: Duration = Duration::from_millis(5);

/// Wait until the hash at `key` satisfies `pred`, panicking after two seconds
pub async fn wait_for_hash<P>(cache: &LocalCache, key: &str, pred: P)
where
    P: Fn(&HashMap<String, String>) -> bool,
{
    for _ in 0..POLLS {
        if pred(&cache.hget_all(key).await.unwrap()) {
            return;
        }
        tokio::time::sleep(POLL_EVERY).await;
    }
    panic!("timed out waiting on hash {key}");
}

/// Wait until the list snapshot satisfies `pred`, panicking after two seconds
pub async fn wait_for_list<P>(cache: &LocalCache, pred: P)
where
    P: Fn(Option<&str>) -> bool,
{
    for _ in 0..POLLS {
        if pred(cache.get(STUDENT_LIST_KEY).await.unwrap().as_deref()) {
            return;
        }
        tokio::time::sleep(POLL_EVERY).await;
    }
    panic!("timed out waiting on the list snapshot");
}
