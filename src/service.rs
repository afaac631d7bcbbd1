use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, info, warn};

use crate::{
    cache::{CacheBackend, Pipeline},
    error::StoreResult,
    keys::{student_key, CachePolicy, STUDENT_LIST_KEY},
    propagate::CachePropagator,
    store::StudentStore,
    student::{Student, StudentId, StudentInput},
};

/// Mediates every student operation between the durable store and the cache.
///
/// The store is always written first and its result is returned right away.
/// The cache is a best-effort side table: reads fall back to the store on any
/// miss or cache failure, and updates to it run on the propagator without
/// the caller waiting for them.
pub struct StudentService<S, C> {
    store: Arc<S>,
    cache: Arc<C>,
    propagator: CachePropagator,
    policy: CachePolicy,
}

impl<S, C> StudentService<S, C>
where
    S: StudentStore,
    C: CacheBackend + 'static,
{
    pub fn new(
        store: Arc<S>,
        cache: Arc<C>,
        propagator: CachePropagator,
        policy: CachePolicy,
    ) -> Self {
        Self {
            store,
            cache,
            propagator,
            policy,
        }
    }

    /// Hand `pipeline` to the background workers; never waits for it
    fn schedule(&self, op: &'static str, key: String, pipeline: Pipeline) {
        let cache = self.cache.clone();
        self.propagator
            .submit(op, key, async move { cache.exec(pipeline).await }.boxed());
    }

    pub async fn create(&self, input: StudentInput) -> StoreResult<Student> {
        let created = self.store.create(input).await?;

        self.schedule(
            "create",
            student_key(created.id),
            self.policy.refresh_and_invalidate_list(&created),
        );

        info!(student_id = created.id, "student created");
        Ok(created)
    }

    pub async fn get_by_id(&self, id: StudentId) -> StoreResult<Student> {
        let key = student_key(id);

        match self.cache.hget_all(&key).await {
            Ok(fields) => {
                if let Some(student) = Student::from_fields(&fields) {
                    info!(student_id = id, "serving student from cache");
                    return Ok(student);
                }
            }
            Err(e) => warn!(key = %key, error = %e, "cache read failed, falling back to store"),
        }

        let student = self.store.get_by_id(id).await?;

        self.schedule("populate", key, self.policy.refresh(&student));

        info!(student_id = id, "student fetched");
        Ok(student)
    }

    pub async fn get_all(&self) -> StoreResult<Vec<Student>> {
        match self.cache.get(STUDENT_LIST_KEY).await {
            Ok(Some(snapshot)) => match serde_json::from_str::<Vec<Student>>(&snapshot) {
                Ok(students) => {
                    info!(count = students.len(), "serving student list from cache");
                    return Ok(students);
                }
                Err(e) => debug!(error = %e, "unreadable list snapshot, treating as miss"),
            },
            Ok(None) => {}
            Err(e) => {
                warn!(key = STUDENT_LIST_KEY, error = %e, "cache read failed, falling back to store")
            }
        }

        let students = self.store.list().await?;

        let snapshot = students.clone();
        let cache = self.cache.clone();
        let policy = self.policy;
        self.propagator.submit(
            "populate_list",
            STUDENT_LIST_KEY,
            async move {
                let data = serde_json::to_string(&snapshot)?;
                cache.exec(policy.store_list(data)).await
            }
            .boxed(),
        );

        info!(count = students.len(), "students fetched");
        Ok(students)
    }

    /// Persist the new attributes of `id` and return the updated student
    pub async fn update(&self, id: StudentId, input: StudentInput) -> StoreResult<Student> {
        self.store.update(id, input.clone()).await?;
        let student = input.with_id(id);

        self.schedule(
            "update",
            student_key(id),
            self.policy.refresh_and_invalidate_list(&student),
        );

        info!(student_id = id, "student updated");
        Ok(student)
    }

    pub async fn delete(&self, id: StudentId) -> StoreResult<()> {
        self.store.delete(id).await?;

        self.schedule("delete", student_key(id), self.policy.evict(id));

        info!(student_id = id, "student deleted");
        Ok(())
    }
}

