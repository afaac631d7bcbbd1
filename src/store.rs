pub mod memory;
pub mod sqlite;

use async_trait::async_trait;

use crate::{
    error::StoreResult,
    student::{Student, StudentId, StudentInput},
};

/// Durable, authoritative storage of students
#[async_trait]
pub trait StudentStore: Send + Sync {
    /// Persist a new student and return it with its assigned id
    async fn create(&self, input: StudentInput) -> StoreResult<Student>;

    /// Fails with `StoreError::NotFound` when absent
    async fn get_by_id(&self, id: StudentId) -> StoreResult<Student>;

    /// Every student, ordered by id
    async fn list(&self) -> StoreResult<Vec<Student>>;

    /// Replace every attribute of student `id`
    async fn update(&self, id: StudentId, input: StudentInput) -> StoreResult<()>;

    async fn delete(&self, id: StudentId) -> StoreResult<()>;
}
