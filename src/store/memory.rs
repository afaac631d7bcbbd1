use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::StudentStore;
use crate::{
    error::{StoreError, StoreResult},
    student::{Student, StudentId, StudentInput},
};

#[derive(Default)]
struct Inner {
    rows: BTreeMap<StudentId, Student>,
    last_id: StudentId,
}

impl Inner {
    fn check_email(&self, email: &str, except: StudentId) -> StoreResult<()> {
        let taken = self
            .rows
            .values()
            .any(|s| s.id != except && s.email == email);
        if taken {
            return Err(StoreError::Conflict(format!("email {email} already in use")));
        }
        Ok(())
    }
}

/// Volatile store, mostly for local runs and tests
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StudentStore for MemoryStore {
    async fn create(&self, input: StudentInput) -> StoreResult<Student> {
        let mut inner = self.inner.write().await;
        inner.check_email(&input.email, 0)?;

        inner.last_id += 1;
        let student = input.with_id(inner.last_id);
        inner.rows.insert(student.id, student.clone());
        Ok(student)
    }

    async fn get_by_id(&self, id: StudentId) -> StoreResult<Student> {
        self.inner
            .read()
            .await
            .rows
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn list(&self) -> StoreResult<Vec<Student>> {
        Ok(self.inner.read().await.rows.values().cloned().collect())
    }

    async fn update(&self, id: StudentId, input: StudentInput) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if !inner.rows.contains_key(&id) {
            return Err(StoreError::NotFound(id));
        }
        inner.check_email(&input.email, id)?;
        inner.rows.insert(id, input.with_id(id));
        Ok(())
    }

    async fn delete(&self, id: StudentId) -> StoreResult<()> {
        self.inner
            .write()
            .await
            .rows
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(name: &str, email: &str) -> StudentInput {
        StudentInput {
            name: name.to_string(),
            email: email.to_string(),
            age: 20,
        }
    }

    #[tokio::test]
    async fn ids_are_assigned_in_order_and_never_reused() {
        let store = MemoryStore::new();
        let a = store.create(input("Ann", "ann@x.com")).await.unwrap();
        let b = store.create(input("Bo", "bo@x.com")).await.unwrap();
        assert_eq!((a.id, b.id), (1, 2));

        store.delete(b.id).await.unwrap();
        let c = store.create(input("Cy", "cy@x.com")).await.unwrap();
        assert_eq!(c.id, 3);

        let ids = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect::<Vec<_>>();
        assert_eq!(ids, vec![1, 3]);
    }

    #[tokio::test]
    async fn email_is_unique() {
        let store = MemoryStore::new();
        let ann = store.create(input("Ann", "ann@x.com")).await.unwrap();
        store.create(input("Bo", "bo@x.com")).await.unwrap();

        assert!(matches!(
            store.create(input("Ann2", "ann@x.com")).await,
            Err(StoreError::Conflict(_))
        ));
        assert!(matches!(
            store.update(ann.id, input("Ann", "bo@x.com")).await,
            Err(StoreError::Conflict(_))
        ));
        // Keeping one's own email is fine
        store.update(ann.id, input("Ann B", "ann@x.com")).await.unwrap();
        assert_eq!(store.get_by_id(ann.id).await.unwrap().name, "Ann B");
    }

    #[tokio::test]
    async fn absent_ids_are_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(store.get_by_id(9).await, Err(StoreError::NotFound(9))));
        assert!(matches!(
            store.update(9, input("X", "x@x.com")).await,
            Err(StoreError::NotFound(9))
        ));
        assert!(matches!(store.delete(9).await, Err(StoreError::NotFound(9))));
    }
}
