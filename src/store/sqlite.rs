use std::str::FromStr;

use async_trait::async_trait;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Row, SqlitePool,
};
use tracing::info;

use super::StudentStore;
use crate::{
    error::{StoreError, StoreResult},
    student::{Student, StudentId, StudentInput},
};

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS students (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    age INTEGER NOT NULL
)";

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `url` and make sure the
    /// schema exists.
    pub async fn connect(url: &str, max_connections: u32) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

        // An in-memory database lives and dies with its single connection
        let pool_options = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(max_connections.max(1))
        };
        let pool = pool_options.connect_with(options).await?;

        sqlx::query(CREATE_TABLE).execute(&pool).await?;
        info!(url, "sqlite store ready");

        Ok(Self { pool })
    }
}

fn from_row(row: &SqliteRow) -> StoreResult<Student> {
    let age: i64 = row.try_get("age")?;
    Ok(Student {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        age: u32::try_from(age).map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
    })
}

/// Unique email violations become conflicts, everything else stays a
/// database error
fn map_write_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict(db.message().to_string())
        }
        _ => StoreError::Database(err),
    }
}

#[async_trait]
impl StudentStore for SqliteStore {
    async fn create(&self, input: StudentInput) -> StoreResult<Student> {
        let result = sqlx::query("INSERT INTO students (name, email, age) VALUES (?, ?, ?)")
            .bind(&input.name)
            .bind(&input.email)
            .bind(i64::from(input.age))
            .execute(&self.pool)
            .await
            .map_err(map_write_error)?;

        Ok(input.with_id(result.last_insert_rowid()))
    }

    async fn get_by_id(&self, id: StudentId) -> StoreResult<Student> {
        let row = sqlx::query("SELECT id, name, email, age FROM students WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound(id))?;
        from_row(&row)
    }

    async fn list(&self) -> StoreResult<Vec<Student>> {
        let rows = sqlx::query("SELECT id, name, email, age FROM students ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(from_row).collect()
    }

    async fn update(&self, id: StudentId, input: StudentInput) -> StoreResult<()> {
        let result = sqlx::query("UPDATE students SET name = ?, email = ?, age = ? WHERE id = ?")
            .bind(&input.name)
            .bind(&input.email)
            .bind(i64::from(input.age))
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_write_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    async fn delete(&self, id: StudentId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM students WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }
}
