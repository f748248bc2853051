// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use crate::error::TodoError;

use anyhow::{Context, Result};
use common::Task;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{migrate::MigrateDatabase, Executor, Sqlite, SqlitePool}; // Added MigrateDatabase for database_exists/create_database
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

const CREATE_TASKS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS tasks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        origin_id INTEGER NULL,
        owner_id INTEGER NOT NULL DEFAULT 1,
        title TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        is_completed BOOLEAN NOT NULL DEFAULT 0,
        due_date DATE NULL
    );
"#;

// Slow subscribers skip ahead and re-query once, so this only bounds memory.
const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Establishes the database connection pool.
/// If the database does not exist, it creates it.
/// It also ensures the `tasks` table has the correct schema.
pub async fn establish_connection_pool(database_url: &str) -> Result<SqlitePool> {
    if !Sqlite::database_exists(database_url).await.unwrap_or(false) {
        info!("Creating database {}", database_url);
        Sqlite::create_database(database_url)
            .await
            .context("Failed to create database")?;
    } else {
        info!("Database already exists.");
    }

    let pool = SqlitePool::connect(database_url)
        .await
        .context("Failed to connect to database")?;

    create_tasks_table(&pool).await?;

    Ok(pool)
}

async fn create_tasks_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(CREATE_TASKS_TABLE)
        .execute(pool)
        .await
        .context("Failed to create 'tasks' table")?;

    info!("'tasks' table is ready.");
    Ok(())
}

/// Handle to the durable task table.
///
/// Every clone shares the same pool and the same change channel, so a write
/// through any clone reaches every live query.
#[derive(Clone)]
pub struct TaskStore {
    pool: SqlitePool,
    changes: broadcast::Sender<()>,
}

impl TaskStore {
    /// Wraps a pool whose `tasks` table already exists.
    pub fn new(pool: SqlitePool) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self { pool, changes }
    }

    /// Opens (creating if needed) the database at `database_url`.
    pub async fn open(database_url: &str) -> Result<Self> {
        let pool = establish_connection_pool(database_url).await?;
        Ok(Self::new(pool))
    }

    /// A private in-memory database, used by tests and throwaway sessions.
    ///
    /// Each SQLite connection to `:memory:` sees its own database, so the pool
    /// is pinned to a single connection that is never recycled.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .context("Failed to open in-memory database")?;

        create_tasks_table(&pool).await?;

        Ok(Self::new(pool))
    }

    /// Closes the pool. Every later operation fails with a storage error.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    fn notify(&self) {
        // No receivers just means nobody is observing right now.
        let _ = self.changes.send(());
    }

    /// Inserts a task. A task with id 0 gets a fresh key; the new id is returned.
    pub async fn insert(&self, task: &Task) -> Result<i64, TodoError> {
        let id = insert_row(&self.pool, task).await?;
        debug!("Inserted task {} ({:?})", id, task.title);
        self.notify();
        Ok(id)
    }

    /// Replaces the row matching `task.id`. Updating a missing row is a no-op.
    pub async fn update(&self, task: &Task) -> Result<(), TodoError> {
        let result = sqlx::query(
            "UPDATE tasks SET origin_id = ?, owner_id = ?, title = ?, description = ?, is_completed = ?, due_date = ? WHERE id = ?",
        )
        .bind(task.origin_id)
        .bind(task.owner_id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.is_completed)
        .bind(task.due_date)
        .bind(task.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            debug!("Updated task {}", task.id);
            self.notify();
        } else {
            warn!("Update ignored: no task with ID {}", task.id);
        }
        Ok(())
    }

    /// Removes the row matching `task.id`.
    pub async fn delete_one(&self, task: &Task) -> Result<(), TodoError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(task.id)
            .execute(&self.pool)
            .await?;

        let rows_affected = result.rows_affected();
        info!("Deleted {} rows for task ID: {}", rows_affected, task.id);
        if rows_affected > 0 {
            self.notify();
        }
        Ok(())
    }

    /// Removes every row.
    pub async fn delete_all(&self) -> Result<u64, TodoError> {
        let rows_affected = sqlx::query("DELETE FROM tasks")
            .execute(&self.pool)
            .await?
            .rows_affected();

        info!("Deleted all {} tasks.", rows_affected);
        if rows_affected > 0 {
            self.notify();
        }
        Ok(rows_affected)
    }

    /// Removes every row that came from the remote source.
    pub async fn delete_remote_derived(&self) -> Result<u64, TodoError> {
        let rows_affected = sqlx::query("DELETE FROM tasks WHERE origin_id IS NOT NULL")
            .execute(&self.pool)
            .await?
            .rows_affected();

        info!("Deleted {} remote-derived tasks.", rows_affected);
        if rows_affected > 0 {
            self.notify();
        }
        Ok(rows_affected)
    }

    /// Drops all remote-derived rows and inserts `tasks` in one transaction.
    /// Observers are notified once, after commit, even when nothing changed.
    pub async fn replace_remote_derived(&self, tasks: &[Task]) -> Result<usize, TodoError> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query("DELETE FROM tasks WHERE origin_id IS NOT NULL")
            .execute(&mut *tx)
            .await?
            .rows_affected();

        for task in tasks {
            insert_row(&mut *tx, task).await?;
        }

        tx.commit().await?;

        info!(
            "Replaced {} remote-derived tasks with {} fresh ones.",
            removed,
            tasks.len()
        );
        self.notify();
        Ok(tasks.len())
    }

    pub async fn count(&self) -> Result<i64, TodoError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM tasks")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Task, TodoError> {
        sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(TodoError::NotFound(id))
    }

    /// Live query over the whole table, ordered by insertion.
    pub fn observe_all(&self) -> TaskSubscription {
        TaskSubscription {
            pool: self.pool.clone(),
            changes: self.changes.subscribe(),
            primed: false,
        }
    }
}

async fn insert_row<'e, E>(executor: E, task: &Task) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let query = if task.id == 0 {
        sqlx::query(
            "INSERT INTO tasks (origin_id, owner_id, title, description, is_completed, due_date) VALUES (?, ?, ?, ?, ?, ?)",
        )
    } else {
        sqlx::query(
            "INSERT INTO tasks (id, origin_id, owner_id, title, description, is_completed, due_date) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(task.id)
    };

    let id = query
        .bind(task.origin_id)
        .bind(task.owner_id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.is_completed)
        .bind(task.due_date)
        .execute(executor)
        .await?
        .last_insert_rowid();

    Ok(id)
}

async fn fetch_snapshot(pool: &SqlitePool) -> Result<Vec<Task>, TodoError> {
    let tasks = sqlx::query_as::<_, Task>("SELECT * FROM tasks ORDER BY id ASC")
        .fetch_all(pool)
        .await?;
    Ok(tasks)
}

/// Subscription returned by [`TaskStore::observe_all`].
///
/// The first call to [`next`](Self::next) yields the current table; each
/// later call waits for a committed write and yields the full table again.
/// Dropping the subscription unsubscribes.
pub struct TaskSubscription {
    pool: SqlitePool,
    changes: broadcast::Receiver<()>,
    primed: bool,
}

impl TaskSubscription {
    /// Returns `None` once every store handle is gone.
    pub async fn next(&mut self) -> Option<Result<Vec<Task>, TodoError>> {
        if self.primed {
            match self.changes.recv().await {
                Ok(()) => {}
                Err(RecvError::Lagged(skipped)) => {
                    debug!("Live query skipped {} change notifications.", skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
        self.primed = true;
        Some(fetch_snapshot(&self.pool).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use common::RemoteTask;
    use std::time::Duration;
    use tokio::time::timeout;

    fn remote_task(id: i64, title: &str) -> Task {
        Task::from(RemoteTask {
            id,
            user_id: 1,
            title: title.to_string(),
            completed: false,
        })
    }

    async fn next_snapshot(subscription: &mut TaskSubscription) -> Vec<Task> {
        timeout(Duration::from_secs(2), subscription.next())
            .await
            .expect("Live query did not emit in time")
            .expect("Live query ended")
            .expect("Snapshot query failed")
    }

    #[tokio::test]
    async fn test_insert_and_get_task() {
        let store = TaskStore::in_memory().await.unwrap();
        let due = NaiveDate::from_ymd_opt(2026, 2, 14).unwrap();
        let task = Task::new_local("Test the database", "with a description", Some(due));

        // Act: Insert the new task in the test database
        let id = store.insert(&task).await.unwrap();

        // Assert: The stored task has the correct data
        assert!(id > 0); // Should have been assigned an ID by the DB
        let stored = store.get_by_id(id).await.unwrap();
        assert_eq!(stored.id, id);
        assert_eq!(stored.title, "Test the database");
        assert_eq!(stored.description, "with a description");
        assert_eq!(stored.due_date, Some(due));
        assert_eq!(stored.origin_id, None);
        assert!(!stored.is_completed);
    }

    #[tokio::test]
    async fn test_get_missing_task_is_not_found() {
        let store = TaskStore::in_memory().await.unwrap();
        let err = store.get_by_id(42).await.unwrap_err();
        assert!(matches!(err, TodoError::NotFound(42)));
    }

    #[tokio::test]
    async fn test_update_replaces_row_and_ignores_missing() {
        let store = TaskStore::in_memory().await.unwrap();
        let id = store
            .insert(&Task::new_local("Water plants", "", None))
            .await
            .unwrap();

        let stored = store.get_by_id(id).await.unwrap();
        store.update(&stored.toggled()).await.unwrap();
        assert!(store.get_by_id(id).await.unwrap().is_completed);

        // A row that does not exist is silently left alone.
        let mut ghost = stored.clone();
        ghost.id = 999;
        store.update(&ghost).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_ids_are_never_reused() {
        let store = TaskStore::in_memory().await.unwrap();
        let first = store.insert(&Task::new_local("One", "", None)).await.unwrap();
        let task = store.get_by_id(first).await.unwrap();
        store.delete_one(&task).await.unwrap();

        let second = store.insert(&Task::new_local("Two", "", None)).await.unwrap();
        assert!(second > first);
    }

    #[tokio::test]
    async fn test_delete_remote_derived_keeps_local_tasks() {
        let store = TaskStore::in_memory().await.unwrap();
        store.insert(&Task::new_local("Local", "", None)).await.unwrap();
        store.insert(&remote_task(1, "Remote A")).await.unwrap();
        store.insert(&remote_task(2, "Remote B")).await.unwrap();

        let removed = store.delete_remote_derived().await.unwrap();

        assert_eq!(removed, 2);
        assert_eq!(store.count().await.unwrap(), 1);
        let mut live = store.observe_all();
        let remaining = next_snapshot(&mut live).await;
        assert_eq!(remaining[0].title, "Local");
    }

    #[tokio::test]
    async fn test_replace_remote_derived() {
        let store = TaskStore::in_memory().await.unwrap();
        store.insert(&Task::new_local("Local", "", None)).await.unwrap();
        store.insert(&remote_task(1, "Stale")).await.unwrap();

        let inserted = store
            .replace_remote_derived(&[remote_task(5, "Fresh A"), remote_task(6, "Fresh B")])
            .await
            .unwrap();

        assert_eq!(inserted, 2);
        let mut live = store.observe_all();
        let titles: Vec<String> = next_snapshot(&mut live)
            .await
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, vec!["Local", "Fresh A", "Fresh B"]);
    }

    #[tokio::test]
    async fn test_delete_all() {
        let store = TaskStore::in_memory().await.unwrap();
        store.insert(&Task::new_local("Local", "", None)).await.unwrap();
        store.insert(&remote_task(1, "Remote")).await.unwrap();

        assert_eq!(store.delete_all().await.unwrap(), 2);
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_observe_all_emits_snapshot_after_each_write() {
        let store = TaskStore::in_memory().await.unwrap();
        let mut live = store.observe_all();

        // The current (empty) table comes first.
        assert!(next_snapshot(&mut live).await.is_empty());

        let id = store.insert(&Task::new_local("First", "", None)).await.unwrap();
        assert_eq!(next_snapshot(&mut live).await.len(), 1);

        store.insert(&Task::new_local("Second", "", None)).await.unwrap();
        let snapshot = next_snapshot(&mut live).await;
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].title, "First");
        assert_eq!(snapshot[1].title, "Second");

        let first = store.get_by_id(id).await.unwrap();
        store.update(&first.toggled()).await.unwrap();
        assert!(next_snapshot(&mut live).await[0].is_completed);

        store.delete_one(&first).await.unwrap();
        let snapshot = next_snapshot(&mut live).await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].title, "Second");
    }

    #[tokio::test]
    async fn test_operations_fail_after_close() {
        let store = TaskStore::in_memory().await.unwrap();
        store.close().await;

        let err = store
            .insert(&Task::new_local("Too late", "", None))
            .await
            .unwrap_err();
        assert!(matches!(err, TodoError::Storage(_)));
    }
}
