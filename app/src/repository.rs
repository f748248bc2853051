// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use crate::database::{TaskStore, TaskSubscription};
use crate::error::{SyncFailure, SyncFailureKind, TodoError};
use crate::remote::RemoteSource;

use chrono::NaiveDate;
use common::Task;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Reconciles the remote task list into the local store.
///
/// Reads never touch the network: the list view reads the store's live query,
/// and [`synchronize`](Self::synchronize) is the only path that pulls remote data.
pub struct TaskRepository {
    store: TaskStore,
    remote: Arc<dyn RemoteSource>,
}

impl TaskRepository {
    pub fn new(store: TaskStore, remote: Arc<dyn RemoteSource>) -> Self {
        Self { store, remote }
    }

    pub fn observe_tasks(&self) -> TaskSubscription {
        self.store.observe_all()
    }

    /// Replaces every remote-derived task with the latest remote list.
    ///
    /// Local edits made to remote-derived tasks are lost here: the remote
    /// rows are dropped and re-inserted, never merged. Locally created tasks
    /// are left untouched.
    pub async fn synchronize(&self) -> Result<usize, SyncFailure> {
        match self.fetch_and_replace().await {
            Ok(inserted) => {
                info!("Sync complete: {} remote tasks stored.", inserted);
                Ok(inserted)
            }
            Err(err) => {
                error!("Sync failed: {}", err);
                let has_cached_data = match self.store.count().await {
                    Ok(count) => count > 0,
                    Err(count_err) => {
                        warn!("Could not count cached tasks: {}", count_err);
                        false
                    }
                };
                Err(SyncFailure {
                    kind: SyncFailureKind::from(&err),
                    has_cached_data,
                })
            }
        }
    }

    async fn fetch_and_replace(&self) -> Result<usize, TodoError> {
        let remote_tasks = self.remote.fetch_all().await?;
        let tasks: Vec<Task> = remote_tasks.into_iter().map(Task::from).collect();
        self.store.replace_remote_derived(&tasks).await
    }

    pub async fn get_task_by_id(&self, id: i64) -> Result<Task, TodoError> {
        self.store.get_by_id(id).await
    }

    pub async fn insert_task(
        &self,
        title: &str,
        description: &str,
        due_date: Option<NaiveDate>,
    ) -> Result<i64, TodoError> {
        self.store
            .insert(&Task::new_local(title, description, due_date))
            .await
    }

    pub async fn update_task(&self, task: &Task) -> Result<(), TodoError> {
        self.store.update(task).await
    }

    pub async fn delete_task(&self, task: &Task) -> Result<(), TodoError> {
        self.store.delete_one(task).await
    }

    pub async fn delete_all_tasks(&self) -> Result<(), TodoError> {
        self.store.delete_all().await.map(|_| ())
    }
}
