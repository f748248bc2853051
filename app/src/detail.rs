// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use crate::repository::TaskRepository;
use crate::state::SharedState;

use common::Task;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

/// What the single-task screen shows.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskDetailState {
    Loading,
    Success(Task),
    Error(String),
}

type StateHandle = Arc<SharedState<TaskDetailState>>;

/// Load, toggle and delete flow for one task, independent of the list.
pub struct TaskDetailCoordinator {
    task_id: i64,
    repository: Arc<TaskRepository>,
    state: StateHandle,
    jobs: Mutex<JoinSet<()>>,
}

impl TaskDetailCoordinator {
    /// Starts loading `task_id` right away. Must be called from within a Tokio runtime.
    pub fn start(task_id: i64, repository: Arc<TaskRepository>) -> Self {
        let coordinator = Self {
            task_id,
            repository,
            state: SharedState::new(TaskDetailState::Loading),
            jobs: Mutex::new(JoinSet::new()),
        };
        coordinator.load();
        coordinator
    }

    pub fn subscribe(&self) -> watch::Receiver<TaskDetailState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> TaskDetailState {
        self.state.get()
    }

    fn spawn<F>(&self, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut jobs = self.jobs.lock();
        while jobs.try_join_next().is_some() {}
        jobs.spawn(job);
    }

    pub fn load(&self) {
        self.spawn(load_task(
            self.repository.clone(),
            self.task_id,
            self.state.clone(),
        ));
    }

    /// Stores the flipped flag, then reloads the stored row instead of
    /// trusting the local copy.
    pub fn toggle_completed(&self, task: &Task) {
        let repository = self.repository.clone();
        let state = self.state.clone();
        let task_id = self.task_id;
        let updated = task.toggled();

        self.spawn(async move {
            match repository.update_task(&updated).await {
                Ok(()) => load_task(repository, task_id, state).await,
                Err(err) => {
                    error!("Failed to update task {}: {}", task_id, err);
                    state.replace(TaskDetailState::Error(format!(
                        "Failed to update task: {}",
                        err
                    )));
                }
            }
        });
    }

    /// Deletes the task and calls `on_navigate_back` once it is gone.
    /// On failure, or once the coordinator is dropped, the callback is never called.
    pub fn delete<F>(&self, task: &Task, on_navigate_back: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let repository = self.repository.clone();
        let state = self.state.clone();
        let task = task.clone();

        self.spawn(async move {
            match repository.delete_task(&task).await {
                Ok(()) if state.is_live() => {
                    info!("Task {} deleted, leaving detail view.", task.id);
                    on_navigate_back();
                }
                Ok(()) => debug!("Task {} deleted after teardown.", task.id),
                Err(err) => {
                    error!("Failed to delete task {}: {}", task.id, err);
                    state.replace(TaskDetailState::Error(format!(
                        "Failed to delete task: {}",
                        err
                    )));
                }
            }
        });
    }
}

impl Drop for TaskDetailCoordinator {
    fn drop(&mut self) {
        debug!("Tearing down detail coordinator for task {}.", self.task_id);
        self.state.shut_down();
        self.jobs.get_mut().abort_all();
    }
}

async fn load_task(
    repository: Arc<TaskRepository>,
    task_id: i64,
    state: StateHandle,
) {
    let next = match repository.get_task_by_id(task_id).await {
        Ok(task) => TaskDetailState::Success(task),
        Err(err) => {
            error!("Failed to load task {}: {}", task_id, err);
            TaskDetailState::Error(err.to_string())
        }
    };
    state.replace(next);
}
