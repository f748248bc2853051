// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use crate::repository::TaskRepository;
use crate::state::SharedState;

use chrono::NaiveDate;
use common::Task;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

/// What the task list screen shows.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskListState {
    /// No snapshot has arrived yet.
    Loading,
    Success {
        tasks: Vec<Task>,
        is_refreshing: bool,
        error_message: Option<String>,
    },
    /// Nothing to show but the failure.
    Error(String),
}

impl TaskListState {
    pub fn tasks(&self) -> &[Task] {
        match self {
            TaskListState::Success { tasks, .. } => tasks,
            TaskListState::Loading | TaskListState::Error(_) => &[],
        }
    }
}

type StateHandle = Arc<SharedState<TaskListState>>;

/// Drives the task list: shows the cached snapshot straight away, refreshes
/// from the remote in the background, and forwards user edits to the
/// repository.
///
/// Edits are fire-and-forget. Their effect shows up through the store's live
/// query, never through a re-sync. Dropping the coordinator aborts all of its
/// background work, and anything that finishes afterwards is discarded.
pub struct TaskListCoordinator {
    repository: Arc<TaskRepository>,
    state: StateHandle,
    jobs: Mutex<JoinSet<()>>,
}

impl TaskListCoordinator {
    /// Subscribes to the live query and kicks off one sync, concurrently.
    /// Must be called from within a Tokio runtime.
    pub fn start(repository: Arc<TaskRepository>) -> Self {
        let coordinator = Self {
            repository,
            state: SharedState::new(TaskListState::Loading),
            jobs: Mutex::new(JoinSet::new()),
        };

        coordinator.spawn(observe_snapshots(
            coordinator.repository.clone(),
            coordinator.state.clone(),
        ));
        coordinator.refresh();
        coordinator
    }

    pub fn subscribe(&self) -> watch::Receiver<TaskListState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> TaskListState {
        self.state.get()
    }

    fn spawn<F>(&self, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut jobs = self.jobs.lock();
        // Reap finished jobs so the set only holds work still in flight.
        while jobs.try_join_next().is_some() {}
        jobs.spawn(job);
    }

    /// Pulls the remote list into the store.
    ///
    /// The refresh flag is raised before this returns. Loading stays Loading
    /// until the first snapshot arrives.
    pub fn refresh(&self) {
        self.state.modify(|current| match current {
            TaskListState::Success { is_refreshing, .. } => *is_refreshing = true,
            TaskListState::Error(_) => *current = TaskListState::Loading,
            TaskListState::Loading => {}
        });

        let repository = self.repository.clone();
        let state = self.state.clone();

        self.spawn(async move {
            match repository.synchronize().await {
                Ok(_) => state.modify(|current| {
                    if let TaskListState::Success {
                        is_refreshing,
                        error_message,
                        ..
                    } = current
                    {
                        *is_refreshing = false;
                        *error_message = None;
                    }
                }),
                Err(failure) => {
                    let message = failure.to_string();
                    state.modify(|current| match current {
                        TaskListState::Success {
                            tasks,
                            is_refreshing,
                            error_message,
                        } if failure.has_cached_data || !tasks.is_empty() => {
                            *is_refreshing = false;
                            *error_message = Some(message);
                        }
                        _ => *current = TaskListState::Error(message),
                    });
                }
            }
        });
    }

    pub fn retry(&self) {
        info!("Retrying sync.");
        self.refresh();
    }

    pub fn add_task(&self, title: &str, description: &str, due_date: Option<NaiveDate>) {
        let repository = self.repository.clone();
        let state = self.state.clone();
        let title = title.to_string();
        let description = description.to_string();

        self.spawn(async move {
            if let Err(err) = repository.insert_task(&title, &description, due_date).await {
                report_failure(&state, format!("Failed to add task: {}", err));
            }
        });
    }

    pub fn toggle_completed(&self, task: &Task) {
        let repository = self.repository.clone();
        let state = self.state.clone();
        let updated = task.toggled();

        self.spawn(async move {
            if let Err(err) = repository.update_task(&updated).await {
                report_failure(&state, format!("Failed to update task: {}", err));
            }
        });
    }

    pub fn delete_task(&self, task: &Task) {
        let repository = self.repository.clone();
        let state = self.state.clone();
        let task = task.clone();

        self.spawn(async move {
            if let Err(err) = repository.delete_task(&task).await {
                report_failure(&state, format!("Failed to delete task: {}", err));
            }
        });
    }

    pub fn clear_all(&self) {
        let repository = self.repository.clone();
        let state = self.state.clone();

        self.spawn(async move {
            if let Err(err) = repository.delete_all_tasks().await {
                report_failure(&state, format!("Failed to clear tasks: {}", err));
            }
        });
    }

    /// Clears the advisory message. Only meaningful while showing tasks.
    pub fn dismiss_error(&self) {
        self.state.modify_if(|current| match current {
            TaskListState::Success { error_message, .. } => error_message.take().is_some(),
            TaskListState::Loading | TaskListState::Error(_) => false,
        });
    }
}

impl Drop for TaskListCoordinator {
    fn drop(&mut self) {
        debug!("Tearing down task list coordinator.");
        self.state.shut_down();
        self.jobs.get_mut().abort_all();
    }
}

async fn observe_snapshots(repository: Arc<TaskRepository>, state: StateHandle) {
    let mut snapshots = repository.observe_tasks();

    while let Some(snapshot) = snapshots.next().await {
        if !state.is_live() {
            break;
        }
        match snapshot {
            Ok(tasks) => {
                debug!("Task snapshot with {} tasks.", tasks.len());
                state.modify(|current| apply_snapshot(current, tasks));
            }
            Err(err) => {
                error!("Live task query failed: {}", err);
                let message = err.to_string();
                let mut showing_tasks = true;
                state.modify(|current| match current {
                    TaskListState::Success { error_message, .. } => {
                        *error_message = Some(message)
                    }
                    _ => {
                        showing_tasks = false;
                        *current = TaskListState::Error(message);
                    }
                });
                if !showing_tasks {
                    break;
                }
            }
        }
    }
}

/// Folds a fresh snapshot into the current state, keeping the refresh flag
/// and any advisory message. An error stays up only while there is nothing
/// to show in its place.
fn apply_snapshot(current: &mut TaskListState, tasks: Vec<Task>) {
    let next = match std::mem::replace(current, TaskListState::Loading) {
        TaskListState::Loading => TaskListState::Success {
            tasks,
            is_refreshing: false,
            error_message: None,
        },
        TaskListState::Success {
            is_refreshing,
            error_message,
            ..
        } => TaskListState::Success {
            tasks,
            is_refreshing,
            error_message,
        },
        TaskListState::Error(message) if tasks.is_empty() => TaskListState::Error(message),
        TaskListState::Error(message) => TaskListState::Success {
            tasks,
            is_refreshing: false,
            error_message: Some(message),
        },
    };
    *current = next;
}

fn report_failure(state: &SharedState<TaskListState>, message: String) {
    error!("{}", message);
    state.modify(|current| match current {
        TaskListState::Success { error_message, .. } => *error_message = Some(message),
        _ => *current = TaskListState::Error(message),
    });
}
