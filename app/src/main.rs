// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use anyhow::{Context, Result};
use app::config::AppConfig;
use app::database::TaskStore;
use app::list::{TaskListCoordinator, TaskListState};
use app::remote::HttpRemoteSource;
use app::repository::TaskRepository;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    tracing::info!("Starting up the task list...");

    if let Err(e) = run(AppConfig::default()).await {
        tracing::error!("Task list stopped with an error: {:?}", e);
        std::process::exit(1);
    }
}

async fn run(config: AppConfig) -> Result<()> {
    tokio::fs::create_dir_all(&config.data_dir)
        .await
        .with_context(|| format!("Failed to create data directory {:?}", config.data_dir))?;

    let store = match TaskStore::open(&config.database_url).await {
        Ok(store) => {
            tracing::info!("Database connection was made successfully.");
            store
        }
        Err(e) => {
            tracing::error!("Failed to connect with the database: {:?}", e);
            return Err(e);
        }
    };

    let remote = HttpRemoteSource::new(&config.api_base_url, config.request_timeout)
        .context("Failed to build the HTTP client")?;
    let repository = Arc::new(TaskRepository::new(store.clone(), Arc::new(remote)));

    let list = TaskListCoordinator::start(repository);
    let mut updates = list.subscribe();
    tracing::info!("Syncing with {}. Press Ctrl-C to quit.", config.api_base_url);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down.");
                break;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = updates.borrow_and_update().clone();
                log_state(&state);
            }
        }
    }

    drop(list);
    store.close().await;
    Ok(())
}

fn log_state(state: &TaskListState) {
    match state {
        TaskListState::Loading => tracing::info!("Loading tasks..."),
        TaskListState::Error(message) => tracing::error!("{}", message),
        TaskListState::Success {
            tasks,
            is_refreshing,
            error_message,
        } => {
            let today = common::local_today();
            let open = tasks.iter().filter(|t| !t.is_completed).count();
            tracing::info!(
                "{} tasks ({} open){}",
                tasks.len(),
                open,
                if *is_refreshing { ", refreshing" } else { "" }
            );
            for task in tasks.iter().filter(|t| t.due_date.is_some()) {
                tracing::debug!("  [{}] {} ({})", task.id, task.title, task.due_label(today));
            }
            if let Some(message) = error_message {
                tracing::warn!("{}", message);
            }
        }
    }
}
