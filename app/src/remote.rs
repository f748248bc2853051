// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use crate::error::TodoError;

use async_trait::async_trait;
use common::RemoteTask;
use std::time::Duration;
use tracing::{debug, info};

/// Read-only source of the remote task list.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Fetches the full remote list in one round-trip.
    async fn fetch_all(&self) -> Result<Vec<RemoteTask>, TodoError>;

    /// Fetches a single remote task by its remote id.
    async fn fetch_one(&self, id: i64) -> Result<RemoteTask, TodoError>;
}

/// [`RemoteSource`] backed by the `/todos` HTTP endpoint.
pub struct HttpRemoteSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRemoteSource {
    /// `timeout` bounds each request; an expired request counts as a network failure.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TodoError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, TodoError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let body = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json::<T>()
            .await?;
        Ok(body)
    }
}

#[async_trait]
impl RemoteSource for HttpRemoteSource {
    async fn fetch_all(&self) -> Result<Vec<RemoteTask>, TodoError> {
        let tasks: Vec<RemoteTask> = self.get("/todos").await?;
        info!("Fetched {} remote tasks.", tasks.len());
        Ok(tasks)
    }

    async fn fetch_one(&self, id: i64) -> Result<RemoteTask, TodoError> {
        self.get(&format!("/todos/{}", id)).await
    }
}
