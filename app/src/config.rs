// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use std::path::PathBuf;
use std::time::Duration;

const DATA_DIR: &str = "database";
const DATABASE_URL: &str = "sqlite://database/tasks.db";
const API_BASE_URL: &str = "https://jsonplaceholder.typicode.com";
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Settings for the composition root. Everything is compiled in.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Directory holding the database file; created on startup.
    pub data_dir: PathBuf,
    pub database_url: String,
    pub api_base_url: String,
    /// Upper bound for a single remote request.
    pub request_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DATA_DIR),
            database_url: DATABASE_URL.to_string(),
            api_base_url: API_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
        }
    }
}
