// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
pub mod config;
pub mod database;
pub mod detail;
pub mod error;
pub mod list;
pub mod remote;
pub mod repository;
pub mod state;
