//! # TaskList
//!
//! A personal task-list web application.
//!
//! Users register, log in, and manage dated tasks. The dashboard splits a
//! user's tasks into three buckets by comparing each deadline against today:
//! overdue, due today, and future.
//!
//! ## Modules
//! - `config`: process configuration from environment variables
//! - `models`: users, tasks, and password hashing
//! - `db`: SQLite persistence
//! - `forms`: form schemas and validation
//! - `session`: signed-cookie sessions
//! - `web`: router, per-request auth, handlers, and HTML views

pub mod config;
pub mod db;
pub mod forms;
pub mod models;
pub mod session;
pub mod web;

pub use config::Config;
