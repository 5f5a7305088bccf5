//! Video showcase backend
//!
//! Users upload short clips, a background worker validates and renders them
//! into branded vertical videos, owners publish them, and the public votes on
//! and ranks the published ones.

pub mod app_state;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod startup;
pub mod storage;

pub use app_state::{AppState, Repositories};
pub use config::Config;
pub use error::{AppError, Result};
