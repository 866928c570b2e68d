//! M3U Aggregator
//!
//! Fetches public M3U playlists, merges them into one deduplicated channel
//! catalog with per-channel alternative streams, serves the catalog over
//! HTTP, and provides the playback fallback logic used by clients.

pub mod catalog;
pub mod config;
pub mod errors;
pub mod ingestor;
pub mod models;
pub mod player;
pub mod services;
pub mod sources;
pub mod utils;
pub mod web;

pub use errors::{AppError, AppResult};
