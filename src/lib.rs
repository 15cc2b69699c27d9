//! Canopy server library
//!
//! Daily request limiting for the public heartbeat and news feed ingestion.
//! Exposed as a library so tests can assemble the pieces directly.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod feeds;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;
