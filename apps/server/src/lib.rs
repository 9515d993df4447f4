//! Rollingdates Server Library
//!
//! This module exposes the server components for testing purposes.

pub mod auth;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod models;
pub mod routes;
pub mod scheduler;
pub mod services;
pub mod state;
pub mod store;
