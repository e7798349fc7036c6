//! Core library for medbook.
//!
//! - `auth`: credential stores and the refreshing [`auth::AuthenticatedSession`]
//! - `api`: transport, error taxonomy and the typed [`api::MedbookClient`]
//! - `models`: wire types for the medbook backend
//! - `views`: client-side list state shared by front ends
//! - `config`: persisted settings and directory layout

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod utils;
pub mod views;

pub use config::{Config, CredentialBackend};
