//! # TeamTrack API Server Library
//!
//! HTTP front end for TeamTrack: authenticates each request, asks the access
//! layer in `teamtrack-shared` for a decision and applies it through the
//! store.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `extract`: Validated JSON body extractor
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
