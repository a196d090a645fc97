//! # Vitrine
//!
//! A multi-tenant image gallery server, usable both as a standalone binary and
//! as a library.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! vitrine = { version = "0.0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vitrine::blob;
//! use vitrine::config::ServerConfig;
//! use vitrine::server::{AppState, create_router};
//! use vitrine::store::{SqliteStore, Store};
//!
//! let config = ServerConfig::default();
//! let store = SqliteStore::new(config.db_path()).unwrap();
//! store.initialize().unwrap();
//! let blobs = blob::from_config(&config).await.unwrap();
//!
//! let state = Arc::new(AppState::new(Arc::new(store), blobs, config));
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Builds the `vitrine` binary. Disable with `default-features = false`.

pub mod auth;
pub mod blob;
pub mod config;
pub mod error;
pub mod gallery;
pub mod server;
pub mod store;
pub mod types;
