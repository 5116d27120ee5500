//! Common types and utilities shared across Roost crates.
//!
//! This crate defines the response envelope returned by every fetch operation,
//! the JSON-tree helpers used to pick apart API payloads, and the observability
//! bootstrap shared by binaries and tests. It stays dependency-light so every
//! other crate in the workspace can depend on it.
//!
//! # Overview
//!
//! - [`Response`], [`ErrorInfo`] and [`ErrorKind`]: the success/error/payload envelope
//! - [`json`]: `find_json_key` / `filter_json` tree helpers
//! - [`observability`]: centralised tracing/logging initialisation
//!
//! # Examples
//!
//! ```rust
//! use roost_common::{ErrorKind, Response};
//!
//! let missing: Response<Vec<u32>> = Response::fail(ErrorKind::NoTweetsFound, Vec::new());
//! assert!(!missing.success());
//! assert_eq!(missing.error().kind(), ErrorKind::NoTweetsFound);
//! ```

pub mod json;
pub mod observability;
pub mod response;

pub use response::{ErrorInfo, ErrorKind, Response};
