//! # Data Retrieval Module
//!
//! This module provides a centralized location for generic data retrieval
//! clients and utilities, primarily focused on HTTP-based interactions.
//!
//! ## Purpose:
//! The goal of the `retrieve` module is to offer a consistent and robust way
//! to fetch data from external services, encapsulating common concerns such
//! as HTTP request building, bounded retries, and cancellation. This prevents
//! duplication of networking logic across different ingestors or API clients.
//!
//! ## Contained Modules:
//!
//! - **`retry`**: A composable retry wrapper around a single HTTP attempt,
//!   parameterized by a transient-error classification predicate, a backoff
//!   schedule, and an attempt cap.
//! - **`client`**: A generic `ApiClient` built on `reqwest` for streaming
//!   endpoints, where the configured timeout bounds header acquisition only.
//!
//! By using the components within this module, other parts of the system can
//! focus on data parsing and business logic, delegating the complexities of
//! network communication to this layer.

#![forbid(unsafe_code)]

/// Generic streaming HTTP client with bounded-backoff retries.
pub mod client;
/// Composable retry wrapper for single HTTP attempts.
pub mod retry;

pub use client::ApiClient;
pub use retry::{retry_request, transient_by_default, AttemptFault, RetrieveError, RetryPolicy};
