//! Runtime adapters exposing the blocking scheduler API to async callers.

#[cfg(feature = "tokio-runtime")]
pub mod async_api;

#[cfg(feature = "tokio-runtime")]
pub use async_api::{admit_async, discard_async, wait_until_ready_async};
