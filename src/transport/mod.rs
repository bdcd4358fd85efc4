//! HTTP transport for the verification service
//!
//! [`FetchTransport`] implements [`Transport`](crate::submission::Transport)
//! with the browser Fetch API. Requests are CORS POSTs with no retry.

pub mod fetch;

pub use fetch::FetchTransport;
