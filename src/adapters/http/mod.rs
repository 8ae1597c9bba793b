//! HTTP adapters: the inbound API and the outbound source fetcher.

pub mod api;
pub mod fetch;

pub use api::{router, AppState};
pub use fetch::HttpFetcher;
