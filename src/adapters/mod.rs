//! Adapters - Concrete implementations of ports.

pub mod cloud;
pub mod http;
pub mod local;
