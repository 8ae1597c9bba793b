//! Remote media storage over a Cloudinary-compatible REST API.

pub mod classify;
pub mod client;
pub mod signature;

pub use client::CloudStorage;
