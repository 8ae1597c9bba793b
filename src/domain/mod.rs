//! Domain layer - Pure business logic.

// Encoder argument builders
pub mod av;

// Inbound request validation
pub mod request;

// Per-request session model
pub mod session;

// Size tiers and delivery strategies
pub mod tiers;
