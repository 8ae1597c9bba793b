//! Reelmerge - Adaptive video merge service
//!
//! Hexagonal Architecture:
//! - domain/: Pure business logic (session, size tiers, encoder arguments)
//! - ports/: Trait definitions
//! - adapters/: Concrete implementations (HTTP, encoder, cloud and local storage)
//! - application/: Generic services (merge pipeline, retention sweeper)
//! - config: Environment configuration

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;

pub use application::pipeline::MergeService;
pub use application::sweeper::RetentionSweeper;
pub use config::{CloudConfig, PipelineConfig, RetentionConfig, ServerConfig};
