//! Ports - Trait definitions for the pipeline's external collaborators.

pub mod encoder;
pub mod fetch;
pub mod merge;
pub mod storage;
