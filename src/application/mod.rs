//! Application layer - Generic services that use ports.

pub mod concat;
pub mod delivery;
pub mod pipeline;
pub mod planner;
pub mod scope;
pub mod sweeper;
pub mod transform;

#[cfg(test)]
mod test_support;
