//! Command implementations

pub mod data;
pub mod pipeline;
pub mod profile;
pub mod provision;
