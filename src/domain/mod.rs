//! Domain objects, business rules and resource/tool integrations
//!
//! Provides the cache cluster administration and reporting logic exposed over the MCP protocol

pub mod admin;
pub mod models;
pub mod reporting;
pub mod resources;
pub mod search;
pub mod tools;
pub mod utils;

#[cfg(test)]
pub(crate) mod fakes;
