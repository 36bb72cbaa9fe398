//! Operator console: remote client, environment file, polling monitors and charts.

pub mod charts;
pub mod client;
pub mod environments;
pub mod monitor;
pub mod poller;
